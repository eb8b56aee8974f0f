//! Trait abstraction for byte-stream transports to enable testing

use crate::error::Result;

/// Duplex, non-blocking byte transport
///
/// Implementations must never block waiting for input: when no byte is
/// buffered `try_read_byte` returns `Ok(None)` immediately.
pub trait Transport: Send {
    /// Read one byte if one is available
    fn try_read_byte(&mut self) -> Result<Option<u8>>;

    /// Write the whole buffer, returning the number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Human-readable identifier used in logs
    fn name(&self) -> &str;
}
