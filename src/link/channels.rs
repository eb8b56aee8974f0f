//! Shared channel table
//!
//! Two banks of 16 pulse widths: `outbound` values are written by the control
//! side and read when an RC channels frame is transmitted, `inbound` values
//! are written by the decoder from every valid RC channels frame.
//!
//! Outbound values are clamped to 1000..=2000µs on store.

use std::sync::Mutex;

use crate::crsf::protocol::{
    ChannelValues, CHANNEL_US_CENTER, CHANNEL_US_MAX, CHANNEL_US_MIN, CRSF_NUM_CHANNELS,
};
use crate::error::{CrsfBridgeError, Result};

#[derive(Debug)]
struct Banks {
    inbound: ChannelValues,
    outbound: ChannelValues,
}

/// Thread-safe two-bank channel store
#[derive(Debug)]
pub struct ChannelStore {
    banks: Mutex<Banks>,
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a 1-based channel index to an array index.
fn slot(channel: usize) -> Result<usize> {
    if (1..=CRSF_NUM_CHANNELS).contains(&channel) {
        Ok(channel - 1)
    } else {
        Err(CrsfBridgeError::ChannelOutOfRange(channel))
    }
}

impl ChannelStore {
    /// Creates a store with every channel at the 1500µs neutral point.
    pub fn new() -> Self {
        Self {
            banks: Mutex::new(Banks {
                inbound: [CHANNEL_US_CENTER; CRSF_NUM_CHANNELS],
                outbound: [CHANNEL_US_CENTER; CRSF_NUM_CHANNELS],
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Banks> {
        // A panic while holding the lock cannot leave the arrays half-written
        self.banks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set one outbound channel (1-based index)
    pub fn set_outbound(&self, channel: usize, value: i32) -> Result<()> {
        let index = slot(channel)?;
        self.lock().outbound[index] = value.clamp(CHANNEL_US_MIN, CHANNEL_US_MAX);
        Ok(())
    }

    /// Replace all outbound channels at once
    pub fn set_outbound_all(&self, values: &ChannelValues) {
        self.lock().outbound = values.map(|v| v.clamp(CHANNEL_US_MIN, CHANNEL_US_MAX));
    }

    /// Replace all inbound channels with a freshly decoded frame
    pub fn set_inbound_all(&self, values: &ChannelValues) {
        self.lock().inbound = *values;
    }

    /// Copy of the outbound bank
    pub fn outbound_snapshot(&self) -> ChannelValues {
        self.lock().outbound
    }

    /// Copy of the inbound bank
    pub fn inbound_snapshot(&self) -> ChannelValues {
        self.lock().inbound
    }
}
