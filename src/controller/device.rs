//! Collaborator seams for the mixing loop.

use super::mixer::MixOutput;
use crate::error::Result;

/// Source of raw axis samples
#[cfg_attr(test, mockall::automock)]
pub trait InputDevice: Send {
    /// Refresh the axis cache without blocking
    fn poll(&mut self) -> Result<()>;

    /// Latest sample for axis `index`, `None` if unavailable this tick
    fn axis(&self, index: usize) -> Option<i16>;
}

/// Consumer of mixed actuator commands
#[cfg_attr(test, mockall::automock)]
pub trait ActuatorSink: Send {
    fn apply(&mut self, output: &MixOutput) -> Result<()>;
}
