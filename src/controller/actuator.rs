//! Dry-run actuator sink
//!
//! Logs every change of mixed output at debug level. Hardware PWM/GPIO
//! drivers implement [`ActuatorSink`] the same way.

use tracing::debug;

use super::device::ActuatorSink;
use super::mixer::MixOutput;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct TracingActuator {
    last: Option<MixOutput>,
    applied: u64,
}

impl TracingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent output
    pub fn last(&self) -> Option<&MixOutput> {
        self.last.as_ref()
    }

    /// Number of outputs applied, repeated ones included
    pub fn applied(&self) -> u64 {
        self.applied
    }
}

impl ActuatorSink for TracingActuator {
    fn apply(&mut self, output: &MixOutput) -> Result<()> {
        self.applied += 1;
        if self.last.as_ref() != Some(output) {
            debug!("Actuator output: {:?}", output);
            self.last = Some(output.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::mixer::MotorCommand;

    #[test]
    fn test_tracks_last_output() {
        let mut sink = TracingActuator::new();
        let stop = MixOutput::Drive {
            left: MotorCommand::STOP,
            right: MotorCommand::STOP,
        };

        sink.apply(&stop).unwrap();
        sink.apply(&stop).unwrap();
        assert_eq!(sink.applied(), 2);
        assert_eq!(sink.last(), Some(&stop));

        let servo = MixOutput::Servo { pulses_us: vec![1500] };
        sink.apply(&servo).unwrap();
        assert_eq!(sink.last(), Some(&servo));
    }
}
