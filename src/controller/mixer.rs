//! # Mixer Module
//!
//! Turns channel values into actuator commands.
//!
//! ## Differential drive
//!
//! Two channels `a` and `b` are first moved into a symmetric duty domain:
//!
//! ```text
//! sym(v) = clamp((v - center) * duty_max / half_range, -duty_max, duty_max)
//! left   =  (a - b) / 2
//! right  = -(a + b) / 2
//! ```
//!
//! Each side is deadbanded on its own, then split into a direction flag and an
//! unsigned duty.
//!
//! ## Servo
//!
//! Each configured channel is passed through as a pulse width, clamped to the
//! channel range and snapped to center inside the deadband.
//!
//! While the link is down every output is replaced by its safe value: zero
//! duty for motors, center pulse for servos.

use serde::{Deserialize, Serialize};

use super::calibration::{apply_deadband, ChannelRange};
use crate::crsf::protocol::{ChannelValues, CRSF_NUM_CHANNELS};

/// Default deadband in duty steps (differential) or µs (servo)
pub const DEFAULT_DEADBAND: i32 = 10;

/// Default full-scale duty
pub const DEFAULT_DUTY_MAX: i32 = 255;

/// Mixing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MixerKind {
    /// No actuator output
    #[default]
    None,
    /// Two-motor tank drive
    Differential,
    /// Pass-through servo pulses
    Servo,
}

/// Which channel bank feeds the mixer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MixSource {
    /// Channels received from the flight controller link
    #[default]
    Inbound,
    /// Channels produced locally from the joystick
    Outbound,
}

/// Direction plus unsigned duty for one motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotorCommand {
    pub forward: bool,
    pub duty: u16,
}

impl MotorCommand {
    /// Zero duty
    pub const STOP: MotorCommand = MotorCommand {
        forward: true,
        duty: 0,
    };

    /// Split a signed duty into direction and magnitude.
    #[must_use]
    pub fn from_signed(value: i32, duty_max: i32) -> Self {
        Self {
            forward: value >= 0,
            duty: value.unsigned_abs().min(duty_max.max(0) as u32) as u16,
        }
    }
}

/// One control cycle's actuator commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MixOutput {
    Drive {
        left: MotorCommand,
        right: MotorCommand,
    },
    Servo {
        pulses_us: Vec<i32>,
    },
}

/// Mixer parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerSettings {
    pub kind: MixerKind,
    pub source: MixSource,
    /// 1-based channel feeding `a`
    pub left_channel: usize,
    /// 1-based channel feeding `b`
    pub right_channel: usize,
    pub deadband: i32,
    pub duty_max: i32,
    /// 1-based channels passed to servos
    pub servo_channels: Vec<usize>,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            kind: MixerKind::None,
            source: MixSource::Inbound,
            left_channel: 1,
            right_channel: 2,
            deadband: DEFAULT_DEADBAND,
            duty_max: DEFAULT_DUTY_MAX,
            servo_channels: vec![1, 2],
        }
    }
}

/// Channel-to-actuator transform
#[derive(Debug, Clone)]
pub struct Mixer {
    settings: MixerSettings,
    range: ChannelRange,
}

impl Mixer {
    #[must_use]
    pub fn new(settings: MixerSettings, range: ChannelRange) -> Self {
        Self { settings, range }
    }

    pub fn settings(&self) -> &MixerSettings {
        &self.settings
    }

    /// Compute this cycle's output.
    ///
    /// Returns `None` when mixing is disabled. When `link_up` is false the
    /// safe output is returned regardless of `channels`.
    #[must_use]
    pub fn mix(&self, channels: &ChannelValues, link_up: bool) -> Option<MixOutput> {
        if !link_up {
            return self.failsafe();
        }

        match self.settings.kind {
            MixerKind::None => None,
            MixerKind::Differential => Some(self.mix_differential(channels)),
            MixerKind::Servo => Some(self.mix_servo(channels)),
        }
    }

    /// Safe output for the configured actuator type
    #[must_use]
    pub fn failsafe(&self) -> Option<MixOutput> {
        match self.settings.kind {
            MixerKind::None => None,
            MixerKind::Differential => Some(MixOutput::Drive {
                left: MotorCommand::STOP,
                right: MotorCommand::STOP,
            }),
            MixerKind::Servo => Some(MixOutput::Servo {
                pulses_us: vec![self.range.center; self.settings.servo_channels.len()],
            }),
        }
    }

    /// Move a pulse width into the symmetric duty domain.
    fn symmetric(&self, value: i32) -> i32 {
        let duty_max = self.settings.duty_max;
        if self.range.half_range == 0 {
            return 0;
        }
        let scaled = (i64::from(value) - i64::from(self.range.center)) * i64::from(duty_max)
            / i64::from(self.range.half_range);
        scaled.clamp(-i64::from(duty_max), i64::from(duty_max)) as i32
    }

    fn channel(channels: &ChannelValues, channel: usize) -> Option<i32> {
        (1..=CRSF_NUM_CHANNELS)
            .contains(&channel)
            .then(|| channels[channel - 1])
    }

    fn mix_differential(&self, channels: &ChannelValues) -> MixOutput {
        let center = self.range.center;
        let a = self.symmetric(Self::channel(channels, self.settings.left_channel).unwrap_or(center));
        let b = self.symmetric(Self::channel(channels, self.settings.right_channel).unwrap_or(center));

        let left = apply_deadband((a - b) / 2, self.settings.deadband);
        let right = apply_deadband(-(a + b) / 2, self.settings.deadband);

        MixOutput::Drive {
            left: MotorCommand::from_signed(left, self.settings.duty_max),
            right: MotorCommand::from_signed(right, self.settings.duty_max),
        }
    }

    fn mix_servo(&self, channels: &ChannelValues) -> MixOutput {
        let center = self.range.center;
        let pulses_us = self
            .settings
            .servo_channels
            .iter()
            .map(|&ch| {
                let pulse = Self::channel(channels, ch)
                    .unwrap_or(center)
                    .clamp(self.range.min, self.range.max);
                center + apply_deadband(pulse - center, self.settings.deadband)
            })
            .collect();

        MixOutput::Servo { pulses_us }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn differential() -> Mixer {
        Mixer::new(
            MixerSettings {
                kind: MixerKind::Differential,
                ..MixerSettings::default()
            },
            ChannelRange::default(),
        )
    }

    fn servo() -> Mixer {
        Mixer::new(
            MixerSettings {
                kind: MixerKind::Servo,
                servo_channels: vec![1, 3],
                ..MixerSettings::default()
            },
            ChannelRange::default(),
        )
    }

    fn with_ab(a: i32, b: i32) -> ChannelValues {
        let mut channels = [1500; CRSF_NUM_CHANNELS];
        channels[0] = a;
        channels[1] = b;
        channels
    }

    fn drive(output: Option<MixOutput>) -> (MotorCommand, MotorCommand) {
        match output {
            Some(MixOutput::Drive { left, right }) => (left, right),
            other => panic!("Expected drive output, got: {:?}", other),
        }
    }

    // ==================== Differential Tests ====================

    #[test]
    fn test_centered_inputs_stop_both_motors() {
        let (left, right) = drive(differential().mix(&with_ab(1500, 1500), true));
        assert_eq!(left.duty, 0);
        assert_eq!(right.duty, 0);
    }

    #[test]
    fn test_equal_inputs_near_center_forced_neutral() {
        // sym(1510) = 10 * 255 / 500 = 5; left = 0, right = -5 -> deadbanded
        let (left, right) = drive(differential().mix(&with_ab(1510, 1510), true));
        assert_eq!(left.duty, 0);
        assert_eq!(right.duty, 0);
    }

    #[test]
    fn test_full_a_drives_both() {
        // a = 255, b = 0 -> left = 127, right = -127
        let (left, right) = drive(differential().mix(&with_ab(2000, 1500), true));
        assert_eq!(left, MotorCommand { forward: true, duty: 127 });
        assert_eq!(right, MotorCommand { forward: false, duty: 127 });
    }

    #[test]
    fn test_opposite_inputs_saturate() {
        // a = 255, b = -255 -> left = 255, right = 0
        let (left, right) = drive(differential().mix(&with_ab(2000, 1000), true));
        assert_eq!(left, MotorCommand { forward: true, duty: 255 });
        assert_eq!(right.duty, 0);
    }

    #[test]
    fn test_out_of_range_input_clamped_in_symmetric_domain() {
        let mixer = differential();
        assert_eq!(mixer.symmetric(5000), 255);
        assert_eq!(mixer.symmetric(-5000), -255);
        assert_eq!(mixer.symmetric(1500), 0);
        assert_eq!(mixer.symmetric(i32::MAX), 255);
        assert_eq!(mixer.symmetric(i32::MIN), -255);
    }

    #[test]
    fn test_differential_deadband_boundary() {
        let mixer = Mixer::new(
            MixerSettings {
                kind: MixerKind::Differential,
                duty_max: 500,
                ..MixerSettings::default()
            },
            ChannelRange::default(),
        );
        // duty_max == half_range, so sym(v) = v - 1500
        // a = 18, b = 0 -> left = 9 (below 10), right = -9
        let (left, right) = drive(mixer.mix(&with_ab(1518, 1500), true));
        assert_eq!(left.duty, 0);
        assert_eq!(right.duty, 0);

        // a = 20 -> left = 10, right = -10 (at threshold, passes)
        let (left, right) = drive(mixer.mix(&with_ab(1520, 1500), true));
        assert_eq!(left, MotorCommand { forward: true, duty: 10 });
        assert_eq!(right, MotorCommand { forward: false, duty: 10 });

        // a = 22 -> 11 passes
        let (left, _) = drive(mixer.mix(&with_ab(1522, 1500), true));
        assert_eq!(left.duty, 11);
    }

    #[test]
    fn test_motor_command_from_signed() {
        assert_eq!(MotorCommand::from_signed(-300, 255), MotorCommand { forward: false, duty: 255 });
        assert_eq!(MotorCommand::from_signed(0, 255), MotorCommand { forward: true, duty: 0 });
        assert_eq!(MotorCommand::from_signed(42, 255), MotorCommand { forward: true, duty: 42 });
    }

    // ==================== Servo Tests ====================

    #[test]
    fn test_servo_passes_clamped_pulses() {
        let mut channels = [1500; CRSF_NUM_CHANNELS];
        channels[0] = 2300;
        channels[2] = 1200;

        match servo().mix(&channels, true) {
            Some(MixOutput::Servo { pulses_us }) => assert_eq!(pulses_us, vec![2000, 1200]),
            other => panic!("Expected servo output, got: {:?}", other),
        }
    }

    #[test]
    fn test_servo_deadband_snaps_to_center() {
        let mut channels = [1500; CRSF_NUM_CHANNELS];
        channels[0] = 1509;
        channels[2] = 1490;

        match servo().mix(&channels, true) {
            Some(MixOutput::Servo { pulses_us }) => assert_eq!(pulses_us, vec![1500, 1490]),
            other => panic!("Expected servo output, got: {:?}", other),
        }
    }

    // ==================== Failsafe Tests ====================

    #[test]
    fn test_drive_failsafe_when_link_down() {
        let (left, right) = drive(differential().mix(&with_ab(2000, 1000), false));
        assert_eq!(left.duty, 0);
        assert_eq!(right.duty, 0);
    }

    #[test]
    fn test_servo_failsafe_is_center() {
        let mut channels = [1500; CRSF_NUM_CHANNELS];
        channels[0] = 2000;

        assert_eq!(
            servo().mix(&channels, false),
            Some(MixOutput::Servo { pulses_us: vec![1500, 1500] })
        );
    }

    #[test]
    fn test_none_kind_produces_nothing() {
        let mixer = Mixer::new(MixerSettings::default(), ChannelRange::default());
        assert_eq!(mixer.mix(&[2000; CRSF_NUM_CHANNELS], true), None);
        assert_eq!(mixer.mix(&[2000; CRSF_NUM_CHANNELS], false), None);
    }
}
