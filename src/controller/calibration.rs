//! # Calibration Module
//!
//! Axis normalisation, shaping and the deadband used by the mixer.
//!
//! ## Normalisation
//!
//! Raw samples are signed 16-bit. The negative half has one more step than the
//! positive half, so each half is scaled separately and both extremes land
//! exactly on ±1.0:
//!
//! ```text
//! n = raw / 32767   (raw >= 0)
//! n = raw / 32768   (raw <  0)
//! ```
//!
//! ## Deadzone and expo
//!
//! Optional shaping on the normalised value. The expo formula is
//! `output = (1 - expo) * input + expo * input³`.
//!
//! ## Usage
//!
//! ```
//! use crsf_bridge::controller::calibration::{normalize_axis, to_channel_us, ChannelRange};
//!
//! let n = normalize_axis(32767);
//! assert_eq!(to_channel_us(n, &ChannelRange::default()), 2000);
//! ```

use crate::crsf::protocol::{CHANNEL_US_CENTER, CHANNEL_US_MAX, CHANNEL_US_MIN};

/// Applies deadzone and exponential curve to a normalized input.
///
/// Input and output are in the range -1.0 to 1.0, where 0.0 is center.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    /// Deadzone as a fraction (0.0 to 0.25).
    deadzone: f32,
    /// Exponential curve factor (0.0 to 1.0).
    expo: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::linear()
    }
}

impl Calibration {
    /// Creates a new calibration with specified deadzone and expo.
    ///
    /// Both values are clamped: deadzone to 0.0..=0.25, expo to 0.0..=1.0.
    #[must_use]
    pub fn new(deadzone: f32, expo: f32) -> Self {
        Self {
            deadzone: deadzone.clamp(0.0, 0.25),
            expo: expo.clamp(0.0, 1.0),
        }
    }

    /// Creates a linear calibration (no deadzone, no expo).
    #[must_use]
    pub fn linear() -> Self {
        Self {
            deadzone: 0.0,
            expo: 0.0,
        }
    }

    #[must_use]
    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    #[must_use]
    pub fn expo(&self) -> f32 {
        self.expo
    }

    /// Applies deadzone and expo curve to a normalized input.
    ///
    /// # Examples
    ///
    /// ```
    /// use crsf_bridge::controller::calibration::Calibration;
    ///
    /// let cal = Calibration::new(0.05, 0.3);
    ///
    /// assert_eq!(cal.apply(0.02), 0.0);
    /// assert!((cal.apply(1.0) - 1.0).abs() < 0.001);
    /// assert!((cal.apply(-1.0) - (-1.0)).abs() < 0.001);
    /// ```
    #[must_use]
    pub fn apply(&self, input: f32) -> f32 {
        let sign = input.signum();
        let abs_input = input.abs();

        let after_deadzone = self.apply_deadzone(abs_input);
        let after_expo = self.apply_expo(after_deadzone);

        sign * after_expo
    }

    /// Maps values within deadzone to 0, and scales remaining range to 0..1.
    #[inline]
    fn apply_deadzone(&self, abs_input: f32) -> f32 {
        if abs_input <= self.deadzone {
            0.0
        } else {
            (abs_input - self.deadzone) / (1.0 - self.deadzone)
        }
    }

    #[inline]
    fn apply_expo(&self, input: f32) -> f32 {
        if self.expo == 0.0 {
            input
        } else {
            let linear = (1.0 - self.expo) * input;
            let cubic = self.expo * input * input * input;
            linear + cubic
        }
    }
}

/// Output range of a channel in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRange {
    pub center: i32,
    pub half_range: i32,
    pub min: i32,
    pub max: i32,
}

impl Default for ChannelRange {
    fn default() -> Self {
        Self {
            center: CHANNEL_US_CENTER,
            half_range: (CHANNEL_US_MAX - CHANNEL_US_MIN) / 2,
            min: CHANNEL_US_MIN,
            max: CHANNEL_US_MAX,
        }
    }
}

/// Converts a raw signed axis sample to -1.0..=1.0.
///
/// # Examples
///
/// ```
/// use crsf_bridge::controller::calibration::normalize_axis;
///
/// assert_eq!(normalize_axis(i16::MIN), -1.0);
/// assert_eq!(normalize_axis(0), 0.0);
/// assert_eq!(normalize_axis(i16::MAX), 1.0);
/// ```
#[must_use]
pub fn normalize_axis(raw: i16) -> f32 {
    if raw >= 0 {
        f32::from(raw) / 32767.0
    } else {
        f32::from(raw) / 32768.0
    }
}

/// Converts a normalized value to a pulse width, rounded and clamped.
///
/// `channel = round(center + normalized * half_range)`, then clamped to
/// `[min, max]`.
#[must_use]
pub fn to_channel_us(normalized: f32, range: &ChannelRange) -> i32 {
    let value = (range.center as f32 + normalized * range.half_range as f32).round() as i32;
    value.clamp(range.min, range.max)
}

/// Forces values with magnitude strictly below `threshold` to zero.
///
/// # Examples
///
/// ```
/// use crsf_bridge::controller::calibration::apply_deadband;
///
/// assert_eq!(apply_deadband(9, 10), 0);
/// assert_eq!(apply_deadband(10, 10), 10);
/// assert_eq!(apply_deadband(-9, 10), 0);
/// ```
#[must_use]
pub fn apply_deadband(value: i32, threshold: i32) -> i32 {
    if value.abs() < threshold {
        0
    } else {
        value
    }
}
