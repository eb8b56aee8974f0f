//! # RC Channel Mapper Module
//!
//! Maps joystick axes to RC channel pulse widths.
//!
//! ## Default Channel Assignments
//!
//! | Channel | Axis | Inverted |
//! |---------|------|----------|
//! | CH1 | 2 | no |
//! | CH2 | 3 | yes |
//! | CH3 | 1 | yes |
//! | CH4 | 0 | no |
//!
//! ## Usage
//!
//! ```
//! use crsf_bridge::controller::channel_mapper::AxisMapper;
//!
//! let mapper = AxisMapper::default();
//! let mut channels = [1500; 16];
//! mapper.map_axes(|axis| if axis == 2 { Some(i16::MAX) } else { Some(0) }, &mut channels);
//!
//! assert_eq!(channels[0], 2000);
//! assert_eq!(channels[1], 1500);
//! ```

use serde::Deserialize;

use super::calibration::{normalize_axis, to_channel_us, Calibration, ChannelRange};
use crate::crsf::protocol::{ChannelValues, CRSF_NUM_CHANNELS};

/// One axis-to-channel assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AxisBinding {
    /// Axis index on the input device
    pub axis: usize,
    /// Target channel (1-based)
    pub channel: usize,
    /// Negate the axis before mapping
    #[serde(default)]
    pub inverted: bool,
}

impl AxisBinding {
    #[must_use]
    pub const fn new(axis: usize, channel: usize, inverted: bool) -> Self {
        Self {
            axis,
            channel,
            inverted,
        }
    }
}

/// Stock layout for a two-stick joystick
pub const DEFAULT_BINDINGS: [AxisBinding; 4] = [
    AxisBinding::new(2, 1, false),
    AxisBinding::new(3, 2, true),
    AxisBinding::new(1, 3, true),
    AxisBinding::new(0, 4, false),
];

/// Converts axis samples into channel values.
#[derive(Debug, Clone)]
pub struct AxisMapper {
    bindings: Vec<AxisBinding>,
    /// Channels mirrored around center after mapping
    reversed_channels: [bool; CRSF_NUM_CHANNELS],
    calibration: Calibration,
    range: ChannelRange,
}

impl Default for AxisMapper {
    fn default() -> Self {
        Self::new(
            DEFAULT_BINDINGS.to_vec(),
            &[],
            Calibration::linear(),
            ChannelRange::default(),
        )
    }
}

impl AxisMapper {
    /// Creates a mapper.
    ///
    /// # Arguments
    ///
    /// * `bindings` - Axis assignments; bindings to channels outside 1-16 are dropped
    /// * `reversed` - Channels to reverse (1-based for user config)
    /// * `calibration` - Deadzone / expo applied to every normalized axis
    /// * `range` - Pulse width range
    #[must_use]
    pub fn new(
        bindings: Vec<AxisBinding>,
        reversed: &[usize],
        calibration: Calibration,
        range: ChannelRange,
    ) -> Self {
        let mut reversed_channels = [false; CRSF_NUM_CHANNELS];
        for &ch in reversed {
            if (1..=CRSF_NUM_CHANNELS).contains(&ch) {
                reversed_channels[ch - 1] = true;
            }
        }

        let bindings = bindings
            .into_iter()
            .filter(|b| (1..=CRSF_NUM_CHANNELS).contains(&b.channel))
            .collect();

        Self {
            bindings,
            reversed_channels,
            calibration,
            range,
        }
    }

    pub fn bindings(&self) -> &[AxisBinding] {
        &self.bindings
    }

    pub fn range(&self) -> &ChannelRange {
        &self.range
    }

    /// Map one raw sample to a pulse width.
    #[must_use]
    pub fn map_sample(&self, raw: i16, inverted: bool, channel: usize) -> i32 {
        let mut normalized = self.calibration.apply(normalize_axis(raw));
        if inverted {
            normalized = -normalized;
        }

        let value = to_channel_us(normalized, &self.range);
        self.apply_reverse(value, channel)
    }

    /// Write every bound axis into `channels`.
    ///
    /// `sample(axis)` returns `None` for an axis with no reading this tick;
    /// its channel keeps the previous value.
    ///
    /// # Returns
    ///
    /// Number of channels written.
    pub fn map_axes<F>(&self, sample: F, channels: &mut ChannelValues) -> usize
    where
        F: Fn(usize) -> Option<i16>,
    {
        let mut written = 0;
        for binding in &self.bindings {
            if let Some(raw) = sample(binding.axis) {
                channels[binding.channel - 1] =
                    self.map_sample(raw, binding.inverted, binding.channel);
                written += 1;
            }
        }
        written
    }

    /// Mirror around center if the channel is reversed.
    #[inline]
    fn apply_reverse(&self, value: i32, channel: usize) -> i32 {
        if self.reversed_channels[channel - 1] {
            (2 * self.range.center - value).clamp(self.range.min, self.range.max)
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_axes(value: i16) -> impl Fn(usize) -> Option<i16> {
        move |_| Some(value)
    }

    // ==================== Mapping Tests ====================

    #[test]
    fn test_default_bindings() {
        let mapper = AxisMapper::default();
        assert_eq!(mapper.bindings(), &DEFAULT_BINDINGS);
    }

    #[test]
    fn test_centered_axes_map_to_center() {
        let mapper = AxisMapper::default();
        let mut channels = [0; CRSF_NUM_CHANNELS];

        assert_eq!(mapper.map_axes(all_axes(0), &mut channels), 4);
        assert_eq!(&channels[..4], &[1500, 1500, 1500, 1500]);
        // Unbound channels untouched
        assert_eq!(channels[4], 0);
    }

    #[test]
    fn test_full_deflection_respects_inversion() {
        let mapper = AxisMapper::default();
        let mut channels = [1500; CRSF_NUM_CHANNELS];

        mapper.map_axes(all_axes(i16::MAX), &mut channels);
        assert_eq!(channels[0], 2000); // axis 2
        assert_eq!(channels[1], 1000); // -axis 3
        assert_eq!(channels[2], 1000); // -axis 1
        assert_eq!(channels[3], 2000); // axis 0
    }

    #[test]
    fn test_inverting_most_negative_sample() {
        let mapper = AxisMapper::default();
        assert_eq!(mapper.map_sample(i16::MIN, true, 2), 2000);
        assert_eq!(mapper.map_sample(i16::MIN, false, 1), 1000);
    }

    #[test]
    fn test_unavailable_axis_keeps_previous_value() {
        let mapper = AxisMapper::default();
        let mut channels = [1234; CRSF_NUM_CHANNELS];

        let written = mapper.map_axes(
            |axis| if axis == 0 { Some(i16::MAX) } else { None },
            &mut channels,
        );

        assert_eq!(written, 1);
        assert_eq!(channels[3], 2000);
        assert_eq!(channels[0], 1234);
    }

    #[test]
    fn test_reversed_channel_mirrors() {
        let mapper = AxisMapper::new(
            DEFAULT_BINDINGS.to_vec(),
            &[1],
            Calibration::linear(),
            ChannelRange::default(),
        );

        assert_eq!(mapper.map_sample(i16::MAX, false, 1), 1000);
        assert_eq!(mapper.map_sample(i16::MAX, false, 4), 2000);
    }

    #[test]
    fn test_reversed_out_of_range_ignored() {
        let mapper = AxisMapper::new(
            DEFAULT_BINDINGS.to_vec(),
            &[0, 17, 100],
            Calibration::linear(),
            ChannelRange::default(),
        );
        assert_eq!(mapper.map_sample(i16::MAX, false, 1), 2000);
    }

    #[test]
    fn test_out_of_range_bindings_dropped() {
        let mapper = AxisMapper::new(
            vec![AxisBinding::new(0, 0, false), AxisBinding::new(0, 17, false), AxisBinding::new(0, 5, false)],
            &[],
            Calibration::linear(),
            ChannelRange::default(),
        );
        assert_eq!(mapper.bindings(), &[AxisBinding::new(0, 5, false)]);
    }

    #[test]
    fn test_calibration_deadzone_applied() {
        let mapper = AxisMapper::new(
            DEFAULT_BINDINGS.to_vec(),
            &[],
            Calibration::new(0.1, 0.0),
            ChannelRange::default(),
        );
        // ~3% deflection sits inside a 10% deadzone
        assert_eq!(mapper.map_sample(1000, false, 1), 1500);
    }

    #[test]
    fn test_binding_deserialize_default_not_inverted() {
        let binding: AxisBinding = toml::from_str("axis = 5\nchannel = 6").unwrap();
        assert_eq!(binding, AxisBinding::new(5, 6, false));
    }
}
