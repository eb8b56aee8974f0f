//! # Event Mapper Module
//!
//! Turns evdev absolute-axis events into an indexed cache of signed 16-bit
//! samples.
//!
//! Devices report each axis in their own range (0-255 for most gamepads,
//! -32768..32767 for some sticks). Every axis is rescaled from the range the
//! kernel reports for it to `i16::MIN..=i16::MAX`, so downstream code sees one
//! sample format. Axis index `i` is the i-th absolute axis the device
//! supports, in ascending code order.

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind};

/// Reported range and last sample of one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSlot {
    /// Kernel axis code
    pub code: u16,
    /// Minimum raw value reported by the device
    pub min: i32,
    /// Maximum raw value reported by the device
    pub max: i32,
    /// Last rescaled sample, `None` until the first reading
    pub value: Option<i16>,
}

impl AxisSlot {
    #[must_use]
    pub fn new(axis: AbsoluteAxisType, min: i32, max: i32) -> Self {
        Self {
            code: axis.0,
            min,
            max,
            value: None,
        }
    }

    /// Rescale a raw device value to the full `i16` range.
    #[must_use]
    pub fn rescale(&self, raw: i32) -> i16 {
        if self.max <= self.min {
            return 0;
        }

        let span = i64::from(self.max) - i64::from(self.min);
        let offset = i64::from(raw.clamp(self.min, self.max)) - i64::from(self.min);
        let scaled = offset * 65_535 / span - 32_768;
        scaled.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
    }
}

/// Maps evdev events into the axis cache.
///
/// `EventMapper` is not thread-safe on its own; the joystick reader wraps it
/// in a mutex.
///
/// # Examples
///
/// ```
/// use evdev::{AbsoluteAxisType, EventType, InputEvent};
/// use crsf_bridge::controller::mapper::{AxisSlot, EventMapper};
///
/// let mut mapper = EventMapper::new(vec![AxisSlot::new(AbsoluteAxisType::ABS_X, 0, 255)]);
/// mapper.process_event(&InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, 255));
/// assert_eq!(mapper.axis(0), Some(i16::MAX));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventMapper {
    slots: Vec<AxisSlot>,
}

impl EventMapper {
    /// Creates a mapper for the given axes, sorted by axis code.
    #[must_use]
    pub fn new(mut slots: Vec<AxisSlot>) -> Self {
        slots.sort_by_key(|slot| slot.code);
        Self { slots }
    }

    /// Number of known axes
    #[must_use]
    pub fn axis_count(&self) -> usize {
        self.slots.len()
    }

    /// Latest sample of axis `index`, `None` if unknown or not yet reported.
    #[must_use]
    pub fn axis(&self, index: usize) -> Option<i16> {
        self.slots.get(index).and_then(|slot| slot.value)
    }

    /// Seed an axis with its current raw value (from the absinfo snapshot).
    pub fn seed(&mut self, code: u16, raw: i32) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.code == code) {
            slot.value = Some(slot.rescale(raw));
        }
    }

    /// Processes a single evdev input event and updates internal state.
    ///
    /// Only absolute-axis events for known axes are used; key, sync and
    /// other events are ignored.
    pub fn process_event(&mut self, event: &InputEvent) {
        if let InputEventKind::AbsAxis(axis) = event.kind() {
            self.seed(axis.0, event.value());
        }
    }

    /// Forget every sample (e.g. after the device disconnects).
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.value = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::{EventType, Key};

    /// Helper to create an axis event for testing.
    fn make_axis_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    fn gamepad() -> EventMapper {
        EventMapper::new(vec![
            AxisSlot::new(AbsoluteAxisType::ABS_RZ, 0, 255),
            AxisSlot::new(AbsoluteAxisType::ABS_X, 0, 255),
            AxisSlot::new(AbsoluteAxisType::ABS_Y, 0, 255),
            AxisSlot::new(AbsoluteAxisType::ABS_Z, 0, 255),
        ])
    }

    // ==================== Rescale Tests ====================

    #[test]
    fn test_rescale_8bit_axis() {
        let slot = AxisSlot::new(AbsoluteAxisType::ABS_X, 0, 255);
        assert_eq!(slot.rescale(0), i16::MIN);
        assert_eq!(slot.rescale(255), i16::MAX);
        assert!(slot.rescale(128).abs() < 200);
    }

    #[test]
    fn test_rescale_native_16bit_axis_identity() {
        let slot = AxisSlot::new(AbsoluteAxisType::ABS_X, -32768, 32767);
        assert_eq!(slot.rescale(-32768), i16::MIN);
        assert_eq!(slot.rescale(0), 0);
        assert_eq!(slot.rescale(32767), i16::MAX);
    }

    #[test]
    fn test_rescale_clamps_out_of_range() {
        let slot = AxisSlot::new(AbsoluteAxisType::ABS_X, 0, 255);
        assert_eq!(slot.rescale(1000), i16::MAX);
        assert_eq!(slot.rescale(-5), i16::MIN);
    }

    #[test]
    fn test_rescale_degenerate_range() {
        let slot = AxisSlot::new(AbsoluteAxisType::ABS_X, 10, 10);
        assert_eq!(slot.rescale(10), 0);
    }

    // ==================== Cache Tests ====================

    #[test]
    fn test_axes_ordered_by_code() {
        let mut mapper = gamepad();
        assert_eq!(mapper.axis_count(), 4);

        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RZ, 255));
        // ABS_X=0, ABS_Y=1, ABS_Z=2, ABS_RZ=5 -> RZ is index 3
        assert_eq!(mapper.axis(3), Some(i16::MAX));
        assert_eq!(mapper.axis(0), None);
    }

    #[test]
    fn test_unreported_axis_is_none() {
        let mapper = gamepad();
        assert_eq!(mapper.axis(0), None);
        assert_eq!(mapper.axis(99), None);
    }

    #[test]
    fn test_latest_event_wins() {
        let mut mapper = gamepad();
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_X, 0));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_X, 255));
        assert_eq!(mapper.axis(0), Some(i16::MAX));
    }

    #[test]
    fn test_unknown_axis_ignored() {
        let mut mapper = gamepad();
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_TILT_X, 100));
        for i in 0..mapper.axis_count() {
            assert_eq!(mapper.axis(i), None);
        }
    }

    #[test]
    fn test_key_and_sync_events_ignored() {
        let mut mapper = gamepad();
        mapper.process_event(&InputEvent::new(EventType::KEY, Key::BTN_SOUTH.code(), 1));
        mapper.process_event(&InputEvent::new(EventType::SYNCHRONIZATION, 0, 0));
        assert_eq!(mapper.axis(0), None);
    }

    #[test]
    fn test_seed_and_reset() {
        let mut mapper = gamepad();
        mapper.seed(AbsoluteAxisType::ABS_Y.0, 0);
        assert_eq!(mapper.axis(1), Some(i16::MIN));

        mapper.reset();
        assert_eq!(mapper.axis(1), None);
    }
}
