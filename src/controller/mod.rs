//! # Controller Module
//!
//! Joystick input, channel mapping and actuator mixing.
//!
//! This module handles:
//! - Joystick detection and an evdev-fed axis cache
//! - Normalising axes and mapping them to RC channels
//! - Differential-drive and servo mixing with deadband
//! - Failsafe output while the link is down
//! - The periodic mixing loop

pub mod actuator;
pub mod calibration;
pub mod channel_mapper;
pub mod control_loop;
pub mod device;
pub mod joystick;
pub mod mapper;
pub mod mixer;
pub mod mode;

pub use control_loop::MixingLoop;
pub use device::{ActuatorSink, InputDevice};
