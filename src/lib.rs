//! # CRSF Bridge Library
//!
//! Drive a flight controller from a joystick over a CRSF serial link.
//!
//! This library provides the CRSF frame codec, the link state machine with its
//! loss-of-link failsafe, the shared channel store, the actuator mixing loop
//! and battery / status telemetry.

pub mod config;
pub mod error;
pub mod crsf;
pub mod link;
pub mod controller;
pub mod serial;
pub mod telemetry;
