//! # Telemetry Module
//!
//! Status snapshots, JSONL logging and outbound battery telemetry.
//!
//! This module handles:
//! - Capturing a read-only snapshot of the link engine's published state
//! - Formatting snapshots as JSONL (JSON Lines)
//! - Writing to rotating log files (max N records per file, last M files kept)
//! - Reading battery measurements from a Linux power supply

pub mod battery;
pub mod logger;
pub mod snapshot;

pub use battery::{BatteryTelemetry, SysfsBattery};
pub use logger::TelemetryLogger;
pub use snapshot::TelemetrySnapshot;
