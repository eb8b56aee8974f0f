//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; missing values take the
//! defaults below.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::controller::calibration::{Calibration, ChannelRange};
use crate::controller::channel_mapper::{AxisBinding, AxisMapper, DEFAULT_BINDINGS};
use crate::controller::mixer::{MixSource, MixerKind, MixerSettings};
use crate::controller::mode::WorkMode;
use crate::crsf::protocol::CRSF_NUM_CHANNELS;
use crate::error::{CrsfBridgeError, Result};
use crate::serial::SUPPORTED_BAUD_RATES;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub link: LinkConfig,
    pub failover: FailoverConfig,
    pub control: ControlConfig,
    pub channels: ChannelConfig,
    pub mixer: MixerConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_primary_port")]
    pub primary_port: String,

    /// Empty disables the secondary port
    #[serde(default = "default_secondary_port")]
    pub secondary_port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Link timing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_failsafe_timeout_ms")]
    pub failsafe_timeout_ms: u64,

    #[serde(default = "default_packet_timeout_ms")]
    pub packet_timeout_ms: u64,

    #[serde(default = "default_receive_period_ms")]
    pub receive_period_ms: u64,

    #[serde(default = "default_max_bytes_per_tick")]
    pub max_bytes_per_tick: usize,
}

/// Transport failover configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FailoverConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_silence_timeout_ms")]
    pub silence_timeout_ms: u64,

    #[serde(default = "default_settle_time_ms")]
    pub settle_time_ms: u64,
}

/// Control loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    #[serde(default = "default_transmit_period_ms")]
    pub transmit_period_ms: u64,

    #[serde(default)]
    pub work_mode: WorkMode,

    /// Empty means auto-detect
    #[serde(default)]
    pub device_path: String,
}

/// Channel configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    #[serde(default = "default_center")]
    pub center: i32,

    #[serde(default = "default_half_range")]
    pub half_range: i32,

    #[serde(default = "default_channel_min")]
    pub min: i32,

    #[serde(default = "default_channel_max")]
    pub max: i32,

    /// 1-based channel numbers
    #[serde(default)]
    pub channel_reverse: Vec<usize>,

    #[serde(default = "default_axis_bindings")]
    pub axis: Vec<AxisBinding>,

    #[serde(default)]
    pub deadzone: f32,

    #[serde(default)]
    pub expo: f32,
}

/// Mixer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MixerConfig {
    #[serde(default)]
    pub kind: MixerKind,

    #[serde(default)]
    pub source: MixSource,

    #[serde(default = "default_left_channel")]
    pub left_channel: usize,

    #[serde(default = "default_right_channel")]
    pub right_channel: usize,

    #[serde(default = "default_deadband")]
    pub deadband: i32,

    #[serde(default = "default_duty_max")]
    pub duty_max: i32,

    #[serde(default = "default_servo_channels")]
    pub servo_channels: Vec<usize>,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_battery_period_ms")]
    pub battery_period_ms: u64,

    /// sysfs power-supply directory; empty disables battery frames
    #[serde(default)]
    pub battery_supply: String,
}

/// Diagnostic log configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily log files; empty logs to stdout only
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_primary_port() -> String { "/dev/ttyAMA0".to_string() }
fn default_secondary_port() -> String { "/dev/ttyS0".to_string() }
fn default_baud_rate() -> u32 { 420000 }

fn default_failsafe_timeout_ms() -> u64 { 1000 }
fn default_packet_timeout_ms() -> u64 { 100 }
fn default_receive_period_ms() -> u64 { 1 }
fn default_max_bytes_per_tick() -> usize { 256 }

fn default_silence_timeout_ms() -> u64 { 30000 }
fn default_settle_time_ms() -> u64 { 5000 }

fn default_period_ms() -> u64 { 10 }
fn default_transmit_period_ms() -> u64 { 10 }

fn default_center() -> i32 { 1500 }
fn default_half_range() -> i32 { 500 }
fn default_channel_min() -> i32 { 1000 }
fn default_channel_max() -> i32 { 2000 }
fn default_axis_bindings() -> Vec<AxisBinding> { DEFAULT_BINDINGS.to_vec() }

fn default_left_channel() -> usize { 1 }
fn default_right_channel() -> usize { 2 }
fn default_deadband() -> i32 { 10 }
fn default_duty_max() -> i32 { 255 }
fn default_servo_channels() -> Vec<usize> { vec![1, 2] }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }
fn default_battery_period_ms() -> u64 { 1000 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            primary_port: default_primary_port(),
            secondary_port: default_secondary_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            failsafe_timeout_ms: default_failsafe_timeout_ms(),
            packet_timeout_ms: default_packet_timeout_ms(),
            receive_period_ms: default_receive_period_ms(),
            max_bytes_per_tick: default_max_bytes_per_tick(),
        }
    }
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            silence_timeout_ms: default_silence_timeout_ms(),
            settle_time_ms: default_settle_time_ms(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            transmit_period_ms: default_transmit_period_ms(),
            work_mode: WorkMode::default(),
            device_path: String::new(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            center: default_center(),
            half_range: default_half_range(),
            min: default_channel_min(),
            max: default_channel_max(),
            channel_reverse: Vec::new(),
            axis: default_axis_bindings(),
            deadzone: 0.0,
            expo: 0.0,
        }
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            kind: MixerKind::default(),
            source: MixSource::default(),
            left_channel: default_left_channel(),
            right_channel: default_right_channel(),
            deadband: default_deadband(),
            duty_max: default_duty_max(),
            servo_channels: default_servo_channels(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
            battery_period_ms: default_battery_period_ms(),
            battery_supply: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> CrsfBridgeError {
    CrsfBridgeError::Config(toml::de::Error::custom(message))
}

fn check_period(name: &str, value: u64, max: u64) -> Result<()> {
    if value == 0 || value > max {
        return Err(invalid(format!("{} must be between 1 and {}", name, max)));
    }
    Ok(())
}

fn check_channel(name: &str, channel: usize) -> Result<()> {
    if !(1..=CRSF_NUM_CHANNELS).contains(&channel) {
        return Err(invalid(format!(
            "{} channel {} is out of bounds (must be 1-16)",
            name, channel
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use crsf_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.primary_port.is_empty() {
            return Err(invalid("primary_port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 115200, 400000, 420000, 921600, 1870000, 3750000",
            ));
        }

        check_period("failsafe_timeout_ms", self.link.failsafe_timeout_ms, 60000)?;
        check_period("packet_timeout_ms", self.link.packet_timeout_ms, 10000)?;
        check_period("receive_period_ms", self.link.receive_period_ms, 1000)?;
        check_period("period_ms", self.control.period_ms, 1000)?;
        check_period("transmit_period_ms", self.control.transmit_period_ms, 1000)?;
        check_period("silence_timeout_ms", self.failover.silence_timeout_ms, 600000)?;
        check_period("settle_time_ms", self.failover.settle_time_ms, 600000)?;

        if self.link.max_bytes_per_tick == 0 {
            return Err(invalid("max_bytes_per_tick must be greater than 0"));
        }

        // Channel range
        if self.channels.min >= self.channels.max {
            return Err(invalid("channel min must be less than max"));
        }

        if self.channels.center < self.channels.min || self.channels.center > self.channels.max {
            return Err(invalid("center must be within channel range (min to max)"));
        }

        if self.channels.half_range <= 0 {
            return Err(invalid("half_range must be greater than 0"));
        }

        if !(0.0..=0.25).contains(&self.channels.deadzone) {
            return Err(invalid("deadzone must be between 0.0 and 0.25"));
        }

        if !(0.0..=1.0).contains(&self.channels.expo) {
            return Err(invalid("expo must be between 0.0 and 1.0"));
        }

        for &channel in &self.channels.channel_reverse {
            check_channel("channel_reverse", channel)?;
        }

        for binding in &self.channels.axis {
            check_channel("axis binding", binding.channel)?;
        }

        // Mixer
        check_channel("left", self.mixer.left_channel)?;
        check_channel("right", self.mixer.right_channel)?;
        for &channel in &self.mixer.servo_channels {
            check_channel("servo", channel)?;
        }

        if self.mixer.deadband < 0 {
            return Err(invalid("deadband must not be negative"));
        }

        if self.mixer.duty_max <= 0 || self.mixer.duty_max > i32::from(u16::MAX) {
            return Err(invalid("duty_max must be between 1 and 65535"));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        check_period("log_interval_ms", self.telemetry.log_interval_ms, 60000)?;
        check_period("battery_period_ms", self.telemetry.battery_period_ms, 60000)?;

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }

    /// Pulse width range shared by the mapper and the mixer
    pub fn channel_range(&self) -> ChannelRange {
        ChannelRange {
            center: self.channels.center,
            half_range: self.channels.half_range,
            min: self.channels.min,
            max: self.channels.max,
        }
    }

    pub fn axis_mapper(&self) -> AxisMapper {
        AxisMapper::new(
            self.channels.axis.clone(),
            &self.channels.channel_reverse,
            Calibration::new(self.channels.deadzone, self.channels.expo),
            self.channel_range(),
        )
    }

    pub fn mixer_settings(&self) -> MixerSettings {
        MixerSettings {
            kind: self.mixer.kind,
            source: self.mixer.source,
            left_channel: self.mixer.left_channel,
            right_channel: self.mixer.right_channel,
            deadband: self.mixer.deadband,
            duty_max: self.mixer.duty_max,
            servo_channels: self.mixer.servo_channels.clone(),
        }
    }
}
