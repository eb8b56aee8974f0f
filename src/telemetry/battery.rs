//! Battery telemetry source
//!
//! Measurements arrive in engineering units and are scaled to the wire units
//! of the battery sensor frame (0.1 V, 0.1 A, 24-bit mAh).

use std::fs;
use std::path::{Path, PathBuf};

use crate::crsf::protocol::BatterySensor;
use crate::error::{CrsfBridgeError, Result};

/// Largest value the 24-bit capacity field can carry
const MAX_CAPACITY_MAH: u32 = 0x00FF_FFFF;

/// Battery measurement in engineering units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatteryTelemetry {
    pub voltage_mv: u32,
    pub current_ma: u32,
    /// Capacity drawn so far
    pub capacity_mah: u32,
    pub remaining_pct: u8,
}

impl BatteryTelemetry {
    /// Scale to frame units, saturating fields that do not fit
    pub fn to_sensor(&self) -> BatterySensor {
        BatterySensor {
            voltage_dv: u16::try_from(self.voltage_mv / 100).unwrap_or(u16::MAX),
            current_da: u16::try_from(self.current_ma / 100).unwrap_or(u16::MAX),
            capacity_used_mah: self.capacity_mah.min(MAX_CAPACITY_MAH),
            remaining_percent: self.remaining_pct.min(100),
        }
    }
}

impl From<BatteryTelemetry> for BatterySensor {
    fn from(telemetry: BatteryTelemetry) -> Self {
        telemetry.to_sensor()
    }
}

/// Linux power-supply class reader (`/sys/class/power_supply/<name>`)
#[derive(Debug, Clone)]
pub struct SysfsBattery {
    dir: PathBuf,
}

impl SysfsBattery {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read one measurement
    ///
    /// `voltage_now` and `current_now` are required (µV / µA). `capacity` (%)
    /// and `charge_full` / `charge_now` (µAh) are optional and read as zero
    /// when missing.
    ///
    /// # Errors
    ///
    /// Returns `Io` if a required attribute cannot be read, `Controller` if
    /// an attribute does not hold an integer
    pub fn read(&self) -> Result<BatteryTelemetry> {
        let voltage_uv = self.read_attr("voltage_now")?;
        let current_ua = self.read_attr("current_now")?;
        let remaining = self.read_attr("capacity").unwrap_or(0);

        let capacity_mah = match (self.read_attr("charge_full"), self.read_attr("charge_now")) {
            (Ok(full), Ok(now)) => (full - now).max(0) / 1000,
            _ => 0,
        };

        Ok(BatteryTelemetry {
            voltage_mv: to_u32(voltage_uv.max(0) / 1000),
            // Sign only encodes charge vs discharge
            current_ma: to_u32(current_ua.abs() / 1000),
            capacity_mah: to_u32(capacity_mah),
            remaining_pct: remaining.clamp(0, 100) as u8,
        })
    }

    fn read_attr(&self, name: &str) -> Result<i64> {
        let raw = fs::read_to_string(self.dir.join(name))?;
        raw.trim().parse::<i64>().map_err(|e| {
            CrsfBridgeError::Controller(format!("invalid battery attribute {}: {}", name, e))
        })
    }
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
