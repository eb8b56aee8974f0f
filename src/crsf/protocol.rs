//! # CRSF Protocol Constants and Types
//!
//! Core protocol definitions for CRSF (Crossfire) communication.
//!
//! Wire layout of every frame:
//!
//! ```text
//! [address][length][type][payload ...][crc8]
//!           \_______ length bytes ________/
//! ```

use serde::Serialize;

/// Flight controller address (also the usual CRSF "sync" byte)
pub const CRSF_ADDRESS_FLIGHT_CONTROLLER: u8 = 0xC8;

/// Broadcast address
pub const CRSF_ADDRESS_BROADCAST: u8 = 0x00;

/// Radio transmitter (handset) address
pub const CRSF_ADDRESS_RADIO_TRANSMITTER: u8 = 0xEA;

/// Receiver address
pub const CRSF_ADDRESS_RECEIVER: u8 = 0xEC;

/// Transmitter module address
pub const CRSF_ADDRESS_TRANSMITTER_MODULE: u8 = 0xEE;

/// Battery Sensor packet type
pub const CRSF_FRAMETYPE_BATTERY_SENSOR: u8 = 0x08;

/// Link Statistics packet type
pub const CRSF_FRAMETYPE_LINK_STATISTICS: u8 = 0x14;

/// RC Channels packet type
pub const CRSF_FRAMETYPE_RC_CHANNELS_PACKED: u8 = 0x16;

/// Maximum size of a complete frame on the wire
pub const CRSF_MAX_FRAME_SIZE: usize = 64;

/// Maximum CRSF payload size
/// Frame structure: address(1) + length(1) + type(1) + payload(N) + crc(1)
pub const CRSF_MAX_PAYLOAD_SIZE: usize = CRSF_MAX_FRAME_SIZE - 4;

/// Smallest legal length byte (type + crc, empty payload)
pub const CRSF_MIN_FRAME_LENGTH: u8 = 2;

/// Largest legal length byte (type + 60-byte payload + crc)
pub const CRSF_MAX_FRAME_LENGTH: u8 = (CRSF_MAX_PAYLOAD_SIZE + 2) as u8;

/// RC channels payload size (22 bytes for 16 channels × 11 bits)
pub const CRSF_RC_CHANNELS_PAYLOAD_SIZE: usize = 22;

/// Link Statistics payload size
pub const CRSF_LINK_STATS_PAYLOAD_SIZE: usize = 10;

/// Battery Sensor payload size
pub const CRSF_BATTERY_SENSOR_PAYLOAD_SIZE: usize = 8;

/// Number of RC channels
pub const CRSF_NUM_CHANNELS: usize = 16;

/// Packed channel value range (11-bit: 0-2047)
pub const CRSF_CHANNEL_VALUE_MIN: u16 = 0;
pub const CRSF_CHANNEL_VALUE_MAX: u16 = 2047;

/// Packed value corresponding to a 1500µs pulse
pub const CRSF_CHANNEL_VALUE_MID: i32 = 992;

/// Pulse width range in microseconds
pub const CHANNEL_US_MIN: i32 = 1000;
pub const CHANNEL_US_CENTER: i32 = 1500;
pub const CHANNEL_US_MAX: i32 = 2000;

/// Channel values in microseconds, index 0 is channel 1
pub type ChannelValues = [i32; CRSF_NUM_CHANNELS];

/// Converts a pulse width in microseconds to the packed 11-bit wire value.
///
/// # Examples
///
/// ```
/// use crsf_bridge::crsf::protocol::us_to_ticks;
///
/// assert_eq!(us_to_ticks(1500), 992);
/// assert_eq!(us_to_ticks(1000), 192);
/// assert_eq!(us_to_ticks(2000), 1792);
/// ```
#[must_use]
pub fn us_to_ticks(us: i32) -> u16 {
    let ticks = (i64::from(us) - i64::from(CHANNEL_US_CENTER)) * 8 / 5 + i64::from(CRSF_CHANNEL_VALUE_MID);
    ticks.clamp(i64::from(CRSF_CHANNEL_VALUE_MIN), i64::from(CRSF_CHANNEL_VALUE_MAX)) as u16
}

/// Converts a packed 11-bit wire value back to microseconds.
#[must_use]
pub fn ticks_to_us(ticks: u16) -> i32 {
    (ticks as i32 - CRSF_CHANNEL_VALUE_MID) * 5 / 8 + CHANNEL_US_CENTER
}

/// Closed set of frame types this bridge understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Battery voltage / current / capacity telemetry
    BatterySensor,
    /// Radio link RSSI / quality telemetry
    LinkStatistics,
    /// 16 channels × 11 bits
    RcChannelsPacked,
    /// Any other type byte; structurally valid but not interpreted
    Unknown(u8),
}

impl FrameType {
    /// Wire value of this type
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            FrameType::BatterySensor => CRSF_FRAMETYPE_BATTERY_SENSOR,
            FrameType::LinkStatistics => CRSF_FRAMETYPE_LINK_STATISTICS,
            FrameType::RcChannelsPacked => CRSF_FRAMETYPE_RC_CHANNELS_PACKED,
            FrameType::Unknown(byte) => byte,
        }
    }

    /// Fixed payload size for known types, `None` for unknown ones
    #[must_use]
    pub fn payload_size(self) -> Option<usize> {
        match self {
            FrameType::BatterySensor => Some(CRSF_BATTERY_SENSOR_PAYLOAD_SIZE),
            FrameType::LinkStatistics => Some(CRSF_LINK_STATS_PAYLOAD_SIZE),
            FrameType::RcChannelsPacked => Some(CRSF_RC_CHANNELS_PAYLOAD_SIZE),
            FrameType::Unknown(_) => None,
        }
    }
}

impl From<u8> for FrameType {
    fn from(byte: u8) -> Self {
        match byte {
            CRSF_FRAMETYPE_BATTERY_SENSOR => FrameType::BatterySensor,
            CRSF_FRAMETYPE_LINK_STATISTICS => FrameType::LinkStatistics,
            CRSF_FRAMETYPE_RC_CHANNELS_PACKED => FrameType::RcChannelsPacked,
            other => FrameType::Unknown(other),
        }
    }
}

/// Link statistics telemetry data
///
/// `Default` is the all-zero value reported before the first frame arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LinkStatistics {
    /// Uplink RSSI (antenna 1) in -dBm
    pub uplink_rssi_1: u8,

    /// Uplink RSSI (antenna 2) in -dBm (diversity)
    pub uplink_rssi_2: u8,

    /// Uplink link quality (0-100%)
    pub uplink_lq: u8,

    /// Uplink SNR in dB
    pub uplink_snr: i8,

    /// Active antenna (0 or 1)
    pub active_antenna: u8,

    /// RF mode / packet rate
    pub rf_mode: u8,

    /// Uplink TX power in mW (encoded)
    pub uplink_tx_power: u8,

    /// Downlink RSSI in -dBm
    pub downlink_rssi: u8,

    /// Downlink link quality (0-100%)
    pub downlink_lq: u8,

    /// Downlink SNR in dB
    pub downlink_snr: i8,
}

/// Battery sensor telemetry data in wire units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatterySensor {
    /// Battery voltage in decivolts (0.1 V)
    pub voltage_dv: u16,

    /// Current draw in deciamperes (0.1 A)
    pub current_da: u16,

    /// Capacity used in mAh (24-bit on the wire)
    pub capacity_used_mah: u32,

    /// Battery remaining percentage (0-100%)
    pub remaining_percent: u8,
}

impl BatterySensor {
    /// Voltage in volts
    #[must_use]
    pub fn voltage(&self) -> f32 {
        self.voltage_dv as f32 / 10.0
    }

    /// Current in amperes
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current_da as f32 / 10.0
    }
}

/// A single validated CRSF frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrsfFrame {
    /// Destination address byte
    pub address: u8,

    /// Frame type
    pub frame_type: FrameType,

    /// Payload data
    pub payload: Vec<u8>,
}

impl CrsfFrame {
    /// Get frame length byte (type + payload + crc)
    ///
    /// Frames are only built by the decoder or after payload validation, so the
    /// payload never exceeds 60 bytes and the value fits in a `u8`.
    #[must_use]
    pub fn length(&self) -> u8 {
        (1 + self.payload.len() + 1) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(CRSF_ADDRESS_FLIGHT_CONTROLLER, 0xC8);
        assert_eq!(CRSF_FRAMETYPE_RC_CHANNELS_PACKED, 0x16);
        assert_eq!(CRSF_FRAMETYPE_LINK_STATISTICS, 0x14);
        assert_eq!(CRSF_FRAMETYPE_BATTERY_SENSOR, 0x08);
        assert_eq!(CRSF_NUM_CHANNELS, 16);
        assert_eq!(CRSF_MAX_PAYLOAD_SIZE, 60);
        assert_eq!(CRSF_MAX_FRAME_LENGTH, 62);
    }

    #[test]
    fn test_frame_type_round_trip_bytes() {
        for byte in [0x08u8, 0x14, 0x16, 0x02, 0x7F] {
            assert_eq!(FrameType::from(byte).as_byte(), byte);
        }
        assert_eq!(FrameType::from(0x02), FrameType::Unknown(0x02));
    }

    #[test]
    fn test_frame_type_payload_sizes() {
        assert_eq!(FrameType::RcChannelsPacked.payload_size(), Some(22));
        assert_eq!(FrameType::LinkStatistics.payload_size(), Some(10));
        assert_eq!(FrameType::BatterySensor.payload_size(), Some(8));
        assert_eq!(FrameType::Unknown(0x02).payload_size(), None);
    }

    #[test]
    fn test_us_tick_conversion_endpoints() {
        assert_eq!(us_to_ticks(1500), 992);
        assert_eq!(us_to_ticks(1000), 192);
        assert_eq!(us_to_ticks(2000), 1792);
        assert_eq!(ticks_to_us(992), 1500);
        assert_eq!(ticks_to_us(192), 1000);
        assert_eq!(ticks_to_us(1792), 2000);
    }

    #[test]
    fn test_us_to_ticks_clamps() {
        assert_eq!(us_to_ticks(-5000), CRSF_CHANNEL_VALUE_MIN);
        assert_eq!(us_to_ticks(5000), CRSF_CHANNEL_VALUE_MAX);
    }

    #[test]
    fn test_us_to_ticks_extreme_values_keep_sign() {
        // Far outside the multiply range of i32
        assert_eq!(us_to_ticks(300_000_000), CRSF_CHANNEL_VALUE_MAX);
        assert_eq!(us_to_ticks(i32::MAX), CRSF_CHANNEL_VALUE_MAX);
        assert_eq!(us_to_ticks(i32::MIN), CRSF_CHANNEL_VALUE_MIN);
    }

    #[test]
    fn test_link_statistics_default_is_zeroed() {
        let stats = LinkStatistics::default();
        assert_eq!(stats.uplink_rssi_1, 0);
        assert_eq!(stats.uplink_lq, 0);
        assert_eq!(stats.downlink_snr, 0);
    }

    #[test]
    fn test_crsf_frame_length() {
        let frame = CrsfFrame {
            address: CRSF_ADDRESS_FLIGHT_CONTROLLER,
            frame_type: FrameType::RcChannelsPacked,
            payload: vec![0u8; 22],
        };
        assert_eq!(frame.length(), 24); // 1 (type) + 22 (payload) + 1 (crc)
    }

    #[test]
    fn test_battery_unit_helpers() {
        let battery = BatterySensor {
            voltage_dv: 168,
            current_da: 125,
            capacity_used_mah: 0,
            remaining_percent: 50,
        };
        assert!((battery.voltage() - 16.8).abs() < 0.001);
        assert!((battery.current() - 12.5).abs() < 0.001);
    }
}
