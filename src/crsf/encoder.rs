//! # CRSF Packet Encoder
//!
//! Serializes outbound frames: RC channels, battery telemetry and any other
//! payload the caller supplies. Encoding never touches shared state.

use bytes::{BufMut, BytesMut};

use super::crc::frame_crc;
use super::protocol::*;
use crate::error::{CrsfBridgeError, Result};

/// Encode a frame of the given type
///
/// # Arguments
///
/// * `address` - Destination address byte
/// * `frame_type` - Frame type
/// * `payload` - Payload bytes; must match the fixed size of a known type
///
/// # Returns
///
/// * `Result<Vec<u8>>` - `address, length, type, payload..., crc`
///
/// # Errors
///
/// Returns `InvalidPayloadSize` if the payload length does not match the
/// frame type, or exceeds 60 bytes for an unknown type.
///
/// # Examples
///
/// ```
/// use crsf_bridge::crsf::encoder::encode_frame;
/// use crsf_bridge::crsf::protocol::{FrameType, CRSF_ADDRESS_FLIGHT_CONTROLLER};
///
/// let frame = encode_frame(
///     CRSF_ADDRESS_FLIGHT_CONTROLLER,
///     FrameType::LinkStatistics,
///     &[0u8; 10],
/// )?;
/// assert_eq!(frame.len(), 14);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn encode_frame(address: u8, frame_type: FrameType, payload: &[u8]) -> Result<Vec<u8>> {
    let expected = frame_type.payload_size();
    let valid = match expected {
        Some(size) => payload.len() == size,
        None => payload.len() <= CRSF_MAX_PAYLOAD_SIZE,
    };

    if !valid {
        return Err(CrsfBridgeError::InvalidPayloadSize {
            frame_type: frame_type.as_byte(),
            expected: expected.unwrap_or(CRSF_MAX_PAYLOAD_SIZE),
            actual: payload.len(),
        });
    }

    Ok(build_frame(address, frame_type.as_byte(), payload))
}

/// Assemble the wire bytes; payload length is already validated.
fn build_frame(address: u8, frame_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = BytesMut::with_capacity(payload.len() + 4);
    frame.put_u8(address);
    frame.put_u8((payload.len() + 2) as u8); // type + payload + crc
    frame.put_u8(frame_type);
    frame.put_slice(payload);
    frame.put_u8(frame_crc(frame_type, payload));
    frame.to_vec()
}

/// Encode RC channels into a complete CRSF frame
///
/// # Arguments
///
/// * `address` - Destination address byte
/// * `channels` - 16 channel values in microseconds
///
/// # Returns
///
/// * `Vec<u8>` - Complete frame (26 bytes)
///
/// # Examples
///
/// ```
/// use crsf_bridge::crsf::encoder::encode_rc_channels_frame;
/// use crsf_bridge::crsf::protocol::CRSF_ADDRESS_FLIGHT_CONTROLLER;
///
/// let channels = [1500i32; 16];
/// let frame = encode_rc_channels_frame(CRSF_ADDRESS_FLIGHT_CONTROLLER, &channels);
/// assert_eq!(frame.len(), 26);
/// ```
pub fn encode_rc_channels_frame(address: u8, channels: &ChannelValues) -> Vec<u8> {
    let payload = encode_rc_channels_payload(channels);
    build_frame(address, CRSF_FRAMETYPE_RC_CHANNELS_PACKED, &payload)
}

/// Encode RC channels into payload (22 bytes)
///
/// Each channel is converted from microseconds to its 11-bit wire value and the
/// 16 values are packed as a continuous bitstream, LSB first:
///
/// ```text
/// Byte 0: Ch1[0:7]
/// Byte 1: Ch1[8:10] | Ch2[0:4]
/// Byte 2: Ch2[5:10] | Ch3[0:1]
/// ...
/// ```
pub fn encode_rc_channels_payload(channels: &ChannelValues) -> [u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE] {
    let mut payload = [0u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE];
    let mut bit_index = 0;

    for &channel in channels.iter() {
        let value = us_to_ticks(channel);

        for bit in 0..11 {
            if (value >> bit) & 1 == 1 {
                payload[bit_index / 8] |= 1 << (bit_index % 8);
            }
            bit_index += 1;
        }
    }

    payload
}

/// Encode a battery sensor payload (8 bytes, multi-byte fields big-endian)
///
/// ```text
/// [voltage_hi][voltage_lo][current_hi][current_lo][cap_hi][cap_mid][cap_lo][remaining]
/// ```
pub fn encode_battery_payload(battery: &BatterySensor) -> [u8; CRSF_BATTERY_SENSOR_PAYLOAD_SIZE] {
    let mut buf = BytesMut::with_capacity(CRSF_BATTERY_SENSOR_PAYLOAD_SIZE);
    buf.put_u16(battery.voltage_dv);
    buf.put_u16(battery.current_da);
    buf.put_uint(u64::from(battery.capacity_used_mah.min(0x00FF_FFFF)), 3);
    buf.put_u8(battery.remaining_percent);

    let mut payload = [0u8; CRSF_BATTERY_SENSOR_PAYLOAD_SIZE];
    payload.copy_from_slice(&buf);
    payload
}

/// Encode a link statistics payload (10 bytes)
pub fn encode_link_statistics_payload(stats: &LinkStatistics) -> [u8; CRSF_LINK_STATS_PAYLOAD_SIZE] {
    [
        stats.uplink_rssi_1,
        stats.uplink_rssi_2,
        stats.uplink_lq,
        stats.uplink_snr as u8,
        stats.active_antenna,
        stats.rf_mode,
        stats.uplink_tx_power,
        stats.downlink_rssi,
        stats.downlink_lq,
        stats.downlink_snr as u8,
    ]
}
