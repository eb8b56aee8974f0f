//! # CRSF Packet Decoder
//!
//! Byte-at-a-time frame accumulator plus payload decoders for RC channels,
//! link statistics and battery telemetry.
//!
//! ## Framing
//!
//! The link has no delimiter other than the embedded length byte, so the
//! accumulator walks these states for every frame:
//!
//! ```text
//! AwaitingAddress -> AwaitingLength -> AwaitingType -> AccumulatingPayload -> AwaitingChecksum
//! ```
//!
//! An out-of-range length or a checksum mismatch drops the frame and restarts
//! at `AwaitingAddress` with the next byte. Resynchronisation is length-based,
//! not content-based, so a corrupted stream can occasionally be misframed
//! until a checksum fails.

use bytes::Buf;

use super::crc::frame_crc;
use super::protocol::*;
use crate::error::{CrsfBridgeError, Result};

/// Accumulator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    AwaitingAddress,
    AwaitingLength,
    AwaitingType,
    AccumulatingPayload,
    AwaitingChecksum,
}

/// Incremental CRSF frame decoder
///
/// # Examples
///
/// ```
/// use crsf_bridge::crsf::decoder::FrameDecoder;
/// use crsf_bridge::crsf::encoder::encode_rc_channels_frame;
///
/// let bytes = encode_rc_channels_frame(0xC8, &[1500; 16]);
/// let mut decoder = FrameDecoder::new();
///
/// let mut frames = Vec::new();
/// for byte in bytes {
///     if let Some(Ok(frame)) = decoder.push_byte(byte) {
///         frames.push(frame);
///     }
/// }
/// assert_eq!(frames.len(), 1);
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    address: u8,
    length: u8,
    frame_type: u8,
    payload: Vec<u8>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Creates a decoder waiting for an address byte.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DecoderState::AwaitingAddress,
            address: 0,
            length: 0,
            frame_type: 0,
            payload: Vec::with_capacity(CRSF_MAX_PAYLOAD_SIZE),
        }
    }

    /// Current accumulator state.
    #[must_use]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// True while no frame is partially accumulated.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == DecoderState::AwaitingAddress
    }

    /// Drops any partial frame.
    pub fn reset(&mut self) {
        self.state = DecoderState::AwaitingAddress;
        self.payload.clear();
    }

    /// Feeds one byte.
    ///
    /// # Returns
    ///
    /// * `None` - frame still incomplete
    /// * `Some(Ok(frame))` - a checksum-valid frame was completed
    /// * `Some(Err(Framing))` - the current frame was discarded
    pub fn push_byte(&mut self, byte: u8) -> Option<Result<CrsfFrame>> {
        match self.state {
            DecoderState::AwaitingAddress => {
                self.address = byte;
                self.state = DecoderState::AwaitingLength;
                None
            }
            DecoderState::AwaitingLength => {
                if !(CRSF_MIN_FRAME_LENGTH..=CRSF_MAX_FRAME_LENGTH).contains(&byte) {
                    self.reset();
                    return Some(Err(CrsfBridgeError::Framing(format!(
                        "Invalid length byte: {}",
                        byte
                    ))));
                }
                self.length = byte;
                self.state = DecoderState::AwaitingType;
                None
            }
            DecoderState::AwaitingType => {
                self.frame_type = byte;
                self.payload.clear();
                self.state = if self.expected_payload_len() == 0 {
                    DecoderState::AwaitingChecksum
                } else {
                    DecoderState::AccumulatingPayload
                };
                None
            }
            DecoderState::AccumulatingPayload => {
                self.payload.push(byte);
                if self.payload.len() == self.expected_payload_len() {
                    self.state = DecoderState::AwaitingChecksum;
                }
                None
            }
            DecoderState::AwaitingChecksum => {
                let calculated = frame_crc(self.frame_type, &self.payload);
                let result = if calculated == byte {
                    Ok(CrsfFrame {
                        address: self.address,
                        frame_type: FrameType::from(self.frame_type),
                        payload: self.payload.clone(),
                    })
                } else {
                    Err(CrsfBridgeError::Framing(format!(
                        "CRC mismatch: expected 0x{:02X}, got 0x{:02X}",
                        calculated, byte
                    )))
                };
                self.reset();
                Some(result)
            }
        }
    }

    fn expected_payload_len(&self) -> usize {
        self.length as usize - 2
    }
}

/// Decode a single complete CRSF frame from a byte slice
///
/// # Errors
///
/// Returns `Framing` if the bytes do not contain exactly one valid frame.
pub fn decode_frame(bytes: &[u8]) -> Result<CrsfFrame> {
    let mut decoder = FrameDecoder::new();

    for (i, &byte) in bytes.iter().enumerate() {
        if let Some(result) = decoder.push_byte(byte) {
            if i + 1 != bytes.len() {
                return Err(CrsfBridgeError::Framing(format!(
                    "{} trailing bytes after frame",
                    bytes.len() - i - 1
                )));
            }
            return result;
        }
    }

    Err(CrsfBridgeError::Framing(format!(
        "Frame too short: {} bytes",
        bytes.len()
    )))
}

/// Decode an RC channels payload into microsecond values
///
/// # Arguments
///
/// * `payload` - RC channels payload (22 bytes)
pub fn decode_rc_channels(payload: &[u8]) -> Result<ChannelValues> {
    if payload.len() != CRSF_RC_CHANNELS_PAYLOAD_SIZE {
        return Err(CrsfBridgeError::InvalidPayloadSize {
            frame_type: CRSF_FRAMETYPE_RC_CHANNELS_PACKED,
            expected: CRSF_RC_CHANNELS_PAYLOAD_SIZE,
            actual: payload.len(),
        });
    }

    let mut channels = [0i32; CRSF_NUM_CHANNELS];
    let mut bit_index = 0;

    for channel in channels.iter_mut() {
        let mut value: u16 = 0;
        for bit in 0..11 {
            if (payload[bit_index / 8] >> (bit_index % 8)) & 1 == 1 {
                value |= 1 << bit;
            }
            bit_index += 1;
        }
        *channel = ticks_to_us(value);
    }

    Ok(channels)
}

/// Decode Link Statistics telemetry packet
///
/// # Arguments
///
/// * `payload` - Link Statistics payload (10 bytes)
///
/// # Returns
///
/// * `Result<LinkStatistics>` - Decoded link statistics
pub fn decode_link_statistics(payload: &[u8]) -> Result<LinkStatistics> {
    if payload.len() < CRSF_LINK_STATS_PAYLOAD_SIZE {
        return Err(CrsfBridgeError::InvalidPayloadSize {
            frame_type: CRSF_FRAMETYPE_LINK_STATISTICS,
            expected: CRSF_LINK_STATS_PAYLOAD_SIZE,
            actual: payload.len(),
        });
    }

    Ok(LinkStatistics {
        uplink_rssi_1: payload[0],
        uplink_rssi_2: payload[1],
        uplink_lq: payload[2],
        uplink_snr: payload[3] as i8,
        active_antenna: payload[4],
        rf_mode: payload[5],
        uplink_tx_power: payload[6],
        downlink_rssi: payload[7],
        downlink_lq: payload[8],
        downlink_snr: payload[9] as i8,
    })
}

/// Decode Battery Sensor telemetry packet
///
/// # Arguments
///
/// * `payload` - Battery Sensor payload (8 bytes)
///
/// # Returns
///
/// * `Result<BatterySensor>` - Decoded battery sensor data
pub fn decode_battery_sensor(payload: &[u8]) -> Result<BatterySensor> {
    if payload.len() < CRSF_BATTERY_SENSOR_PAYLOAD_SIZE {
        return Err(CrsfBridgeError::InvalidPayloadSize {
            frame_type: CRSF_FRAMETYPE_BATTERY_SENSOR,
            expected: CRSF_BATTERY_SENSOR_PAYLOAD_SIZE,
            actual: payload.len(),
        });
    }

    let mut buf = payload;
    Ok(BatterySensor {
        voltage_dv: buf.get_u16(),
        current_da: buf.get_u16(),
        capacity_used_mah: buf.get_uint(3) as u32,
        remaining_percent: buf.get_u8(),
    })
}
