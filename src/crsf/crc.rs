//! # CRC8-DVB-S2 Implementation
//!
//! CRC-8-DVB-S2 checksum calculation for CRSF protocol.
//!
//! **Polynomial**: 0xD5 (x^8 + x^7 + x^6 + x^4 + x^2 + 1)
//! **Initial Value**: 0x00
//!
//! The checksum covers the frame type byte followed by the payload. Neither
//! the address nor the length byte is included.

use crc::Crc;

/// CRC-8-DVB-S2 as used by CRSF.
pub const CRSF_CRC8: Crc<u8> = Crc::<u8>::new(&crc::CRC_8_DVB_S2);

/// Calculate CRC8-DVB-S2 over an arbitrary byte slice
///
/// # Examples
///
/// ```
/// use crsf_bridge::crsf::crc::crc8_dvb_s2;
///
/// assert_eq!(crc8_dvb_s2(&[]), 0x00);
/// ```
pub fn crc8_dvb_s2(data: &[u8]) -> u8 {
    CRSF_CRC8.checksum(data)
}

/// Calculate the CRSF frame checksum over `frame_type ++ payload`
///
/// # Arguments
///
/// * `frame_type` - Frame type byte
/// * `payload` - Payload bytes following the type
///
/// # Returns
///
/// * `u8` - Checksum to append after the payload
pub fn frame_crc(frame_type: u8, payload: &[u8]) -> u8 {
    let mut digest = CRSF_CRC8.digest();
    digest.update(&[frame_type]);
    digest.update(payload);
    digest.finalize()
}
