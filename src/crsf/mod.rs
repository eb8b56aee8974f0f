//! # CRSF Protocol Module
//!
//! Frame codec for the Crossfire (CRSF) link protocol.
//!
//! This module handles:
//! - Byte-at-a-time frame accumulation with length-based resynchronisation
//! - RC channels packing (16 channels, 11-bit resolution)
//! - Link statistics and battery sensor payloads
//! - CRC8-DVB-S2 checksum calculation

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
