//! # Link Module
//!
//! Link health, failsafe and channel exchange on top of the CRSF codec.
//!
//! This module handles:
//! - Draining the active transport and decoding frames
//! - Link up / link down transitions with a failsafe timeout
//! - Inbound and outbound channel banks
//! - Primary / secondary transport selection

pub mod channels;
pub mod engine;
pub mod failover;
pub mod state;

pub use engine::{LinkCounters, LinkEngine, LinkSettings};
pub use state::{LinkEvent, LinkHealth};
