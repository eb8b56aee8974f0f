//! # Link State Machine
//!
//! Tracks link health from decoded frames and elapsed time.
//!
//! ```text
//!          valid RC channels frame
//!   Down ---------------------------> Up
//!    ^                                 |
//!    +---------------------------------+
//!      no valid frame for > failsafe threshold
//! ```
//!
//! Every valid frame, whatever its type, refreshes the "last valid frame"
//! timestamp. Only RC channels frames raise the link. Time is passed in by
//! the caller so transitions can be driven deterministically.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::crsf::decoder::{decode_battery_sensor, decode_link_statistics, decode_rc_channels};
use crate::crsf::protocol::{BatterySensor, ChannelValues, CrsfFrame, FrameType, LinkStatistics};
use crate::error::{CrsfBridgeError, Result};

/// Default failsafe threshold
pub const DEFAULT_FAILSAFE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Link health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkHealth {
    Down,
    Up,
}

/// Edge-triggered notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Down -> Up
    LinkUp,
    /// Up -> Down
    LinkDown,
    /// A valid RC channels frame was received
    ChannelsUpdated(ChannelValues),
}

/// Link health tracker
#[derive(Debug)]
pub struct LinkStateMachine {
    health: LinkHealth,
    last_valid_frame: Option<Instant>,
    failsafe_timeout: Duration,
    stats: LinkStatistics,
    last_battery: Option<BatterySensor>,
}

impl LinkStateMachine {
    /// Creates a machine in the `Down` state.
    pub fn new(failsafe_timeout: Duration) -> Self {
        Self {
            health: LinkHealth::Down,
            last_valid_frame: None,
            failsafe_timeout,
            stats: LinkStatistics::default(),
            last_battery: None,
        }
    }

    pub fn health(&self) -> LinkHealth {
        self.health
    }

    pub fn is_up(&self) -> bool {
        self.health == LinkHealth::Up
    }

    /// Latest link statistics, zeroed before the first statistics frame
    pub fn link_statistics(&self) -> LinkStatistics {
        self.stats
    }

    /// Latest battery telemetry received from the far end
    pub fn last_battery(&self) -> Option<BatterySensor> {
        self.last_battery
    }

    /// Instant of the last checksum-valid frame
    pub fn last_valid_frame(&self) -> Option<Instant> {
        self.last_valid_frame
    }

    /// Apply one checksum-valid frame
    ///
    /// # Returns
    ///
    /// * `Ok(events)` - Events raised by this frame, in order
    /// * `Err(UnsupportedFrameType)` - Unknown type, counted as alive only
    /// * `Err(InvalidPayloadSize)` - Known type with a malformed payload
    pub fn handle_frame(&mut self, frame: &CrsfFrame, now: Instant) -> Result<Vec<LinkEvent>> {
        self.last_valid_frame = Some(now);

        match frame.frame_type {
            FrameType::RcChannelsPacked => {
                let channels = decode_rc_channels(&frame.payload)?;
                let mut events = Vec::with_capacity(2);

                if self.health == LinkHealth::Down {
                    info!("Link up");
                    self.health = LinkHealth::Up;
                    events.push(LinkEvent::LinkUp);
                }
                events.push(LinkEvent::ChannelsUpdated(channels));
                Ok(events)
            }
            FrameType::LinkStatistics => {
                self.stats = decode_link_statistics(&frame.payload)?;
                Ok(Vec::new())
            }
            FrameType::BatterySensor => {
                self.last_battery = Some(decode_battery_sensor(&frame.payload)?);
                Ok(Vec::new())
            }
            FrameType::Unknown(byte) => Err(CrsfBridgeError::UnsupportedFrameType(byte)),
        }
    }

    /// Time-driven Up -> Down check
    ///
    /// Must be called every control tick, whether or not bytes arrived.
    pub fn check_timeout(&mut self, now: Instant) -> Option<LinkEvent> {
        if self.health != LinkHealth::Up {
            return None;
        }

        let elapsed = self
            .last_valid_frame
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::MAX);

        if elapsed > self.failsafe_timeout {
            warn!(
                "Link down: no valid frame for {} ms, entering failsafe",
                elapsed.as_millis()
            );
            self.health = LinkHealth::Down;
            return Some(LinkEvent::LinkDown);
        }

        None
    }
}
