//! Point-in-time view of the link for status reporting

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::controller::mode::WorkMode;
use crate::crsf::protocol::{BatterySensor, ChannelValues, LinkStatistics};
use crate::link::failover::ActivePort;
use crate::link::{LinkCounters, LinkEngine};

/// One status record
///
/// Captured only through the engine's read accessors; building a snapshot
/// never changes link state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub timestamp: DateTime<Utc>,
    pub link_up: bool,
    pub active_port: ActivePort,
    /// `None` until the first valid frame
    pub ms_since_last_receive: Option<u64>,
    pub inbound_channels: ChannelValues,
    pub outbound_channels: ChannelValues,
    pub counters: LinkCounters,
    pub link_statistics: LinkStatistics,
    pub battery: Option<BatterySensor>,
    pub work_mode: WorkMode,
}

impl TelemetrySnapshot {
    pub fn capture(engine: &LinkEngine, work_mode: WorkMode, now: Instant) -> Self {
        let counters = engine.counters();
        let ms_since_last_receive = counters
            .last_receive
            .map(|t| now.saturating_duration_since(t).as_millis() as u64);

        Self {
            timestamp: Utc::now(),
            link_up: engine.is_link_up(),
            active_port: engine.active_port(),
            ms_since_last_receive,
            inbound_channels: engine.inbound_channels(),
            outbound_channels: engine.outbound_channels(),
            counters,
            link_statistics: engine.link_statistics(),
            battery: engine.last_battery(),
            work_mode,
        }
    }
}
