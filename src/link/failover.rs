//! Primary/secondary transport selection
//!
//! Two UARTs may be wired to the flight controller. One of them is active at
//! a time; switching between them is decided by [`FailoverPolicy`], a pure
//! function of elapsed times that is disabled by default.
//!
//! Silence is measured per port: a port that was switched to and has not
//! delivered a frame yet holds the selection until it does.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::serial::Transport;

/// Which transport slot is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivePort {
    Primary,
    Secondary,
}

impl ActivePort {
    /// The other slot
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            ActivePort::Primary => ActivePort::Secondary,
            ActivePort::Secondary => ActivePort::Primary,
        }
    }
}

/// Failover decision rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverPolicy {
    /// Master switch; nothing ever switches when false
    pub enabled: bool,
    /// Silence on the active port before switching
    pub silence_timeout: Duration,
    /// Minimum time between two switches
    pub settle_time: Duration,
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            silence_timeout: Duration::from_millis(30_000),
            settle_time: Duration::from_millis(5_000),
        }
    }
}

impl FailoverPolicy {
    /// Decide whether to switch to the other transport
    ///
    /// # Arguments
    ///
    /// * `since_last_receive` - Time since the last valid frame, `None` if no
    ///   frame has ever been received
    /// * `since_last_switch` - Time since the previous switch, `None` if the
    ///   active port has never changed
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use crsf_bridge::link::failover::FailoverPolicy;
    ///
    /// let policy = FailoverPolicy { enabled: true, ..FailoverPolicy::default() };
    /// assert!(policy.should_switch(Some(Duration::from_secs(31)), None));
    /// assert!(!policy.should_switch(None, None));
    /// ```
    #[must_use]
    pub fn should_switch(
        &self,
        since_last_receive: Option<Duration>,
        since_last_switch: Option<Duration>,
    ) -> bool {
        if !self.enabled {
            return false;
        }

        let silent = match since_last_receive {
            Some(elapsed) => elapsed > self.silence_timeout,
            None => false,
        };
        let settled = match since_last_switch {
            Some(elapsed) => elapsed > self.settle_time,
            None => true,
        };

        silent && settled
    }
}

/// Owned pair of optional transports plus the active selection
///
/// A slot holding `None` is unavailable: it is never selected by failover and
/// reads from it yield nothing.
pub struct TransportSet {
    primary: Option<Box<dyn Transport>>,
    secondary: Option<Box<dyn Transport>>,
    active: ActivePort,
    last_switch: Option<Instant>,
    primary_last_receive: Option<Instant>,
    secondary_last_receive: Option<Instant>,
}

impl std::fmt::Debug for TransportSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSet")
            .field("primary", &self.primary.as_ref().map(|t| t.name().to_string()))
            .field("secondary", &self.secondary.as_ref().map(|t| t.name().to_string()))
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl TransportSet {
    /// Build the set and pick the initial port
    ///
    /// The primary is preferred; the secondary is chosen only when it is the
    /// sole open transport.
    pub fn new(
        primary: Option<Box<dyn Transport>>,
        secondary: Option<Box<dyn Transport>>,
    ) -> Self {
        let active = if primary.is_none() && secondary.is_some() {
            ActivePort::Secondary
        } else {
            ActivePort::Primary
        };

        if primary.is_none() && secondary.is_none() {
            warn!("No transport available, link will stay down");
        }

        Self {
            primary,
            secondary,
            active,
            last_switch: None,
            primary_last_receive: None,
            secondary_last_receive: None,
        }
    }

    /// Currently selected port
    pub fn active_port(&self) -> ActivePort {
        self.active
    }

    /// True if the given slot holds an open transport
    pub fn is_available(&self, port: ActivePort) -> bool {
        match port {
            ActivePort::Primary => self.primary.is_some(),
            ActivePort::Secondary => self.secondary.is_some(),
        }
    }

    /// Mutable access to the active transport, if it is open
    pub fn active_mut(&mut self) -> Option<&mut (dyn Transport + 'static)> {
        match self.active {
            ActivePort::Primary => self.primary.as_deref_mut(),
            ActivePort::Secondary => self.secondary.as_deref_mut(),
        }
    }

    /// Note a valid frame received on `port`
    pub fn record_receive(&mut self, port: ActivePort, now: Instant) {
        match port {
            ActivePort::Primary => self.primary_last_receive = Some(now),
            ActivePort::Secondary => self.secondary_last_receive = Some(now),
        }
    }

    /// Time of the last valid frame received on `port`
    pub fn last_receive(&self, port: ActivePort) -> Option<Instant> {
        match port {
            ActivePort::Primary => self.primary_last_receive,
            ActivePort::Secondary => self.secondary_last_receive,
        }
    }

    /// Apply the failover policy, returning true if the active port changed
    ///
    /// Only the active port's own silence counts.
    pub fn maybe_switch(&mut self, policy: &FailoverPolicy, now: Instant) -> bool {
        let since_last_receive = self
            .last_receive(self.active)
            .map(|t| now.saturating_duration_since(t));
        let since_last_switch = self.last_switch.map(|t| now.saturating_duration_since(t));

        if !policy.should_switch(since_last_receive, since_last_switch) {
            return false;
        }

        let target = self.active.other();
        if !self.is_available(target) {
            return false;
        }

        info!("Switching active transport {:?} -> {:?}", self.active, target);
        self.active = target;
        self.last_switch = Some(now);
        true
    }

    /// Drop both transports
    pub fn close(&mut self) {
        self.primary = None;
        self.secondary = None;
    }
}
