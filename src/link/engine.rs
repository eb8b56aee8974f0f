//! # Link Engine
//!
//! Owns the transports, the frame decoder, the link state machine and the
//! channel store, and exposes the two periodic entry points:
//!
//! - [`LinkEngine::run_receive_tick`] drains available bytes from the active
//!   transport and applies every decoded frame.
//! - [`LinkEngine::update_link_health`] runs the time-driven failsafe check;
//!   the control loop calls it every tick.
//!
//! `LinkEngine` is a cheap `Clone` handle; receive and control tasks each hold
//! one. Each shared structure sits behind its own lock. Nested locks are
//! always taken in the order transports, receive, then state or counters.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::channels::ChannelStore;
use super::failover::{ActivePort, FailoverPolicy, TransportSet};
use super::state::{LinkEvent, LinkHealth, LinkStateMachine, DEFAULT_FAILSAFE_TIMEOUT};
use crate::config::Config;
use crate::crsf::decoder::FrameDecoder;
use crate::crsf::encoder::{encode_battery_payload, encode_frame, encode_rc_channels_frame};
use crate::crsf::protocol::{
    BatterySensor, ChannelValues, FrameType, LinkStatistics, CRSF_ADDRESS_FLIGHT_CONTROLLER,
};
use crate::error::{CrsfBridgeError, Result};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Timing and sizing knobs for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Up -> Down threshold since the last valid frame
    pub failsafe_timeout: Duration,
    /// A partial frame older than this is discarded
    pub packet_timeout: Duration,
    /// Upper bound on bytes consumed by one receive tick
    pub max_bytes_per_tick: usize,
    /// Transport failover rule
    pub failover: FailoverPolicy,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            failsafe_timeout: DEFAULT_FAILSAFE_TIMEOUT,
            packet_timeout: Duration::from_millis(100),
            max_bytes_per_tick: 256,
            failover: FailoverPolicy::default(),
        }
    }
}

impl LinkSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            failsafe_timeout: Duration::from_millis(config.link.failsafe_timeout_ms),
            packet_timeout: Duration::from_millis(config.link.packet_timeout_ms),
            max_bytes_per_tick: config.link.max_bytes_per_tick,
            failover: FailoverPolicy {
                enabled: config.failover.enabled,
                silence_timeout: Duration::from_millis(config.failover.silence_timeout_ms),
                settle_time: Duration::from_millis(config.failover.settle_time_ms),
            },
        }
    }
}

/// Link traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkCounters {
    /// Checksum-valid frames of any type
    pub frames_received: u64,
    /// Frames written to the active transport
    pub frames_sent: u64,
    /// Checksum mismatches, bad lengths and malformed payloads
    pub framing_errors: u64,
    /// Valid frames of a type with no handler
    pub unsupported_frames: u64,
    /// Partial frames dropped for staleness
    pub partial_timeouts: u64,
    /// Read or write failures reported by the transport
    pub transport_errors: u64,
    #[serde(skip)]
    pub last_receive: Option<Instant>,
}

#[derive(Debug)]
struct ReceiveState {
    decoder: FrameDecoder,
    last_byte_at: Option<Instant>,
}

#[derive(Debug)]
struct Inner {
    settings: LinkSettings,
    receive: Mutex<ReceiveState>,
    state: Mutex<LinkStateMachine>,
    transports: Mutex<TransportSet>,
    channels: ChannelStore,
    counters: Mutex<LinkCounters>,
    events: broadcast::Sender<LinkEvent>,
}

/// Shared handle to the protocol engine
#[derive(Debug, Clone)]
pub struct LinkEngine {
    inner: Arc<Inner>,
}

/// Locks a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LinkEngine {
    /// Creates an engine in the `Down` state with neutral channels.
    pub fn new(settings: LinkSettings, transports: TransportSet) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                settings,
                receive: Mutex::new(ReceiveState {
                    decoder: FrameDecoder::new(),
                    last_byte_at: None,
                }),
                state: Mutex::new(LinkStateMachine::new(settings.failsafe_timeout)),
                transports: Mutex::new(transports),
                channels: ChannelStore::new(),
                counters: Mutex::new(LinkCounters::default()),
                events,
            }),
        }
    }

    /// Subscribe to link-up, link-down and channel-update events
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.inner.events.subscribe()
    }

    fn publish(&self, event: LinkEvent) {
        // No subscribers is not an error
        let _ = self.inner.events.send(event);
    }

    // ==================== Receive Side ====================

    /// Drain and decode bytes from the active transport
    ///
    /// Never blocks: stops at the first "no byte available" or after
    /// `max_bytes_per_tick` bytes. Framing and type errors are counted and
    /// logged, never returned.
    ///
    /// # Returns
    ///
    /// Number of bytes consumed.
    pub fn run_receive_tick(&self, now: Instant) -> usize {
        let (port, bytes) = self.read_available(now);
        let mut heard = false;

        let mut receive = lock(&self.inner.receive);

        if !receive.decoder.is_idle() {
            let stale = receive
                .last_byte_at
                .map(|t| now.saturating_duration_since(t) > self.inner.settings.packet_timeout)
                .unwrap_or(true);
            if stale {
                debug!("Dropping stale partial frame");
                receive.decoder.reset();
                lock(&self.inner.counters).partial_timeouts += 1;
            }
        }

        if !bytes.is_empty() {
            receive.last_byte_at = Some(now);
        }

        for &byte in &bytes {
            match receive.decoder.push_byte(byte) {
                None => {}
                Some(Ok(frame)) => {
                    heard = true;
                    {
                        let mut counters = lock(&self.inner.counters);
                        counters.frames_received += 1;
                        counters.last_receive = Some(now);
                    }

                    let result = lock(&self.inner.state).handle_frame(&frame, now);
                    match result {
                        Ok(events) => {
                            for event in events {
                                if let LinkEvent::ChannelsUpdated(channels) = &event {
                                    self.inner.channels.set_inbound_all(channels);
                                }
                                self.publish(event);
                            }
                        }
                        Err(CrsfBridgeError::UnsupportedFrameType(frame_type)) => {
                            debug!("Ignoring unsupported frame type 0x{:02X}", frame_type);
                            lock(&self.inner.counters).unsupported_frames += 1;
                        }
                        Err(e) => {
                            debug!("Malformed frame: {}", e);
                            lock(&self.inner.counters).framing_errors += 1;
                        }
                    }
                }
                Some(Err(e)) => {
                    debug!("{}", e);
                    lock(&self.inner.counters).framing_errors += 1;
                }
            }
        }
        drop(receive);

        if heard {
            lock(&self.inner.transports).record_receive(port, now);
        }

        bytes.len()
    }

    /// Pull up to `max_bytes_per_tick` bytes, applying failover first.
    ///
    /// Returns the port the bytes were read from.
    fn read_available(&self, now: Instant) -> (ActivePort, Vec<u8>) {
        let mut transports = lock(&self.inner.transports);

        if transports.maybe_switch(&self.inner.settings.failover, now) {
            lock(&self.inner.receive).decoder.reset();
        }

        let port = transports.active_port();
        let mut bytes = Vec::new();
        let Some(transport) = transports.active_mut() else {
            return (port, bytes);
        };

        while bytes.len() < self.inner.settings.max_bytes_per_tick {
            match transport.try_read_byte() {
                Ok(Some(byte)) => bytes.push(byte),
                Ok(None) => break,
                Err(e) => {
                    warn!("Read from {} failed: {}", transport.name(), e);
                    lock(&self.inner.counters).transport_errors += 1;
                    break;
                }
            }
        }

        (port, bytes)
    }

    // ==================== Health ====================

    /// Run the failsafe check; returns true while the link is up
    pub fn update_link_health(&self, now: Instant) -> bool {
        let (event, up) = {
            let mut state = lock(&self.inner.state);
            let event = state.check_timeout(now);
            (event, state.is_up())
        };

        if let Some(event) = event {
            self.publish(event);
        }
        up
    }

    pub fn is_link_up(&self) -> bool {
        lock(&self.inner.state).is_up()
    }

    pub fn link_health(&self) -> LinkHealth {
        lock(&self.inner.state).health()
    }

    /// Latest link statistics (zeroed before the first statistics frame)
    pub fn link_statistics(&self) -> LinkStatistics {
        lock(&self.inner.state).link_statistics()
    }

    /// Latest battery telemetry received on the link
    pub fn last_battery(&self) -> Option<BatterySensor> {
        lock(&self.inner.state).last_battery()
    }

    pub fn counters(&self) -> LinkCounters {
        *lock(&self.inner.counters)
    }

    pub fn active_port(&self) -> ActivePort {
        lock(&self.inner.transports).active_port()
    }

    // ==================== Channels ====================

    /// Set one outbound channel (1-based index), clamped to 1000..=2000µs
    pub fn set_channel(&self, channel: usize, value: i32) -> Result<()> {
        self.inner.channels.set_outbound(channel, value)
    }

    /// Replace all outbound channels
    pub fn set_channels(&self, values: &ChannelValues) {
        self.inner.channels.set_outbound_all(values);
    }

    pub fn inbound_channels(&self) -> ChannelValues {
        self.inner.channels.inbound_snapshot()
    }

    pub fn outbound_channels(&self) -> ChannelValues {
        self.inner.channels.outbound_snapshot()
    }

    // ==================== Transmit Side ====================

    /// Transmit the outbound channel bank as one RC channels frame
    pub fn send_channels(&self) -> Result<usize> {
        let channels = self.inner.channels.outbound_snapshot();
        let frame = encode_rc_channels_frame(CRSF_ADDRESS_FLIGHT_CONTROLLER, &channels);
        self.write_frame(&frame)
    }

    /// Transmit a battery sensor telemetry frame
    pub fn send_battery(&self, battery: &BatterySensor) -> Result<usize> {
        let payload = encode_battery_payload(battery);
        let frame = encode_frame(
            CRSF_ADDRESS_FLIGHT_CONTROLLER,
            FrameType::BatterySensor,
            &payload,
        )?;
        self.write_frame(&frame)
    }

    /// Encode and transmit an arbitrary frame
    ///
    /// # Errors
    ///
    /// `InvalidPayloadSize` is returned before anything is written.
    pub fn send_frame(&self, frame_type: FrameType, payload: &[u8]) -> Result<usize> {
        let frame = encode_frame(CRSF_ADDRESS_FLIGHT_CONTROLLER, frame_type, payload)?;
        self.write_frame(&frame)
    }

    fn write_frame(&self, frame: &[u8]) -> Result<usize> {
        let mut transports = lock(&self.inner.transports);
        let port = transports.active_port();
        let transport = transports.active_mut().ok_or_else(|| {
            CrsfBridgeError::TransportUnavailable(format!("{:?} transport is not open", port))
        })?;

        match transport.write(frame) {
            Ok(written) => {
                lock(&self.inner.counters).frames_sent += 1;
                Ok(written)
            }
            Err(e) => {
                lock(&self.inner.counters).transport_errors += 1;
                Err(e)
            }
        }
    }

    /// Release the transports; further sends fail with `TransportUnavailable`
    pub fn close(&self) {
        lock(&self.inner.transports).close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crsf::decoder::{decode_battery_sensor, decode_frame, decode_rc_channels};
    use crate::crsf::encoder::{encode_frame, encode_rc_channels_frame};
    use crate::crsf::crc::frame_crc;
    use crate::serial::transport::mocks::MockTransport;
    use crate::serial::Transport;
    use tokio_test::{assert_pending, assert_ready_ok};

    fn engine_with(settings: LinkSettings) -> (LinkEngine, MockTransport) {
        let mock = MockTransport::new("primary");
        let transports = TransportSet::new(Some(Box::new(mock.clone()) as Box<dyn Transport>), None);
        (LinkEngine::new(settings, transports), mock)
    }

    fn engine() -> (LinkEngine, MockTransport) {
        engine_with(LinkSettings::default())
    }

    fn zero_rc_frame() -> Vec<u8> {
        let mut frame = vec![0xC8, 24, 0x16];
        frame.extend_from_slice(&[0u8; 22]);
        frame.push(frame_crc(0x16, &[0u8; 22]));
        frame
    }

    fn drain(rx: &mut broadcast::Receiver<LinkEvent>) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    // ==================== Scenario Tests ====================

    #[test]
    fn test_zero_rc_frame_brings_link_up_once() {
        let (engine, mock) = engine();
        let mut rx = engine.subscribe();
        let now = Instant::now();

        mock.push_bytes(&zero_rc_frame());
        assert_eq!(engine.run_receive_tick(now), 26);
        assert!(engine.is_link_up());

        for i in 1..10 {
            mock.push_bytes(&zero_rc_frame());
            engine.run_receive_tick(now + Duration::from_millis(i * 5));
        }

        let ups = drain(&mut rx)
            .into_iter()
            .filter(|e| *e == LinkEvent::LinkUp)
            .count();
        assert_eq!(ups, 1);
        assert_eq!(engine.counters().frames_received, 10);
    }

    #[test]
    fn test_link_statistics_scenario() {
        let (engine, mock) = engine();
        let frame =
            encode_frame(0xC8, FrameType::LinkStatistics, &[100, 95, 90, 0, 0, 0, 0, 0, 0, 0])
                .unwrap();

        mock.push_bytes(&frame);
        engine.run_receive_tick(Instant::now());

        let stats = engine.link_statistics();
        assert_eq!(stats.uplink_rssi_1, 100);
        assert_eq!(stats.uplink_rssi_2, 95);
        assert_eq!(stats.uplink_lq, 90);
        assert!(!engine.is_link_up());
    }

    #[test]
    fn test_inbound_channels_updated_and_event_published() {
        let (engine, mock) = engine();
        let mut rx = engine.subscribe();
        let mut channels = [1500; 16];
        channels[0] = 1200;

        mock.push_bytes(&encode_rc_channels_frame(0xC8, &channels));
        engine.run_receive_tick(Instant::now());

        assert_eq!(engine.inbound_channels(), channels);
        assert_eq!(engine.outbound_channels(), [1500; 16]);
        assert!(drain(&mut rx).contains(&LinkEvent::ChannelsUpdated(channels)));
    }

    #[test]
    fn test_corrupted_frame_counted_and_ignored() {
        let (engine, mock) = engine();
        let mut bad = zero_rc_frame();
        bad[10] ^= 0x01;

        let now = Instant::now();
        mock.push_bytes(&bad);
        engine.run_receive_tick(now);

        // Nothing from the corrupted frame reaches the inbound bank
        assert_eq!(engine.inbound_channels(), [1500; 16]);
        assert!(!engine.is_link_up());

        let mut good = [1500; 16];
        good[0] = 1800;
        good[7] = 1200;
        mock.push_bytes(&encode_rc_channels_frame(0xC8, &good));
        engine.run_receive_tick(now);

        let counters = engine.counters();
        assert_eq!(counters.framing_errors, 1);
        assert_eq!(counters.frames_received, 1);
        assert!(engine.is_link_up());
        assert_eq!(engine.inbound_channels(), good);
    }

    #[test]
    fn test_unsupported_frame_counted() {
        let (engine, mock) = engine();
        mock.push_bytes(&encode_frame(0xC8, FrameType::Unknown(0x29), &[1, 2]).unwrap());
        engine.run_receive_tick(Instant::now());

        let counters = engine.counters();
        assert_eq!(counters.unsupported_frames, 1);
        assert_eq!(counters.framing_errors, 0);
        assert!(!engine.is_link_up());
    }

    #[test]
    fn test_receive_tick_respects_byte_budget() {
        let (engine, mock) = engine_with(LinkSettings {
            max_bytes_per_tick: 10,
            ..LinkSettings::default()
        });
        let now = Instant::now();

        mock.push_bytes(&zero_rc_frame());
        assert_eq!(engine.run_receive_tick(now), 10);
        assert_eq!(mock.pending(), 16);
        assert_eq!(engine.run_receive_tick(now), 10);
        assert_eq!(engine.run_receive_tick(now), 6);
        assert!(engine.is_link_up());
    }

    #[test]
    fn test_stale_partial_frame_dropped() {
        let (engine, mock) = engine();
        let start = Instant::now();
        let frame = zero_rc_frame();

        mock.push_bytes(&frame[..12]);
        engine.run_receive_tick(start);

        // The tail arrives too late and is treated as noise
        mock.push_bytes(&frame[12..]);
        engine.run_receive_tick(start + Duration::from_millis(150));
        assert_eq!(engine.counters().partial_timeouts, 1);
        assert!(!engine.is_link_up());

        // After another quiet period any leftover partial state is dropped too
        mock.push_bytes(&frame);
        engine.run_receive_tick(start + Duration::from_millis(400));
        assert!(engine.is_link_up());
    }

    // ==================== Failsafe Tests ====================

    #[test]
    fn test_failsafe_fires_once_on_silence() {
        let (engine, mock) = engine();
        let mut rx = engine.subscribe();
        let start = Instant::now();

        mock.push_bytes(&zero_rc_frame());
        engine.run_receive_tick(start);
        drain(&mut rx);

        assert!(engine.update_link_health(start + Duration::from_millis(999)));
        assert!(!engine.update_link_health(start + Duration::from_millis(1001)));
        assert!(!engine.update_link_health(start + Duration::from_millis(2000)));

        assert_eq!(drain(&mut rx), vec![LinkEvent::LinkDown]);
        assert_eq!(engine.link_health(), LinkHealth::Down);
    }

    #[test]
    fn test_link_down_wakes_waiting_subscriber() {
        let (engine, mock) = engine();
        let mut rx = engine.subscribe();
        let start = Instant::now();

        mock.push_bytes(&zero_rc_frame());
        engine.run_receive_tick(start);
        drain(&mut rx);

        let mut next = tokio_test::task::spawn(rx.recv());
        assert_pending!(next.poll());

        engine.update_link_health(start + Duration::from_millis(500));
        assert!(!next.is_woken());

        engine.update_link_health(start + Duration::from_millis(1001));
        assert!(next.is_woken());
        assert_eq!(assert_ready_ok!(next.poll()), LinkEvent::LinkDown);
    }

    #[test]
    fn test_stats_survive_link_down() {
        let (engine, mock) = engine();
        let start = Instant::now();

        mock.push_bytes(&zero_rc_frame());
        mock.push_bytes(
            &encode_frame(0xC8, FrameType::LinkStatistics, &[100, 95, 90, 0, 0, 0, 0, 0, 0, 0])
                .unwrap(),
        );
        engine.run_receive_tick(start);
        engine.update_link_health(start + Duration::from_secs(5));

        assert!(!engine.is_link_up());
        assert_eq!(engine.link_statistics().uplink_lq, 90);
    }

    // ==================== Transmit Tests ====================

    #[test]
    fn test_send_channels_uses_outbound_bank() {
        let (engine, mock) = engine();
        engine.set_channel(3, 2000).unwrap();

        assert_eq!(engine.send_channels().unwrap(), 26);

        let written = mock.get_written_data();
        assert_eq!(written.len(), 1);
        let frame = decode_frame(&written[0]).unwrap();
        let channels = decode_rc_channels(&frame.payload).unwrap();
        assert_eq!(channels[2], 2000);
        assert_eq!(channels[0], 1500);
        assert_eq!(engine.counters().frames_sent, 1);
    }

    #[test]
    fn test_oversized_channel_value_sent_as_maximum() {
        let (engine, mock) = engine();
        engine.set_channel(1, 300_000_000).unwrap();
        engine.set_channel(2, -300_000_000).unwrap();

        engine.send_channels().unwrap();

        let frame = decode_frame(&mock.get_written_data()[0]).unwrap();
        let channels = decode_rc_channels(&frame.payload).unwrap();
        assert_eq!(channels[0], 2000);
        assert_eq!(channels[1], 1000);
    }

    #[test]
    fn test_set_channel_out_of_range() {
        let (engine, _mock) = engine();
        assert!(engine.set_channel(0, 1500).is_err());
        assert!(engine.set_channel(17, 1500).is_err());
    }

    #[test]
    fn test_send_battery_frame() {
        let (engine, mock) = engine();
        let battery = BatterySensor {
            voltage_dv: 126,
            current_da: 15,
            capacity_used_mah: 450,
            remaining_percent: 70,
        };

        engine.send_battery(&battery).unwrap();

        let written = mock.get_written_data();
        let frame = decode_frame(&written[0]).unwrap();
        assert_eq!(frame.frame_type, FrameType::BatterySensor);
        assert_eq!(decode_battery_sensor(&frame.payload).unwrap(), battery);
    }

    #[test]
    fn test_send_frame_rejects_bad_payload_without_writing() {
        let (engine, mock) = engine();
        let result = engine.send_frame(FrameType::RcChannelsPacked, &[0u8; 3]);

        assert!(matches!(result, Err(CrsfBridgeError::InvalidPayloadSize { .. })));
        assert!(mock.get_written_data().is_empty());
    }

    #[test]
    fn test_send_without_transport_unavailable() {
        let engine = LinkEngine::new(LinkSettings::default(), TransportSet::new(None, None));

        assert!(matches!(
            engine.send_channels(),
            Err(CrsfBridgeError::TransportUnavailable(_))
        ));
        assert_eq!(engine.run_receive_tick(Instant::now()), 0);
        assert!(!engine.is_link_up());
    }

    #[test]
    fn test_write_error_counted() {
        let (engine, mock) = engine();
        mock.set_write_error(std::io::ErrorKind::BrokenPipe);

        assert!(engine.send_channels().is_err());
        let counters = engine.counters();
        assert_eq!(counters.transport_errors, 1);
        assert_eq!(counters.frames_sent, 0);
    }

    #[test]
    fn test_close_releases_transports() {
        let (engine, _mock) = engine();
        engine.close();
        assert!(engine.send_channels().is_err());
    }

    // ==================== Failover Tests ====================

    #[test]
    fn test_failover_switches_to_secondary_on_silence() {
        let primary = MockTransport::new("primary");
        let secondary = MockTransport::new("secondary");
        let transports = TransportSet::new(
            Some(Box::new(primary.clone()) as Box<dyn Transport>),
            Some(Box::new(secondary.clone()) as Box<dyn Transport>),
        );
        let engine = LinkEngine::new(
            LinkSettings {
                failover: FailoverPolicy {
                    enabled: true,
                    ..FailoverPolicy::default()
                },
                ..LinkSettings::default()
            },
            transports,
        );
        let start = Instant::now();

        primary.push_bytes(&zero_rc_frame());
        engine.run_receive_tick(start);
        assert_eq!(engine.active_port(), ActivePort::Primary);

        secondary.push_bytes(&zero_rc_frame());
        engine.run_receive_tick(start + Duration::from_secs(31));
        assert_eq!(engine.active_port(), ActivePort::Secondary);
        assert_eq!(engine.counters().frames_received, 2);
    }

    #[test]
    fn test_failover_holds_silent_secondary() {
        let primary = MockTransport::new("primary");
        let secondary = MockTransport::new("secondary");
        let transports = TransportSet::new(
            Some(Box::new(primary.clone()) as Box<dyn Transport>),
            Some(Box::new(secondary) as Box<dyn Transport>),
        );
        let engine = LinkEngine::new(
            LinkSettings {
                failover: FailoverPolicy {
                    enabled: true,
                    ..FailoverPolicy::default()
                },
                ..LinkSettings::default()
            },
            transports,
        );
        let start = Instant::now();

        primary.push_bytes(&zero_rc_frame());
        engine.run_receive_tick(start);

        engine.run_receive_tick(start + Duration::from_secs(31));
        assert_eq!(engine.active_port(), ActivePort::Secondary);

        // Secondary never delivers: selection stays, no switching every settle period
        for secs in [37, 43, 49, 120] {
            engine.run_receive_tick(start + Duration::from_secs(secs));
            assert_eq!(engine.active_port(), ActivePort::Secondary);
        }
        assert_eq!(engine.counters().frames_received, 1);
    }

    #[tokio::test]
    async fn test_engine_shared_across_tasks() {
        let (engine, mock) = engine();
        let mut rx = engine.subscribe();

        let receiver = engine.clone();
        mock.push_bytes(&zero_rc_frame());
        tokio::spawn(async move { receiver.run_receive_tick(Instant::now()) })
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), LinkEvent::LinkUp);
        assert!(engine.is_link_up());
    }
}
