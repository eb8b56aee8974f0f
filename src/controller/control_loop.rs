//! # Mixing Loop
//!
//! One control tick:
//!
//! 1. Run the link failsafe check.
//! 2. In joystick mode, poll the input device and write mapped axes into the
//!    outbound channel bank.
//! 3. Mix the selected channel bank; the safe output replaces it whenever the
//!    link is down.
//! 4. Hand the output to the actuator sink.
//! 5. Transmit the outbound bank once per transmit period.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::channel_mapper::AxisMapper;
use super::device::{ActuatorSink, InputDevice};
use super::mixer::{MixOutput, MixSource, Mixer};
use super::mode::ModeSelector;
use crate::link::LinkEngine;

/// Periodic channel-mixing driver
pub struct MixingLoop {
    engine: LinkEngine,
    input: Option<Box<dyn InputDevice>>,
    sink: Box<dyn ActuatorSink>,
    mapper: AxisMapper,
    mixer: Mixer,
    mode: ModeSelector,
    transmit_period: Duration,
    last_transmit: Option<Instant>,
    input_healthy: bool,
}

impl std::fmt::Debug for MixingLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixingLoop")
            .field("mode", &self.mode.get())
            .field("transmit_period", &self.transmit_period)
            .finish_non_exhaustive()
    }
}

impl MixingLoop {
    pub fn new(
        engine: LinkEngine,
        input: Option<Box<dyn InputDevice>>,
        sink: Box<dyn ActuatorSink>,
        mapper: AxisMapper,
        mixer: Mixer,
        mode: ModeSelector,
        transmit_period: Duration,
    ) -> Self {
        Self {
            engine,
            input,
            sink,
            mapper,
            mixer,
            mode,
            transmit_period,
            last_transmit: None,
            input_healthy: true,
        }
    }

    pub fn mode(&self) -> &ModeSelector {
        &self.mode
    }

    /// Run one control cycle
    ///
    /// # Returns
    ///
    /// The output handed to the actuator sink, `None` when mixing is disabled.
    pub fn run_control_tick(&mut self, now: Instant) -> Option<MixOutput> {
        let link_up = self.engine.update_link_health(now);

        if self.mode.is_joystick() {
            self.update_outbound_from_input();
        }

        let channels = match self.mixer.settings().source {
            MixSource::Inbound => self.engine.inbound_channels(),
            MixSource::Outbound => self.engine.outbound_channels(),
        };

        let output = self.mixer.mix(&channels, link_up);
        if let Some(output) = &output {
            if let Err(e) = self.sink.apply(output) {
                warn!("Actuator sink rejected output: {}", e);
            }
        }

        self.maybe_transmit(now);
        output
    }

    fn update_outbound_from_input(&mut self) {
        let Some(input) = self.input.as_mut() else {
            return;
        };

        match input.poll() {
            Ok(()) => {
                if !self.input_healthy {
                    info!("Input device recovered");
                    self.input_healthy = true;
                }
            }
            Err(e) => {
                if self.input_healthy {
                    warn!("Input device unavailable: {}", e);
                    self.input_healthy = false;
                }
                return;
            }
        }

        let mut channels = self.engine.outbound_channels();
        let input = &*input;
        if self.mapper.map_axes(|axis| input.axis(axis), &mut channels) > 0 {
            self.engine.set_channels(&channels);
        }
    }

    fn maybe_transmit(&mut self, now: Instant) {
        let due = self
            .last_transmit
            .map(|t| now.saturating_duration_since(t) >= self.transmit_period)
            .unwrap_or(true);
        if !due {
            return;
        }

        self.last_transmit = Some(now);
        if let Err(e) = self.engine.send_channels() {
            debug!("Channel transmit skipped: {}", e);
        }
    }
}
