//! # CRSF Bridge
//!
//! Bridges a joystick to a flight controller over a CRSF serial link.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first CLI argument, default `config/default.toml`)
//!    - Set up logging with tracing subscriber, optionally to a daily file
//!    - Open the primary and secondary serial transports
//!    - Open the joystick; it is only polled while the mode is joystick
//!
//! 2. **Tasks**
//!    - Receive: drain the active transport every `receive_period_ms`
//!    - Control: failsafe check, mixing and channel transmit every `period_ms`
//!    - Battery: send a battery sensor frame every `battery_period_ms`
//!    - Status: append a telemetry snapshot every `log_interval_ms`
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C signals every task to stop
//!    - Transports are released once the tasks have finished

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crsf_bridge::config::Config;
use crsf_bridge::controller::actuator::TracingActuator;
use crsf_bridge::controller::joystick::Joystick;
use crsf_bridge::controller::mixer::Mixer;
use crsf_bridge::controller::mode::{ModeSelector, WorkMode};
use crsf_bridge::controller::{InputDevice, MixingLoop};
use crsf_bridge::link::failover::TransportSet;
use crsf_bridge::link::{LinkEngine, LinkSettings};
use crsf_bridge::serial::open_optional;
use crsf_bridge::telemetry::{SysfsBattery, TelemetryLogger, TelemetrySnapshot};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Interval between link status log lines
const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let (config, loaded_from_file) = load_config(&config_path)?;

    let _log_guard = init_logging(&config)?;

    info!("CRSF Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    if loaded_from_file {
        info!("Configuration loaded from {}", config_path);
    } else {
        warn!("{} not found, using default configuration", config_path);
    }

    // Transports
    let primary = open_optional(&config.serial.primary_port, config.serial.baud_rate);
    let secondary = open_optional(&config.serial.secondary_port, config.serial.baud_rate);
    let engine = LinkEngine::new(
        LinkSettings::from_config(&config),
        TransportSet::new(primary, secondary),
    );
    info!("Active transport: {:?}", engine.active_port());

    // Input
    let mode = ModeSelector::new(config.control.work_mode);
    // Opened in both modes so a runtime switch to joystick has a device
    let input: Option<Box<dyn InputDevice>> = match Joystick::open(&config.control.device_path) {
        Ok(joystick) => {
            info!("Joystick: {} ({})", joystick.name(), joystick.device_path());
            Some(Box::new(joystick))
        }
        Err(e) if config.control.work_mode == WorkMode::Joystick => {
            error!("Joystick unavailable: {}", e);
            None
        }
        Err(e) => {
            warn!("Joystick unavailable, manual mode only: {}", e);
            None
        }
    };
    info!("Work mode: {:?}", mode.get());

    let mixing = MixingLoop::new(
        engine.clone(),
        input,
        Box::new(TracingActuator::new()),
        config.axis_mapper(),
        Mixer::new(config.mixer_settings(), config.channel_range()),
        mode.clone(),
        Duration::from_millis(config.control.transmit_period_ms),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = vec![
        spawn_receive_task(engine.clone(), &config, shutdown_rx.clone()),
        spawn_control_task(mixing, &config, shutdown_rx.clone()),
    ];

    if !config.telemetry.battery_supply.is_empty() {
        tasks.push(spawn_battery_task(engine.clone(), &config, shutdown_rx.clone()));
    }

    if config.telemetry.enabled {
        match TelemetryLogger::new(
            &config.telemetry.log_dir,
            config.telemetry.max_records_per_file,
            config.telemetry.max_files_to_keep,
        ) {
            Ok(logger) => tasks.push(spawn_status_task(
                engine.clone(),
                mode.clone(),
                logger,
                &config,
                shutdown_rx.clone(),
            )),
            Err(e) => error!("Telemetry logging disabled: {}", e),
        }
    }

    info!("Press Ctrl+C to exit");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, shutting down...");

    // Receivers are still alive in the tasks
    let _ = shutdown_tx.send(true);
    for task in tasks {
        if let Err(e) = task.await {
            warn!("Task ended abnormally: {}", e);
        }
    }

    let counters = engine.counters();
    info!(
        "Frames received: {}, sent: {}, framing errors: {}",
        counters.frames_received, counters.frames_sent, counters.framing_errors
    );
    engine.close();
    info!("Shutdown complete");

    Ok(())
}

/// Load the configuration, falling back to defaults when the file is absent
fn load_config(path: &str) -> Result<(Config, bool)> {
    if !Path::new(path).exists() {
        return Ok((Config::default(), false));
    }

    let config = Config::load(path).with_context(|| format!("invalid configuration in {}", path))?;
    Ok((config, true))
}

fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.log_dir.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    }

    std::fs::create_dir_all(&config.logging.log_dir)
        .with_context(|| format!("cannot create log directory {}", config.logging.log_dir))?;
    let appender = tracing_appender::rolling::daily(&config.logging.log_dir, "crsf-bridge.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

fn ticker(period_ms: u64) -> tokio::time::Interval {
    let mut ticker = interval(Duration::from_millis(period_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

fn spawn_receive_task(
    engine: LinkEngine,
    config: &Config,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut ticker = ticker(config.link.receive_period_ms);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    engine.run_receive_tick(Instant::now());
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("Receive task stopped");
    })
}

fn spawn_control_task(
    mut mixing: MixingLoop,
    config: &Config,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut ticker = ticker(config.control.period_ms);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    mixing.run_control_tick(Instant::now());
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("Control task stopped");
    })
}

fn spawn_battery_task(
    engine: LinkEngine,
    config: &Config,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let battery = SysfsBattery::new(&config.telemetry.battery_supply);
    let mut ticker = ticker(config.telemetry.battery_period_ms);
    info!("Battery telemetry from {}", battery.dir().display());

    tokio::spawn(async move {
        let mut healthy = true;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match battery.read() {
                        Ok(reading) => {
                            healthy = true;
                            if let Err(e) = engine.send_battery(&reading.to_sensor()) {
                                debug!("Battery frame skipped: {}", e);
                            }
                        }
                        Err(e) if healthy => {
                            warn!("Battery read failed: {}", e);
                            healthy = false;
                        }
                        Err(_) => {}
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("Battery task stopped");
    })
}

fn spawn_status_task(
    engine: LinkEngine,
    mode: ModeSelector,
    mut logger: TelemetryLogger,
    config: &Config,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut ticker = ticker(config.telemetry.log_interval_ms);

    tokio::spawn(async move {
        let mut last_status = Instant::now();
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let snapshot = TelemetrySnapshot::capture(&engine, mode.get(), now);
                    if let Err(e) = logger.log(&snapshot) {
                        warn!("Telemetry write failed: {}", e);
                    }

                    if now.duration_since(last_status) >= STATUS_LOG_INTERVAL {
                        info!(
                            "Link {}, port {:?}, received {}, sent {}",
                            if snapshot.link_up { "up" } else { "down" },
                            snapshot.active_port,
                            snapshot.counters.frames_received,
                            snapshot.counters.frames_sent
                        );
                        last_status = now;
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("Status task stopped");
    })
}
