//! # Joystick Module
//!
//! Opens a Linux evdev joystick and keeps an axis cache fed by an async event
//! stream task.
//!
//! ## Device Selection
//!
//! An explicit `/dev/input/eventN` path is used as-is. Otherwise every
//! `event*` node under `/dev/input` is tried in sorted order and the first
//! device that exposes absolute axes is taken.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use evdev::Device;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::device::InputDevice;
use super::mapper::{AxisSlot, EventMapper};
use crate::error::{CrsfBridgeError, Result};

/// Joystick handle
///
/// Must be opened from within a tokio runtime; the event reader runs as a
/// background task until the handle is dropped.
pub struct Joystick {
    cache: Arc<Mutex<EventMapper>>,
    connected: Arc<AtomicBool>,
    device_path: String,
    name: String,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for Joystick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joystick")
            .field("device_path", &self.device_path)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Joystick {
    /// Open a joystick
    ///
    /// # Arguments
    ///
    /// * `path` - Explicit device node; empty string means auto-detect
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: no device with absolute axes
    /// - `Controller`: the device could not be opened or streamed
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use crsf_bridge::controller::joystick::Joystick;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let joystick = Joystick::open("")?;
    ///     println!("Using {}", joystick.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str) -> Result<Self> {
        let (device, device_path) = if path.is_empty() {
            Self::detect()?
        } else {
            let device = Device::open(path)
                .map_err(|e| CrsfBridgeError::Controller(format!("Failed to open {}: {}", path, e)))?;
            (device, PathBuf::from(path))
        };

        let device_path = device_path.to_string_lossy().to_string();
        let name = device.name().unwrap_or("unknown").to_string();
        let mapper = Self::build_mapper(&device)?;
        info!(
            "Opened joystick {} ({}) with {} axes",
            device_path,
            name,
            mapper.axis_count()
        );

        let cache = Arc::new(Mutex::new(mapper));
        let connected = Arc::new(AtomicBool::new(true));

        let mut stream = device
            .into_event_stream()
            .map_err(|e| CrsfBridgeError::Controller(format!("Failed to stream {}: {}", device_path, e)))?;

        let reader = {
            let cache = cache.clone();
            let connected = connected.clone();
            let path = device_path.clone();
            tokio::spawn(async move {
                loop {
                    match stream.next_event().await {
                        Ok(event) => {
                            if let Ok(mut mapper) = cache.lock() {
                                mapper.process_event(&event);
                            }
                        }
                        Err(e) => {
                            warn!("Joystick {} disconnected: {}", path, e);
                            if let Ok(mut mapper) = cache.lock() {
                                mapper.reset();
                            }
                            connected.store(false, Ordering::SeqCst);
                            break;
                        }
                    }
                }
            })
        };

        Ok(Self {
            cache,
            connected,
            device_path,
            name,
            reader,
        })
    }

    /// Scan /dev/input for the first device with absolute axes.
    fn detect() -> Result<(Device, PathBuf)> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(CrsfBridgeError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| CrsfBridgeError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| CrsfBridgeError::Controller(format!("Failed to read directory entry: {}", e)))?;

        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    let axes = device
                        .supported_absolute_axes()
                        .map(|axes| axes.iter().count())
                        .unwrap_or(0);
                    debug!("Found input device: {} ({} absolute axes)", path.display(), axes);

                    if axes > 0 {
                        return Ok((device, path));
                    }
                }
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(CrsfBridgeError::ControllerNotFound)
    }

    /// Build the axis cache from the device's absinfo table.
    fn build_mapper(device: &Device) -> Result<EventMapper> {
        let abs_state = device
            .get_abs_state()
            .map_err(|e| CrsfBridgeError::Controller(format!("Failed to read axis ranges: {}", e)))?;

        let Some(axes) = device.supported_absolute_axes() else {
            return Err(CrsfBridgeError::ControllerNotFound);
        };

        let slots: Vec<AxisSlot> = axes
            .iter()
            .map(|axis| {
                let info = abs_state[axis.0 as usize];
                AxisSlot::new(axis, info.minimum, info.maximum)
            })
            .collect();

        let mut mapper = EventMapper::new(slots);
        for axis in axes.iter() {
            mapper.seed(axis.0, abs_state[axis.0 as usize].value);
        }
        Ok(mapper)
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl InputDevice for Joystick {
    fn poll(&mut self) -> Result<()> {
        // Events are applied by the reader task; polling only reports health
        if self.is_connected() {
            Ok(())
        } else {
            Err(CrsfBridgeError::Controller(format!(
                "{} disconnected",
                self.device_path
            )))
        }
    }

    fn axis(&self, index: usize) -> Option<i16> {
        self.cache.lock().ok().and_then(|mapper| mapper.axis(index))
    }
}

impl Drop for Joystick {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
