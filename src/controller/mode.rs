//! Work mode selection
//!
//! In `Joystick` mode the mixing loop writes joystick-derived channels into
//! the outbound bank every tick. In `Manual` mode the outbound bank is left to
//! whoever calls `set_channel` directly.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkMode {
    #[default]
    Joystick,
    Manual,
}

impl WorkMode {
    fn as_u8(self) -> u8 {
        match self {
            WorkMode::Joystick => 0,
            WorkMode::Manual => 1,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkMode::Joystick,
            _ => WorkMode::Manual,
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkMode::Joystick => write!(f, "joystick"),
            WorkMode::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for WorkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "joystick" => Ok(WorkMode::Joystick),
            "manual" => Ok(WorkMode::Manual),
            other => Err(format!("unknown work mode '{}'", other)),
        }
    }
}

/// Shared, runtime-switchable work mode
#[derive(Debug, Clone)]
pub struct ModeSelector {
    mode: Arc<AtomicU8>,
}

impl Default for ModeSelector {
    fn default() -> Self {
        Self::new(WorkMode::default())
    }
}

impl ModeSelector {
    pub fn new(mode: WorkMode) -> Self {
        Self {
            mode: Arc::new(AtomicU8::new(mode.as_u8())),
        }
    }

    pub fn get(&self) -> WorkMode {
        WorkMode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    pub fn set(&self, mode: WorkMode) {
        self.mode.store(mode.as_u8(), Ordering::Relaxed);
    }

    /// True when joystick axes drive the outbound channels
    pub fn is_joystick(&self) -> bool {
        self.get() == WorkMode::Joystick
    }
}
