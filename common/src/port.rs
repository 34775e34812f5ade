//! Pin-level capability the controller is written against.
//!
//! Backends (simulated on host, `PinDriver` on ESP-IDF) live in the
//! controller binary; nothing in this crate touches registers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::High => "HIGH",
        }
    }

    pub fn is_high(self) -> bool {
        self == Self::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pull {
    Floating,
    Down,
    Up,
}

/// One physical pin. Implementations perform plain level I/O and never fail;
/// driver faults are the backend's to log.
pub trait DigitalPort {
    fn configure(&mut self, direction: Direction, pull: Pull);

    /// Only meaningful on a port configured as [`Direction::Output`].
    fn write(&mut self, level: Level);

    /// Only meaningful on a port configured as [`Direction::Input`].
    fn read(&mut self) -> Level;
}
