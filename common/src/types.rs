use serde::{Deserialize, Serialize};

/// Window length of the LONG preset (18h00).
pub const LONG_DURATION_MINUTES: u16 = 18 * 60;
/// Window length of the SHORT preset (12h00).
pub const SHORT_DURATION_MINUTES: u16 = 12 * 60;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControllerState {
    Off,
    On,
}

impl ControllerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }
}

/// Selectable length of the daily ON window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DurationPreset {
    Long,
    Short,
}

impl DurationPreset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }

    pub fn minutes(self) -> u16 {
        match self {
            Self::Long => LONG_DURATION_MINUTES,
            Self::Short => SHORT_DURATION_MINUTES,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    pub(crate) fn to_bits(self) -> u8 {
        match self {
            Self::Long => 0,
            Self::Short => 1,
        }
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        if bits & 1 == 0 {
            Self::Long
        } else {
            Self::Short
        }
    }
}
