use serde::{Deserialize, Serialize};

use crate::port::Pull;
use crate::types::DurationPreset;

const DEFAULT_ON_OFF_PIN: i32 = 8;
const DEFAULT_MODE_PIN: i32 = 9;
const DEFAULT_LIGHT_PIN: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub on_off_pin: i32,
    pub mode_pin: i32,
    pub light_pin: i32,
    pub input_pull: Pull,
    pub poll_interval_ms: u64,
    pub scheduler_interval_ms: u64,
    pub default_preset: DurationPreset,
    pub timezone: Option<String>,
    /// Host simulation only: an input reads HIGH once in this many reads.
    pub simulated_press_one_in: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            on_off_pin: DEFAULT_ON_OFF_PIN,
            mode_pin: DEFAULT_MODE_PIN,
            light_pin: DEFAULT_LIGHT_PIN,
            input_pull: Pull::Down,
            poll_interval_ms: 1,
            scheduler_interval_ms: 1,
            default_preset: DurationPreset::Long,
            timezone: None,
            simulated_press_one_in: 1_000,
        }
    }
}

impl ControllerConfig {
    pub fn from_json_slice(raw: &[u8]) -> serde_json::Result<Self> {
        let mut config: Self = serde_json::from_slice(raw)?;
        config.sanitize();
        Ok(config)
    }

    pub fn sanitize(&mut self) {
        if self.on_off_pin < 0 {
            self.on_off_pin = DEFAULT_ON_OFF_PIN;
        }
        if self.mode_pin < 0 {
            self.mode_pin = DEFAULT_MODE_PIN;
        }
        if self.light_pin < 0 {
            self.light_pin = DEFAULT_LIGHT_PIN;
        }

        self.poll_interval_ms = self.poll_interval_ms.clamp(1, 1_000);
        self.scheduler_interval_ms = self.scheduler_interval_ms.clamp(1, 1_000);
        self.simulated_press_one_in = self.simulated_press_one_in.max(2);

        if self
            .timezone
            .as_deref()
            .is_some_and(|zone| zone.trim().is_empty())
        {
            self.timezone = None;
        }
    }
}
