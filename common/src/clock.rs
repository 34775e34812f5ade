use std::sync::atomic::{AtomicU16, Ordering};

use chrono::Local;

use crate::schedule::minutes_since_midnight;
use crate::types::MINUTES_PER_DAY;

/// Source of the current time of day for the scheduler task.
pub trait Clock: Send + Sync + 'static {
    /// Minutes since local midnight, in `0..1440`.
    fn minutes_of_day(&self) -> u16;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn minutes_of_day(&self) -> u16 {
        minutes_since_midnight(&Local::now())
    }
}

/// Clock whose time only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    minutes: AtomicU16,
}

impl ManualClock {
    pub fn new(minutes: u16) -> Self {
        Self {
            minutes: AtomicU16::new(minutes % MINUTES_PER_DAY),
        }
    }

    pub fn set(&self, minutes: u16) {
        self.minutes
            .store(minutes % MINUTES_PER_DAY, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn minutes_of_day(&self) -> u16 {
        self.minutes.load(Ordering::Acquire)
    }
}
