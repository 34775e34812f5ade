use chrono::Timelike;
use thiserror::Error;

use crate::types::MINUTES_PER_DAY;

/// Minutes after local midnight at which the daily ON window opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StartTime(u16);

impl StartTime {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl std::fmt::Display for StartTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeStringError {
    #[error("start time field too short: `{0}`")]
    TooShort(String),
    #[error("missing start time separator: `{0}`")]
    MissingSeparator(String),
    #[error("non-number in start time field: `{0}`")]
    NonDigit(String),
    #[error("start time hour outside bounds: {0}")]
    HourOutOfRange(u16),
    #[error("start time minute outside bounds: {0}")]
    MinuteOutOfRange(u16),
}

/// Validates an `HH:MM` / `HH.MM` string and converts it to a [`StartTime`].
///
/// The hour is always taken from bytes `0..2` and the minute from bytes
/// `3..5`; the separator only has to appear somewhere in the string.
pub fn parse_start_time(input: &str) -> Result<StartTime, TimeStringError> {
    if input.len() < 5 {
        return Err(TimeStringError::TooShort(input.to_string()));
    }

    if !input.contains(':') && !input.contains('.') {
        return Err(TimeStringError::MissingSeparator(input.to_string()));
    }

    let (Some(hour), Some(minute)) = (two_digits(input, 0), two_digits(input, 3)) else {
        return Err(TimeStringError::NonDigit(input.to_string()));
    };

    if hour >= 24 {
        return Err(TimeStringError::HourOutOfRange(hour));
    }
    if minute >= 60 {
        return Err(TimeStringError::MinuteOutOfRange(minute));
    }

    Ok(StartTime(hour * 60 + minute))
}

fn two_digits(input: &str, offset: usize) -> Option<u16> {
    let field = input.get(offset..offset + 2)?;
    if !field.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Decides whether the light should be energized at `now`.
///
/// When the window crosses midnight only `now >= start` is checked, so the
/// early-morning tail of the window (`now < stop`) stays dark.
pub fn should_be_on(now: u16, start: u16, duration_minutes: u32) -> bool {
    let day = u32::from(MINUTES_PER_DAY);
    let start = u32::from(start);
    let now = u32::from(now);
    let stop = (start + duration_minutes % day) % day;

    if stop < start {
        now >= start
    } else {
        now < stop
    }
}

pub fn minutes_since_midnight<T: Timelike>(time: &T) -> u16 {
    // hour() < 24 and minute() < 60, the product always fits
    (time.hour() * 60 + time.minute()) as u16
}
