use anyhow::anyhow;
use chrono::{Local, Utc};
use chrono_tz::Tz;

use light_timer_common::{minutes_since_midnight, Clock};

/// Wall clock in a configured IANA zone, or the system's local zone.
#[derive(Debug, Clone, Copy)]
pub struct ZonedClock {
    timezone: Option<Tz>,
}

impl ZonedClock {
    pub fn local() -> Self {
        Self { timezone: None }
    }

    pub fn from_config(timezone: Option<&str>) -> anyhow::Result<Self> {
        let Some(name) = timezone else {
            return Ok(Self::local());
        };

        let tz: Tz = name
            .trim()
            .parse()
            .map_err(|_| anyhow!("unknown timezone `{name}`"))?;
        Ok(Self { timezone: Some(tz) })
    }

    pub fn timezone_name(&self) -> &'static str {
        self.timezone.map(|tz| tz.name()).unwrap_or("local")
    }
}

impl Clock for ZonedClock {
    fn minutes_of_day(&self) -> u16 {
        match self.timezone {
            Some(tz) => minutes_since_midnight(&Utc::now().with_timezone(&tz)),
            None => minutes_since_midnight(&Local::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_known_zone() {
        let clock = ZonedClock::from_config(Some("Europe/Berlin")).unwrap();
        assert_eq!(clock.timezone_name(), "Europe/Berlin");
        assert!(clock.minutes_of_day() < 1440);
    }

    #[test]
    fn missing_zone_means_local_time() {
        let clock = ZonedClock::from_config(None).unwrap();
        assert_eq!(clock.timezone_name(), "local");
    }

    #[test]
    fn rejects_unknown_zone() {
        let err = ZonedClock::from_config(Some("Mars/Olympus_Mons")).unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }
}
