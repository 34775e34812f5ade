use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{bail, Context};
use oorandom::Rand32;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use light_timer_common::{
    ControllerConfig, DigitalPort, Direction, EdgeDetector, Level, LightController, PollLoop, Pull,
};

use crate::clock::ZonedClock;

const USAGE: &str = "usage: light-timer-controller <HH:MM>";

/// Stand-in for a GPIO pin when no hardware is attached. Outputs only record
/// their level; inputs read HIGH roughly once in `press_one_in` reads.
pub struct SimulatedPort {
    name: &'static str,
    pin: i32,
    direction: Direction,
    level: Level,
    press_one_in: u32,
    rng: Rand32,
}

impl SimulatedPort {
    pub fn new(name: &'static str, pin: i32, press_one_in: u32, seed: u64) -> Self {
        Self {
            name,
            pin,
            direction: Direction::Input,
            level: Level::Low,
            press_one_in: press_one_in.max(2),
            rng: Rand32::new(seed),
        }
    }
}

impl DigitalPort for SimulatedPort {
    fn configure(&mut self, direction: Direction, pull: Pull) {
        self.direction = direction;
        debug!(
            "simulated [{}] ({}) configured as {direction:?}, pull {pull:?}",
            self.name, self.pin
        );
    }

    fn write(&mut self, level: Level) {
        if self.direction != Direction::Output {
            return;
        }
        if self.level != level {
            debug!(
                "simulated [{}] ({}) driven {}",
                self.name,
                self.pin,
                level.as_str()
            );
        }
        self.level = level;
    }

    fn read(&mut self) -> Level {
        match self.direction {
            Direction::Output => self.level,
            Direction::Input => Level::from(self.rng.rand_range(0..self.press_one_in) == 0),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let start_time = start_time_argument(std::env::args().skip(1))?;

    let mut config = load_config().await.unwrap_or_else(|err| {
        warn!("failed to load controller config: {err:#}");
        ControllerConfig::default()
    });
    apply_env_overrides(&mut config);
    config.sanitize();

    let clock = ZonedClock::from_config(config.timezone.as_deref()).unwrap_or_else(|err| {
        warn!("{err:#}; falling back to local time");
        ZonedClock::local()
    });
    info!(
        "simulated light timer: light=GPIO{} on/off=GPIO{} mode=GPIO{} tz={}",
        config.light_pin,
        config.on_off_pin,
        config.mode_pin,
        clock.timezone_name()
    );

    let seed = clock_seed();
    let light = SimulatedPort::new("light", config.light_pin, config.simulated_press_one_in, seed);
    let on_off = SimulatedPort::new(
        "on/off",
        config.on_off_pin,
        config.simulated_press_one_in,
        seed.rotate_left(21),
    );
    let mode = SimulatedPort::new(
        "mode",
        config.mode_pin,
        config.simulated_press_one_in,
        seed.rotate_left(42),
    );

    let controller = LightController::new(light, Arc::new(clock), &config);
    let mut poll_loop = PollLoop::new(
        controller,
        EdgeDetector::new("on/off", config.on_off_pin, on_off, config.input_pull),
        EdgeDetector::new("mode", config.mode_pin, mode, config.input_pull),
        start_time,
        Duration::from_millis(config.poll_interval_ms),
    );
    poll_loop.start();

    let stop = Arc::new(AtomicBool::new(false));
    let mut worker = tokio::task::spawn_blocking({
        let stop = stop.clone();
        move || poll_loop.run(&stop)
    });

    let signal = tokio::select! {
        joined = &mut worker => {
            joined.context("poll loop terminated unexpectedly")?;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => signal,
    };

    if let Err(err) = signal {
        warn!("failed to listen for shutdown signal: {err}");
        return worker.await.context("poll loop terminated unexpectedly");
    }
    info!("shutdown requested");

    stop.store(true, Ordering::Release);
    worker.await.context("poll loop task failed")?;
    info!("light forced off, exiting");
    Ok(())
}

fn start_time_argument(mut args: impl Iterator<Item = String>) -> anyhow::Result<String> {
    let Some(start_time) = args.next() else {
        bail!("missing start time argument\n{USAGE}");
    };

    let extra = args.count();
    if extra > 0 {
        warn!("ignoring {extra} extra argument(s) after `{start_time}`");
    }
    Ok(start_time)
}

fn config_path() -> PathBuf {
    std::env::var("LIGHT_TIMER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.light-timer/config.json"))
}

async fn load_config() -> anyhow::Result<ControllerConfig> {
    let path = config_path();
    match tokio::fs::read(&path).await {
        Ok(raw) => ControllerConfig::from_json_slice(&raw)
            .with_context(|| format!("invalid config at {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(ControllerConfig::default()),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn apply_env_overrides(config: &mut ControllerConfig) {
    if let Ok(timezone) = std::env::var("LIGHT_TIMER_TZ") {
        config.timezone = Some(timezone);
    }

    if let Some(poll_ms) = std::env::var("LIGHT_TIMER_POLL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
    {
        config.poll_interval_ms = poll_ms;
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn output_port_reads_back_last_write() {
        let mut port = SimulatedPort::new("light", 10, 1_000, 7);
        port.configure(Direction::Output, Pull::Floating);

        port.write(Level::High);
        assert_eq!(port.read(), Level::High);

        port.write(Level::Low);
        assert_eq!(port.read(), Level::Low);
    }

    #[test]
    fn input_port_ignores_writes_and_produces_both_levels() {
        let mut port = SimulatedPort::new("on/off", 8, 2, 7);
        port.configure(Direction::Input, Pull::Down);
        port.write(Level::High);

        let highs = (0..500).filter(|_| port.read().is_high()).count();

        assert!(highs > 0);
        assert!(highs < 500);
    }

    #[test]
    fn same_seed_gives_same_presses() {
        let mut first = SimulatedPort::new("mode", 9, 10, 99);
        let mut second = SimulatedPort::new("mode", 9, 10, 99);

        let a: Vec<Level> = (0..64).map(|_| first.read()).collect();
        let b: Vec<Level> = (0..64).map(|_| second.read()).collect();

        assert_eq!(a, b);
    }

    #[test]
    fn start_time_is_first_argument() {
        assert_eq!(start_time_argument(args(&["18:00"])).unwrap(), "18:00");
        assert_eq!(
            start_time_argument(args(&["06.30", "extra"])).unwrap(),
            "06.30"
        );
    }

    #[test]
    fn missing_start_time_is_a_usage_error() {
        let err = start_time_argument(args(&[])).unwrap_err();
        assert!(err.to_string().contains(USAGE));
    }
}
