use std::{
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use anyhow::Context;
use esp_idf_hal::gpio::{AnyIOPin, InputOutput, PinDriver, Pull as EspPull};
use esp_idf_svc::log::EspLogger;
use log::{info, warn};

use light_timer_common::{
    ControllerConfig, DigitalPort, Direction, EdgeDetector, Level, LightController, PollLoop, Pull,
};

use crate::clock::ZonedClock;

/// No argv on the target; the start time is baked in at build time.
const START_TIME: &str = match option_env!("LIGHT_TIMER_START") {
    Some(start_time) => start_time,
    None => "18:00",
};

struct EspPort {
    name: &'static str,
    pin: i32,
    driver: PinDriver<'static, AnyIOPin, InputOutput>,
}

impl EspPort {
    fn new(name: &'static str, pin: i32) -> anyhow::Result<Self> {
        let driver = unsafe { PinDriver::input_output(AnyIOPin::new(pin)) }
            .with_context(|| format!("failed to claim GPIO{pin} for `{name}`"))?;
        Ok(Self { name, pin, driver })
    }
}

impl DigitalPort for EspPort {
    fn configure(&mut self, direction: Direction, pull: Pull) {
        if direction == Direction::Output {
            return;
        }

        let pull = match pull {
            Pull::Floating => EspPull::Floating,
            Pull::Down => EspPull::Down,
            Pull::Up => EspPull::Up,
        };
        if let Err(err) = self.driver.set_pull(pull) {
            warn!("GPIO{} (`{}`) pull setup failed: {err}", self.pin, self.name);
        }
    }

    fn write(&mut self, level: Level) {
        let result = match level {
            Level::High => self.driver.set_high(),
            Level::Low => self.driver.set_low(),
        };
        if let Err(err) = result {
            warn!("GPIO{} (`{}`) write failed: {err}", self.pin, self.name);
        }
    }

    fn read(&mut self) -> Level {
        Level::from(self.driver.is_high())
    }
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let mut config = ControllerConfig::default();
    config.sanitize();

    let clock = ZonedClock::from_config(config.timezone.as_deref()).unwrap_or_else(|err| {
        warn!("{err:#}; falling back to local time");
        ZonedClock::local()
    });

    let light = EspPort::new("light", config.light_pin)?;
    let on_off = EspPort::new("on/off", config.on_off_pin)?;
    let mode = EspPort::new("mode", config.mode_pin)?;
    info!(
        "light timer GPIO: light={} on/off={} mode={} tz={}",
        config.light_pin,
        config.on_off_pin,
        config.mode_pin,
        clock.timezone_name()
    );

    let controller = LightController::new(light, Arc::new(clock), &config);
    let mut poll_loop = PollLoop::new(
        controller,
        EdgeDetector::new("on/off", config.on_off_pin, on_off, config.input_pull),
        EdgeDetector::new("mode", config.mode_pin, mode, config.input_pull),
        START_TIME,
        Duration::from_millis(config.poll_interval_ms),
    );
    poll_loop.start();

    // Never raised on the device: it runs until power is removed.
    let stop = AtomicBool::new(false);
    poll_loop.run(&stop);
    Ok(())
}
