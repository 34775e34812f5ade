use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use log::{info, warn};

use crate::clock::Clock;
use crate::controller::{Event, LightController, Outcome};
use crate::edge::EdgeDetector;
use crate::port::DigitalPort;

/// Events produced by a single tick, in dispatch order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub on_off: Option<Outcome>,
    pub mode: Option<Outcome>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.on_off.is_none() && self.mode.is_none()
    }
}

/// Foreground loop: samples both buttons each tick and turns toggles into
/// controller events.
pub struct PollLoop<P, C, I>
where
    P: DigitalPort + Send + 'static,
    C: Clock,
    I: DigitalPort,
{
    controller: LightController<P, C>,
    on_off: EdgeDetector<I>,
    mode: EdgeDetector<I>,
    start_time: String,
    interval: Duration,
}

impl<P, C, I> PollLoop<P, C, I>
where
    P: DigitalPort + Send + 'static,
    C: Clock,
    I: DigitalPort,
{
    pub fn new(
        controller: LightController<P, C>,
        on_off: EdgeDetector<I>,
        mode: EdgeDetector<I>,
        start_time: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            controller,
            on_off,
            mode,
            start_time: start_time.into(),
            interval,
        }
    }

    pub fn controller(&self) -> &LightController<P, C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut LightController<P, C> {
        &mut self.controller
    }

    /// Issues the startup `TurnOn` with the configured time string. An invalid
    /// string leaves the controller OFF; the buttons still work afterwards.
    pub fn start(&mut self) -> Outcome {
        let outcome = self.controller.dispatch(Event::turn_on(self.start_time.clone()));
        if self.controller.is_on() {
            info!("light timer running, window opens at {}", self.start_time);
        } else {
            warn!(
                "controller stayed OFF after startup with on_time=`{}`",
                self.start_time
            );
        }
        outcome
    }

    /// One poll: each detector is read exactly once.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        if self.on_off.poll() {
            let event = if self.controller.is_on() {
                Event::TurnOff
            } else {
                Event::turn_on(self.start_time.clone())
            };
            report.on_off = Some(self.controller.dispatch(event));
        }

        if self.mode.poll() {
            report.mode = Some(self.controller.dispatch(Event::ChangeDurationPreset));
        }

        report
    }

    /// Ticks until `stop` is raised, then runs the forced shutdown.
    pub fn run(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Acquire) {
            self.tick();
            thread::sleep(self.interval);
        }

        info!("poll loop stopping");
        self.controller.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ControllerConfig;
    use crate::port::{Direction, Level, Pull};
    use crate::types::{ControllerState, DurationPreset};

    /// Input whose levels are pushed by the test through a shared queue.
    #[derive(Clone)]
    struct Button {
        levels: Arc<Mutex<VecDeque<Level>>>,
        held: Arc<Mutex<Level>>,
    }

    impl Button {
        fn new() -> Self {
            Self {
                levels: Arc::default(),
                held: Arc::new(Mutex::new(Level::Low)),
            }
        }

        fn press(&self) {
            self.levels
                .lock()
                .unwrap()
                .extend([Level::High, Level::Low]);
        }
    }

    impl DigitalPort for Button {
        fn configure(&mut self, _direction: Direction, _pull: Pull) {}

        fn write(&mut self, _level: Level) {}

        fn read(&mut self) -> Level {
            let mut held = self.held.lock().unwrap();
            if let Some(level) = self.levels.lock().unwrap().pop_front() {
                *held = level;
            }
            *held
        }
    }

    struct NullOutput;

    impl DigitalPort for NullOutput {
        fn configure(&mut self, _direction: Direction, _pull: Pull) {}

        fn write(&mut self, _level: Level) {}

        fn read(&mut self) -> Level {
            Level::Low
        }
    }

    fn poll_loop(start_time: &str) -> (PollLoop<NullOutput, ManualClock, Button>, Button, Button) {
        let on_off = Button::new();
        let mode = Button::new();
        let controller = LightController::new(
            NullOutput,
            Arc::new(ManualClock::new(0)),
            &ControllerConfig::default(),
        );
        let poll_loop = PollLoop::new(
            controller,
            EdgeDetector::new("on/off", 8, on_off.clone(), Pull::Down),
            EdgeDetector::new("mode", 9, mode.clone(), Pull::Down),
            start_time,
            Duration::from_millis(1),
        );
        (poll_loop, on_off, mode)
    }

    #[test]
    fn startup_turns_controller_on() {
        let (mut poll_loop, _, _) = poll_loop("18:00");

        poll_loop.start();

        assert_eq!(poll_loop.controller().state(), ControllerState::On);
    }

    #[test]
    fn invalid_startup_time_stays_off() {
        let (mut poll_loop, _, _) = poll_loop("18h00");

        assert!(matches!(poll_loop.start(), Outcome::Rejected(_)));
        assert_eq!(poll_loop.controller().state(), ControllerState::Off);
    }

    #[test]
    fn on_off_button_alternates_between_states() {
        let (mut poll_loop, on_off, _) = poll_loop("18:00");
        poll_loop.start();

        on_off.press();
        // rising edge
        assert!(matches!(
            poll_loop.tick().on_off,
            Some(Outcome::Transitioned {
                to: ControllerState::Off,
                ..
            })
        ));
        // falling edge is also a toggle
        assert!(matches!(
            poll_loop.tick().on_off,
            Some(Outcome::Transitioned {
                to: ControllerState::On,
                ..
            })
        ));
        assert!(poll_loop.tick().is_idle());
        assert_eq!(poll_loop.controller().state(), ControllerState::On);
    }

    #[test]
    fn mode_button_changes_preset_only_while_on() {
        let (mut poll_loop, on_off, mode) = poll_loop("18:00");
        poll_loop.start();

        mode.press();
        assert_eq!(
            poll_loop.tick().mode,
            Some(Outcome::PresetChanged(DurationPreset::Short))
        );
        assert_eq!(
            poll_loop.tick().mode,
            Some(Outcome::PresetChanged(DurationPreset::Long))
        );

        on_off.levels.lock().unwrap().push_back(Level::High);
        mode.levels.lock().unwrap().push_back(Level::High);
        let report = poll_loop.tick();

        assert!(matches!(
            report.on_off,
            Some(Outcome::Transitioned {
                to: ControllerState::Off,
                ..
            })
        ));
        assert!(matches!(report.mode, Some(Outcome::Ignored { .. })));
        assert_eq!(poll_loop.controller().preset(), DurationPreset::Long);
    }

    #[test]
    fn run_returns_after_stop_and_shuts_down() {
        let (mut poll_loop, _, _) = poll_loop("18:00");
        poll_loop.start();

        let stop = AtomicBool::new(true);
        poll_loop.run(&stop);

        assert_eq!(poll_loop.controller().state(), ControllerState::Off);
        assert!(!poll_loop.controller().schedule().is_running());
    }
}
