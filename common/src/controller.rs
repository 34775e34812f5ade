//! On/off state machine for the light.
//!
//! | From | Event                  | Guard              | To  |
//! |------|------------------------|--------------------|-----|
//! | OFF  | `TurnOn { time }`      | `time` is `HH:MM`  | ON  |
//! | ON   | `TurnOff`              |                    | OFF |
//! | ON   | `ChangeDurationPreset` |                    | ON  |
//!
//! Every other (state, event) pair is ignored. A rejected guard leaves state
//! and schedule untouched.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::ControllerConfig;
use crate::port::{DigitalPort, Direction, Level, Pull};
use crate::schedule::{parse_start_time, StartTime, TimeStringError};
use crate::scheduler::{self, lock_port, ScheduleState, SchedulerHandle};
use crate::types::{ControllerState, DurationPreset};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TurnOn { time: String },
    TurnOff,
    ChangeDurationPreset,
}

impl Event {
    pub fn turn_on(time: impl Into<String>) -> Self {
        Self::TurnOn { time: time.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnOn { .. } => "turn_on",
            Self::TurnOff => "turn_off",
            Self::ChangeDurationPreset => "change_duration_preset",
        }
    }
}

/// What a dispatched event did. Informational only: nothing here needs
/// handling by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Transitioned {
        from: ControllerState,
        to: ControllerState,
    },
    PresetChanged(DurationPreset),
    Rejected(TimeStringError),
    Ignored {
        state: ControllerState,
        event: &'static str,
    },
    /// The OS refused the scheduler thread; the controller stayed OFF.
    SpawnFailed,
}

pub struct LightController<P, C>
where
    P: DigitalPort + Send + 'static,
    C: Clock,
{
    state: ControllerState,
    schedule: Arc<ScheduleState>,
    output: Arc<Mutex<P>>,
    clock: Arc<C>,
    scheduler_interval: Duration,
    task: Option<SchedulerHandle>,
}

impl<P, C> LightController<P, C>
where
    P: DigitalPort + Send + 'static,
    C: Clock,
{
    pub fn new(mut output: P, clock: Arc<C>, config: &ControllerConfig) -> Self {
        output.configure(Direction::Output, Pull::Floating);
        output.write(Level::Low);

        Self {
            state: ControllerState::Off,
            schedule: Arc::new(ScheduleState::new(config.default_preset)),
            output: Arc::new(Mutex::new(output)),
            clock,
            scheduler_interval: Duration::from_millis(config.scheduler_interval_ms),
            task: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == ControllerState::On
    }

    pub fn preset(&self) -> DurationPreset {
        self.schedule.preset()
    }

    /// Last start time accepted by the guard; reads as `00:00` before the
    /// first `TurnOn`.
    pub fn start_time(&self) -> Option<StartTime> {
        StartTime::from_minutes(self.schedule.start_minutes())
    }

    pub fn schedule(&self) -> &Arc<ScheduleState> {
        &self.schedule
    }

    /// Runs `f` with exclusive access to the output port.
    pub fn with_output<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut lock_port(&self.output))
    }

    pub fn dispatch(&mut self, event: Event) -> Outcome {
        debug!("[event] {}", event.name());

        let outcome = match (self.state, event) {
            (ControllerState::Off, Event::TurnOn { time }) => match parse_start_time(&time) {
                Ok(start) => {
                    debug!("[guard] valid_time_string [OK]");
                    self.enter_on(start)
                }
                Err(reason) => {
                    warn!("[guard] valid_time_string [REJECTED]: {reason}");
                    Outcome::Rejected(reason)
                }
            },
            (ControllerState::On, Event::TurnOff) => {
                self.enter_off();
                Outcome::Transitioned {
                    from: ControllerState::On,
                    to: ControllerState::Off,
                }
            }
            (ControllerState::On, Event::ChangeDurationPreset) => {
                let preset = self.schedule.toggle_preset();
                info!("[action] duration preset set to {}", preset.as_str());
                Outcome::PresetChanged(preset)
            }
            (state, event) => {
                debug!(
                    "[ignored] {} has no transition from {}",
                    event.name(),
                    state.as_str()
                );
                Outcome::Ignored {
                    state,
                    event: event.name(),
                }
            }
        };

        if let Outcome::Transitioned { from, to } = outcome {
            info!("[transition] {} -> {}", from.as_str(), to.as_str());
        }

        outcome
    }

    /// Forced cleanup for process exit: stops any task and drives the light
    /// LOW regardless of state. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.is_on() {
            info!(
                "[transition] {} -> {} (shutdown)",
                ControllerState::On.as_str(),
                ControllerState::Off.as_str()
            );
        }
        self.enter_off();
    }

    fn enter_on(&mut self, start: StartTime) -> Outcome {
        info!("[action] starting with on_time={start}");
        let previous_start = self.schedule.arm(start);

        match scheduler::spawn(
            self.schedule.clone(),
            self.output.clone(),
            self.clock.clone(),
            self.scheduler_interval,
        ) {
            Ok(handle) => {
                self.task = Some(handle);
                self.state = ControllerState::On;
                info!("[action] scheduler task started");
                Outcome::Transitioned {
                    from: ControllerState::Off,
                    to: ControllerState::On,
                }
            }
            Err(err) => {
                error!("failed to spawn scheduler task: {err}");
                self.schedule.disarm(previous_start);
                self.force_output_low();
                Outcome::SpawnFailed
            }
        }
    }

    fn enter_off(&mut self) {
        match self.task.take() {
            Some(task) => {
                task.stop(&self.schedule);
                info!("[action] scheduler task joined");
            }
            None => self.schedule.set_running(false),
        }
        self.force_output_low();
        self.state = ControllerState::Off;
    }

    fn force_output_low(&self) {
        lock_port(&self.output).write(Level::Low);
    }
}

impl<P, C> Drop for LightController<P, C>
where
    P: DigitalPort + Send + 'static,
    C: Clock,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
