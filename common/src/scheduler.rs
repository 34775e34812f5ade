//! Background evaluation of the ON window.
//!
//! The controller owns the only [`SchedulerHandle`]. Entering ON raises
//! `running` and spawns the task; entering OFF lowers `running` and joins the
//! task before the transition completes, so at most one task body is ever
//! live.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, AtomicU16, AtomicU8, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{info, warn};

use crate::clock::Clock;
use crate::port::{DigitalPort, Level};
use crate::schedule::{should_be_on, StartTime};
use crate::types::DurationPreset;

/// Schedule values shared between the controller and the scheduler task.
///
/// Single writer (controller actions), single reader (scheduler task) per
/// field; every field is one atomic word.
#[derive(Debug)]
pub struct ScheduleState {
    start_minutes: AtomicU16,
    preset: AtomicU8,
    running: AtomicBool,
    active_tasks: AtomicUsize,
}

impl ScheduleState {
    pub fn new(preset: DurationPreset) -> Self {
        Self {
            start_minutes: AtomicU16::new(0),
            preset: AtomicU8::new(preset.to_bits()),
            running: AtomicBool::new(false),
            active_tasks: AtomicUsize::new(0),
        }
    }

    pub fn start_minutes(&self) -> u16 {
        self.start_minutes.load(Ordering::Acquire)
    }

    pub fn preset(&self) -> DurationPreset {
        DurationPreset::from_bits(self.preset.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of scheduler task bodies currently executing.
    pub fn active_tasks(&self) -> usize {
        self.active_tasks.load(Ordering::Acquire)
    }

    /// Stores `start` and raises `running` ahead of a spawn. Returns the
    /// previous start for [`ScheduleState::disarm`].
    pub(crate) fn arm(&self, start: StartTime) -> u16 {
        let previous = self.start_minutes.swap(start.minutes(), Ordering::AcqRel);
        self.set_running(true);
        previous
    }

    /// Undoes [`ScheduleState::arm`] when no task was started.
    pub(crate) fn disarm(&self, previous_start: u16) {
        self.set_running(false);
        self.start_minutes.store(previous_start, Ordering::Release);
    }

    pub(crate) fn toggle_preset(&self) -> DurationPreset {
        let previous = self.preset.fetch_xor(1, Ordering::AcqRel);
        DurationPreset::from_bits(previous).toggled()
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }
}

pub struct SchedulerHandle {
    thread: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Lowers the running flag, then blocks until the task body has returned.
    pub(crate) fn stop(self, state: &ScheduleState) {
        state.set_running(false);
        if self.thread.join().is_err() {
            warn!("scheduler task panicked before it was joined");
        }
    }
}

/// Spawns the task. `state.running` must already be raised, otherwise the
/// task exits on its first check.
pub(crate) fn spawn<P, C>(
    state: Arc<ScheduleState>,
    output: Arc<Mutex<P>>,
    clock: Arc<C>,
    interval: Duration,
) -> io::Result<SchedulerHandle>
where
    P: DigitalPort + Send + 'static,
    C: Clock,
{
    let thread = thread::Builder::new()
        .name("light-scheduler".into())
        .spawn(move || run(&state, &output, clock.as_ref(), interval))?;

    Ok(SchedulerHandle { thread })
}

fn run<P: DigitalPort, C: Clock>(
    state: &ScheduleState,
    output: &Mutex<P>,
    clock: &C,
    interval: Duration,
) {
    let _active = ActiveTask::enter(state);
    let mut driven: Option<Level> = None;

    while state.is_running() {
        let level = Level::from(should_be_on(
            clock.minutes_of_day(),
            state.start_minutes(),
            u32::from(state.preset().minutes()),
        ));

        if driven != Some(level) {
            lock_port(output).write(level);
            info!("light output toggled {}", level.as_str());
            driven = Some(level);
        }

        thread::sleep(interval);
    }
}

pub(crate) fn lock_port<P>(output: &Mutex<P>) -> MutexGuard<'_, P> {
    output.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ActiveTask<'a> {
    state: &'a ScheduleState,
}

impl<'a> ActiveTask<'a> {
    fn enter(state: &'a ScheduleState) -> Self {
        state.active_tasks.fetch_add(1, Ordering::AcqRel);
        Self { state }
    }
}

impl Drop for ActiveTask<'_> {
    fn drop(&mut self) {
        self.state.active_tasks.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::ManualClock;
    use crate::port::{Direction, Pull};

    #[derive(Default)]
    struct RecordingOutput {
        writes: Vec<Level>,
    }

    impl DigitalPort for RecordingOutput {
        fn configure(&mut self, _direction: Direction, _pull: Pull) {}

        fn write(&mut self, level: Level) {
            self.writes.push(level);
        }

        fn read(&mut self) -> Level {
            self.writes.last().copied().unwrap_or(Level::Low)
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn preset_toggle_flips_between_values() {
        let state = ScheduleState::new(DurationPreset::Long);

        assert_eq!(state.toggle_preset(), DurationPreset::Short);
        assert_eq!(state.preset(), DurationPreset::Short);
        assert_eq!(state.toggle_preset(), DurationPreset::Long);
        assert_eq!(state.preset(), DurationPreset::Long);
    }

    #[test]
    fn disarm_restores_previous_start() {
        let state = ScheduleState::new(DurationPreset::Long);
        state.arm(StartTime::from_minutes(6 * 60).unwrap());

        let previous = state.arm(StartTime::from_minutes(18 * 60).unwrap());
        assert_eq!(previous, 6 * 60);
        assert!(state.is_running());

        state.disarm(previous);
        assert_eq!(state.start_minutes(), 6 * 60);
        assert!(!state.is_running());
    }

    #[test]
    fn task_follows_clock_and_filters_repeated_levels() {
        let state = Arc::new(ScheduleState::new(DurationPreset::Short));
        state.arm(StartTime::from_minutes(6 * 60).unwrap());

        let output = Arc::new(Mutex::new(RecordingOutput::default()));
        let clock = Arc::new(ManualClock::new(7 * 60));

        let handle = spawn(
            state.clone(),
            output.clone(),
            clock.clone(),
            Duration::from_millis(1),
        )
        .unwrap();

        assert!(wait_for(|| lock_port(&output).writes == vec![Level::High]));

        // 06:00 + 12h closes at 18:00
        clock.set(18 * 60 + 5);
        assert!(wait_for(|| lock_port(&output).writes.len() == 2));

        handle.stop(&state);

        assert_eq!(lock_port(&output).writes, vec![Level::High, Level::Low]);
        assert_eq!(state.active_tasks(), 0);
        assert!(!state.is_running());
    }

    #[test]
    fn task_exits_immediately_when_not_running() {
        let state = Arc::new(ScheduleState::new(DurationPreset::Long));
        let output = Arc::new(Mutex::new(RecordingOutput::default()));

        let handle = spawn(
            state.clone(),
            output.clone(),
            Arc::new(ManualClock::new(0)),
            Duration::from_millis(1),
        )
        .unwrap();
        handle.stop(&state);

        assert!(lock_port(&output).writes.is_empty());
        assert_eq!(state.active_tasks(), 0);
    }
}
