pub mod clock;
pub mod config;
pub mod controller;
pub mod edge;
pub mod poll;
pub mod port;
pub mod schedule;
pub mod scheduler;
pub mod types;

pub use clock::{Clock, LocalClock, ManualClock};
pub use config::ControllerConfig;
pub use controller::{Event, LightController, Outcome};
pub use edge::EdgeDetector;
pub use poll::{PollLoop, TickReport};
pub use port::{DigitalPort, Direction, Level, Pull};
pub use schedule::{minutes_since_midnight, parse_start_time, should_be_on, StartTime, TimeStringError};
pub use scheduler::ScheduleState;
pub use types::{ControllerState, DurationPreset, LONG_DURATION_MINUTES, SHORT_DURATION_MINUTES};
