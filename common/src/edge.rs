use log::debug;

use crate::port::{DigitalPort, Direction, Level, Pull};

/// Edge-only reporting over an input [`DigitalPort`].
///
/// `poll` takes `&mut self`: a detector has exactly one caller, the poll loop.
pub struct EdgeDetector<P> {
    name: &'static str,
    pin: i32,
    port: P,
    last_level: Level,
}

impl<P: DigitalPort> EdgeDetector<P> {
    pub fn new(name: &'static str, pin: i32, mut port: P, pull: Pull) -> Self {
        port.configure(Direction::Input, pull);
        Self {
            name,
            pin,
            port,
            last_level: Level::Low,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn last_level(&self) -> Level {
        self.last_level
    }

    /// Reads the port once and returns `true` iff the level differs from the
    /// previous read.
    pub fn poll(&mut self) -> bool {
        let level = self.port.read();
        if level == self.last_level {
            return false;
        }

        self.last_level = level;
        debug!(
            "input [{}] ({}) toggled {}",
            self.name,
            self.pin,
            level.as_str()
        );
        true
    }
}
