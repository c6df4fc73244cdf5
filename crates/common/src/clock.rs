use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of timestamps for publish, retrieval and send times
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that starts at a fixed instant and moves forward by `step` on every read
#[derive(Debug)]
pub struct SteppingClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    /// Jump forward without producing a reading
    pub fn advance(&self, by: Duration) {
        *self.current.lock() += by;
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.current.lock();
        let now = *current;
        *current += self.step;
        now
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stepping_clock_is_strictly_increasing() {
        let start = Utc::now();
        let clock = SteppingClock::new(start, Duration::seconds(1));
        let a = clock.now();
        let b = clock.now();
        assert_eq!(a, start);
        assert_eq!(b - a, Duration::seconds(1));

        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now() - b, Duration::seconds(1) + Duration::minutes(5));
    }
}
