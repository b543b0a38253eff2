use std::time::Duration;

use instant::Instant;
use serde::{Deserialize, Serialize};


pub const DEFAULT_MOVE_TIME_LIMIT: Duration = Duration::from_secs(60);

// Advertised to clients at game start. The move-by-move clock enforcement lives
// with the sweeper, which cares only about the per-move limit.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TimeControl {
    pub initial: u32,    // seconds
    pub increment: u32,  // seconds
}

impl Default for TimeControl {
    fn default() -> Self {
        TimeControl { initial: 600, increment: 5 }
    }
}

// Tracks when the side to move last changed.
#[derive(Clone, Copy, Debug)]
pub struct MoveClock {
    last_move: Instant,
}

impl MoveClock {
    pub fn new(now: Instant) -> Self {
        MoveClock { last_move: now }
    }

    pub fn register_move(&mut self, now: Instant) {
        self.last_move = std::cmp::max(self.last_move, now);
    }

    pub fn is_stale(&self, now: Instant, limit: Duration) -> bool {
        now.saturating_duration_since(self.last_move) > limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staleness_threshold() {
        let t0 = Instant::now();
        let mut clock = MoveClock::new(t0);
        let limit = Duration::from_secs(60);
        assert!(!clock.is_stale(t0 + Duration::from_secs(60), limit));
        assert!(clock.is_stale(t0 + Duration::from_secs(61), limit));
        clock.register_move(t0 + Duration::from_secs(61));
        assert!(!clock.is_stale(t0 + Duration::from_secs(121), limit));
        assert!(clock.is_stale(t0 + Duration::from_secs(122), limit));
    }
}
