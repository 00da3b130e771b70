use std::time::{Duration, Instant};

pub const DEFAULT_INPUT_COOLDOWN: Duration = Duration::from_millis(50);

/// Rate limit for input polling: open at most once per `interval`.
///
/// Never sleeps. A closed cooldown reopens on its own once `interval` has
/// passed since it was last taken.
#[derive(Debug, Clone)]
pub struct Cooldown {
    interval: Duration,
    ready_at: Option<Instant>,
}

impl Cooldown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ready_at: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Take the cooldown if it is open at `now`; returns whether it was taken.
    pub fn try_begin(&mut self, now: Instant) -> bool {
        if let Some(ready_at) = self.ready_at {
            if now < ready_at {
                return false;
            }
        }
        self.ready_at = Some(now + self.interval);
        true
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.ready_at.is_some_and(|ready_at| now < ready_at)
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_COOLDOWN)
    }
}
