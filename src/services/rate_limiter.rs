use std::time::Duration;
use tokio::time::Instant;

/// Upstream allows 30 requests/minute; stay under it
pub const REQUEST_CEILING: u32 = 25;
pub const WINDOW: Duration = Duration::from_secs(60);
pub const COOLDOWN: Duration = Duration::from_secs(60);

/// Requests issued in the current rolling window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindowState {
    pub request_count: u32,
    pub window_start: Instant,
}

/// What the scheduler should do before the next fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Open,
    /// Pause for the given duration, call [`RateLimiter::reset`], then skip this pass
    Cooling(Duration),
}

/// Rolling one-minute request budget.
/// Never fails, only tells the caller to wait.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    state: RateWindowState,
    ceiling: u32,
    window: Duration,
    cooldown: Duration,
}

impl RateLimiter {
    pub fn new(now: Instant) -> Self {
        Self::with_limits(now, REQUEST_CEILING, WINDOW, COOLDOWN)
    }

    pub fn with_limits(now: Instant, ceiling: u32, window: Duration, cooldown: Duration) -> Self {
        Self {
            state: RateWindowState {
                request_count: 0,
                window_start: now,
            },
            ceiling,
            window,
            cooldown,
        }
    }

    /// Roll the window if it has elapsed, then decide whether a request may go out
    pub fn check(&mut self, now: Instant) -> RateDecision {
        if now.saturating_duration_since(self.state.window_start) >= self.window {
            self.reset(now);
        }

        if self.state.request_count >= self.ceiling {
            RateDecision::Cooling(self.cooldown)
        } else {
            RateDecision::Open
        }
    }

    /// Start a fresh window, used after a cooldown
    pub fn reset(&mut self, now: Instant) {
        self.state = RateWindowState {
            request_count: 0,
            window_start: now,
        };
    }

    /// One unit of upstream budget spent
    pub fn record_request(&mut self) {
        self.state.request_count = self.state.request_count.saturating_add(1);
    }

    pub fn state(&self) -> RateWindowState {
        self.state
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }
}
