use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Elapsed display time of the active story, measured against its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTimer {
    #[serde(with = "crate::serde_duration")]
    elapsed: Duration,
    #[serde(with = "crate::serde_duration")]
    limit: Duration,
}

impl ProgressTimer {
    pub fn new(limit: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            limit,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn is_up(&self) -> bool {
        self.elapsed >= self.limit
    }

    /// Progress in `[0, 100]`; `100` only transiently, before the owner resets.
    pub fn percent(&self) -> f32 {
        if self.limit.is_zero() {
            return 0.0;
        }
        let ratio = self.elapsed.as_secs_f64() / self.limit.as_secs_f64();
        (ratio * 100.0).min(100.0) as f32
    }

    pub fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.limit);
    }
}

/// Handle for a recurring timer. At most one deadline is armed at a time; re-arming
/// drops the previous schedule, so a torn-down interval can never fire late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimer {
    period: Duration,
    next_due: Option<Instant>,
}

impl IntervalTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn arm(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    pub fn disarm(&mut self) {
        self.next_due = None;
    }

    /// Consumes one due firing and schedules the following one.
    pub fn fire_if_due(&mut self, now: Instant) -> Option<Instant> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        self.next_due = Some(due + self.period);
        Some(due)
    }
}

/// A deferred release: engaged until a fixed instant, then free again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cooldown {
    until: Option<Instant>,
}

impl Cooldown {
    pub fn engage(&mut self, now: Instant, window: Duration) {
        self.until = Some(now + window);
    }

    pub fn clear(&mut self) {
        self.until = None;
    }

    pub fn until(&self) -> Option<Instant> {
        self.until
    }

    pub fn is_engaged(&self) -> bool {
        self.until.is_some()
    }

    /// Returns `true` if this call released the cooldown.
    pub fn release_if_due(&mut self, now: Instant) -> bool {
        match self.until {
            Some(until) if now >= until => {
                self.until = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&mut self, now: Instant) -> bool {
        self.release_if_due(now);
        self.is_engaged()
    }
}
