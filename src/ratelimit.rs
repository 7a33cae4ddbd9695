//! Rate limiting for producer-side diagnostics
//!
//! Owned by the stream context and touched only from the delivery path, so
//! it needs no atomics or locks.

use std::time::{Duration, Instant};

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateCheck {
    /// Emit the message; `suppressed` messages were swallowed since the
    /// previous window closed
    Allowed { suppressed: u64 },
    /// Swallow the message
    Suppressed,
}

/// Fixed-window limiter: at most `burst` messages per `interval`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    burst: u32,
    window_start: Option<Instant>,
    emitted: u32,
    suppressed: u64,
    total_suppressed: u64,
}

impl RateLimiter {
    pub fn new(interval: Duration, burst: u32) -> Self {
        Self {
            interval,
            burst,
            window_start: None,
            emitted: 0,
            suppressed: 0,
            total_suppressed: 0,
        }
    }

    pub fn check(&mut self) -> RateCheck {
        self.check_at(Instant::now())
    }

    pub fn check_at(&mut self, now: Instant) -> RateCheck {
        let mut reported = 0;
        let expired = match self.window_start {
            Some(start) => now.saturating_duration_since(start) >= self.interval,
            None => true,
        };
        if expired {
            self.window_start = Some(now);
            self.emitted = 0;
            reported = std::mem::take(&mut self.suppressed);
        }

        if self.emitted < self.burst {
            self.emitted += 1;
            RateCheck::Allowed { suppressed: reported }
        } else {
            self.suppressed += 1;
            self.total_suppressed += 1;
            RateCheck::Suppressed
        }
    }

    /// Messages swallowed since creation.
    pub fn total_suppressed(&self) -> u64 {
        self.total_suppressed
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_suppress_then_report() {
        let mut limiter = RateLimiter::new(Duration::from_millis(100), 2);
        let t0 = Instant::now();

        assert_eq!(limiter.check_at(t0), RateCheck::Allowed { suppressed: 0 });
        assert_eq!(limiter.check_at(t0), RateCheck::Allowed { suppressed: 0 });
        assert_eq!(limiter.check_at(t0), RateCheck::Suppressed);
        assert_eq!(limiter.check_at(t0 + Duration::from_millis(50)), RateCheck::Suppressed);

        let later = t0 + Duration::from_millis(100);
        assert_eq!(limiter.check_at(later), RateCheck::Allowed { suppressed: 2 });
        assert_eq!(limiter.check_at(later), RateCheck::Allowed { suppressed: 0 });
        assert_eq!(limiter.total_suppressed(), 2);
    }

    #[test]
    fn zero_burst_suppresses_everything() {
        let mut limiter = RateLimiter::new(Duration::from_secs(1), 0);
        assert_eq!(limiter.check(), RateCheck::Suppressed);
        assert_eq!(limiter.check(), RateCheck::Suppressed);
        assert_eq!(limiter.total_suppressed(), 2);
    }
}
