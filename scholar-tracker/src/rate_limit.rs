//! Minimum-interval rate limiter shared by the scroll throttle and the
//! cross-type emission debounce.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// True when at least `min_interval` has passed since the last mark.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Check and mark in one step. Returns false (and leaves the limiter
    /// untouched) when called inside the window.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.is_ready(now) {
            self.mark(now);
            true
        } else {
            false
        }
    }

    pub fn last(&self) -> Option<Instant> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_call_is_always_ready() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        assert!(limiter.is_ready(Instant::now()));
    }

    #[test]
    fn test_try_acquire_blocks_inside_window() {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(Duration::from_millis(2000));

        assert!(limiter.try_acquire(start));
        assert!(!limiter.try_acquire(start + Duration::from_millis(1999)));
        // A rejected attempt does not move the window.
        assert!(limiter.try_acquire(start + Duration::from_millis(2000)));
        assert_eq!(limiter.last(), Some(start + Duration::from_millis(2000)));
    }

    #[test]
    fn test_is_ready_does_not_mark() {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(Duration::from_secs(5));
        limiter.mark(start);

        assert!(!limiter.is_ready(start + Duration::from_secs(4)));
        assert!(!limiter.is_ready(start + Duration::from_secs(4)));
        assert!(limiter.is_ready(start + Duration::from_secs(5)));
    }
}
