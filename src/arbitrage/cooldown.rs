//! Dispatch Cooldown - Minimum spacing between execution attempts
//!
//! Purpose:
//!     Every dispatch attempt, successful or not, arms a cooldown window.
//!     Until it expires the dispatcher refuses further attempts. With failure
//!     backoff enabled, consecutive failures stretch the window so a broken
//!     execution path is not retried every cycle.
//!
//! Author: AI-Generated
//! Created: 2026-02-03
//!
//! Design:
//!     - Base window: `interval` after each attempt (0 = disabled)
//!     - Failure backoff: interval -> 5x -> 25x -> ... capped at `max_backoff`
//!     - On success: window drops back to the base interval
//!     - `reset()` forgets everything (engine restart)

use std::time::{Duration, Instant};
use tracing::debug;

/// Escalation multiplier per consecutive failure (5x each step)
const ESCALATION_FACTOR: u32 = 5;

/// Engine-wide cooldown between dispatch attempts
#[derive(Debug, Clone)]
pub struct DispatchCooldown {
    interval: Duration,
    /// Ceiling for failure backoff. `None` keeps the window at `interval`.
    max_backoff: Option<Duration>,
    consecutive_failures: u32,
    window: Duration,
    last_attempt: Option<Instant>,
}

impl DispatchCooldown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_backoff: None,
            consecutive_failures: 0,
            window: interval,
            last_attempt: None,
        }
    }

    /// Enable escalating backoff after failures, capped at `max`.
    pub fn with_failure_backoff(mut self, max: Option<Duration>) -> Self {
        self.max_backoff = max.map(|m| m.max(self.interval));
        self
    }

    /// Time left before the next attempt is allowed. `None` when clear.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_attempt?;
        let expires_at = last + self.window;
        (now < expires_at).then(|| expires_at - now)
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.remaining(now).is_some()
    }

    /// Current window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm the cooldown after a successful attempt.
    pub fn record_success(&mut self, now: Instant) {
        if self.consecutive_failures > 0 {
            debug!("Dispatch cooldown reset after {} failures", self.consecutive_failures);
        }
        self.consecutive_failures = 0;
        self.window = self.interval;
        self.last_attempt = Some(now);
    }

    /// Arm the cooldown after a failed attempt, escalating if backoff is on.
    /// Escalation: interval -> interval x5 -> interval x25 -> ... -> max_backoff
    pub fn record_failure(&mut self, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_attempt = Some(now);

        let Some(max) = self.max_backoff else {
            self.window = self.interval;
            return;
        };
        let factor = ESCALATION_FACTOR.saturating_pow(self.consecutive_failures.saturating_sub(1));
        self.window = self.interval.saturating_mul(factor).min(max);

        debug!(
            "Dispatch cooldown: fail #{} | {}ms",
            self.consecutive_failures,
            self.window.as_millis()
        );
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.window = self.interval;
        self.last_attempt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_no_cooldown_initially() {
        let cd = DispatchCooldown::new(ms(1000));
        assert!(!cd.is_active(Instant::now()));
    }

    #[test]
    fn test_cooldown_after_attempt() {
        let mut cd = DispatchCooldown::new(ms(1000));
        let t0 = Instant::now();
        cd.record_success(t0);

        assert_eq!(cd.remaining(t0 + ms(500)), Some(ms(500)));
        assert!(cd.is_active(t0 + ms(999)));
        assert!(!cd.is_active(t0 + ms(1000)));
    }

    #[test]
    fn test_failure_without_backoff_keeps_interval() {
        let mut cd = DispatchCooldown::new(ms(1000));
        let t0 = Instant::now();
        cd.record_failure(t0);
        cd.record_failure(t0);
        assert_eq!(cd.window(), ms(1000));
        assert_eq!(cd.consecutive_failures(), 2);
    }

    #[test]
    fn test_escalating_backoff() {
        let mut cd = DispatchCooldown::new(ms(1000)).with_failure_backoff(Some(ms(60_000)));
        let t0 = Instant::now();

        cd.record_failure(t0);
        assert_eq!(cd.window(), ms(1000));
        cd.record_failure(t0);
        assert_eq!(cd.window(), ms(5000));
        cd.record_failure(t0);
        assert_eq!(cd.window(), ms(25_000));
        // capped
        cd.record_failure(t0);
        assert_eq!(cd.window(), ms(60_000));
        cd.record_failure(t0);
        assert_eq!(cd.window(), ms(60_000));

        assert!(cd.is_active(t0 + ms(59_999)));
        assert!(!cd.is_active(t0 + ms(60_000)));
    }

    #[test]
    fn test_success_resets_backoff() {
        let mut cd = DispatchCooldown::new(ms(1000)).with_failure_backoff(Some(ms(60_000)));
        let t0 = Instant::now();
        cd.record_failure(t0);
        cd.record_failure(t0);
        assert_eq!(cd.window(), ms(5000));

        cd.record_success(t0 + ms(6000));
        assert_eq!(cd.window(), ms(1000));
        assert_eq!(cd.consecutive_failures(), 0);
        assert!(!cd.is_active(t0 + ms(7000)));
    }

    #[test]
    fn test_disabled_when_zero() {
        let mut cd = DispatchCooldown::new(Duration::ZERO);
        let t0 = Instant::now();
        cd.record_success(t0);
        assert!(!cd.is_active(t0));
    }

    #[test]
    fn test_reset_clears_window() {
        let mut cd = DispatchCooldown::new(ms(1000));
        let t0 = Instant::now();
        cd.record_success(t0);
        cd.reset();
        assert!(!cd.is_active(t0));
    }
}
