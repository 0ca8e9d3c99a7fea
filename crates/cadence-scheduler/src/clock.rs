//! Time sources for the scheduler.
//!
//! Fire times are wall-clock `DateTime<Utc>` values, but the scheduler never
//! reads the system clock directly: every component goes through a [`Clock`]
//! so tests can drive time deterministically.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::time::Instant;

/// Time provider used by the scheduler loop and control API.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;

    /// Resolve once `now() >= deadline`.
    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

/// Wall-clock time anchored to tokio's monotonic clock.
///
/// `now()` is the UTC time at construction plus the monotonic time elapsed
/// since, so it never jumps backwards and follows tokio's paused clock in
/// tests.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin_utc: DateTime<Utc>,
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin_utc: Utc::now(),
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.origin.elapsed()).unwrap_or_default();
        self.origin_utc + elapsed
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let remaining = deadline - self.now();
        if let Ok(remaining) = remaining.to_std() {
            tokio::time::sleep(remaining).await;
        }
    }
}

/// Clock that only moves when [`ManualClock::advance`] or
/// [`ManualClock::set`] is called.
#[derive(Debug)]
pub struct ManualClock {
    now: watch::Sender<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        let (now, _) = watch::channel(start);
        Self { now }
    }

    pub fn advance(&self, by: TimeDelta) {
        self.now.send_modify(|now| *now += by);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.now.send_replace(to);
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.borrow()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let mut rx = self.now.subscribe();
        // The sender lives as long as `self`, so `changed` only fails after drop.
        while *rx.borrow_and_update() < deadline {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_clock_follows_tokio_time() {
        let clock = MonotonicClock::new();
        let start = clock.now();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(clock.now() - start, TimeDelta::seconds(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_sleep_until() {
        let clock = MonotonicClock::new();
        let deadline = clock.now() + TimeDelta::milliseconds(1500);

        clock.sleep_until(deadline).await;
        assert!(clock.now() >= deadline);
    }

    #[tokio::test]
    async fn test_monotonic_sleep_until_past_deadline_returns() {
        let clock = MonotonicClock::new();
        let deadline = clock.now() - TimeDelta::seconds(10);
        clock.sleep_until(deadline).await;
    }

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.advance(TimeDelta::minutes(3));
        assert_eq!(clock.now(), start + TimeDelta::minutes(3));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_wakes_on_advance() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));

        let sleeper = {
            let clock = clock.clone();
            tokio::spawn(async move {
                clock.sleep_until(start + TimeDelta::seconds(10)).await;
            })
        };

        tokio::task::yield_now().await;
        clock.advance(TimeDelta::seconds(4));
        tokio::task::yield_now().await;
        assert!(!sleeper.is_finished());

        clock.advance(TimeDelta::seconds(6));
        tokio::time::timeout(Duration::from_secs(1), sleeper)
            .await
            .unwrap()
            .unwrap();
    }
}
