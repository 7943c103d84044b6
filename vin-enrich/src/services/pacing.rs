//! Clock and request pacing
//!
//! The registry asks clients to leave a few seconds between requests. All
//! waiting in the pipeline (request spacing and retry backoff) goes through
//! the [`Clock`] and [`CallPacer`] seams so tests can run without real
//! wall-clock delays.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source of time and sleeping
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by tokio timers
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        vin_common::time::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test clock: sleeping advances virtual time instantly and is recorded
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move virtual time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        self.advance(duration);
    }
}

/// Gate in front of every registry request start
#[async_trait]
pub trait CallPacer: Send + Sync {
    /// Wait until the next request may start
    async fn until_ready(&self);

    /// Minimum gap enforced between request starts
    fn spacing(&self) -> Duration;
}

/// Production pacer: token bucket of one permit per spacing period
///
/// The first request goes out immediately; each later request waits until
/// `spacing` has passed since the previous permit. A zero spacing disables
/// pacing entirely.
pub struct GovernorPacer {
    limiter: Option<DefaultDirectRateLimiter>,
    spacing: Duration,
}

impl GovernorPacer {
    pub fn new(spacing: Duration) -> Self {
        let limiter = Quota::with_period(spacing).map(RateLimiter::direct);
        Self { limiter, spacing }
    }
}

#[async_trait]
impl CallPacer for GovernorPacer {
    async fn until_ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    fn spacing(&self) -> Duration {
        if self.limiter.is_some() {
            self.spacing
        } else {
            Duration::ZERO
        }
    }
}

/// Pacer that enforces spacing through a [`Clock`]
///
/// Start times are reserved under a short lock before sleeping, so the lock
/// is never held across an await.
pub struct ClockPacer {
    clock: Arc<dyn Clock>,
    spacing: Duration,
    next_start: Mutex<Option<DateTime<Utc>>>,
}

impl ClockPacer {
    pub fn new(clock: Arc<dyn Clock>, spacing: Duration) -> Self {
        Self {
            clock,
            spacing,
            next_start: Mutex::new(None),
        }
    }
}

#[async_trait]
impl CallPacer for ClockPacer {
    async fn until_ready(&self) {
        let spacing =
            chrono::Duration::from_std(self.spacing).unwrap_or(chrono::Duration::zero());
        let now = self.clock.now();

        let wait = {
            let mut next = self.next_start.lock().unwrap_or_else(|e| e.into_inner());
            let start = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(start + spacing);
            (start - now).to_std().unwrap_or(Duration::ZERO)
        };

        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Pacing registry request");
            self.clock.sleep(wait).await;
        }
    }

    fn spacing(&self) -> Duration {
        self.spacing
    }
}

/// Pacer that never waits
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

#[async_trait]
impl CallPacer for NoPacing {
    async fn until_ready(&self) {}

    fn spacing(&self) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Instant;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_manual_clock_records_sleeps() {
        let clock = ManualClock::new(start());
        clock.sleep(Duration::from_secs(3)).await;
        clock.sleep(Duration::from_secs(6)).await;

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(3), Duration::from_secs(6)]
        );
        assert_eq!(clock.now(), start() + chrono::Duration::seconds(9));
    }

    #[tokio::test]
    async fn test_clock_pacer_spaces_consecutive_starts() {
        let clock = Arc::new(ManualClock::new(start()));
        let pacer = ClockPacer::new(clock.clone(), Duration::from_secs(3));

        pacer.until_ready().await; // first request is immediate
        pacer.until_ready().await;
        pacer.until_ready().await;

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(3), Duration::from_secs(3)]
        );
    }

    #[tokio::test]
    async fn test_clock_pacer_credits_elapsed_time() {
        let clock = Arc::new(ManualClock::new(start()));
        let pacer = ClockPacer::new(clock.clone(), Duration::from_secs(3));

        pacer.until_ready().await;
        clock.advance(Duration::from_secs(2));
        pacer.until_ready().await;
        clock.advance(Duration::from_secs(10));
        pacer.until_ready().await;

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
    }

    #[tokio::test]
    async fn test_governor_pacer_first_permit_immediate() {
        let pacer = GovernorPacer::new(Duration::from_secs(3));

        let started = Instant::now();
        pacer.until_ready().await;
        assert!(
            started.elapsed().as_millis() < 100,
            "First request should be immediate, took {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn test_governor_pacer_waits_for_period() {
        let pacer = GovernorPacer::new(Duration::from_millis(300));

        pacer.until_ready().await;
        let started = Instant::now();
        pacer.until_ready().await;
        let waited = started.elapsed();

        assert!(
            waited.as_millis() >= 250,
            "Second request should wait ~300ms, took {:?}",
            waited
        );
    }

    #[tokio::test]
    async fn test_zero_spacing_disables_governor() {
        let pacer = GovernorPacer::new(Duration::ZERO);
        assert_eq!(pacer.spacing(), Duration::ZERO);

        let started = Instant::now();
        for _ in 0..5 {
            pacer.until_ready().await;
        }
        assert!(started.elapsed().as_millis() < 100);
    }
}
