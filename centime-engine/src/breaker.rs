//! Circuit breaker guarding calls to the shared cache tier and backing store.
//!
//! Closed: calls pass, consecutive failures counted. Open: calls rejected
//! fast for a cooldown. HalfOpen: exactly one trial call; success closes the
//! circuit, failure re-opens it and the cooldown restarts.

use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Error surfaced by a breaker-guarded call.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// Rejected fast; the underlying call was not attempted.
    #[error("circuit open; call rejected")]
    Open,
    #[error(transparent)]
    Inner(E),
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Operational counters, all monotonic.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BreakerStats {
    pub state: CircuitState,
    pub rejected_calls: u64,
    pub times_opened: u64,
    pub recoveries: u64,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: u32,
    cooldown: Duration,
    rejected_calls: AtomicU64,
    times_opened: AtomicU64,
    recoveries: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
            failure_threshold: failure_threshold.max(1),
            cooldown,
            rejected_calls: AtomicU64::new(0),
            times_opened: AtomicU64::new(0),
            recoveries: AtomicU64::new(0),
        }
    }

    /// Run `f` if the circuit admits it, recording the outcome.
    pub fn call<T, E, F>(&self, f: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if !self.admit() {
            self.rejected_calls.fetch_add(1, Ordering::Relaxed);
            return Err(BreakerError::Open);
        }

        match f() {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(BreakerError::Inner(err))
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        // Drive the Open -> HalfOpen transition on observation too.
        let mut inner = self.lock();
        self.maybe_enter_half_open(&mut inner);
        inner.state
    }

    pub fn stats(&self) -> BreakerStats {
        BreakerStats {
            state: self.state(),
            rejected_calls: self.rejected_calls.load(Ordering::Relaxed),
            times_opened: self.times_opened.load(Ordering::Relaxed),
            recoveries: self.recoveries.load(Ordering::Relaxed),
        }
    }

    fn admit(&self) -> bool {
        let mut inner = self.lock();
        self.maybe_enter_half_open(&mut inner);
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    fn maybe_enter_half_open(&self, inner: &mut BreakerInner) {
        if inner.state == CircuitState::Open {
            let cooled = inner
                .opened_at
                .map(|at| at.elapsed() >= self.cooldown)
                .unwrap_or(true);
            if cooled {
                inner.state = CircuitState::HalfOpen;
                inner.probe_in_flight = false;
                debug!("circuit half-open; admitting one trial call");
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            self.recoveries.fetch_add(1, Ordering::Relaxed);
            debug!("circuit closed after successful trial call");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                // Failed trial: back to open, cooldown restarts.
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_in_flight = false;
                self.times_opened.fetch_add(1, Ordering::Relaxed);
                warn!("trial call failed; circuit re-opened");
            }
            _ => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold
                    && inner.state == CircuitState::Closed
                {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    self.times_opened.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        failures = inner.consecutive_failures,
                        "failure threshold reached; circuit opened"
                    );
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().expect("circuit breaker lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn failing_call() -> Result<(), &'static str> {
        Err("backend down")
    }

    #[test]
    fn opens_after_threshold_and_rejects_fast() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        let attempts = AtomicU32::new(0);

        for _ in 0..3 {
            let _ = breaker.call(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                failing_call()
            });
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        // Underlying dependency is no longer invoked.
        let res: Result<(), _> = breaker.call(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            failing_call()
        });
        assert!(matches!(res, Err(BreakerError::Open)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(breaker.stats().rejected_calls, 1);
        assert_eq!(breaker.stats().times_opened, 1);
    }

    #[test]
    fn half_open_trial_success_closes() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        let _ = breaker.call(|| failing_call());
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let res: Result<u8, BreakerError<&str>> = breaker.call(|| Ok(7));
        assert!(res.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.stats().recoveries, 1);

        // Failure count was reset: one new failure does not immediately
        // re-trip at a higher threshold.
        let breaker = CircuitBreaker::new(2, Duration::from_millis(10));
        let _ = breaker.call(|| failing_call());
        let _: Result<u8, BreakerError<&str>> = breaker.call(|| Ok(1));
        let _ = breaker.call(|| failing_call());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_trial_failure_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        let _ = breaker.call(|| failing_call());
        std::thread::sleep(Duration::from_millis(15));
        let _ = breaker.call(|| failing_call());
        assert_eq!(breaker.stats().times_opened, 2);

        // Cooldown restarted: still rejecting.
        let res: Result<(), _> = breaker.call(|| failing_call());
        assert!(matches!(res, Err(BreakerError::Open)));
    }

    #[test]
    fn half_open_admits_exactly_one_probe() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(5));
        let _ = breaker.call(|| failing_call());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // First probe admitted, second rejected while the first is "in flight".
        assert!(breaker.admit());
        assert!(!breaker.admit());
    }
}
