//! Consecutive-failure-count circuit breaker guarding the canonicalizer's
//! LLM fallback call (spec §4.3).
//!
//! Unlike a sliding-window breaker that trips on an error *rate* over a
//! time window, this one trips on `failure_threshold` *consecutive*
//! failures — a single stray success resets the counter, matching spec
//! §4.3's "N consecutive failures" wording exactly.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::CircuitBreakerConfig;

/// Current state of a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through; failures accumulate toward `failure_threshold`.
    Closed,
    /// Calls are rejected until `recovery_timeout_secs` elapses.
    Open,
    /// One trial call is allowed; its outcome decides `Closed` or `Open`.
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_trial_in_flight: bool,
}

/// A consecutive-failure-count circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

/// The outcome of a call wrapped by [`CircuitBreaker::call`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the call was never attempted.
    Open,
    /// The call was attempted and the inner operation failed.
    Inner(E),
}

impl CircuitBreaker {
    /// Build a breaker starting `Closed`.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                half_open_trial_in_flight: false,
            }),
        }
    }

    /// Current state, advancing `Open` to `HalfOpen` if the recovery timeout
    /// has elapsed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        self.maybe_recover(&mut inner);
        inner.state
    }

    fn maybe_recover(&self, inner: &mut Inner) {
        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= Duration::from_secs(self.config.recovery_timeout_secs) {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_trial_in_flight = false;
                }
            }
        }
    }

    /// Whether a call may proceed right now. `HalfOpen` allows exactly one
    /// concurrent trial.
    fn allow_request(&self, inner: &mut Inner) -> bool {
        self.maybe_recover(inner);
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.half_open_trial_in_flight {
                    false
                } else {
                    inner.half_open_trial_in_flight = true;
                    true
                }
            }
        }
    }

    fn record_success(&self, inner: &mut Inner) {
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.half_open_trial_in_flight = false;
    }

    fn record_failure(&self, inner: &mut Inner) {
        inner.half_open_trial_in_flight = false;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.consecutive_failures = self.config.failure_threshold;
            }
            _ => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
        }
    }

    /// Run `op` if the circuit allows it, tracking the outcome. Never holds
    /// the internal lock across the `await`.
    pub async fn call<F, Fut, T, E>(&self, op: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
            if !self.allow_request(&mut inner) {
                return Err(CircuitBreakerError::Open);
            }
        }

        match op().await {
            Ok(value) => {
                let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
                self.record_success(&mut inner);
                Ok(value)
            }
            Err(err) => {
                let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
                self.record_failure(&mut inner);
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout_secs: 0,
        }
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures_reaches_threshold() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        }
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn a_single_success_resets_the_consecutive_failure_counter() {
        let breaker = CircuitBreaker::new(config());
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        let _ = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        for _ in 0..2 {
            let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn open_circuit_rejects_calls_without_invoking_them() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout_secs: 3600,
        });
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        let mut invoked = false;
        let result = breaker
            .call(|| {
                invoked = true;
                async { Ok::<_, &str>(()) }
            })
            .await;
        assert!(!invoked);
        assert_eq!(result, Err(CircuitBreakerError::Open));
    }

    #[tokio::test]
    async fn half_open_success_closes_the_circuit() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        }
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        let result = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_the_circuit() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        }
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
