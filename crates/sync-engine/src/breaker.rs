// crates/sync-engine/src/breaker.rs
//! Circuit breaker around the remote store

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are skipped until the cooldown has passed
    Open,
    /// One trial request is allowed through
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
}

/// Stops calling the remote after repeated transport failures
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    state: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            state: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
            })),
        }
    }

    /// Gets the current state
    pub fn state(&self) -> CircuitState {
        self.state.lock().map(|s| s.state).unwrap_or(CircuitState::Open)
    }

    /// Whether a request may go out now.
    ///
    /// An open breaker whose cooldown has elapsed turns half-open and lets one
    /// request through.
    pub fn allow(&self) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };

        match state.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => false,
            CircuitState::Open => {
                let cooled = state
                    .opened_at
                    .is_none_or(|opened| opened.elapsed() >= self.cooldown);
                if cooled {
                    log::info!("Circuit half-open, sending one trial request");
                    state.state = CircuitState::HalfOpen;
                }
                cooled
            }
        }
    }

    /// Records an answered request
    pub fn record_success(&self) {
        if let Ok(mut state) = self.state.lock() {
            if state.state != CircuitState::Closed {
                log::info!("Remote reachable again, circuit closed");
            }
            state.state = CircuitState::Closed;
            state.failure_count = 0;
            state.opened_at = None;
        }
    }

    /// Records a transport failure
    pub fn record_failure(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.failure_count = state.failure_count.saturating_add(1);

            let trip = state.state == CircuitState::HalfOpen
                || state.failure_count >= self.failure_threshold;
            if trip {
                if state.state != CircuitState::Open {
                    log::warn!(
                        "Circuit opened after {} consecutive failure(s), pausing sync for {:?}",
                        state.failure_count,
                        self.cooldown
                    );
                }
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
        }
    }

    /// Resets the circuit breaker to closed state
    pub fn reset(&self) {
        self.record_success();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(30));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow());
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(30));

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow());
    }

    #[test]
    fn test_success_resets_count() {
        let cb = CircuitBreaker::new(2, Duration::from_secs(30));
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_allows_one_trial() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10));
        cb.record_failure();
        assert!(!cb.allow());

        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(!cb.allow());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_failed_trial_reopens() {
        let cb = CircuitBreaker::new(5, Duration::from_millis(10));
        for _ in 0..5 {
            cb.record_failure();
        }
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow());
    }

    #[test]
    fn test_reset() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(60));
        cb.record_failure();
        cb.reset();
        assert!(cb.allow());
    }
}
