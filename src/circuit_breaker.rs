//! # Circuit Breaker Module
//!
//! Stops calling the OCR engine after repeated failures and lets it recover.
//!
//! ```text
//! CLOSED ──failures ≥ threshold──► OPEN ──reset timeout──► CLOSED
//! ```
//!
//! The scale retry controller creates one breaker per analysis. While it is
//! open the remaining scale attempts of that analysis fail fast with
//! `OcrError::Unavailable` and are recorded like any other failed attempt.
//! Other analyses are never affected.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::ocr_config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStatus {
    Closed,
    Open,
}

/// Circuit breaker for OCR operations
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: RecoveryConfig,
}

impl CircuitBreaker {
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    /// Whether requests should be blocked.
    ///
    /// Once the reset timeout has elapsed since the last failure the counters
    /// are cleared and the next request is let through.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock();
        if state.failure_count < self.config.circuit_breaker_threshold {
            return false;
        }
        match state.last_failure_time {
            Some(last_time)
                if last_time.elapsed()
                    < Duration::from_secs(self.config.circuit_breaker_reset_secs) =>
            {
                true
            }
            _ => {
                *state = BreakerState::default();
                false
            }
        }
    }

    pub fn status(&self) -> BreakerStatus {
        if self.is_open() {
            BreakerStatus::Open
        } else {
            BreakerStatus::Closed
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
    }

    pub fn record_success(&self) {
        *self.state.lock() = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(RecoveryConfig {
            circuit_breaker_threshold: threshold,
            ..Default::default()
        })
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = breaker(2);
        assert!(!cb.is_open());
        cb.record_failure();
        assert!(!cb.is_open());
        cb.record_failure();
        assert!(cb.is_open());
        assert_eq!(cb.status(), BreakerStatus::Open);
    }

    #[test]
    fn test_success_closes() {
        let cb = breaker(1);
        cb.record_failure();
        assert!(cb.is_open());
        cb.record_success();
        assert!(!cb.is_open());
        assert_eq!(cb.failure_count(), 0);
    }
}
