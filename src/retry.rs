//! Retry budget and delay schedule shared by both phases
//!
//! Each phase owns its own `RetryPolicy`; nothing is shared between the
//! submission and confirmation budgets.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::cancel::CancellationSignal;

/// Rejected `RetryPolicy` values
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RetryPolicyError {
    #[error("max_attempts must be > 0")]
    ZeroAttempts,

    #[error("max_delay_ms ({max_delay_ms}) must be >= base_delay_ms ({base_delay_ms})")]
    DelayBounds { base_delay_ms: u64, max_delay_ms: u64 },

    #[error("multiplier must be >= 1.0, got {0}")]
    InvalidMultiplier(f64),

    #[error("jitter_factor must be within 0.0..=1.0, got {0}")]
    InvalidJitter(f64),
}

/// Attempt budget plus exponential backoff with jitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any single delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays (1.0 = fixed delay)
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Jitter factor (0.0 - 1.0)
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    2_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter_factor() -> f64 {
    0.1
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::submission()
    }
}

impl RetryPolicy {
    /// Default budget for delivering a transaction
    pub fn submission() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }

    /// Default budget for status polling; `base_delay_ms` is the poll interval
    pub fn confirmation() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 8_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }

    /// Constant delay between attempts, no jitter
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        let delay_ms = delay.as_millis() as u64;
        Self {
            max_attempts,
            base_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Zero delay; used where backoff would only slow tests down
    pub fn immediate(max_attempts: u32) -> Self {
        Self::fixed(max_attempts, Duration::ZERO)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Effective attempt count; a zero budget still makes one attempt
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the given failed attempt (1-indexed)
    ///
    /// Returns `None` once the budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.attempts() {
            return None;
        }

        let exp = (attempt - 1).min(30) as i32;
        let delay_ms = self.base_delay_ms as f64 * self.multiplier.max(1.0).powi(exp);
        let capped = delay_ms.min(self.max_delay_ms as f64);

        let jitter = self.jitter_factor.clamp(0.0, 1.0);
        let jittered = if jitter > 0.0 && capped > 0.0 {
            let range = capped * jitter;
            capped + rand::thread_rng().gen_range(-range..=range)
        } else {
            capped
        };

        Some(Duration::from_millis(jittered.max(0.0) as u64))
    }

    /// Validate policy values
    pub fn validate(&self) -> Result<(), RetryPolicyError> {
        if self.max_attempts == 0 {
            return Err(RetryPolicyError::ZeroAttempts);
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(RetryPolicyError::DelayBounds {
                base_delay_ms: self.base_delay_ms,
                max_delay_ms: self.max_delay_ms,
            });
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(RetryPolicyError::InvalidMultiplier(self.multiplier));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(RetryPolicyError::InvalidJitter(self.jitter_factor));
        }
        Ok(())
    }
}

/// Sleep for `delay`, returning `false` if cancelled first
pub(crate) async fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationSignal) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
