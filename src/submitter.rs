//! Submission phase: deliver a signed payload until the network accepts it
//!
//! The same bytes are resent on every attempt, so a retry can never create a
//! second, different transaction. Transport failures are absorbed, logged and
//! counted; only budget exhaustion or cancellation ends the phase without an
//! identifier.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::cancel::CancellationSignal;
use crate::errors::{SubmitError, TransportError};
use crate::ledger::LedgerRpc;
use crate::metrics::{metrics, Timer};
use crate::retry::{sleep_unless_cancelled, RetryPolicy};
use crate::types::{Phase, SignedTransaction, TransactionId};

/// Delivers signed transactions with a bounded retry budget
#[derive(Clone)]
pub struct SubmissionCoordinator {
    ledger: Arc<dyn LedgerRpc>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for SubmissionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionCoordinator")
            .field("endpoint", &self.ledger.endpoint())
            .field("policy", &self.policy)
            .finish()
    }
}

impl SubmissionCoordinator {
    pub fn new(ledger: Arc<dyn LedgerRpc>, policy: RetryPolicy) -> Self {
        Self { ledger, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Same ledger, different budget
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            policy,
        }
    }

    /// Deliver `tx`, returning the identifier the network assigned
    pub async fn submit(
        &self,
        tx: &SignedTransaction,
        cancel: &CancellationSignal,
    ) -> Result<TransactionId, SubmitError> {
        let max_attempts = self.policy.attempts();
        let endpoint = self.ledger.endpoint();
        let timer = Timer::new();
        let start = Instant::now();
        let mut last_error: Option<TransportError> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            debug!(
                attempt,
                max_attempts,
                endpoint,
                len = tx.len(),
                "Submitting transaction"
            );
            metrics().submit_attempts.inc();

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                result = self.ledger.submit_raw(tx.as_bytes()) => result,
            };

            match result {
                Ok(id) => {
                    timer.observe_duration(&metrics().submit_latency);
                    if let Some(expected) = tx.expected_id() {
                        if expected != &id {
                            warn!(
                                expected = %expected,
                                returned = %id,
                                endpoint,
                                "Network returned a different signature than the payload carries"
                            );
                        }
                    }
                    debug!(
                        signature = %id,
                        attempts = attempt,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Transaction accepted"
                    );
                    return Ok(id);
                }
                Err(err) => {
                    metrics()
                        .submit_failures
                        .with_label_values(&[err.kind()])
                        .inc();

                    let backoff = self.policy.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        endpoint,
                        transient = err.is_transient(),
                        backoff_ms = backoff.map(|d| d.as_millis() as u64),
                        error = %err,
                        "Submission attempt failed"
                    );
                    last_error = Some(err);

                    if let Some(delay) = backoff {
                        if !sleep_unless_cancelled(delay, cancel).await {
                            return Err(cancelled());
                        }
                    }
                }
            }
        }

        metrics().submit_exhausted.inc();
        let last_error = last_error.unwrap_or_else(|| TransportError::Connection {
            endpoint: endpoint.to_string(),
            message: "no attempt completed".to_string(),
        });
        warn!(
            attempts = max_attempts,
            endpoint,
            error = %last_error,
            "All submission attempts exhausted"
        );
        Err(SubmitError::SubmissionExhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

fn cancelled() -> SubmitError {
    SubmitError::Cancelled {
        id: None,
        phase: Phase::Submission,
    }
}
