//! Confirmation phase: poll status until the requested commitment is observed
//!
//! Polling is a pure read, so calling [`ConfirmationTracker::confirm`] again
//! for the same identifier (after a timeout, say) is always safe.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cancel::CancellationSignal;
use crate::errors::SubmitError;
use crate::ledger::LedgerRpc;
use crate::metrics::{metrics, Timer};
use crate::retry::{sleep_unless_cancelled, RetryPolicy};
use crate::types::{CommitmentLevel, LedgerStatus, Phase, TransactionId};

/// Polls the ledger for a transaction's commitment level
#[derive(Clone)]
pub struct ConfirmationTracker {
    ledger: Arc<dyn LedgerRpc>,
    policy: RetryPolicy,
    treat_execution_error_as_pending: bool,
}

impl std::fmt::Debug for ConfirmationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationTracker")
            .field("endpoint", &self.ledger.endpoint())
            .field("policy", &self.policy)
            .field(
                "treat_execution_error_as_pending",
                &self.treat_execution_error_as_pending,
            )
            .finish()
    }
}

impl ConfirmationTracker {
    pub fn new(ledger: Arc<dyn LedgerRpc>, policy: RetryPolicy) -> Self {
        Self {
            ledger,
            policy,
            treat_execution_error_as_pending: false,
        }
    }

    /// Keep polling after an execution error instead of failing the phase
    pub fn treat_execution_error_as_pending(mut self, enabled: bool) -> Self {
        self.treat_execution_error_as_pending = enabled;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Same ledger and flags, different budget
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            policy,
            treat_execution_error_as_pending: self.treat_execution_error_as_pending,
        }
    }

    /// Wait until `id` reaches at least `commitment`
    ///
    /// Returns the observed level, which may be stronger than requested.
    pub async fn confirm(
        &self,
        id: &TransactionId,
        commitment: CommitmentLevel,
        cancel: &CancellationSignal,
    ) -> Result<CommitmentLevel, SubmitError> {
        let max_polls = self.policy.attempts();
        let endpoint = self.ledger.endpoint();
        let timer = Timer::new();
        let mut last_rejection: Option<String> = None;

        for poll in 1..=max_polls {
            if cancel.is_cancelled() {
                return Err(cancelled(id));
            }

            metrics().confirm_polls.inc();
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(id)),
                status = self.ledger.get_status(id) => status,
            };

            match status {
                Ok(LedgerStatus::ConfirmedAt(level)) if commitment.is_satisfied_by(level) => {
                    timer.observe_duration(&metrics().confirm_latency);
                    info!(
                        signature = %id,
                        observed = %level,
                        requested = %commitment,
                        polls = poll,
                        "Transaction confirmed"
                    );
                    return Ok(level);
                }
                Ok(LedgerStatus::ConfirmedAt(level)) => {
                    debug!(
                        signature = %id,
                        observed = %level,
                        requested = %commitment,
                        poll,
                        max_polls,
                        "Commitment below requested level"
                    );
                }
                Ok(LedgerStatus::Pending) => {
                    debug!(signature = %id, poll, max_polls, "Transaction not yet visible");
                }
                Ok(LedgerStatus::ExecutionFailed { reason }) => {
                    if !self.treat_execution_error_as_pending {
                        warn!(signature = %id, reason = %reason, "Transaction rejected on-ledger");
                        return Err(SubmitError::TransactionRejected {
                            id: *id,
                            reason,
                        });
                    }
                    debug!(
                        signature = %id,
                        reason = %reason,
                        poll,
                        "Execution error reported; polling continues"
                    );
                    last_rejection = Some(reason);
                }
                Err(err) => {
                    metrics()
                        .confirm_poll_errors
                        .with_label_values(&[err.kind()])
                        .inc();
                    warn!(
                        signature = %id,
                        poll,
                        max_polls,
                        endpoint,
                        transient = err.is_transient(),
                        error = %err,
                        "Status query failed"
                    );
                }
            }

            if let Some(delay) = self.policy.delay_after(poll) {
                if !sleep_unless_cancelled(delay, cancel).await {
                    return Err(cancelled(id));
                }
            }
        }

        metrics().confirm_timeouts.inc();
        warn!(
            signature = %id,
            polls = max_polls,
            requested = %commitment,
            last_rejection = last_rejection.as_deref(),
            "Confirmation not observed within budget"
        );
        Err(SubmitError::ConfirmationTimeout {
            id: *id,
            polls: max_polls,
        })
    }
}

fn cancelled(id: &TransactionId) -> SubmitError {
    SubmitError::Cancelled {
        id: Some(*id),
        phase: Phase::Confirmation,
    }
}
