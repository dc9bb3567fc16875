//! Caller-facing submission engine
//!
//! Runs one cycle: submit, then confirm, then classify. Each cycle is
//! independent; many may run concurrently over one shared ledger client.

use solana_sdk::signer::signers::Signers;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::cancel::CancellationSignal;
use crate::config::Config;
use crate::errors::SubmitError;
use crate::ledger::LedgerRpc;
use crate::metrics::{metrics, InFlightGuard, Timer};
use crate::observability::{cycle_span, CorrelationId};
use crate::retry::RetryPolicy;
use crate::submitter::SubmissionCoordinator;
use crate::tracker::ConfirmationTracker;
use crate::tx_builder::{TransactionBuilder, TransactionBuilderError, TransactionRequest};
use crate::types::{CommitmentLevel, SignedTransaction, SubmissionOutcome, TransactionId};

/// Per-call overrides; anything unset falls back to the engine defaults
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub commitment: Option<CommitmentLevel>,
    pub submission_policy: Option<RetryPolicy>,
    pub confirmation_policy: Option<RetryPolicy>,
    pub cancel: Option<CancellationSignal>,
    pub correlation_id: Option<CorrelationId>,
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commitment(mut self, commitment: CommitmentLevel) -> Self {
        self.commitment = Some(commitment);
        self
    }

    pub fn with_submission_policy(mut self, policy: RetryPolicy) -> Self {
        self.submission_policy = Some(policy);
        self
    }

    pub fn with_confirmation_policy(mut self, policy: RetryPolicy) -> Self {
        self.confirmation_policy = Some(policy);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// Submits signed transactions and waits for their confirmation
#[derive(Debug, Clone)]
pub struct SubmitEngine {
    submitter: SubmissionCoordinator,
    tracker: ConfirmationTracker,
    default_commitment: CommitmentLevel,
}

impl SubmitEngine {
    /// Engine with default budgets: 3 submission attempts, 3 polls, `Processed`
    pub fn new(ledger: Arc<dyn LedgerRpc>) -> Self {
        Self {
            submitter: SubmissionCoordinator::new(Arc::clone(&ledger), RetryPolicy::submission()),
            tracker: ConfirmationTracker::new(ledger, RetryPolicy::confirmation()),
            default_commitment: CommitmentLevel::default(),
        }
    }

    /// Engine with budgets and flags from configuration
    pub fn from_config(ledger: Arc<dyn LedgerRpc>, config: &Config) -> Self {
        Self {
            submitter: SubmissionCoordinator::new(Arc::clone(&ledger), config.submission.clone()),
            tracker: ConfirmationTracker::new(ledger, config.confirmation.retry.clone())
                .treat_execution_error_as_pending(
                    config.confirmation.treat_execution_error_as_pending,
                ),
            default_commitment: config.confirmation.commitment,
        }
    }

    pub fn with_default_commitment(mut self, commitment: CommitmentLevel) -> Self {
        self.default_commitment = commitment;
        self
    }

    pub fn default_commitment(&self) -> CommitmentLevel {
        self.default_commitment
    }

    /// Submission phase only
    pub async fn submit(
        &self,
        tx: &SignedTransaction,
        cancel: &CancellationSignal,
    ) -> Result<TransactionId, SubmitError> {
        self.submitter.submit(tx, cancel).await
    }

    /// Confirmation phase only; safe to repeat for the same identifier
    pub async fn confirm(
        &self,
        id: &TransactionId,
        commitment: CommitmentLevel,
        cancel: &CancellationSignal,
    ) -> Result<CommitmentLevel, SubmitError> {
        self.tracker.confirm(id, commitment, cancel).await
    }

    /// Full cycle: deliver `tx`, then wait for the requested commitment
    pub async fn submit_and_confirm(
        &self,
        tx: &SignedTransaction,
        options: SubmitOptions,
    ) -> SubmissionOutcome {
        let commitment = options.commitment.unwrap_or(self.default_commitment);
        let correlation_id = options.correlation_id.clone().unwrap_or_default();
        let span = cycle_span(&correlation_id, commitment.as_str());

        self.run_cycle(tx, commitment, options)
            .instrument(span)
            .await
    }

    async fn run_cycle(
        &self,
        tx: &SignedTransaction,
        commitment: CommitmentLevel,
        options: SubmitOptions,
    ) -> SubmissionOutcome {
        let _in_flight = InFlightGuard::enter();
        let timer = Timer::new();
        let cancel = options.cancel.unwrap_or_default();

        let submitter = match options.submission_policy {
            Some(policy) => self.submitter.with_policy(policy),
            None => self.submitter.clone(),
        };
        let tracker = match options.confirmation_policy {
            Some(policy) => self.tracker.with_policy(policy),
            None => self.tracker.clone(),
        };

        let result = match submitter.submit(tx, &cancel).await {
            Ok(id) => {
                tracing::Span::current().record("signature", tracing::field::display(&id));
                tracker
                    .confirm(&id, commitment, &cancel)
                    .await
                    .map(|level| (id, level))
            }
            Err(err) => Err(err),
        };

        let outcome = SubmissionOutcome::from_result(result);
        timer.observe_duration(&metrics().cycle_latency);
        metrics()
            .outcomes
            .with_label_values(&[outcome.kind()])
            .inc();
        log_outcome(&outcome, timer.elapsed_secs());
        outcome
    }

    /// Build a signed transaction, then run a full cycle with it
    ///
    /// Builder failures are returned before anything is sent.
    pub async fn build_and_submit<B, S>(
        &self,
        builder: &B,
        request: &TransactionRequest,
        signers: &S,
        options: SubmitOptions,
    ) -> Result<SubmissionOutcome, TransactionBuilderError>
    where
        B: TransactionBuilder + ?Sized,
        S: Signers + Sync + ?Sized,
    {
        let tx = builder.build_signed(request, signers).await?;
        Ok(self.submit_and_confirm(&tx, options).await)
    }
}

fn log_outcome(outcome: &SubmissionOutcome, elapsed_secs: f64) {
    let elapsed_ms = (elapsed_secs * 1_000.0) as u64;
    match outcome {
        SubmissionOutcome::Confirmed { id, level } => {
            info!(signature = %id, level = %level, elapsed_ms, "Cycle confirmed");
        }
        SubmissionOutcome::Rejected { id, reason } => {
            warn!(signature = %id, reason = %reason, elapsed_ms, "Cycle rejected");
        }
        SubmissionOutcome::Indeterminate { id, cause } => {
            let signature = id.map(|id| id.to_string()).unwrap_or_default();
            warn!(
                signature = %signature,
                cause = %cause,
                elapsed_ms,
                "Cycle outcome indeterminate; transaction may still land"
            );
        }
        SubmissionOutcome::Cancelled { id } => {
            let signature = id.map(|id| id.to_string()).unwrap_or_default();
            info!(
                signature = %signature,
                elapsed_ms,
                "Cycle cancelled"
            );
        }
    }
}
