//! Reliable transaction submission and confirmation for Solana
//!
//! A signed transaction is delivered with a bounded retry budget, then its
//! status is polled until the requested commitment level is observed. Every
//! cycle ends in exactly one [`SubmissionOutcome`]; an outcome the client
//! cannot determine is reported as such and never guessed.

pub mod cancel;
pub mod config;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod retry;
pub mod submitter;
pub mod tracker;
pub mod tx_builder;
pub mod types;

pub use cancel::{cancellation_pair, CancellationHandle, CancellationSignal};
pub use config::{Config, ConfigError};
pub use engine::{SubmitEngine, SubmitOptions};
pub use errors::{SubmitError, TransportError};
pub use ledger::{LedgerRpc, SolanaLedgerClient};
pub use retry::{RetryPolicy, RetryPolicyError};
pub use submitter::SubmissionCoordinator;
pub use tracker::ConfirmationTracker;
pub use tx_builder::{InstructionTxBuilder, TransactionBuilder, TransactionRequest};
pub use types::{
    AccountKey, Amount, CommitmentLevel, LedgerStatus, SignedTransaction, SubmissionOutcome,
    TransactionId,
};

#[cfg(test)]
mod tests;
