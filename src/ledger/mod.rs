//! Ledger RPC collaborator
//!
//! The engine only needs two calls from the network: deliver raw bytes and
//! ask for a transaction's status. Both go through [`LedgerRpc`] so the
//! retry loops can be driven by the Solana client in production and by
//! scripted fakes in tests.

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::types::{LedgerStatus, TransactionId};

pub mod solana;

pub use solana::{SendOptions, SolanaLedgerClient};

/// Network endpoint able to accept and report on transactions
///
/// Implementations must be stateless from the caller's point of view so one
/// instance can be shared across concurrent cycles.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Deliver an already-signed payload verbatim
    async fn submit_raw(&self, tx_bytes: &[u8]) -> Result<TransactionId, TransportError>;

    /// Query the settlement status of a previously delivered transaction
    async fn get_status(&self, id: &TransactionId) -> Result<LedgerStatus, TransportError>;

    /// Endpoint label used in logs
    fn endpoint(&self) -> &str {
        "unknown"
    }
}
