//! `LedgerRpc` backed by the Solana nonblocking JSON-RPC client

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcRequest;
use solana_rpc_client_api::config::RpcSendTransactionConfig;
use solana_sdk::hash::Hash;
use solana_transaction_status::{
    TransactionConfirmationStatus, TransactionStatus, UiTransactionEncoding,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::LedgerRpc;
use crate::config::RpcConfig;
use crate::errors::TransportError;
use crate::tx_builder::{BlockhashSource, TransactionBuilderError};
use crate::types::{CommitmentLevel, LedgerStatus, TransactionId, ValueError};

/// Node-side options attached to every `sendTransaction`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Skip the node's preflight simulation
    pub skip_preflight: bool,
    /// Commitment used by preflight simulation
    pub preflight_commitment: Option<CommitmentLevel>,
    /// How many times the node itself rebroadcasts; `None` leaves the node default
    pub node_max_retries: Option<usize>,
}

/// Production ledger client
///
/// Wraps a single pooled `RpcClient`; cloning is cheap and clones share the
/// connection pool.
#[derive(Clone)]
pub struct SolanaLedgerClient {
    client: Arc<RpcClient>,
    endpoint: String,
    send_options: SendOptions,
    search_transaction_history: bool,
}

impl std::fmt::Debug for SolanaLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaLedgerClient")
            .field("endpoint", &self.endpoint)
            .field("send_options", &self.send_options)
            .field("search_transaction_history", &self.search_transaction_history)
            .finish_non_exhaustive()
    }
}

impl SolanaLedgerClient {
    pub fn new(url: impl Into<String>) -> Self {
        let endpoint = url.into();
        Self {
            client: Arc::new(RpcClient::new(endpoint.clone())),
            endpoint,
            send_options: SendOptions::default(),
            search_transaction_history: false,
        }
    }

    /// Build from the `rpc` configuration section
    pub fn from_config(config: &RpcConfig) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            config
                .preflight_commitment
                .unwrap_or_default()
                .to_commitment_config(),
        );
        Self {
            client: Arc::new(client),
            endpoint: config.url.clone(),
            send_options: SendOptions {
                skip_preflight: config.skip_preflight,
                preflight_commitment: config.preflight_commitment,
                node_max_retries: config.node_max_retries,
            },
            search_transaction_history: config.search_transaction_history,
        }
    }

    pub fn with_send_options(mut self, send_options: SendOptions) -> Self {
        self.send_options = send_options;
        self
    }

    /// Also consult the node's long-term history when polling status
    pub fn with_transaction_history(mut self, enabled: bool) -> Self {
        self.search_transaction_history = enabled;
        self
    }

    fn send_config(&self) -> RpcSendTransactionConfig {
        RpcSendTransactionConfig {
            skip_preflight: self.send_options.skip_preflight,
            preflight_commitment: self.send_options.preflight_commitment.map(Into::into),
            encoding: Some(UiTransactionEncoding::Base64),
            max_retries: self.send_options.node_max_retries,
            ..Default::default()
        }
    }
}

/// Map one signature status entry onto the engine's view
fn classify_status(status: Option<TransactionStatus>) -> LedgerStatus {
    let Some(status) = status else {
        return LedgerStatus::Pending;
    };

    if let Some(err) = status.err {
        return LedgerStatus::ExecutionFailed {
            reason: err.to_string(),
        };
    }

    let level = match status.confirmation_status {
        Some(TransactionConfirmationStatus::Finalized) => CommitmentLevel::Finalized,
        Some(TransactionConfirmationStatus::Confirmed) => CommitmentLevel::Confirmed,
        Some(TransactionConfirmationStatus::Processed) => CommitmentLevel::Processed,
        // Older nodes omit confirmationStatus; a missing confirmation count means rooted
        None => match status.confirmations {
            None => CommitmentLevel::Finalized,
            Some(0) => CommitmentLevel::Processed,
            Some(_) => CommitmentLevel::Confirmed,
        },
    };
    LedgerStatus::ConfirmedAt(level)
}

#[async_trait]
impl LedgerRpc for SolanaLedgerClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, len = tx_bytes.len()))]
    async fn submit_raw(&self, tx_bytes: &[u8]) -> Result<TransactionId, TransportError> {
        let encoded = BASE64_STANDARD.encode(tx_bytes);
        let params = serde_json::json!([encoded, self.send_config()]);

        let signature: String = self
            .client
            .send(RpcRequest::SendTransaction, params)
            .await
            .map_err(|e| TransportError::from_client_error(e, &self.endpoint))?;

        debug!(signature = %signature, "sendTransaction accepted");

        signature
            .parse()
            .map_err(|e: ValueError| TransportError::MalformedResponse {
                endpoint: self.endpoint.clone(),
                message: e.to_string(),
            })
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, signature = %id))]
    async fn get_status(&self, id: &TransactionId) -> Result<LedgerStatus, TransportError> {
        let signatures = [*id.as_signature()];
        let response = if self.search_transaction_history {
            self.client
                .get_signature_statuses_with_history(&signatures)
                .await
        } else {
            self.client.get_signature_statuses(&signatures).await
        }
        .map_err(|e| TransportError::from_client_error(e, &self.endpoint))?;

        let status = response.value.into_iter().next().flatten();
        Ok(classify_status(status))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BlockhashSource for SolanaLedgerClient {
    async fn latest_blockhash(&self) -> Result<Hash, TransactionBuilderError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| TransactionBuilderError::Blockhash(e.to_string()))
    }
}
