//! Error taxonomy for submission and confirmation
//!
//! `TransportError` covers a single failed network call and never leaves the
//! retry loops on its own. `SubmitError` is the terminal classification a
//! caller sees once a phase gives up.

use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::RpcError;
use thiserror::Error;

use crate::types::{Phase, TransactionId};

/// JSON-RPC code a node returns while it lags the cluster
const NODE_UNHEALTHY: i64 = -32005;

/// Failure of one call to the ledger endpoint
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The call did not complete within the client timeout
    #[error("Timeout (endpoint: {endpoint}): {message}")]
    Timeout { endpoint: String, message: String },

    /// Connection refused, reset, DNS failure and similar
    #[error("Connection error (endpoint: {endpoint}): {message}")]
    Connection { endpoint: String, message: String },

    /// The node answered with a JSON-RPC error object
    #[error("RPC response error (endpoint: {endpoint}, code: {code:?}): {message}")]
    RpcResponse {
        endpoint: String,
        code: Option<i64>,
        message: String,
    },

    /// The node answered with something we could not decode
    #[error("Malformed response (endpoint: {endpoint}): {message}")]
    MalformedResponse { endpoint: String, message: String },
}

impl TransportError {
    /// Network-level failure, as opposed to a node-side rejection of the call
    ///
    /// Both kinds are retried within budget; the distinction only feeds logs
    /// and metrics.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout { .. } => true,
            TransportError::Connection { .. } => true,
            TransportError::MalformedResponse { .. } => true,
            // Node is behind or unhealthy. HTTP 429 and 5xx never get here;
            // they arrive through the HTTP client and classify as `Connection`
            TransportError::RpcResponse { code, .. } => *code == Some(NODE_UNHEALTHY),
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            TransportError::Timeout { endpoint, .. }
            | TransportError::Connection { endpoint, .. }
            | TransportError::RpcResponse { endpoint, .. }
            | TransportError::MalformedResponse { endpoint, .. } => endpoint,
        }
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout { .. } => "timeout",
            TransportError::Connection { .. } => "connection",
            TransportError::RpcResponse { .. } => "rpc_response",
            TransportError::MalformedResponse { .. } => "malformed_response",
        }
    }

    /// Classify an RPC client failure
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        let endpoint = endpoint.to_string();
        match err.kind() {
            ClientErrorKind::Reqwest(e) if e.is_timeout() => TransportError::Timeout {
                endpoint,
                message: e.to_string(),
            },
            ClientErrorKind::Reqwest(e) if e.is_decode() => TransportError::MalformedResponse {
                endpoint,
                message: e.to_string(),
            },
            ClientErrorKind::Reqwest(e) => TransportError::Connection {
                endpoint,
                message: e.to_string(),
            },
            ClientErrorKind::Io(e) => TransportError::Connection {
                endpoint,
                message: e.to_string(),
            },
            ClientErrorKind::SerdeJson(e) => TransportError::MalformedResponse {
                endpoint,
                message: e.to_string(),
            },
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
                TransportError::RpcResponse {
                    endpoint,
                    code: Some(*code),
                    message: message.clone(),
                }
            }
            ClientErrorKind::RpcError(RpcError::ParseError(message)) => {
                TransportError::MalformedResponse {
                    endpoint,
                    message: message.clone(),
                }
            }
            _ => Self::from_message(err.to_string(), endpoint),
        }
    }

    /// Fallback classification on the rendered error text
    fn from_message(message: String, endpoint: String) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("timed out") || lower.contains("timeout") {
            TransportError::Timeout { endpoint, message }
        } else if lower.contains("connection") || lower.contains("connect") {
            TransportError::Connection { endpoint, message }
        } else {
            TransportError::RpcResponse {
                endpoint,
                code: None,
                message,
            }
        }
    }
}

/// Terminal failure of a submission or confirmation phase
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// Every delivery attempt failed; the transaction may still have reached a node
    #[error("Submission exhausted after {attempts} attempts: {last_error}")]
    SubmissionExhausted {
        attempts: u32,
        last_error: TransportError,
    },

    /// Delivered, but the requested commitment was not observed within budget
    #[error("Confirmation of {id} not observed after {polls} polls")]
    ConfirmationTimeout { id: TransactionId, polls: u32 },

    /// The ledger executed the transaction and rejected it
    #[error("Transaction {id} rejected: {reason}")]
    TransactionRejected { id: TransactionId, reason: String },

    /// The caller cancelled the wait
    #[error("Cancelled during {phase}")]
    Cancelled {
        id: Option<TransactionId>,
        phase: Phase,
    },
}

impl SubmitError {
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            SubmitError::SubmissionExhausted { .. } => None,
            SubmitError::ConfirmationTimeout { id, .. } => Some(id),
            SubmitError::TransactionRejected { id, .. } => Some(id),
            SubmitError::Cancelled { id, .. } => id.as_ref(),
        }
    }

    /// Whether the caller can conclude the transaction did not take effect
    pub fn is_definitive(&self) -> bool {
        matches!(self, SubmitError::TransactionRejected { .. })
    }
}
