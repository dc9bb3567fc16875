//! Error types for the transaction builder
//!
//! Builder failures happen before anything touches the network, so every
//! variant here means the transaction was never delivered.

use solana_sdk::signature::SignerError;
use thiserror::Error;

use crate::types::ValueError;

/// Failure to produce a signed, network-ready transaction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionBuilderError {
    /// Could not obtain a recent blockhash
    ///
    /// Typically a transient RPC failure; rebuilding later may succeed.
    #[error("Blockhash error: {0}")]
    Blockhash(String),

    /// A required signer was not supplied
    #[error("Missing signer for required account {0}")]
    MissingSigner(String),

    /// A supplied signer failed to produce a signature
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Request has no instructions or is otherwise unusable
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Builder configuration is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Signed transaction could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl TransactionBuilderError {
    /// Check if rebuilding later might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Blockhash(_) => true,
            Self::MissingSigner(_) => false,
            Self::Signing(_) => false,
            Self::InvalidRequest(_) => false,
            Self::Configuration(_) => false,
            Self::Encoding(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Blockhash(_) => "blockhash",
            Self::MissingSigner(_) | Self::Signing(_) => "signing",
            Self::InvalidRequest(_) => "request",
            Self::Configuration(_) => "config",
            Self::Encoding(_) => "encoding",
        }
    }
}

impl From<SignerError> for TransactionBuilderError {
    fn from(err: SignerError) -> Self {
        Self::Signing(err.to_string())
    }
}

impl From<ValueError> for TransactionBuilderError {
    fn from(err: ValueError) -> Self {
        Self::Encoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransactionBuilderError::MissingSigner("Feepayer111".to_string());
        assert_eq!(err.to_string(), "Missing signer for required account Feepayer111");
    }

    #[test]
    fn test_error_retryability() {
        assert!(TransactionBuilderError::Blockhash("rpc down".to_string()).is_retryable());
        assert!(!TransactionBuilderError::Signing("test".to_string()).is_retryable());
        assert!(!TransactionBuilderError::InvalidRequest("test".to_string()).is_retryable());
    }

    #[test]
    fn test_signer_error_conversion() {
        let err: TransactionBuilderError = SignerError::InvalidInput("bad key".to_string()).into();
        match err {
            TransactionBuilderError::Signing(msg) => assert!(msg.contains("bad key")),
            other => panic!("Expected Signing variant, got {:?}", other),
        }
        assert_eq!(
            TransactionBuilderError::MissingSigner("x".to_string()).category(),
            "signing"
        );
    }
}
