//! Core value types shared by the submission and confirmation phases
//!
//! Everything here is immutable once constructed. Payloads and identifiers
//! are cheap to clone so that concurrent cycles never share mutable state.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel as SolanaCommitmentLevel},
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, VersionedTransaction},
};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::errors::SubmitError;

/// Errors raised while constructing one of the value types in this module
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    /// A signed transaction payload must carry at least one byte
    #[error("Signed transaction payload is empty")]
    EmptyPayload,

    /// Transaction could not be encoded to wire bytes
    #[error("Failed to encode transaction: {0}")]
    Encode(String),

    /// Fixed-width value received the wrong number of bytes
    #[error("Invalid length for {kind}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Text could not be decoded into the target value
    #[error("Invalid {kind}: {reason}")]
    Parse { kind: &'static str, reason: String },
}

/// An already-signed, network-ready transaction payload
///
/// The bytes are shared behind an `Arc` and never mutated; every retry
/// resends exactly the same buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    bytes: Arc<[u8]>,
    expected_id: Option<TransactionId>,
}

impl SignedTransaction {
    /// Wrap an opaque, already-serialized payload
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, ValueError> {
        let bytes: Vec<u8> = bytes.into();
        if bytes.is_empty() {
            return Err(ValueError::EmptyPayload);
        }
        Ok(Self {
            bytes: Arc::from(bytes),
            expected_id: None,
        })
    }

    /// Encode a signed versioned transaction to its wire form
    pub fn from_versioned(tx: &VersionedTransaction) -> Result<Self, ValueError> {
        let bytes = bincode::serialize(tx).map_err(|e| ValueError::Encode(e.to_string()))?;
        let mut signed = Self::from_bytes(bytes)?;
        signed.expected_id = tx.signatures.first().copied().map(TransactionId::from);
        Ok(signed)
    }

    /// Encode a signed legacy transaction to its wire form
    pub fn from_legacy(tx: &Transaction) -> Result<Self, ValueError> {
        let bytes = bincode::serialize(tx).map_err(|e| ValueError::Encode(e.to_string()))?;
        let mut signed = Self::from_bytes(bytes)?;
        signed.expected_id = tx.signatures.first().copied().map(TransactionId::from);
        Ok(signed)
    }

    /// Raw wire bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Identifier the network is expected to assign, when known locally
    ///
    /// Only available for payloads built from a decoded transaction; the
    /// identifier returned by the network remains authoritative.
    pub fn expected_id(&self) -> Option<&TransactionId> {
        self.expected_id.as_ref()
    }
}

impl fmt::Debug for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTransaction")
            .field("len", &self.bytes.len())
            .field("expected_id", &self.expected_id)
            .finish()
    }
}

/// Network-assigned transaction identifier (the first transaction signature)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(Signature);

impl TransactionId {
    pub fn as_signature(&self) -> &Signature {
        &self.0
    }
}

impl From<Signature> for TransactionId {
    fn from(signature: Signature) -> Self {
        Self(signature)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signature::from_str(s.trim())
            .map(Self)
            .map_err(|e| ValueError::Parse {
                kind: "transaction id",
                reason: e.to_string(),
            })
    }
}

/// Settlement strength, ordered weakest to strongest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentLevel {
    /// Seen and processed by the node that answered
    #[default]
    Processed,
    /// Voted on by a supermajority of the cluster
    Confirmed,
    /// Rooted; irreversible
    Finalized,
}

impl CommitmentLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitmentLevel::Processed => "processed",
            CommitmentLevel::Confirmed => "confirmed",
            CommitmentLevel::Finalized => "finalized",
        }
    }

    /// Whether an observed level satisfies this requested level
    pub fn is_satisfied_by(&self, observed: CommitmentLevel) -> bool {
        observed >= *self
    }

    pub fn to_commitment_config(self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.into(),
        }
    }
}

impl From<CommitmentLevel> for SolanaCommitmentLevel {
    fn from(level: CommitmentLevel) -> Self {
        match level {
            CommitmentLevel::Processed => SolanaCommitmentLevel::Processed,
            CommitmentLevel::Confirmed => SolanaCommitmentLevel::Confirmed,
            CommitmentLevel::Finalized => SolanaCommitmentLevel::Finalized,
        }
    }
}

impl fmt::Display for CommitmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitmentLevel {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" | "recent" => Ok(CommitmentLevel::Processed),
            "confirmed" | "single" | "singlegossip" => Ok(CommitmentLevel::Confirmed),
            "finalized" | "max" | "root" => Ok(CommitmentLevel::Finalized),
            other => Err(ValueError::Parse {
                kind: "commitment level",
                reason: format!("unknown level '{}'", other),
            }),
        }
    }
}

/// Answer to one status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerStatus {
    /// Not (yet) known to the node
    Pending,
    /// Executed successfully and attested at the given level
    ConfirmedAt(CommitmentLevel),
    /// Executed and rejected by on-ledger program logic
    ExecutionFailed { reason: String },
}

/// Which half of a cycle an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Submission,
    Confirmation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Submission => f.write_str("submission"),
            Phase::Confirmation => f.write_str("confirmation"),
        }
    }
}

/// Terminal result of one submission + confirmation cycle
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// Observed at or above the requested commitment level
    Confirmed {
        id: TransactionId,
        level: CommitmentLevel,
    },
    /// Executed and rejected on-ledger; did not take effect
    Rejected { id: TransactionId, reason: String },
    /// The client cannot tell whether the transaction took effect
    Indeterminate {
        id: Option<TransactionId>,
        cause: SubmitError,
    },
    /// Caller withdrew interest before a terminal outcome
    Cancelled { id: Option<TransactionId> },
}

impl SubmissionOutcome {
    /// Classify the result of a full cycle
    pub fn from_result(
        result: Result<(TransactionId, CommitmentLevel), SubmitError>,
    ) -> Self {
        match result {
            Ok((id, level)) => SubmissionOutcome::Confirmed { id, level },
            Err(SubmitError::TransactionRejected { id, reason }) => {
                SubmissionOutcome::Rejected { id, reason }
            }
            Err(SubmitError::Cancelled { id, .. }) => SubmissionOutcome::Cancelled { id },
            Err(cause) => SubmissionOutcome::Indeterminate {
                id: cause.transaction_id().copied(),
                cause,
            },
        }
    }

    pub fn id(&self) -> Option<&TransactionId> {
        match self {
            SubmissionOutcome::Confirmed { id, .. } | SubmissionOutcome::Rejected { id, .. } => {
                Some(id)
            }
            SubmissionOutcome::Indeterminate { id, .. } | SubmissionOutcome::Cancelled { id } => {
                id.as_ref()
            }
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, SubmissionOutcome::Confirmed { .. })
    }

    /// `false` only when the network definitively rejected the transaction
    pub fn may_have_landed(&self) -> bool {
        !matches!(self, SubmissionOutcome::Rejected { .. })
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionOutcome::Confirmed { .. } => "confirmed",
            SubmissionOutcome::Rejected { .. } => "rejected",
            SubmissionOutcome::Indeterminate { .. } => "indeterminate",
            SubmissionOutcome::Cancelled { .. } => "cancelled",
        }
    }
}

/// 32-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountKey([u8; 32]);

impl AccountKey {
    pub const LEN: usize = 32;

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, ValueError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| ValueError::InvalidLength {
            kind: "account key",
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_pubkey(self) -> Pubkey {
        Pubkey::new_from_array(self.0)
    }
}

impl From<Pubkey> for AccountKey {
    fn from(pubkey: Pubkey) -> Self {
        Self(pubkey.to_bytes())
    }
}

impl From<AccountKey> for Pubkey {
    fn from(key: AccountKey) -> Self {
        key.to_pubkey()
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountKey({})", self)
    }
}

impl FromStr for AccountKey {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| ValueError::Parse {
                kind: "account key",
                reason: e.to_string(),
            })?;
        Self::try_from_slice(&decoded)
    }
}

impl Serialize for AccountKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Unsigned 64-bit token amount in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const LEN: usize = 8;

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Decode from the little-endian on-ledger layout
    pub fn from_le_slice(bytes: &[u8]) -> Result<Self, ValueError> {
        let array: [u8; 8] = bytes.try_into().map_err(|_| ValueError::InvalidLength {
            kind: "amount",
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(u64::from_le_bytes(array)))
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
