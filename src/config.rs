//! Configuration for the submission engine
//!
//! Loaded once from a TOML file (plus `.env` / environment overrides) and
//! passed by value into the ledger client, builder and engine. There is no
//! process-wide mutable state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::retry::{RetryPolicy, RetryPolicyError};
use crate::types::{AccountKey, CommitmentLevel};

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid environment variable {name}: {reason}")]
    InvalidEnvVar { name: String, reason: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid retry policy in [{section}]: {source}")]
    InvalidRetryPolicy {
        section: &'static str,
        #[source]
        source: RetryPolicyError,
    },
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ledger endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Delivery retry budget
    #[serde(default = "RetryPolicy::submission")]
    pub submission: RetryPolicy,

    /// Status polling
    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    /// Transaction builder settings
    #[serde(default)]
    pub builder: BuilderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Skip the node's preflight simulation on send
    #[serde(default)]
    pub skip_preflight: bool,

    /// Commitment for preflight simulation
    #[serde(default)]
    pub preflight_commitment: Option<CommitmentLevel>,

    /// Ask the node to search long-term history when polling status
    #[serde(default)]
    pub search_transaction_history: bool,

    /// Node-side rebroadcast count; unset leaves the node default
    #[serde(default)]
    pub node_max_retries: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Commitment level a transaction must reach
    #[serde(default)]
    pub commitment: CommitmentLevel,

    /// Poll budget; `base_delay_ms` is the poll interval
    #[serde(default = "RetryPolicy::confirmation")]
    pub retry: RetryPolicy,

    /// Keep polling after an on-ledger execution error instead of
    /// reporting a rejection straight away
    #[serde(default)]
    pub treat_execution_error_as_pending: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Compute unit limit instruction, when set
    #[serde(default)]
    pub compute_unit_limit: Option<u32>,

    /// Priority fee in micro-lamports per compute unit, when set
    #[serde(default)]
    pub compute_unit_price_micro_lamports: Option<u64>,

    /// Well-known accounts resolved by name (program ids, pool storage, ...)
    #[serde(default)]
    pub known_accounts: BTreeMap<String, AccountKey>,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8899".to_string()
}
fn default_rpc_timeout() -> u64 {
    30
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            skip_preflight: false,
            preflight_commitment: None,
            search_transaction_history: false,
            node_max_retries: None,
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            commitment: CommitmentLevel::default(),
            retry: RetryPolicy::confirmation(),
            treat_execution_error_as_pending: false,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::IoError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    ///
    /// Recognised: `LEDGER_RPC_URL`, `LEDGER_COMMITMENT`,
    /// `LEDGER_SUBMIT_MAX_ATTEMPTS`, `LEDGER_CONFIRM_MAX_ATTEMPTS`,
    /// `LEDGER_POLL_INTERVAL_MS`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LEDGER_RPC_URL") {
            self.rpc.url = url;
        }
        if let Some(level) = lookup("LEDGER_COMMITMENT") {
            self.confirmation.commitment =
                level.parse().map_err(|e| ConfigError::InvalidEnvVar {
                    name: "LEDGER_COMMITMENT".to_string(),
                    reason: format!("{}", e),
                })?;
        }
        if let Some(value) = lookup("LEDGER_SUBMIT_MAX_ATTEMPTS") {
            self.submission.max_attempts = parse_env("LEDGER_SUBMIT_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("LEDGER_CONFIRM_MAX_ATTEMPTS") {
            self.confirmation.retry.max_attempts =
                parse_env("LEDGER_CONFIRM_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("LEDGER_POLL_INTERVAL_MS") {
            let interval: u64 = parse_env("LEDGER_POLL_INTERVAL_MS", &value)?;
            self.confirmation.retry.base_delay_ms = interval;
            self.confirmation.retry.max_delay_ms =
                self.confirmation.retry.max_delay_ms.max(interval);
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpc.url.starts_with("http://") && !self.rpc.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "Invalid URL format: {}",
                self.rpc.url
            )));
        }
        if self.rpc.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "rpc.timeout_secs must be > 0".to_string(),
            ));
        }
        self.submission
            .validate()
            .map_err(|source| ConfigError::InvalidRetryPolicy {
                section: "submission",
                source,
            })?;
        self.confirmation
            .retry
            .validate()
            .map_err(|source| ConfigError::InvalidRetryPolicy {
                section: "confirmation.retry",
                source,
            })?;
        if self.builder.compute_unit_limit == Some(0) {
            return Err(ConfigError::ValidationError(
                "builder.compute_unit_limit must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.submission.max_attempts, 3);
        assert_eq!(config.confirmation.retry.max_attempts, 3);
        assert_eq!(config.confirmation.commitment, CommitmentLevel::Processed);
        assert!(!config.confirmation.treat_execution_error_as_pending);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.rpc.url, "http://127.0.0.1:8899");
        assert_eq!(config.submission, RetryPolicy::submission());
        assert_eq!(config.confirmation.retry, RetryPolicy::confirmation());
    }

    #[test]
    fn test_parse_full_toml() {
        let pool = solana_sdk::pubkey::Pubkey::new_unique();
        let toml = format!(
            r#"
            [rpc]
            url = "https://api.devnet.solana.com"
            skip_preflight = true
            preflight_commitment = "confirmed"

            [submission]
            max_attempts = 5
            base_delay_ms = 100

            [confirmation]
            commitment = "finalized"
            treat_execution_error_as_pending = true

            [confirmation.retry]
            max_attempts = 10
            base_delay_ms = 500
            max_delay_ms = 500
            multiplier = 1.0

            [builder]
            compute_unit_limit = 200000

            [builder.known_accounts]
            pool_storage = "{}"
            "#,
            pool
        );

        let config = Config::from_toml_str(&toml).unwrap();
        assert!(config.rpc.skip_preflight);
        assert_eq!(config.rpc.preflight_commitment, Some(CommitmentLevel::Confirmed));
        assert_eq!(config.submission.max_attempts, 5);
        assert_eq!(config.submission.max_delay_ms, 2_000);
        assert_eq!(config.confirmation.commitment, CommitmentLevel::Finalized);
        assert_eq!(config.confirmation.retry.max_attempts, 10);
        assert!(config.confirmation.treat_execution_error_as_pending);
        assert_eq!(
            config.builder.known_accounts["pool_storage"].to_pubkey(),
            pool
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_account_key_rejected() {
        let toml = r#"
            [builder.known_accounts]
            pool_storage = "tooshort"
        "#;
        assert!(matches!(
            Config::from_toml_str(toml),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LEDGER_RPC_URL", "https://rpc.example.com"),
            ("LEDGER_COMMITMENT", "confirmed"),
            ("LEDGER_SUBMIT_MAX_ATTEMPTS", "7"),
            ("LEDGER_CONFIRM_MAX_ATTEMPTS", "4"),
            ("LEDGER_POLL_INTERVAL_MS", "10000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.rpc.url, "https://rpc.example.com");
        assert_eq!(config.confirmation.commitment, CommitmentLevel::Confirmed);
        assert_eq!(config.submission.max_attempts, 7);
        assert_eq!(config.confirmation.retry.max_attempts, 4);
        assert_eq!(config.confirmation.retry.base_delay_ms, 10_000);
        assert_eq!(config.confirmation.retry.max_delay_ms, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_env_override() {
        let mut config = Config::default();
        let err = config
            .apply_env_overrides(|name| {
                (name == "LEDGER_SUBMIT_MAX_ATTEMPTS").then(|| "many".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.rpc.url = "ftp://node".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.submission.max_attempts = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidRetryPolicy {
                section: "submission",
                source: RetryPolicyError::ZeroAttempts,
            })
        );

        let mut config = Config::default();
        config.confirmation.retry.jitter_factor = -0.1;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidRetryPolicy {
                section: "confirmation.retry",
                source: RetryPolicyError::InvalidJitter(_),
            }
        ));
        assert!(err.to_string().contains("[confirmation.retry]"));

        let mut config = Config::default();
        config.builder.compute_unit_limit = Some(0);
        assert!(config.validate().is_err());
    }
}
