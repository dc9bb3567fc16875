//! Loading configuration files from disk

use ledger_submit::{CommitmentLevel, Config, ConfigError};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_config_file() {
    let file = write_config(
        r#"
        [rpc]
        url = "https://api.mainnet-beta.solana.com"
        timeout_secs = 10
        search_transaction_history = true
        node_max_retries = 0

        [submission]
        max_attempts = 4

        [confirmation]
        commitment = "confirmed"

        [builder]
        compute_unit_price_micro_lamports = 5000
        "#,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.rpc.timeout_secs, 10);
    assert!(config.rpc.search_transaction_history);
    assert_eq!(config.rpc.node_max_retries, Some(0));
    assert_eq!(config.submission.max_attempts, 4);
    assert_eq!(config.submission.base_delay_ms, 250);
    assert_eq!(config.confirmation.commitment, CommitmentLevel::Confirmed);
    assert_eq!(config.confirmation.retry.max_attempts, 3);
    assert_eq!(config.builder.compute_unit_price_micro_lamports, Some(5_000));
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::IoError(_)));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let file = write_config("[submission]\nmax_attempts = \"three\"\n");
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn test_file_with_env_rejects_invalid_values() {
    let file = write_config("[rpc]\nurl = \"ws://127.0.0.1:8900\"\n");
    let err = Config::from_file_with_env(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}
