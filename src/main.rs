//! ledger-submit
//!
//! Sends one pre-signed transaction and waits for the requested commitment.
//! Exit code: 0 confirmed, 2 rejected, 3 indeterminate, 4 cancelled,
//! 1 on any setup error.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use clap::Parser;
use solana_sdk::transaction::VersionedTransaction;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger_submit::{
    cancellation_pair, metrics::metrics, observability::CorrelationId, CommitmentLevel, Config,
    SignedTransaction, SolanaLedgerClient, SubmissionOutcome, SubmitEngine, SubmitOptions,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Signed transaction, base64 text or raw wire bytes
    #[arg(short, long)]
    tx_file: String,

    /// Commitment level to wait for (overrides configuration)
    #[arg(long, env = "LEDGER_COMMITMENT")]
    commitment: Option<CommitmentLevel>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus metrics to stdout when done
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose, args.json_logs) {
        eprintln!("Failed to initialise logging: {:#}", e);
        return ExitCode::from(1);
    }

    match run(args).await {
        Ok(outcome) => ExitCode::from(exit_code(&outcome)),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<SubmissionOutcome> {
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    let tx = read_transaction(&args.tx_file)?;
    let correlation_id = CorrelationId::new();
    info!(
        correlation_id = %correlation_id,
        endpoint = %config.rpc.url,
        len = tx.len(),
        expected_signature = ?tx.expected_id().map(|id| id.to_string()),
        "Loaded signed transaction"
    );

    let ledger = Arc::new(SolanaLedgerClient::from_config(&config.rpc));
    let engine = SubmitEngine::from_config(ledger, &config);

    let (handle, signal) = cancellation_pair();
    let mut options = SubmitOptions::new()
        .with_cancellation(signal)
        .with_correlation_id(correlation_id);
    if let Some(level) = args.commitment {
        options = options.with_commitment(level);
    }

    let cycle = engine.submit_and_confirm(&tx, options);
    tokio::pin!(cycle);

    let finished = tokio::select! {
        outcome = &mut cycle => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    let outcome = match finished {
        Some(outcome) => outcome,
        None => {
            warn!("Received interrupt, cancelling");
            handle.cancel();
            cycle.await
        }
    };

    report(&outcome);

    if args.print_metrics {
        print!("{}", metrics().encode_text()?);
    }

    Ok(outcome)
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "ledger_submit=debug,info"
    } else {
        "ledger_submit=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        dotenvy::dotenv().ok();
        let mut config = Config::default();
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }
}

fn read_transaction(path: &str) -> Result<SignedTransaction> {
    let contents =
        std::fs::read(path).with_context(|| format!("Failed to read transaction file {}", path))?;
    decode_transaction(&contents)
}

/// Accept base64 text or raw wire bytes
///
/// The payload is sent exactly as decoded; parsing is only attempted to
/// learn the expected signature.
fn decode_transaction(contents: &[u8]) -> Result<SignedTransaction> {
    let text = std::str::from_utf8(contents).ok().map(str::trim);
    let bytes = match text.and_then(|t| BASE64_STANDARD.decode(t).ok()) {
        Some(decoded) => decoded,
        None => contents.to_vec(),
    };
    if bytes.is_empty() {
        bail!("Transaction file is empty");
    }

    match bincode::deserialize::<VersionedTransaction>(&bytes) {
        Ok(parsed) if bincode::serialize(&parsed).ok().as_deref() == Some(bytes.as_slice()) => {
            let expected = parsed.signatures.first().copied();
            debug!(signature = ?expected, "Decoded versioned transaction");
            Ok(SignedTransaction::from_versioned(&parsed)?)
        }
        _ => {
            debug!("Payload is not a decodable transaction, sending as-is");
            Ok(SignedTransaction::from_bytes(bytes)?)
        }
    }
}

fn report(outcome: &SubmissionOutcome) {
    match outcome {
        SubmissionOutcome::Confirmed { id, level } => {
            println!("confirmed {} at {}", id, level);
        }
        SubmissionOutcome::Rejected { id, reason } => {
            println!("rejected {}: {}", id, reason);
        }
        SubmissionOutcome::Indeterminate { id, cause } => match id {
            Some(id) => println!("indeterminate {}: {}", id, cause),
            None => println!("indeterminate: {}", cause),
        },
        SubmissionOutcome::Cancelled { id } => match id {
            Some(id) => println!("cancelled {}", id),
            None => println!("cancelled"),
        },
    }
}

fn exit_code(outcome: &SubmissionOutcome) -> u8 {
    match outcome {
        SubmissionOutcome::Confirmed { .. } => 0,
        SubmissionOutcome::Rejected { .. } => 2,
        SubmissionOutcome::Indeterminate { .. } => 3,
        SubmissionOutcome::Cancelled { .. } => 4,
    }
}
