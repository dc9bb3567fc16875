//! Confirmation phase behaviour against a scripted ledger

use std::sync::Arc;
use std::time::Duration;

use super::test_helpers::*;
use crate::cancel::{cancellation_pair, CancellationSignal};
use crate::errors::SubmitError;
use crate::retry::RetryPolicy;
use crate::tracker::ConfirmationTracker;
use crate::types::{CommitmentLevel, Phase};

fn tracker(ledger: &Arc<ScriptedLedger>, policy: RetryPolicy) -> ConfirmationTracker {
    ConfirmationTracker::new(ledger.clone(), policy)
}

#[tokio::test(start_paused = true)]
async fn test_confirms_on_first_sufficient_status() {
    let ledger = Arc::new(
        ScriptedLedger::new()
            .status(pending())
            .status(pending())
            .status(confirmed(CommitmentLevel::Processed))
            .status(confirmed(CommitmentLevel::Finalized)),
    );

    let level = tracker(&ledger, RetryPolicy::fixed(5, Duration::from_secs(2)))
        .confirm(&sig(1), CommitmentLevel::Processed, &CancellationSignal::never())
        .await
        .unwrap();

    assert_eq!(level, CommitmentLevel::Processed);
    assert_eq!(ledger.status_calls(), 3);
    assert!(ledger.polled_ids().iter().all(|id| *id == sig(1)));
}

#[tokio::test(start_paused = true)]
async fn test_first_poll_is_immediate() {
    let ledger = Arc::new(ScriptedLedger::new().status(confirmed(CommitmentLevel::Confirmed)));
    let start = tokio::time::Instant::now();

    tracker(&ledger, RetryPolicy::confirmation())
        .confirm(&sig(1), CommitmentLevel::Processed, &CancellationSignal::never())
        .await
        .unwrap();

    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_after_exactly_the_poll_budget() {
    let ledger = Arc::new(ScriptedLedger::new());

    let err = tracker(&ledger, RetryPolicy::fixed(4, Duration::from_secs(2)))
        .confirm(&sig(2), CommitmentLevel::Confirmed, &CancellationSignal::never())
        .await
        .unwrap_err();

    match err {
        SubmitError::ConfirmationTimeout { id, polls } => {
            assert_eq!(id, sig(2));
            assert_eq!(polls, 4);
        }
        other => panic!("Expected ConfirmationTimeout, got {:?}", other),
    }
    assert_eq!(ledger.status_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_default_poll_budget_and_interval() {
    let ledger = Arc::new(ScriptedLedger::new());
    let start = tokio::time::Instant::now();

    let err = tracker(&ledger, RetryPolicy::confirmation())
        .confirm(&sig(2), CommitmentLevel::Processed, &CancellationSignal::never())
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::ConfirmationTimeout { polls: 3, .. }));
    assert_eq!(ledger.status_calls(), 3);
    // 2s then 4s between the three polls, each within 10% jitter
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(5_400), "elapsed {:?}", elapsed);
    assert!(elapsed <= Duration::from_millis(6_600), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_transport_errors_count_as_not_yet_confirmed() {
    let ledger = Arc::new(
        ScriptedLedger::new()
            .status(Err(timeout_error()))
            .status(Err(connection_error("refused")))
            .status(confirmed(CommitmentLevel::Confirmed)),
    );

    let level = tracker(&ledger, RetryPolicy::immediate(3))
        .confirm(&sig(3), CommitmentLevel::Confirmed, &CancellationSignal::never())
        .await
        .unwrap();

    assert_eq!(level, CommitmentLevel::Confirmed);
    assert_eq!(ledger.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_weaker_level_keeps_polling() {
    let ledger = Arc::new(
        ScriptedLedger::new()
            .status(confirmed(CommitmentLevel::Processed))
            .status(confirmed(CommitmentLevel::Confirmed))
            .status(confirmed(CommitmentLevel::Finalized)),
    );

    let level = tracker(&ledger, RetryPolicy::immediate(5))
        .confirm(&sig(4), CommitmentLevel::Finalized, &CancellationSignal::never())
        .await
        .unwrap();

    assert_eq!(level, CommitmentLevel::Finalized);
    assert_eq!(ledger.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stronger_level_reported_as_observed() {
    let ledger = Arc::new(ScriptedLedger::new().status(confirmed(CommitmentLevel::Finalized)));

    let level = tracker(&ledger, RetryPolicy::immediate(3))
        .confirm(&sig(4), CommitmentLevel::Processed, &CancellationSignal::never())
        .await
        .unwrap();

    assert_eq!(level, CommitmentLevel::Finalized);
}

#[tokio::test(start_paused = true)]
async fn test_reconfirm_after_timeout_succeeds() {
    let ledger = Arc::new(ScriptedLedger::new().status(pending()).status(pending()));
    let tracker = tracker(&ledger, RetryPolicy::immediate(2));

    let first = tracker
        .confirm(&sig(6), CommitmentLevel::Confirmed, &CancellationSignal::never())
        .await;
    assert!(matches!(first, Err(SubmitError::ConfirmationTimeout { polls: 2, .. })));

    ledger.push_status(confirmed(CommitmentLevel::Confirmed));
    let second = tracker
        .confirm(&sig(6), CommitmentLevel::Confirmed, &CancellationSignal::never())
        .await
        .unwrap();

    assert_eq!(second, CommitmentLevel::Confirmed);
    assert_eq!(ledger.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_execution_error_is_terminal() {
    let ledger = Arc::new(
        ScriptedLedger::new()
            .status(pending())
            .status(execution_failed("custom program error: 0x1771"))
            .status(confirmed(CommitmentLevel::Finalized)),
    );

    let err = tracker(&ledger, RetryPolicy::immediate(5))
        .confirm(&sig(7), CommitmentLevel::Processed, &CancellationSignal::never())
        .await
        .unwrap_err();

    match err {
        SubmitError::TransactionRejected { id, reason } => {
            assert_eq!(id, sig(7));
            assert!(reason.contains("0x1771"));
        }
        other => panic!("Expected TransactionRejected, got {:?}", other),
    }
    assert_eq!(ledger.status_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_execution_error_as_pending_keeps_polling() {
    let ledger = Arc::new(
        ScriptedLedger::new()
            .status(execution_failed("custom program error: 0x1"))
            .status(execution_failed("custom program error: 0x1"))
            .status(execution_failed("custom program error: 0x1")),
    );

    let err = tracker(&ledger, RetryPolicy::immediate(3))
        .treat_execution_error_as_pending(true)
        .confirm(&sig(8), CommitmentLevel::Processed, &CancellationSignal::never())
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::ConfirmationTimeout { polls: 3, .. }));
    assert_eq!(ledger.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_poll_interval() {
    let ledger = Arc::new(ScriptedLedger::new());
    let (handle, signal) = cancellation_pair();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();
    });

    let err = tracker(&ledger, RetryPolicy::fixed(10, Duration::from_secs(30)))
        .confirm(&sig(9), CommitmentLevel::Processed, &signal)
        .await
        .unwrap_err();

    match err {
        SubmitError::Cancelled { id, phase } => {
            assert_eq!(id, Some(sig(9)));
            assert_eq!(phase, Phase::Confirmation);
        }
        other => panic!("Expected Cancelled, got {:?}", other),
    }
    assert_eq!(ledger.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_hanging_status_query() {
    let ledger = Arc::new(ScriptedLedger::new().hanging_status());
    let (handle, signal) = cancellation_pair();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let err = tracker(&ledger, RetryPolicy::confirmation())
        .confirm(&sig(9), CommitmentLevel::Processed, &signal)
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Cancelled { id: Some(_), .. }));
}
