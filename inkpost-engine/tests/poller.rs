mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::MockDriver;
use inkpost_engine::poll::{wait_until, PollConfig, PollOutcome};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn config(dir: &TempDir, interval_ms: u64, deadline_ms: u64) -> PollConfig {
    PollConfig::new(
        "editor ready",
        Duration::from_millis(interval_ms),
        Duration::from_millis(deadline_ms),
    )
    .diagnostics_dir(dir.path())
}

#[tokio::test(start_paused = true)]
async fn always_false_predicate_times_out_with_diagnostics() {
    let driver = MockDriver::new();
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();

    let started = tokio::time::Instant::now();
    let outcome = wait_until(&driver, &config(&dir, 100, 1_000), &cancel, || async {
        false
    })
    .await;

    assert!(started.elapsed() >= Duration::from_millis(1_000));
    match outcome {
        PollOutcome::TimedOut(diag) => {
            assert!(diag.screenshot.exists(), "screenshot must be captured");
            assert!(diag.dom.exists(), "document dump must be captured");
            let dom = std::fs::read_to_string(&diag.dom).unwrap();
            assert!(dom.contains("mock document"));
        }
        other => panic!("expected TimedOut, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn satisfied_as_soon_as_the_predicate_turns_true() {
    let driver = MockDriver::new();
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let checks = AtomicUsize::new(0);

    let outcome = wait_until(&driver, &config(&dir, 100, 10_000), &cancel, || async {
        checks.fetch_add(1, Ordering::SeqCst) + 1 >= 3
    })
    .await;

    assert!(outcome.is_satisfied());
    assert_eq!(checks.load(Ordering::SeqCst), 3);
    // No diagnostics on success.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_produces_a_distinct_outcome() {
    let driver = MockDriver::new();
    let dir = TempDir::new().unwrap();

    // Pre-cancelled: not a single sleep tick should matter.
    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = wait_until(&driver, &config(&dir, 100, 10_000), &cancel, || async {
        false
    })
    .await;
    assert!(matches!(outcome, PollOutcome::Cancelled));

    // Cancelled mid-wait, from the predicate itself.
    let cancel = CancellationToken::new();
    let checks = AtomicUsize::new(0);
    let outcome = wait_until(&driver, &config(&dir, 100, 10_000), &cancel, || {
        let n = checks.fetch_add(1, Ordering::SeqCst);
        if n == 2 {
            cancel.cancel();
        }
        async { false }
    })
    .await;
    assert!(matches!(outcome, PollOutcome::Cancelled));
    // Cancellation must never be reported as a timeout with diagnostics.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn a_zero_interval_is_clamped_to_the_floor() {
    let driver = MockDriver::new();
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let checks = AtomicUsize::new(0);

    let outcome = wait_until(&driver, &config(&dir, 0, 1_000), &cancel, || {
        checks.fetch_add(1, Ordering::SeqCst);
        async { false }
    })
    .await;

    assert!(matches!(outcome, PollOutcome::TimedOut(_)));
    // 1s deadline with a 100ms floor allows ~11 checks, not thousands.
    assert!(checks.load(Ordering::SeqCst) <= 12);
}
