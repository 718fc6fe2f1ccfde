//! Operator-initiated cancellation.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use redteam_console::models::message::Role;
use redteam_console::RunSupervisor;

use super::test_helpers::{frame, run_params, wait_until, MockBackend};

#[tokio::test]
async fn stop_tears_down_a_live_run() {
    let backend = MockBackend::start().await;
    backend.set_frames(vec![frame(
        "RunResponseContent",
        "Still working...",
        json!({}),
    )]);
    backend.hang_after_frames();

    let supervisor = RunSupervisor::new(backend.config()).expect("supervisor");
    let shared = supervisor.shared();

    supervisor.start_run(run_params()).await.expect("start");
    wait_until("first content entry", || {
        let shared = Arc::clone(&shared);
        async move { shared.transcript_messages().await.len() >= 2 }
    })
    .await;

    supervisor.stop_run().await.expect("stop");

    assert_eq!(backend.stop_calls(), 1);
    assert!(!shared.is_streaming());
    assert_eq!(supervisor.session_id().await, None);

    let messages = shared.transcript_messages().await;
    let last = messages.last().expect("cancellation entry");
    assert_eq!(last.role, Role::System);
    assert!(last.is_error);
    assert_eq!(last.text, "Job cancelled!");

    // The poller must be gone with the run.
    let polled = backend.state_calls();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(backend.state_calls(), polled, "poller kept running after stop");
}

#[tokio::test]
async fn stop_is_idempotent() {
    let backend = MockBackend::start().await;
    backend.hang_after_frames();

    let supervisor = RunSupervisor::new(backend.config()).expect("supervisor");
    let shared = supervisor.shared();

    supervisor.start_run(run_params()).await.expect("start");
    wait_until("streaming flag", || {
        let shared = Arc::clone(&shared);
        async move { shared.is_streaming() }
    })
    .await;

    supervisor.stop_run().await.expect("first stop");
    supervisor.stop_run().await.expect("second stop");

    assert_eq!(backend.stop_calls(), 1, "second stop must not reach the backend");
    let cancelled = shared
        .transcript_messages()
        .await
        .iter()
        .filter(|message| message.text == "Job cancelled!")
        .count();
    assert_eq!(cancelled, 1, "exactly one cancellation entry");
}

#[tokio::test]
async fn stop_without_a_run_is_a_no_op() {
    let backend = MockBackend::start().await;
    let supervisor = RunSupervisor::new(backend.config()).expect("supervisor");

    supervisor.stop_run().await.expect("stop");

    assert_eq!(backend.stop_calls(), 0);
    assert!(supervisor.shared().transcript_messages().await.is_empty());
}
