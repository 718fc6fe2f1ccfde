//! Unit tests for the single-slot action rendezvous.

use std::sync::Arc;
use std::time::Duration;

use redteam_console::rendezvous::ActionRendezvous;
use redteam_console::AppError;

#[tokio::test]
async fn resolve_fulfils_the_pending_request() {
    let rendezvous = Arc::new(ActionRendezvous::new());

    let waiter = Arc::clone(&rendezvous);
    let request = tokio::spawn(async move { waiter.request("a1", "continue?", None).await });

    // Wait until the slot is registered.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let pending = rendezvous.pending().expect("pending action");
    assert_eq!(pending.action_id, "a1");
    assert_eq!(pending.prompt, "continue?");
    assert!(pending.deadline.is_none());

    rendezvous.resolve("yes");
    let response = request.await.expect("task").expect("resolved");
    assert_eq!(response, "yes");
    assert!(rendezvous.pending().is_none(), "slot cleared on resolution");
}

#[tokio::test]
async fn ttl_expiry_rejects_and_clears_the_slot() {
    let rendezvous = Arc::new(ActionRendezvous::new());

    let result = rendezvous.request("a2", "still there?", Some(1)).await;
    assert!(
        matches!(result, Err(AppError::ActionTimeout(_))),
        "expected ActionTimeout, got {result:?}"
    );
    assert!(rendezvous.pending().is_none(), "slot self-clears on expiry");
}

#[tokio::test]
async fn reject_fails_the_pending_request() {
    let rendezvous = Arc::new(ActionRendezvous::new());

    let waiter = Arc::clone(&rendezvous);
    let request = tokio::spawn(async move { waiter.request("a3", "prompt", Some(60)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    rendezvous.reject("run stopped");

    let result = request.await.expect("task");
    assert!(
        matches!(result, Err(AppError::ActionCancelled(_))),
        "expected ActionCancelled, got {result:?}"
    );
    assert!(rendezvous.pending().is_none());
}

#[tokio::test]
async fn resolution_is_at_most_once() {
    let rendezvous = Arc::new(ActionRendezvous::new());

    let waiter = Arc::clone(&rendezvous);
    let request = tokio::spawn(async move { waiter.request("a4", "prompt", None).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    rendezvous.resolve("first");
    // Second resolve and a late reject must be silent no-ops.
    rendezvous.resolve("second");
    rendezvous.reject("late");

    let response = request.await.expect("task").expect("resolved once");
    assert_eq!(response, "first");
}

#[tokio::test]
async fn resolve_without_pending_request_is_a_noop() {
    let rendezvous = ActionRendezvous::new();
    rendezvous.resolve("nobody asked");
    rendezvous.reject("nothing pending");
    assert!(rendezvous.pending().is_none());
}

#[tokio::test]
async fn second_request_while_outstanding_is_rejected() {
    let rendezvous = Arc::new(ActionRendezvous::new());

    let waiter = Arc::clone(&rendezvous);
    let first = tokio::spawn(async move { waiter.request("a5", "first", None).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = rendezvous.request("a6", "second", None).await;
    assert!(
        matches!(second, Err(AppError::Action(_))),
        "expected contract violation, got {second:?}"
    );

    // The original request is unaffected.
    rendezvous.resolve("answer");
    assert_eq!(first.await.expect("task").expect("resolved"), "answer");
}

#[tokio::test]
async fn positive_ttl_exposes_a_deadline() {
    let rendezvous = Arc::new(ActionRendezvous::new());

    let waiter = Arc::clone(&rendezvous);
    let request = tokio::spawn(async move { waiter.request("a7", "prompt", Some(30)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let pending = rendezvous.pending().expect("pending action");
    let remaining = pending.remaining_seconds().expect("deadline set");
    assert!(
        (1..=30).contains(&remaining),
        "remaining time should count down from the TTL, got {remaining}"
    );

    rendezvous.resolve("done");
    let _ = request.await.expect("task");
}

#[tokio::test]
async fn zero_ttl_means_no_expiry() {
    let rendezvous = Arc::new(ActionRendezvous::new());

    let waiter = Arc::clone(&rendezvous);
    let request = tokio::spawn(async move { waiter.request("a8", "prompt", Some(0)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let pending = rendezvous.pending().expect("pending action");
    assert!(pending.deadline.is_none(), "TTL of 0 must not arm a timer");

    rendezvous.resolve("ok");
    assert_eq!(request.await.expect("task").expect("resolved"), "ok");
}
