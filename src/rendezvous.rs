//! Single-slot human-action rendezvous.
//!
//! Pairs a server-issued `UserInput` request with the eventual operator
//! response. The stream consumer calls [`ActionRendezvous::request`]
//! and suspends on the returned future; the rendering layer answers
//! through [`ActionRendezvous::resolve`] or gives up through
//! [`ActionRendezvous::reject`]. A positive TTL arms a deadline after
//! which the request auto-expires.
//!
//! At most one request is outstanding at a time — the consumer
//! processes frames sequentially, so this is structural.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::oneshot;
use tracing::debug;

use crate::{AppError, Result};

/// Read-only descriptor of the outstanding request, exposed to the
/// rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    /// Server-issued identifier, unique per outstanding request.
    pub action_id: String,
    /// Display text shown to the operator.
    pub prompt: String,
    /// Absolute expiry time; `None` means no expiry.
    pub deadline: Option<DateTime<Utc>>,
}

impl PendingAction {
    /// Whole seconds until expiry, clamped at zero. `None` when the
    /// request never expires.
    #[must_use]
    pub fn remaining_seconds(&self) -> Option<i64> {
        self.deadline
            .map(|deadline| (deadline - Utc::now()).num_seconds().max(0))
    }
}

/// Terminal outcome delivered to the waiting consumer.
#[derive(Debug)]
enum Reply {
    /// Operator answered with the given text.
    Answer(String),
    /// Request was rejected or torn down.
    Cancelled(String),
}

struct Slot {
    action: PendingAction,
    tx: oneshot::Sender<Reply>,
}

/// Single-slot request/response broker between the stream consumer and
/// the rendering layer.
#[derive(Default)]
pub struct ActionRendezvous {
    slot: Mutex<Option<Slot>>,
}

impl ActionRendezvous {
    /// Empty rendezvous.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Slot>> {
        // Recover the inner state on poison; the slot holds no
        // invariants a panicked writer could have broken mid-update.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the outstanding request and await its outcome.
    ///
    /// A positive `ttl_seconds` arms a countdown; on expiry the slot
    /// clears itself and the future fails with `ActionTimeout`.
    ///
    /// # Errors
    ///
    /// - `AppError::Action` if a request is already outstanding.
    /// - `AppError::ActionTimeout` when the TTL elapses unanswered.
    /// - `AppError::ActionCancelled` on [`reject`](Self::reject) or
    ///   when the rendezvous is dropped mid-wait.
    pub async fn request(
        &self,
        action_id: &str,
        prompt: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<String> {
        let ttl = ttl_seconds.filter(|&secs| secs > 0);
        let (tx, rx) = oneshot::channel::<Reply>();

        {
            let mut slot = self.lock();
            if slot.is_some() {
                return Err(AppError::Action(
                    "an action request is already outstanding".into(),
                ));
            }
            let deadline = ttl.and_then(|secs| {
                i64::try_from(secs)
                    .ok()
                    .map(|secs| Utc::now() + ChronoDuration::seconds(secs))
            });
            *slot = Some(Slot {
                action: PendingAction {
                    action_id: action_id.to_owned(),
                    prompt: prompt.to_owned(),
                    deadline,
                },
                tx,
            });
        }

        let reply = if let Some(secs) = ttl {
            match tokio::time::timeout(std::time::Duration::from_secs(secs), rx).await {
                Ok(reply) => reply,
                Err(_elapsed) => {
                    // Expired unanswered — clear the slot ourselves.
                    self.lock().take();
                    debug!(action_id, ttl_seconds = secs, "action request expired");
                    return Err(AppError::ActionTimeout(format!(
                        "no response within {secs}s"
                    )));
                }
            }
        } else {
            rx.await
        };

        match reply {
            Ok(Reply::Answer(text)) => Ok(text),
            Ok(Reply::Cancelled(reason)) => Err(AppError::ActionCancelled(reason)),
            Err(_recv) => Err(AppError::ActionCancelled(
                "responder dropped without answering".into(),
            )),
        }
    }

    /// Fulfil the outstanding request with the operator's response.
    /// No-op when nothing is outstanding or the request already expired.
    pub fn resolve(&self, response: &str) {
        if let Some(slot) = self.lock().take() {
            let _ = slot.tx.send(Reply::Answer(response.to_owned()));
        }
    }

    /// Fail the outstanding request. No-op when nothing is outstanding.
    pub fn reject(&self, reason: &str) {
        if let Some(slot) = self.lock().take() {
            let _ = slot.tx.send(Reply::Cancelled(reason.to_owned()));
        }
    }

    /// Descriptor of the outstanding request, if any.
    #[must_use]
    pub fn pending(&self) -> Option<PendingAction> {
        self.lock().as_ref().map(|slot| slot.action.clone())
    }
}
