//! Periodic authoritative state polling.
//!
//! Fetches `GET /sessions/{id}/state` once immediately, then on a fixed
//! interval until cancelled. Each successful fetch fully replaces the
//! shared snapshot; each failure is logged and leaves the prior
//! snapshot in place until the next success. The snapshot and the live
//! transcript are independent, eventually-consistent views — they are
//! never merged.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::api::ApiClient;
use crate::state::RunShared;

/// Background snapshot refresher for one run.
pub struct StatePoller {
    session_id: String,
    api: ApiClient,
    shared: Arc<RunShared>,
    interval: Duration,
    cancel: CancellationToken,
}

impl StatePoller {
    /// Build a poller (does not start the timer yet).
    #[must_use]
    pub fn new(
        session_id: String,
        api: ApiClient,
        shared: Arc<RunShared>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            api,
            shared,
            interval,
            cancel,
        }
    }

    /// Spawn the background polling task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        let span = info_span!("state_poller", session_id = %self.session_id);
        tokio::spawn(self.run().instrument(span))
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    debug!("state poller cancelled");
                    break;
                }

                // First tick completes immediately, so the initial
                // fetch happens as soon as streaming begins.
                _ = ticker.tick() => self.fetch_once().await,
            }
        }
    }

    async fn fetch_once(&self) {
        match self.api.fetch_state(&self.session_id).await {
            Ok(snapshot) => {
                *self.shared.snapshot.write().await = Some(snapshot);
            }
            Err(err) => {
                // Keep the previous snapshot until the next success.
                warn!(error = %err, "state poll failed");
            }
        }
    }
}
