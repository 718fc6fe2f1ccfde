//! Session lifecycle management: start, stop, resume.
//!
//! [`RunSupervisor`] is the top-level orchestrator and the exclusive
//! owner of the run context — session id, cancellation tokens, and the
//! consumer/poller task handles. The rendering layer holds the shared
//! [`RunShared`] view and calls the operations here; it never touches
//! the protocol directly.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::models::message::{Message, Metadata};
use crate::models::session::RunParams;
use crate::poller::StatePoller;
use crate::state::RunShared;
use crate::stream::consumer::StreamConsumer;
use crate::Result;

/// Transcript text recorded when the operator cancels a run.
const CANCELLED_TEXT: &str = "Job cancelled!";

/// Context of the run currently owned by the supervisor.
struct ActiveRun {
    session_id: String,
    cancel: CancellationToken,
    consumer: JoinHandle<()>,
    poller: JoinHandle<()>,
}

/// Top-level orchestrator for one run at a time.
pub struct RunSupervisor {
    api: ApiClient,
    config: ClientConfig,
    shared: Arc<RunShared>,
    /// Root token parenting every run's token; cancelled on drop so no
    /// task, timer, or connection outlives the supervisor.
    shutdown: CancellationToken,
    active: Mutex<Option<ActiveRun>>,
}

impl RunSupervisor {
    /// Build a supervisor against the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        Ok(Self {
            api,
            config,
            shared: Arc::new(RunShared::new()),
            shutdown: CancellationToken::new(),
            active: Mutex::new(None),
        })
    }

    /// The shared state read by the rendering layer.
    #[must_use]
    pub fn shared(&self) -> Arc<RunShared> {
        Arc::clone(&self.shared)
    }

    /// Session id of the current run, if one exists.
    pub async fn session_id(&self) -> Option<String> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|run| run.session_id.clone())
    }

    /// Validate parameters, create a session, launch the run, and start
    /// the stream consumer and state poller concurrently.
    ///
    /// Re-entrant calls while a run is streaming are no-ops. Setup
    /// failures append one system error entry and abort — after a
    /// create failure no run exists; after a launch failure the session
    /// exists server-side but is never streamed.
    ///
    /// # Errors
    ///
    /// - `AppError::Validation` — empty required field, checked before
    ///   any network call.
    /// - `AppError::SessionCreate` / `AppError::RunStart` — setup
    ///   network or HTTP failure.
    pub async fn start_run(&self, params: RunParams) -> Result<()> {
        let request = params.into_request()?;

        if self.shared.is_streaming() {
            debug!("run already active, ignoring start request");
            return Ok(());
        }

        let span = info_span!("start_run", target = %request.target);
        async {
            let mut active = self.active.lock().await;

            // Supersede a finished or torn-down previous run.
            if let Some(previous) = active.take() {
                previous.cancel.cancel();
            }
            self.shared.rendezvous.reject("superseded by a new run");

            // Seed the transcript and drop the previous run's state.
            self.shared
                .transcript
                .write()
                .await
                .reset_with(Message::user(request.initiating_text()));
            *self.shared.snapshot.write().await = None;
            self.shared.set_viewer_url(None);
            self.shared.set_resume_available(false);

            let session_id = match self.api.create_session(&request).await {
                Ok(session_id) => session_id,
                Err(err) => {
                    self.record_setup_failure(&err.to_string()).await;
                    return Err(err);
                }
            };

            if let Err(err) = self.api.start_run(&session_id).await {
                self.record_setup_failure(&err.to_string()).await;
                return Err(err);
            }

            self.shared.set_streaming(true);

            let cancel = self.shutdown.child_token();
            let poll_cancel = cancel.child_token();

            let consumer = StreamConsumer::new(
                session_id.clone(),
                self.api.clone(),
                Arc::clone(&self.shared),
                cancel.clone(),
                poll_cancel.clone(),
            )
            .spawn();

            let poller = StatePoller::new(
                session_id.clone(),
                self.api.clone(),
                Arc::clone(&self.shared),
                Duration::from_millis(self.config.poll_interval_ms),
                poll_cancel,
            )
            .spawn();

            info!(session_id, "run started");
            *active = Some(ActiveRun {
                session_id,
                cancel,
                consumer,
                poller,
            });
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Cancel the current run: best-effort stop call, reject any
    /// pending action, tear down the consumer and poller, and append
    /// exactly one cancellation entry. No-op without a run; idempotent.
    ///
    /// # Errors
    ///
    /// Infallible today; `Result` keeps the call-site contract uniform
    /// with the other lifecycle operations.
    pub async fn stop_run(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        let Some(run) = active.take() else {
            return Ok(());
        };

        let span = info_span!("stop_run", session_id = %run.session_id);
        async {
            if let Err(err) = self.api.stop_run(&run.session_id).await {
                warn!(error = %err, "stop request failed, tearing down anyway");
            }

            // A consumer suspended on a pending action must be released
            // before its cancellation is observed.
            self.shared.rendezvous.reject("run stopped");
            run.cancel.cancel();

            let _ = run.consumer.await;
            let _ = run.poller.await;

            self.shared.set_streaming(false);
            self.shared.set_resume_available(false);
            self.shared
                .transcript
                .write()
                .await
                .push_system_error(CANCELLED_TEXT, Metadata::new());
            info!("run cancelled");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Ask the backend to resume a paused manual-login step. No-op
    /// without a run; failures are logged, never surfaced to the
    /// transcript.
    ///
    /// # Errors
    ///
    /// Infallible today; see [`stop_run`](Self::stop_run).
    pub async fn resume_run(&self) -> Result<()> {
        let active = self.active.lock().await;
        let Some(run) = active.as_ref() else {
            return Ok(());
        };

        self.shared.set_resuming(true);
        if let Err(err) = self.api.resume(&run.session_id).await {
            warn!(session_id = %run.session_id, error = %err, "resume request failed");
        }
        self.shared.set_resuming(false);
        Ok(())
    }

    /// Deliver the operator's answer to the pending action request.
    /// No-op when nothing is pending.
    pub fn submit_action_response(&self, response: &str) {
        self.shared.rendezvous.resolve(response);
    }

    /// Dismiss the pending action request without answering. No-op when
    /// nothing is pending.
    pub fn cancel_pending_action(&self) {
        self.shared.rendezvous.reject("cancelled by operator");
    }

    async fn record_setup_failure(&self, detail: &str) {
        self.shared
            .transcript
            .write()
            .await
            .push_system_error(&format!("Error: {detail}"), Metadata::new());
    }
}

impl Drop for RunSupervisor {
    /// Cancel every outstanding task unconditionally, regardless of run
    /// state, and release a consumer suspended on a pending action.
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.shared.rendezvous.reject("supervisor dropped");
    }
}
