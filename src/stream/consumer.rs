//! Event stream consumer task.
//!
//! Owns exactly one live stream connection per run and applies each
//! frame to the shared run state in strict arrival order. A `UserInput`
//! frame suspends this task on the action rendezvous until the operator
//! answers, the TTL expires, or the run is torn down — frames keep
//! buffering in the framed reader meanwhile, and the poller keeps
//! running.
//!
//! Malformed frames are logged and skipped; they never terminate the
//! stream. A transport error or premature EOF ends the run with a
//! single system error entry — there is no automatic reconnect.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::api::ApiClient;
use crate::models::message::{Message, Metadata, Role};
use crate::models::session::ActionSubmission;
use crate::state::RunShared;
use crate::stream::codec::SseCodec;
use crate::stream::frame::{
    flag_is_set, parse_frame, RunEvent, MANUAL_LOGIN_TOOL, VIEWER_URL_KEY,
};
use crate::AppError;

/// Whether frame processing should continue after an event.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Consumes the event stream of one run.
pub struct StreamConsumer {
    session_id: String,
    api: ApiClient,
    shared: Arc<RunShared>,
    cancel: CancellationToken,
    poll_cancel: CancellationToken,
}

impl StreamConsumer {
    /// Build a consumer for the given session.
    ///
    /// `cancel` stops this task; `poll_cancel` is the poller's token,
    /// fired here when the terminal frame arrives or the stream dies.
    #[must_use]
    pub fn new(
        session_id: String,
        api: ApiClient,
        shared: Arc<RunShared>,
        cancel: CancellationToken,
        poll_cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            api,
            shared,
            cancel,
            poll_cancel,
        }
    }

    /// Spawn the consumer task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        let span = info_span!("stream_consumer", session_id = %self.session_id);
        tokio::spawn(self.run().instrument(span))
    }

    async fn run(self) {
        let response = match self.api.open_stream(&self.session_id).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "failed to open event stream");
                self.end_with_error(&format!("Connection error: {err}"))
                    .await;
                return;
            }
        };

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let mut framed = FramedRead::new(StreamReader::new(body), SseCodec::new());

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    debug!("stream consumer cancelled");
                    break;
                }

                item = framed.next() => match item {
                    None => {
                        // Premature EOF — the terminal frame never came.
                        self.end_with_error("Connection error! Ending stream").await;
                        break;
                    }

                    Some(Err(err)) => {
                        warn!(error = %err, "stream transport error");
                        self.end_with_error(&format!("Connection error: {err}")).await;
                        break;
                    }

                    Some(Ok(payload)) => match parse_frame(&payload) {
                        Ok(event) => {
                            if self.apply(event).await == Flow::Stop {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, raw_frame = %payload, "skipping malformed frame");
                        }
                    },
                },
            }
        }
    }

    /// Apply one classified event to the shared state.
    async fn apply(&self, event: RunEvent) -> Flow {
        match event {
            RunEvent::Content { text, metadata } => {
                self.shared
                    .transcript
                    .write()
                    .await
                    .append_assistant(&text, metadata);
            }

            RunEvent::ToolStarted { text, metadata } => {
                if let Some(url) = metadata.get(VIEWER_URL_KEY).and_then(|v| v.as_str()) {
                    self.shared.set_viewer_url(Some(url.to_owned()));
                }
                if tool_name(&metadata) == Some(MANUAL_LOGIN_TOOL) {
                    self.shared.set_resume_available(true);
                }
                self.shared
                    .transcript
                    .write()
                    .await
                    .push(Message::tool_running(text, metadata));
            }

            RunEvent::ToolCompleted { text, metadata } => {
                if tool_name(&metadata) == Some(MANUAL_LOGIN_TOOL) {
                    self.shared.set_resume_available(false);
                }
                let failed = flag_is_set(metadata.get("tool_call_error"));
                let matched = self.shared.transcript.write().await.complete_latest_running(
                    Role::Tool,
                    failed,
                    &text,
                    metadata,
                );
                if !matched {
                    // No running tool entry — the frame is dropped.
                    debug!("tool completion frame without a running tool entry");
                }
            }

            RunEvent::ToolFailed { text, metadata } => {
                let mut transcript = self.shared.transcript.write().await;
                let matched = transcript.complete_latest_running(
                    Role::Tool,
                    true,
                    &text,
                    metadata.clone(),
                );
                if !matched {
                    transcript.push_system_error(&text, metadata);
                }
            }

            RunEvent::DiagnosticStarted { text, metadata } => {
                self.shared
                    .transcript
                    .write()
                    .await
                    .push(Message::diagnostic_running(text, metadata));
            }

            RunEvent::DiagnosticCompleted { text, metadata } => {
                let failed = flag_is_set(metadata.get("error"));
                let matched = self.shared.transcript.write().await.complete_latest_running(
                    Role::Diagnostic,
                    failed,
                    &text,
                    metadata,
                );
                if !matched {
                    debug!("diagnostic completion frame without a running entry");
                }
            }

            RunEvent::UserInputRequested {
                prompt,
                action_id,
                ttl_seconds,
                metadata,
            } => {
                self.await_user_input(prompt, action_id, ttl_seconds, metadata)
                    .await;
            }

            RunEvent::RunCompleted { text, metadata } => {
                self.shared
                    .transcript
                    .write()
                    .await
                    .push(Message::system(text, metadata));
                self.finish_run().await;
                return Flow::Stop;
            }

            RunEvent::Other {
                kind,
                text,
                metadata,
            } => {
                debug!(kind, "unrecognized frame type, recording as system entry");
                self.shared
                    .transcript
                    .write()
                    .await
                    .push(Message::system(text, metadata));
            }
        }
        Flow::Continue
    }

    /// Handle a `UserInput` frame: record the prompt, suspend on the
    /// rendezvous, and on resolution append the response and submit it
    /// to the backend (best-effort).
    ///
    /// The wait races the run's cancellation token, so teardown releases
    /// a consumer suspended here even when the request has no TTL.
    async fn await_user_input(
        &self,
        prompt: String,
        action_id: String,
        ttl_seconds: Option<u64>,
        metadata: Metadata,
    ) {
        self.shared
            .transcript
            .write()
            .await
            .push(Message::assistant(prompt.clone(), metadata));

        let outcome = tokio::select! {
            biased;

            () = self.cancel.cancelled() => {
                // Clear a slot that registered after the teardown reject.
                self.shared.rendezvous.reject("run torn down");
                Err(AppError::ActionCancelled("run torn down".into()))
            }

            result = self
                .shared
                .rendezvous
                .request(&action_id, &prompt, ttl_seconds) => result,
        };

        match outcome {
            Ok(response) => {
                self.shared
                    .transcript
                    .write()
                    .await
                    .push(Message::user(response.clone()));

                let submission = ActionSubmission {
                    session_id: self.session_id.clone(),
                    action_id,
                    message: response,
                };
                if let Err(err) = self.api.submit_action(&submission).await {
                    warn!(error = %err, "action submission failed, stream continues");
                }
            }
            Err(AppError::ActionTimeout(reason)) => {
                info!(action_id, reason, "action request timed out, stream continues");
            }
            Err(AppError::ActionCancelled(reason)) => {
                info!(action_id, reason, "action request cancelled, stream continues");
            }
            Err(err) => {
                warn!(action_id, error = %err, "action rendezvous failed");
            }
        }
    }

    /// Terminal-frame teardown: stop the poller, take one final
    /// authoritative snapshot, and mark the run inactive.
    async fn finish_run(&self) {
        self.shared.set_streaming(false);
        self.shared.set_resume_available(false);
        self.poll_cancel.cancel();

        match self.api.fetch_state(&self.session_id).await {
            Ok(snapshot) => {
                *self.shared.snapshot.write().await = Some(snapshot);
            }
            Err(err) => {
                warn!(error = %err, "final state fetch failed");
            }
        }
        info!("run complete, stream closed");
    }

    /// Connection-level failure teardown: one system error entry, run
    /// inactive, poller stopped.
    async fn end_with_error(&self, text: &str) {
        self.shared
            .transcript
            .write()
            .await
            .push_system_error(text, Metadata::new());
        self.shared.set_streaming(false);
        self.shared.set_resume_available(false);
        self.poll_cancel.cancel();
    }
}

/// Extract `metadata.tool_name` as a string.
fn tool_name(metadata: &Metadata) -> Option<&str> {
    metadata.get("tool_name").and_then(|v| v.as_str())
}
