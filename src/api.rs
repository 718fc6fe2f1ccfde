//! REST and stream client for the backend agent service.

use std::time::Duration;

use tracing::debug;

use crate::config::ClientConfig;
use crate::models::session::{ActionSubmission, SessionCreated, SessionRequest};
use crate::models::snapshot::StateSnapshot;
use crate::{AppError, Result};

/// Thin typed wrapper over the backend's REST and stream endpoints.
///
/// One client serves the whole supervisor lifetime. Plain REST calls
/// carry a per-request timeout; the event stream request does not, as
/// it stays open for the duration of a run.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl ApiClient {
    /// Build a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            base_url: config.backend_url.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
        })
    }

    /// Backend base URL, normalized without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /sessions` — create a session and return its id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionCreate` on any transport or HTTP
    /// failure; the run must not be started.
    pub async fn create_session(&self, request: &SessionRequest) -> Result<String> {
        let url = format!("{}/sessions", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|err| AppError::SessionCreate(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::SessionCreate(format!(
                "backend returned {}",
                response.status()
            )));
        }

        let created: SessionCreated = response
            .json()
            .await
            .map_err(|err| AppError::SessionCreate(format!("invalid response body: {err}")))?;
        debug!(session_id = %created.session_id, "session created");
        Ok(created.session_id)
    }

    /// `POST /sessions/{id}/run` — launch execution.
    ///
    /// # Errors
    ///
    /// Returns `AppError::RunStart` on any transport or HTTP failure.
    pub async fn start_run(&self, session_id: &str) -> Result<()> {
        let url = format!("{}/sessions/{session_id}/run", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|err| AppError::RunStart(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::RunStart(format!(
                "backend returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// `GET /sessions/{id}/stream` — open the live event stream.
    ///
    /// Returns the raw response; the caller frames its byte stream.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Stream` on connection or HTTP failure.
    pub async fn open_stream(&self, session_id: &str) -> Result<reqwest::Response> {
        let url = format!("{}/sessions/{session_id}/stream", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| AppError::Stream(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Stream(format!(
                "backend returned {}",
                response.status()
            )));
        }
        Ok(response)
    }

    /// `GET /sessions/{id}/state` — fetch the authoritative snapshot.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http`; poll failures are logged by the
    /// caller and never fatal.
    pub async fn fetch_state(&self, session_id: &str) -> Result<StateSnapshot> {
        let url = format!("{}/sessions/{session_id}/state", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|err| AppError::Http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Http(format!(
                "state fetch returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|err| AppError::Http(format!("invalid state body: {err}")))
    }

    /// `POST /sessions/{id}/stop` — best-effort run cancellation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http`; the caller logs and continues teardown.
    pub async fn stop_run(&self, session_id: &str) -> Result<()> {
        let url = format!("{}/sessions/{session_id}/stop", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|err| AppError::Http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Http(format!(
                "stop returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// `GET /sessions/{id}/resume` — resume a paused manual-login step.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http`; failures are logged, never surfaced
    /// to the transcript.
    pub async fn resume(&self, session_id: &str) -> Result<()> {
        let url = format!("{}/sessions/{session_id}/resume", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|err| AppError::Http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Http(format!(
                "resume returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// `POST /actions` — submit a human response to a pending request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http`; submission failures are logged and the
    /// stream continues regardless.
    pub async fn submit_action(&self, submission: &ActionSubmission) -> Result<()> {
        let url = format!("{}/actions", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(submission)
            .send()
            .await
            .map_err(|err| AppError::Http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Http(format!(
                "action submission returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
