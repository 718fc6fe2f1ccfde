//! Run parameters and outbound session payloads.

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Raw run parameters as supplied by the rendering layer. Whitespace is
/// tolerated; [`RunParams::into_request`] trims and validates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunParams {
    /// Target URL or host to assess.
    pub target: String,
    /// Natural-language objective for the agent.
    pub goal: String,
    /// Model identifier the backend should run.
    pub model: String,
    /// Optional URL the agent uses to verify success.
    pub verify_url: String,
    /// Optional string the agent looks for at `verify_url`.
    pub verify_str: String,
    /// Optional login username for authenticated targets.
    pub username: String,
    /// Optional login password for authenticated targets.
    pub password: String,
}

impl RunParams {
    /// Trim and validate the parameters into an outbound payload.
    ///
    /// Empty optional fields are dropped from the payload entirely.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `target`, `goal`, or `model`
    /// is empty after trimming.
    pub fn into_request(self) -> Result<SessionRequest> {
        let target = self.target.trim().to_owned();
        let goal = self.goal.trim().to_owned();
        let model = self.model.trim().to_owned();

        if target.is_empty() || goal.is_empty() || model.is_empty() {
            return Err(AppError::Validation(
                "target, goal, and model must not be empty".into(),
            ));
        }

        let optional = |value: &str| -> Option<String> {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        };

        Ok(SessionRequest {
            target,
            goal,
            model,
            verify_url: optional(&self.verify_url),
            verify_str: optional(&self.verify_str),
            username: optional(&self.username),
            password: optional(&self.password),
        })
    }
}

/// Validated body for `POST /sessions`. Optional fields are omitted
/// from the JSON when absent.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionRequest {
    /// Target URL or host to assess.
    pub target: String,
    /// Natural-language objective for the agent.
    pub goal: String,
    /// Model identifier the backend should run.
    pub model: String,
    /// Optional verification URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_url: Option<String>,
    /// Optional verification string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_str: Option<String>,
    /// Optional login username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Optional login password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl SessionRequest {
    /// Text of the transcript entry that initiates a run.
    #[must_use]
    pub fn initiating_text(&self) -> String {
        format!("Target: {}\nGoal: {}", self.target, self.goal)
    }
}

/// Response body of `POST /sessions`.
#[derive(Debug, Deserialize)]
pub struct SessionCreated {
    /// Server-assigned opaque session identifier.
    pub session_id: String,
}

/// Body for `POST /actions` — a human response to a pending
/// `UserInput` request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ActionSubmission {
    /// Session the action belongs to.
    pub session_id: String,
    /// Server-issued identifier of the outstanding request.
    pub action_id: String,
    /// The operator's response text.
    pub message: String,
}
