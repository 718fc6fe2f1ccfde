//! Transcript message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata attached to a transcript message: an open mapping of string
/// keys to arbitrary JSON values (tool name, tool output, node ids,
/// remote-viewer URL, TTL, error flags…).
pub type Metadata = Map<String, Value>;

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operator-originated entry (the initiating prompt or an action
    /// response).
    User,
    /// Agent narration, streamed as text deltas.
    Assistant,
    /// Client- or server-side status and error entries.
    System,
    /// One tool invocation by the agent.
    Tool,
    /// One diagnostic probe run by the agent.
    Diagnostic,
}

/// Progress state of a `tool` or `diagnostic` entry. Meaningless for
/// other roles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    /// Started, completion frame not yet seen.
    Running,
    /// Finished without a reported error.
    Completed,
    /// Finished with a reported error.
    Failed,
}

/// One transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Message {
    /// Entry author.
    pub role: Role,
    /// Accumulated display text. Grows in place for the most recent
    /// assistant entry while deltas stream in.
    pub text: String,
    /// Progress state for tool/diagnostic entries.
    pub status: Option<ActivityStatus>,
    /// Text delivered by the completion frame of a tool/diagnostic.
    pub completion: Option<String>,
    /// Open metadata map, shallow-merged across delta updates.
    #[serde(default)]
    pub metadata: Metadata,
    /// Marks terminal system-level errors.
    pub is_error: bool,
    /// Client-side arrival timestamp.
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn base(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            status: None,
            completion: None,
            metadata: Metadata::new(),
            is_error: false,
            created_at: Utc::now(),
        }
    }

    /// Operator-originated entry.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::base(Role::User, text)
    }

    /// Agent narration entry carrying stream metadata.
    #[must_use]
    pub fn assistant(text: impl Into<String>, metadata: Metadata) -> Self {
        let mut msg = Self::base(Role::Assistant, text);
        msg.metadata = metadata;
        msg
    }

    /// Plain system status entry.
    #[must_use]
    pub fn system(text: impl Into<String>, metadata: Metadata) -> Self {
        let mut msg = Self::base(Role::System, text);
        msg.metadata = metadata;
        msg
    }

    /// System entry flagged as a terminal error.
    #[must_use]
    pub fn system_error(text: impl Into<String>, metadata: Metadata) -> Self {
        let mut msg = Self::system(text, metadata);
        msg.is_error = true;
        msg
    }

    /// Tool invocation entry in the `running` state.
    #[must_use]
    pub fn tool_running(text: impl Into<String>, metadata: Metadata) -> Self {
        let mut msg = Self::base(Role::Tool, text);
        msg.status = Some(ActivityStatus::Running);
        msg.metadata = metadata;
        msg
    }

    /// Diagnostic probe entry in the `running` state.
    #[must_use]
    pub fn diagnostic_running(text: impl Into<String>, metadata: Metadata) -> Self {
        let mut msg = Self::base(Role::Diagnostic, text);
        msg.status = Some(ActivityStatus::Running);
        msg.metadata = metadata;
        msg
    }

    /// Whether this entry is a tool/diagnostic still awaiting its
    /// completion frame.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == Some(ActivityStatus::Running)
    }
}
