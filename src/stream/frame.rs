//! Run event taxonomy.
//!
//! Each SSE payload is a JSON envelope `{type, data, metadata}`. The
//! `type` tag dispatches into the closed [`RunEvent`] variant set, with
//! [`RunEvent::Other`] absorbing anything unrecognized so a new server
//! event type can never break the stream.

use serde::Deserialize;
use serde_json::Value;

use crate::models::message::Metadata;
use crate::{AppError, Result};

/// Tool name the agent uses for operator-driven manual login. Seeing it
/// start makes the run resumable; seeing it complete clears that.
pub const MANUAL_LOGIN_TOOL: &str = "Playwright.alogin_manual";

/// Metadata key carrying the remote desktop viewer URL.
pub const VIEWER_URL_KEY: &str = "novnc_url";

/// Envelope shared by every stream frame.
#[derive(Debug, Deserialize)]
struct FrameEnvelope {
    /// Event type tag.
    #[serde(rename = "type")]
    kind: String,
    /// Display payload; usually a string, coerced when not.
    #[serde(default)]
    data: Value,
    /// Event-specific metadata.
    #[serde(default)]
    metadata: Metadata,
}

/// One classified stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// `RunResponseContent` — assistant text delta.
    Content {
        /// Text delta to append.
        text: String,
        /// Metadata to shallow-merge into the assistant entry.
        metadata: Metadata,
    },
    /// `ToolCallStarted` — a tool invocation began.
    ToolStarted {
        /// Tool announcement text.
        text: String,
        /// Tool metadata (`tool_name`, viewer URL, args…).
        metadata: Metadata,
    },
    /// `ToolCallCompleted` — the running tool finished.
    ToolCompleted {
        /// Completion text.
        text: String,
        /// Completion metadata (`tool_call_error` flags failure).
        metadata: Metadata,
    },
    /// `ToolCallFailed` or `Error` — the running tool failed, or a
    /// server-side error with no tool to attach it to.
    ToolFailed {
        /// Failure text.
        text: String,
        /// Failure metadata.
        metadata: Metadata,
    },
    /// `DiagnosticStart` — a diagnostic probe began.
    DiagnosticStarted {
        /// Probe announcement text.
        text: String,
        /// Probe metadata.
        metadata: Metadata,
    },
    /// `DiagnosticComplete` — the running probe finished.
    DiagnosticCompleted {
        /// Completion text.
        text: String,
        /// Completion metadata (`error` flags failure).
        metadata: Metadata,
    },
    /// `UserInput` — the agent blocks on a human response.
    UserInputRequested {
        /// Prompt shown to the operator.
        prompt: String,
        /// Server-issued request identifier.
        action_id: String,
        /// Optional time-to-live in seconds.
        ttl_seconds: Option<u64>,
        /// Request metadata.
        metadata: Metadata,
    },
    /// `RunComplete` — terminal frame; the run is over.
    RunCompleted {
        /// Completion summary text.
        text: String,
        /// Completion metadata.
        metadata: Metadata,
    },
    /// Any unrecognized type — rendered as a generic system entry.
    Other {
        /// Original type tag.
        kind: String,
        /// Display text.
        text: String,
        /// Frame metadata.
        metadata: Metadata,
    },
}

/// Parse one SSE payload into a classified event.
///
/// # Errors
///
/// Returns `AppError::Stream` when the payload is not valid envelope
/// JSON or a `UserInput` frame lacks its `action_id`. Callers log and
/// skip such frames; they never terminate the stream.
pub fn parse_frame(payload: &str) -> Result<RunEvent> {
    let envelope: FrameEnvelope = serde_json::from_str(payload)
        .map_err(|err| AppError::Stream(format!("malformed frame: {err}")))?;

    let text = coerce_text(&envelope.data);
    let metadata = envelope.metadata;

    let event = match envelope.kind.as_str() {
        "RunResponseContent" => RunEvent::Content { text, metadata },
        "ToolCallStarted" => RunEvent::ToolStarted { text, metadata },
        "ToolCallCompleted" => RunEvent::ToolCompleted { text, metadata },
        "ToolCallFailed" | "Error" => RunEvent::ToolFailed { text, metadata },
        "DiagnosticStart" => RunEvent::DiagnosticStarted { text, metadata },
        "DiagnosticComplete" => RunEvent::DiagnosticCompleted { text, metadata },
        "UserInput" => {
            let action_id = metadata
                .get("action_id")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| {
                    AppError::Stream("UserInput frame without action_id".into())
                })?;
            let ttl_seconds = metadata.get("TTL").and_then(Value::as_u64);
            RunEvent::UserInputRequested {
                prompt: text,
                action_id,
                ttl_seconds,
                metadata,
            }
        }
        "RunComplete" => RunEvent::RunCompleted { text, metadata },
        other => RunEvent::Other {
            kind: other.to_owned(),
            text,
            metadata,
        },
    };
    Ok(event)
}

/// Render the `data` field as display text. Strings pass through;
/// `null` becomes empty; anything else keeps its JSON rendering.
fn coerce_text(data: &Value) -> String {
    match data {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Interpret a metadata value as a failure flag with JS-style
/// truthiness: absent, `null`, `false`, `""`, and `0` are false.
#[must_use]
pub fn flag_is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null | Value::Bool(false)) => false,
        Some(Value::Bool(true)) => true,
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0) != 0.0,
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}
