//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Required run parameter is empty after trimming. Raised before
    /// any network call is made.
    Validation(String),
    /// `POST /sessions` failed — the run is aborted before launch.
    SessionCreate(String),
    /// `POST /sessions/{id}/run` failed — the session exists
    /// server-side but is never streamed.
    RunStart(String),
    /// Event-stream connection or framing failure. Ends the run; there
    /// is no automatic reconnect.
    Stream(String),
    /// Pending human action expired before a response arrived.
    ActionTimeout(String),
    /// Pending human action was cancelled by the user or by run
    /// teardown.
    ActionCancelled(String),
    /// Action rendezvous contract misuse (e.g. a second request while
    /// one is outstanding).
    Action(String),
    /// Auxiliary HTTP failure (state poll, stop, resume, action
    /// submission). Logged by callers, never fatal to the run.
    Http(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::SessionCreate(msg) => write!(f, "session create: {msg}"),
            Self::RunStart(msg) => write!(f, "run start: {msg}"),
            Self::Stream(msg) => write!(f, "stream: {msg}"),
            Self::ActionTimeout(msg) => write!(f, "action timeout: {msg}"),
            Self::ActionCancelled(msg) => write!(f, "action cancelled: {msg}"),
            Self::Action(msg) => write!(f, "action: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

// Required by the `tokio_util::codec::Decoder` contract.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
