//! Authoritative session-state snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Periodically polled external view of run progress.
///
/// The task/result tree is carried opaquely in `extra`; only freshness
/// matters to the core. Each successful poll fully replaces the prior
/// snapshot — snapshots are never merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct StateSnapshot {
    /// Session the snapshot describes.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Target under assessment.
    #[serde(default)]
    pub target: Option<String>,
    /// Run objective.
    #[serde(default)]
    pub goal: Option<String>,
    /// Hierarchical task tree and any other server-provided fields,
    /// kept opaque.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
