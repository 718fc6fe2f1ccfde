//! Shared run state read by the rendering layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::RwLock;

use crate::models::message::Message;
use crate::models::snapshot::StateSnapshot;
use crate::rendezvous::{ActionRendezvous, PendingAction};
use crate::transcript::TranscriptStore;

/// State shared between the supervisor, the stream consumer, the state
/// poller, and the rendering layer.
///
/// The core is the only writer; everything handed out is a clone or a
/// flag read. The transcript and snapshot are deliberately independent,
/// eventually-consistent views — they are never merged.
#[derive(Default)]
pub struct RunShared {
    /// Live transcript, mutated only by the stream consumer and the
    /// supervisor.
    pub transcript: RwLock<TranscriptStore>,
    /// Latest authoritative snapshot; fully replaced on each poll.
    pub snapshot: RwLock<Option<StateSnapshot>>,
    /// Single-slot human-action broker.
    pub rendezvous: ActionRendezvous,
    streaming: AtomicBool,
    resume_available: AtomicBool,
    resuming: AtomicBool,
    viewer_url: Mutex<Option<String>>,
}

impl RunShared {
    /// Fresh state with an empty transcript and no snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run is currently streaming events.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    /// Flip the streaming flag.
    pub fn set_streaming(&self, active: bool) {
        self.streaming.store(active, Ordering::SeqCst);
    }

    /// Whether the manual-login tool is waiting and the run can be
    /// resumed.
    #[must_use]
    pub fn resume_available(&self) -> bool {
        self.resume_available.load(Ordering::SeqCst)
    }

    /// Flip the resume-available flag.
    pub fn set_resume_available(&self, available: bool) {
        self.resume_available.store(available, Ordering::SeqCst);
    }

    /// Whether a resume call is currently in flight.
    #[must_use]
    pub fn is_resuming(&self) -> bool {
        self.resuming.load(Ordering::SeqCst)
    }

    /// Flip the resuming flag.
    pub fn set_resuming(&self, resuming: bool) {
        self.resuming.store(resuming, Ordering::SeqCst);
    }

    /// Remote desktop viewer URL announced by the agent, if any.
    #[must_use]
    pub fn viewer_url(&self) -> Option<String> {
        self.viewer_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record or clear the remote viewer URL.
    pub fn set_viewer_url(&self, url: Option<String>) {
        *self
            .viewer_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = url;
    }

    /// Cloned transcript entries in arrival order.
    pub async fn transcript_messages(&self) -> Vec<Message> {
        self.transcript.read().await.messages().to_vec()
    }

    /// Cloned latest snapshot, if one has been fetched.
    pub async fn snapshot(&self) -> Option<StateSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Descriptor of the outstanding human-action request, if any.
    #[must_use]
    pub fn pending_action(&self) -> Option<PendingAction> {
        self.rendezvous.pending()
    }
}
