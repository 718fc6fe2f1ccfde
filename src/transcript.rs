//! Transcript store — the ordered, append/merge message sequence.
//!
//! Pure data structure with no I/O. The stream consumer is its only
//! writer; the rendering layer reads cloned views through
//! [`crate::state::RunShared`].
//!
//! Ordering invariant: strictly append-only, except that the most
//! recent `assistant` entry may grow in place while text deltas stream
//! in, and the most recent `running` `tool`/`diagnostic` entry of
//! matching role may be flipped in place to `completed`/`failed`.

use crate::models::message::{ActivityStatus, Message, Metadata, Role};

/// Shallow-merge `incoming` into `target`; later keys win.
fn merge_metadata(target: &mut Metadata, incoming: Metadata) {
    for (key, value) in incoming {
        target.insert(key, value);
    }
}

/// Ordered transcript of one run.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    messages: Vec<Message>,
}

impl TranscriptStore {
    /// Empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard everything and seed the transcript with the initiating
    /// entry of a new run.
    pub fn reset_with(&mut self, initial: Message) {
        self.messages.clear();
        self.messages.push(initial);
    }

    /// Append an entry unconditionally.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Apply an assistant text delta.
    ///
    /// If the last entry is an `assistant` message its text is extended
    /// and its metadata shallow-merged (later keys win); otherwise a new
    /// assistant entry is appended.
    pub fn append_assistant(&mut self, delta: &str, metadata: Metadata) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == Role::Assistant {
                last.text.push_str(delta);
                merge_metadata(&mut last.metadata, metadata);
                return;
            }
        }
        self.messages.push(Message::assistant(delta, metadata));
    }

    /// Complete the most recent `running` entry of `role`.
    ///
    /// Scans backward for the nearest matching entry, sets its status to
    /// `failed` or `completed`, records the completion text, and merges
    /// the metadata. Returns `false` when no running entry of that role
    /// exists — the caller drops the frame in that case.
    ///
    /// Correlation by backward scan assumes at most one running tool and
    /// one running diagnostic at a time; the wire protocol carries no
    /// call identifier on completion frames to do better.
    pub fn complete_latest_running(
        &mut self,
        role: Role,
        failed: bool,
        completion: &str,
        metadata: Metadata,
    ) -> bool {
        for message in self.messages.iter_mut().rev() {
            if message.role == role && message.is_running() {
                message.status = Some(if failed {
                    ActivityStatus::Failed
                } else {
                    ActivityStatus::Completed
                });
                message.completion = Some(completion.to_owned());
                merge_metadata(&mut message.metadata, metadata);
                return true;
            }
        }
        false
    }

    /// Append a system entry flagged as a terminal error.
    pub fn push_system_error(&mut self, text: &str, metadata: Metadata) {
        self.messages.push(Message::system_error(text, metadata));
    }

    /// All entries in arrival order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
