//! Live event-stream handling: SSE framing, event taxonomy, and the
//! consumer task that applies frames to the shared run state.

pub mod codec;
pub mod consumer;
pub mod frame;
