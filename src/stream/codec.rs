//! SSE decoder for the run event stream.
//!
//! Frames a `text/event-stream` byte flow into one payload string per
//! event: `data:` lines accumulate (joined with `\n` for multi-line
//! payloads) and the blank line dispatches the event. Comment lines and
//! other SSE fields (`event:`, `id:`, `retry:`) are ignored — the
//! backend only ever populates `data`.
//!
//! Use as the codec parameter for [`tokio_util::codec::FramedRead`]
//! over a [`tokio_util::io::StreamReader`] wrapping the response body.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Maximum line length accepted by the stream decoder: 1 MiB.
///
/// Longer lines make [`SseCodec::decode`] return [`AppError::Stream`]
/// rather than allocating unbounded memory for a single frame.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Decoder yielding one event payload per SSE event.
#[derive(Debug)]
pub struct SseCodec {
    lines: LinesCodec,
    data: Vec<String>,
}

impl SseCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_LINE_BYTES),
            data: Vec::new(),
        }
    }

    /// Feed one line into the accumulator; returns a finished event
    /// payload when the line terminates one.
    fn take_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(self.data.drain(..).collect::<Vec<_>>().join("\n"));
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_owned());
        }
        // Comments (leading ':') and non-data fields are skipped.
        None
    }
}

impl Default for SseCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for SseCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next complete event from `src`.
    ///
    /// Returns `Ok(None)` while the event is still buffering.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        while let Some(line) = self.lines.decode(src).map_err(map_codec_error)? {
            if let Some(payload) = self.take_line(&line) {
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    /// Flush a trailing unterminated event at EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        while let Some(line) = self.lines.decode_eof(src).map_err(map_codec_error)? {
            if let Some(payload) = self.take_line(&line) {
                return Ok(Some(payload));
            }
        }
        if self.data.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.data.drain(..).collect::<Vec<_>>().join("\n")))
        }
    }
}

/// Map a [`LinesCodecError`] to an [`AppError`].
fn map_codec_error(e: LinesCodecError) -> AppError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            AppError::Stream(format!("line too long: exceeded {MAX_LINE_BYTES} bytes"))
        }
        LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
    }
}
