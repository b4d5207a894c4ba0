use crate::error::DecodeError;

use super::ansi::strip_sgr;
use super::decoder::ByteDecoder;
use super::region::{LineAction, MarkerFilter, RegionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    /// The end marker was seen; further bytes are ignored.
    Done,
}

impl Progress {
    pub fn is_done(self) -> bool {
        matches!(self, Progress::Done)
    }
}

/// Byte stream → region-filtered characters.
///
/// Characters are only released once their line is complete, because the
/// marker and noise decisions are made per line.
#[derive(Debug)]
pub struct Transcoder {
    decoder: ByteDecoder,
    filter: MarkerFilter,
    line: String,
    state: RegionState,
    chars_emitted: u64,
    lossy_chars: u64,
}

impl Transcoder {
    pub fn new(filter: MarkerFilter) -> Self {
        Self {
            decoder: ByteDecoder::new(),
            filter,
            line: String::with_capacity(256),
            state: RegionState::default(),
            chars_emitted: 0,
            lossy_chars: 0,
        }
    }

    pub fn state(&self) -> RegionState {
        self.state
    }

    pub fn chars_emitted(&self) -> u64 {
        self.chars_emitted
    }

    /// Number of U+FFFD substitutions made for invalid input bytes.
    pub fn lossy_chars(&self) -> u64 {
        self.lossy_chars
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.decoder.consumed()
    }

    /// Feed one byte, appending any released characters to `out`.
    pub fn push_byte(&mut self, byte: u8, out: &mut String) -> Progress {
        if self.state.is_done() {
            return Progress::Done;
        }
        for decoded in self.decoder.feed(byte) {
            if decoded.lossy {
                self.lossy_chars += 1;
            }
            if decoded.ch == '\n' {
                if self.dispatch_line(out).is_done() {
                    return Progress::Done;
                }
            } else {
                self.line.push(decoded.ch);
            }
        }
        Progress::Continue
    }

    pub fn push_bytes(&mut self, bytes: &[u8], out: &mut String) -> Progress {
        for byte in bytes {
            if self.push_byte(*byte, out).is_done() {
                return Progress::Done;
            }
        }
        Progress::Continue
    }

    /// End of stream: run the unterminated last line through the filter, then
    /// report a truncated multi-byte sequence if one is still pending.
    pub fn finish(&mut self, out: &mut String) -> Result<(), DecodeError> {
        let decoded = self.decoder.finish();
        if !self.state.is_done() && !self.line.is_empty() {
            self.dispatch_line(out);
        }
        self.line.clear();
        decoded
    }

    fn dispatch_line(&mut self, out: &mut String) -> Progress {
        let raw = std::mem::take(&mut self.line);
        let trimmed = raw.trim_end_matches(['\r', '\n']);
        let clean = strip_sgr(trimmed);

        let (next, action) = self.filter.step(self.state, &clean);
        self.state = next;
        let progress = match action {
            LineAction::Emit(text) => {
                out.push_str(text);
                out.push('\n');
                self.chars_emitted += text.chars().count() as u64 + 1;
                Progress::Continue
            }
            LineAction::Discard(reason) => {
                tracing::trace!(target: "ocbridge.transcode", ?reason, "line discarded");
                Progress::Continue
            }
            LineAction::Stop => Progress::Done,
        };

        drop(clean);
        // Reuse the allocation for the next line.
        self.line = raw;
        self.line.clear();
        progress
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(MarkerFilter::default())
    }
}
