//! Incremental UTF-8 decoding of a subprocess byte stream.
//!
//! Bytes arrive one at a time and in arbitrary read-sized chunks, so a
//! multi-byte character may be split across reads. The decoder keeps at most
//! one partial sequence (never more than 4 bytes) and resolves it as soon as
//! the sequence is either complete or provably invalid.
use std::ops::Range;

use crate::error::DecodeError;

/// Longest UTF-8 encoding of a scalar value.
const MAX_SEQUENCE_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedChar {
    pub ch: char,
    /// Stream offsets of the bytes this character was decoded from.
    pub span: Range<u64>,
    /// `ch` is U+FFFD standing in for bytes that can never form a character.
    pub lossy: bool,
}

/// Characters resolved by a single [`ByteDecoder::feed`] call.
///
/// At most two: a replacement for an invalidated prefix, then the byte that
/// invalidated it when that byte decodes on its own.
#[derive(Debug, Default)]
pub struct Fed {
    slots: [Option<DecodedChar>; 2],
    next: usize,
}

impl Fed {
    fn push(&mut self, decoded: DecodedChar) {
        if self.slots[0].is_none() {
            self.slots[0] = Some(decoded);
        } else {
            self.slots[1] = Some(decoded);
        }
    }
}

impl Iterator for Fed {
    type Item = DecodedChar;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.slots.len() {
            let slot = self.slots[self.next].take();
            self.next += 1;
            if slot.is_some() {
                return slot;
            }
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct ByteDecoder {
    pending: [u8; MAX_SEQUENCE_LEN],
    pending_len: usize,
    /// Stream offset of `pending[0]`.
    pending_start: u64,
    consumed: u64,
}

impl ByteDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_len > 0
    }

    /// Total number of bytes fed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Feed one byte.
    ///
    /// Incomplete prefixes are held back. A prefix that the new byte makes
    /// impossible to complete is flushed as one U+FFFD and the new byte is
    /// decoded afresh, so a lead byte arriving after a truncated sequence still
    /// starts its own character.
    pub fn feed(&mut self, byte: u8) -> Fed {
        let offset = self.consumed;
        self.consumed += 1;

        let mut out = Fed::default();
        if self.pending_len == 0 {
            self.pending_start = offset;
        }
        self.pending[self.pending_len] = byte;
        self.pending_len += 1;

        match std::str::from_utf8(&self.pending[..self.pending_len]) {
            Ok(s) => {
                if let Some(ch) = s.chars().next() {
                    out.push(self.take_char(ch, false));
                }
            }
            Err(e) if e.error_len().is_none() => {
                // Valid prefix of a longer sequence; wait for more bytes.
            }
            Err(_) if self.pending_len == 1 => {
                // Stray continuation byte or a byte that never appears in UTF-8.
                out.push(self.take_char(char::REPLACEMENT_CHARACTER, true));
            }
            Err(_) => {
                // The held prefix was valid before this byte arrived, so only the
                // new byte is at fault: flush the prefix, then retry the byte alone.
                self.pending_len -= 1;
                out.push(self.take_char(char::REPLACEMENT_CHARACTER, true));
                self.consumed -= 1;
                for decoded in self.feed(byte) {
                    out.push(decoded);
                }
            }
        }
        out
    }

    /// Signal end-of-stream. A still-pending partial sequence is reported rather
    /// than silently replaced.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        if self.pending_len == 0 {
            return Ok(());
        }
        let bytes = self.pending[..self.pending_len].to_vec();
        self.pending_len = 0;
        Err(DecodeError::IncompleteTrailingSequence { bytes })
    }

    fn take_char(&mut self, ch: char, lossy: bool) -> DecodedChar {
        let start = self.pending_start;
        let end = start + self.pending_len as u64;
        self.pending_len = 0;
        DecodedChar {
            ch,
            span: start..end,
            lossy,
        }
    }
}
