//! Output transcoding: subprocess bytes → clean, region-filtered characters.
//!
//! Data flow: [`ByteDecoder`] → line buffer → [`strip_sgr`] → [`MarkerFilter`]
//! → emitted characters. [`Transcoder`] composes the stages.
mod ansi;
mod decoder;
mod pipeline;
mod region;

pub use ansi::strip_sgr;
pub use decoder::{ByteDecoder, DecodedChar, Fed};
pub use pipeline::{Progress, Transcoder};
pub use region::{
    DiscardReason, LineAction, MarkerFilter, RegionState, DEFAULT_PROVIDER_TAG, END_MARKER,
    NOISE_SENTINEL, START_MARKER,
};
