//! Output transcoding and process driving for the opencode OpenAI bridge.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod runner;
pub mod transcode;
pub mod util;
