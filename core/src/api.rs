//! Stable re-exports for consumers (`cli`, `plugins`, and integration tests).
//!
//! Prefer importing from `ocbridge_core::api` instead of reaching into internal modules.

pub use crate::backend::{
    wrap_prompt, BackendPlan, BackendPlanRequest, BackendStrategy, WRAP_INSTRUCTION,
};
pub use crate::config::{
    load_default, AppConfig, ControlConfig, HttpServerConfig, LoggingConfig, OpencodeConfig,
};
pub use crate::error::{CliError, CompletionError, DecodeError, RunnerError};
pub use crate::runner::{
    produce_completion, CompletionDriver, CompletionOptions, CompletionStream, RunOutcome,
    RunnerPlugin, RunnerSession, RunnerStartArgs, Signal,
};
pub use crate::transcode::{MarkerFilter, Transcoder, END_MARKER, START_MARKER};
