pub mod opencode;

pub use ocbridge_core::runner::{RunOutcome, RunnerPlugin, RunnerSession, RunnerStartArgs, Signal};
