#[allow(clippy::module_inception)]
pub mod error;
pub mod completion;

pub use completion::{CompletionError, DecodeError};
pub use error::{CliError, RunnerError};
