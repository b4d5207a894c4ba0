mod abort;
mod completion;
mod control;
mod io_pump;
mod traits;
pub mod types;

pub use abort::{terminate_session, SessionGuard};
pub use completion::{produce_completion, CompletionDriver, CompletionOptions, CompletionStream};
pub use traits::{RunnerPlugin, RunnerSession};
pub use types::{RunOutcome, RunnerStartArgs, Signal};
