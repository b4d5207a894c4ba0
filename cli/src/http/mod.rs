//! OpenAI-compatible HTTP surface over the completion driver.

pub mod middleware;
pub mod models;
pub mod prompt;
pub mod routes;
pub mod server;
pub mod state;

pub use models::*;
pub use server::*;
pub use state::*;
