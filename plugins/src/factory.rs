use std::sync::Arc;

use ocbridge_core::backend::BackendStrategy;
use ocbridge_core::config::AppConfig;
use ocbridge_core::runner::{CompletionDriver, CompletionOptions};

use crate::backend::OpencodeBackendStrategy;

pub fn build_backend(cfg: &AppConfig) -> Arc<dyn BackendStrategy> {
    Arc::new(OpencodeBackendStrategy::from_config(&cfg.opencode))
}

/// The completion driver the HTTP server runs every request through.
pub fn build_driver(cfg: &AppConfig) -> CompletionDriver {
    CompletionDriver::new(build_backend(cfg), CompletionOptions::from_config(cfg))
}
