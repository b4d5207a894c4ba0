//! Shared handler state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Local};
use ocbridge_core::api::{AppConfig, CompletionDriver};

/// Shared by all handlers; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub driver: CompletionDriver,
    pub config: Arc<AppConfig>,
    pub stats: Arc<RwLock<ServerStats>>,
}

impl AppState {
    pub fn new(driver: CompletionDriver, config: AppConfig) -> Self {
        Self {
            driver,
            config: Arc::new(config),
            stats: Arc::new(RwLock::new(ServerStats::new())),
        }
    }

    /// Model opencode is launched with; the one a client names is only echoed.
    pub fn model(&self) -> &str {
        &self.config.opencode.model
    }

    pub fn stats(&self) -> RwLockReadGuard<'_, ServerStats> {
        self.stats.read().unwrap_or_else(|e| e.into_inner())
    }

    fn stats_mut(&self) -> RwLockWriteGuard<'_, ServerStats> {
        self.stats.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record_request(&self, endpoint: &str) {
        self.stats_mut().increment_request(endpoint);
    }

    pub fn record_error(&self) {
        self.stats_mut().increment_error();
    }
}

pub struct ServerStats {
    pub requests_total: u64,
    pub requests_by_endpoint: HashMap<String, u64>,
    pub errors_total: u64,
    pub start_time: DateTime<Local>,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            requests_total: 0,
            requests_by_endpoint: HashMap::new(),
            errors_total: 0,
            start_time: Local::now(),
        }
    }

    pub fn increment_request(&mut self, endpoint: &str) {
        self.requests_total += 1;
        *self
            .requests_by_endpoint
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
    }

    pub fn increment_error(&mut self) {
        self.errors_total += 1;
    }

    pub fn uptime_seconds(&self) -> f64 {
        let now = Local::now();
        (now - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}
