use serde::{Deserialize, Serialize};

use crate::transcode::DEFAULT_PROVIDER_TAG;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub http_server: HttpServerConfig,

    #[serde(default)]
    pub opencode: OpencodeConfig,

    #[serde(default)]
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "ocbridge_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_host")]
    pub host: String,

    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    4141
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpencodeConfig {
    /// Bare command name or absolute path.
    #[serde(default = "default_opencode_binary")]
    pub binary: String,

    /// Passed as `--model`; the model named in a request is only echoed back.
    #[serde(default = "default_opencode_model")]
    pub model: String,

    /// Searched before the built-in install locations.
    #[serde(default)]
    pub extra_search_dirs: Vec<String>,

    /// Provider name that marks the model banner line inside the output region.
    #[serde(default = "default_provider_tag")]
    pub provider_tag: String,

    #[serde(default)]
    pub working_dir: Option<String>,
}

fn default_opencode_binary() -> String {
    "opencode".to_string()
}

fn default_opencode_model() -> String {
    "github-copilot/gpt-4.1".to_string()
}

fn default_provider_tag() -> String {
    DEFAULT_PROVIDER_TAG.to_string()
}

impl Default for OpencodeConfig {
    fn default() -> Self {
        Self {
            binary: default_opencode_binary(),
            model: default_opencode_model(),
            extra_search_dirs: Vec::new(),
            provider_tag: default_provider_tag(),
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Time between SIGTERM and kill when a request is abandoned.
    #[serde(default = "default_abort_grace_ms")]
    pub abort_grace_ms: u64,

    #[serde(default = "default_stderr_capture_bytes")]
    pub stderr_capture_bytes: usize,

    #[serde(default = "default_read_buffer_bytes")]
    pub read_buffer_bytes: usize,
}

fn default_abort_grace_ms() -> u64 {
    2_000
}

fn default_stderr_capture_bytes() -> usize {
    64 * 1024
}

fn default_read_buffer_bytes() -> usize {
    8 * 1024
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            abort_grace_ms: default_abort_grace_ms(),
            stderr_capture_bytes: default_stderr_capture_bytes(),
            read_buffer_bytes: default_read_buffer_bytes(),
        }
    }
}
