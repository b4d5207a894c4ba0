use std::path::PathBuf;

use clap::Parser;
use ocbridge_core::api::AppConfig;

/// Serve an OpenAI-compatible chat completion API backed by the opencode CLI.
#[derive(Parser, Debug, Default)]
#[command(name = "ocbridge", version, about)]
pub struct Args {
    /// Config file; defaults to ~/.ocbridge/config.toml, then ./config.toml.
    #[arg(long, env = "OCBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Model passed to `opencode --model`.
    #[arg(long)]
    pub model: Option<String>,

    /// opencode executable name or path.
    #[arg(long)]
    pub opencode_bin: Option<String>,

    /// Log filter, e.g. "debug" or "ocbridge_core=trace".
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Flags given on the command line win over the config file and environment.
    pub fn apply_to(&self, cfg: &mut AppConfig) {
        if let Some(host) = &self.host {
            cfg.http_server.host = host.clone();
        }
        if let Some(port) = self.port {
            cfg.http_server.port = port;
        }
        if let Some(model) = &self.model {
            cfg.opencode.model = model.clone();
        }
        if let Some(bin) = &self.opencode_bin {
            cfg.opencode.binary = bin.clone();
        }
        if let Some(level) = &self.log_level {
            cfg.logging.level = level.clone();
        }
    }
}
