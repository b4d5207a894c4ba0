use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Per-user data directory: ~/.ocbridge
pub fn get_ocbridge_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".ocbridge"))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {}: {}", path.display(), e))?;
    toml::from_str::<AppConfig>(&s).map_err(|e| anyhow::anyhow!("parse {}: {}", path.display(), e))
}

/// Load configuration.
///
/// Priority: explicit path, then `~/.ocbridge/config.toml`, then
/// `./config.toml`, then built-in defaults. `OCBRIDGE_*` environment
/// variables are applied last.
pub fn load_default(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut cfg = match explicit {
        Some(path) => load_from_path(path)?,
        None => {
            let user_config = get_ocbridge_data_dir()
                .map(|dir| dir.join("config.toml"))
                .ok()
                .filter(|p| p.exists());
            let local_config = Path::new("config.toml");
            if let Some(path) = user_config {
                load_from_path(&path)?
            } else if local_config.exists() {
                load_from_path(local_config)?
            } else {
                AppConfig::default()
            }
        }
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

pub(crate) fn apply_env_overrides<F>(cfg: &mut AppConfig, get: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("OCBRIDGE_MODEL") {
        cfg.opencode.model = v;
    }
    if let Some(v) = non_empty("OCBRIDGE_BINARY") {
        cfg.opencode.binary = v;
    }
    if let Some(v) = non_empty("OCBRIDGE_PORT") {
        cfg.http_server.port = v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("OCBRIDGE_PORT is not a valid port: {v}"))?;
    }
    Ok(())
}
