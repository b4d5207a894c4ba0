use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Result;

use ocbridge_core::api as core_api;
use ocbridge_core::config::OpencodeConfig;

use crate::runner::opencode::OpencodeRunnerPlugin;

/// Install locations checked after the PATH lookup, in order.
const COMMON_BIN_DIRS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin"];

/// Home-relative install locations; `~/.opencode/bin` is opencode's own installer target.
const HOME_BIN_DIRS: &[&str] = &[".opencode/bin", ".local/bin", "bin"];

pub struct OpencodeBackendStrategy {
    binary: String,
    model: String,
    extra_search_dirs: Vec<PathBuf>,
    working_dir: Option<String>,
}

impl OpencodeBackendStrategy {
    pub fn new(binary: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
            extra_search_dirs: Vec::new(),
            working_dir: None,
        }
    }

    pub fn from_config(cfg: &OpencodeConfig) -> Self {
        Self {
            binary: cfg.binary.clone(),
            model: cfg.model.clone(),
            extra_search_dirs: cfg.extra_search_dirs.iter().map(PathBuf::from).collect(),
            working_dir: cfg
                .working_dir
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Directories searched after PATH and prepended to the child's PATH.
    fn search_dirs(&self, home: Option<&Path>) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.extra_search_dirs.clone();
        dirs.extend(COMMON_BIN_DIRS.iter().map(PathBuf::from));
        if let Some(home) = home {
            dirs.extend(HOME_BIN_DIRS.iter().map(|d| home.join(d)));
        }
        dirs
    }
}

impl core_api::BackendStrategy for OpencodeBackendStrategy {
    fn name(&self) -> &str {
        "opencode"
    }

    fn plan(&self, request: core_api::BackendPlanRequest) -> Result<core_api::BackendPlan> {
        let core_api::BackendPlanRequest {
            prompt,
            mut base_envs,
        } = request;

        if let Some(dir) = &self.working_dir {
            if !Path::new(dir).is_dir() {
                anyhow::bail!("opencode working_dir is not a directory: {}", dir);
            }
        }

        let home = dirs::home_dir();
        let search_dirs = self.search_dirs(home.as_deref());

        let current_path = base_envs.get("PATH").map(OsString::from);
        let exe_path = resolve_executable_path(&self.binary, current_path.as_deref(), &search_dirs);
        tracing::debug!(target: "ocbridge.runner", exe = %exe_path, "resolved opencode executable");

        // The child may spawn tools of its own; give it the install dirs even when
        // this server was started with a minimal environment.
        let path = extended_path(&search_dirs, current_path.as_deref())?;
        base_envs.insert("PATH".to_string(), path);

        let args = vec![
            "--model".to_string(),
            self.model.clone(),
            "run".to_string(),
            "-".to_string(),
        ];

        tracing::debug!(
            target: "ocbridge.runner",
            model = %self.model,
            prompt_len = prompt.len(),
            "planned opencode invocation"
        );

        Ok(core_api::BackendPlan {
            runner: Box::new(OpencodeRunnerPlugin::new()),
            session_args: core_api::RunnerStartArgs {
                cmd: exe_path,
                args,
                envs: base_envs,
                cwd: self.working_dir.clone(),
                stdin_payload: Some(core_api::wrap_prompt(&prompt)),
            },
        })
    }
}

/// Locate the opencode executable.
///
/// Order: explicit path as given, PATH lookup, `search_dirs`, and finally the
/// bare name so the OS reports its own "not found" at launch.
pub fn resolve_executable_path(
    binary: &str,
    path_env: Option<&std::ffi::OsStr>,
    search_dirs: &[PathBuf],
) -> String {
    let binary_path = Path::new(binary);

    if binary_path.components().count() > 1 || binary_path.is_absolute() {
        if !binary_path.exists() {
            tracing::warn!(target: "ocbridge.runner", path = %binary, "configured opencode path does not exist");
        }
        return binary.to_string();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if let Ok(found) = which::which_in(binary, path_env, &cwd) {
        tracing::debug!(target: "ocbridge.runner", path = %found.display(), "found on PATH");
        return found.to_string_lossy().to_string();
    }

    for dir in search_dirs {
        let candidate = dir.join(binary);
        if is_executable(&candidate) {
            tracing::debug!(target: "ocbridge.runner", path = %candidate.display(), "found in install dir");
            return candidate.to_string_lossy().to_string();
        }
    }

    tracing::warn!(
        target: "ocbridge.runner",
        binary,
        "could not find opencode executable, falling back to bare name"
    );
    binary.to_string()
}

/// `search_dirs` followed by the existing PATH entries.
pub fn extended_path(search_dirs: &[PathBuf], current: Option<&std::ffi::OsStr>) -> Result<String> {
    let mut entries: Vec<PathBuf> = search_dirs.to_vec();
    if let Some(current) = current {
        entries.extend(std::env::split_paths(current));
    }
    let joined = std::env::join_paths(entries)
        .map_err(|e| anyhow::anyhow!("cannot build PATH for opencode: {}", e))?;
    Ok(joined.to_string_lossy().to_string())
}

#[cfg(not(target_os = "windows"))]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(target_os = "windows")]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
