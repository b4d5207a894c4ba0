use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};

use super::{RunOutcome, RunnerPlugin, RunnerSession, RunnerStartArgs, Signal};

/// Launches the planned command as a direct child with piped stdio.
pub struct OpencodeRunnerPlugin {}

impl OpencodeRunnerPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for OpencodeRunnerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunnerPlugin for OpencodeRunnerPlugin {
    fn name(&self) -> &str {
        "opencode"
    }

    async fn start_session(&self, args: &RunnerStartArgs) -> Result<Box<dyn RunnerSession>> {
        let mut cmd = Command::new(&args.cmd);
        cmd.args(&args.args)
            .envs(&args.envs)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Last resort if the session is leaked without a runtime to stop it.
            .kill_on_drop(true);
        if let Some(dir) = &args.cwd {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("spawn {}", args.cmd))?;

        Ok(Box::new(OpencodeRunnerSession {
            child,
            started_at: Instant::now(),
        }))
    }
}

struct OpencodeRunnerSession {
    child: Child,
    started_at: Instant,
}

#[async_trait]
impl RunnerSession for OpencodeRunnerSession {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>> {
        self.child
            .stdin
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncWrite + Unpin + Send>)
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn signal(&mut self, signal: Signal) -> Result<()> {
        match signal {
            Signal::Term => send_term(&mut self.child),
            Signal::Kill => {
                // Already reaped: nothing left to kill.
                if self.child.id().is_none() {
                    return Ok(());
                }
                self.child.start_kill().context("kill opencode")
            }
        }
    }

    async fn wait(&mut self) -> Result<RunOutcome> {
        let status = self.child.wait().await.context("wait for opencode")?;
        Ok(RunOutcome {
            exit_code: normalize_exit(status),
            duration_ms: Some(self.started_at.elapsed().as_millis() as u64),
        })
    }
}

#[cfg(unix)]
fn send_term(child: &mut Child) -> Result<()> {
    use nix::sys::signal::{kill, Signal as NixSignal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid).context("pid out of range")?;
    match kill(Pid::from_raw(pid), NixSignal::SIGTERM) {
        Ok(()) => Ok(()),
        // Exited between the id() check and the signal.
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(anyhow::anyhow!("failed to send SIGTERM to {}: {}", pid, e)),
    }
}

#[cfg(not(unix))]
fn send_term(child: &mut Child) -> Result<()> {
    // No graceful signal on this platform.
    child.start_kill().context("kill opencode")
}

fn normalize_exit(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(code) = status.code() {
            code
        } else if let Some(sig) = status.signal() {
            128 + sig
        } else {
            1
        }
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(1)
    }
}
