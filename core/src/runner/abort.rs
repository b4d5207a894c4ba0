use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use super::traits::RunnerSession;
use super::types::{RunOutcome, Signal};

type Stdio = (
    Option<Box<dyn AsyncWrite + Unpin + Send>>,
    Option<Box<dyn AsyncRead + Unpin + Send>>,
    Option<Box<dyn AsyncRead + Unpin + Send>>,
);

/// Owns a running session until it has been reaped.
///
/// A guard dropped before [`SessionGuard::wait`] completed (client gone, error
/// path, stream abandoned) terminates the process in the background: SIGTERM,
/// then a kill once `grace` has elapsed.
pub struct SessionGuard {
    session: Option<Box<dyn RunnerSession>>,
    grace: Duration,
}

impl SessionGuard {
    pub fn new(session: Box<dyn RunnerSession>, grace: Duration) -> Self {
        Self {
            session: Some(session),
            grace,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.session.as_ref().and_then(|s| s.pid())
    }

    pub fn take_stdio(&mut self) -> Stdio {
        match self.session.as_mut() {
            Some(s) => (s.stdin(), s.stdout(), s.stderr()),
            None => (None, None, None),
        }
    }

    /// Wait for a normal exit. The session is released only once reaped.
    pub async fn wait(&mut self) -> anyhow::Result<RunOutcome> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("session already released"))?;
        let outcome = session.wait().await?;
        self.session = None;
        Ok(outcome)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let pid = session.pid();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(target: "ocbridge.runner", ?pid, "session abandoned, terminating");
                let grace = self.grace;
                handle.spawn(async move {
                    terminate_session(session, grace).await;
                });
            }
            Err(_) => {
                // No runtime left to drive a graceful stop; the runner's
                // kill-on-drop is the last line.
                tracing::warn!(target: "ocbridge.runner", ?pid, "no runtime to terminate session");
                drop(session);
            }
        }
    }
}

pub async fn terminate_session(
    mut session: Box<dyn RunnerSession>,
    grace: Duration,
) -> Option<RunOutcome> {
    let pid = session.pid();
    if let Err(e) = session.signal(Signal::Term).await {
        tracing::debug!(target: "ocbridge.runner", ?pid, error = %e, "SIGTERM failed");
    }

    match tokio::time::timeout(grace, session.wait()).await {
        Ok(Ok(outcome)) => {
            tracing::debug!(target: "ocbridge.runner", ?pid, exit_code = outcome.exit_code, "terminated");
            return Some(outcome);
        }
        Ok(Err(e)) => {
            tracing::warn!(target: "ocbridge.runner", ?pid, error = %e, "wait after SIGTERM failed");
        }
        Err(_) => {
            tracing::warn!(
                target: "ocbridge.runner",
                ?pid,
                grace_ms = grace.as_millis() as u64,
                "process ignored SIGTERM, killing"
            );
        }
    }

    if let Err(e) = session.signal(Signal::Kill).await {
        tracing::warn!(target: "ocbridge.runner", ?pid, error = %e, "kill failed");
    }
    match session.wait().await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::error!(target: "ocbridge.runner", ?pid, error = %e, "failed to reap process");
            None
        }
    }
}
