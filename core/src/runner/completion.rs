//! Process driver: one opencode invocation → a lazy stream of characters.
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use tokio::io::AsyncReadExt;

use crate::backend::{BackendPlan, BackendPlanRequest, BackendStrategy};
use crate::config::AppConfig;
use crate::error::CompletionError;
use crate::transcode::{MarkerFilter, Transcoder};
use crate::util::RingBytes;

use super::abort::SessionGuard;
use super::control;
use super::io_pump;

pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<char, CompletionError>> + Send>>;

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub filter: MarkerFilter,
    pub abort_grace: Duration,
    pub stderr_capture_bytes: usize,
    pub read_buffer_bytes: usize,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            filter: MarkerFilter::default(),
            abort_grace: Duration::from_millis(2000),
            stderr_capture_bytes: 64 * 1024,
            read_buffer_bytes: 8 * 1024,
        }
    }
}

impl CompletionOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            filter: MarkerFilter::new(cfg.opencode.provider_tag.clone()),
            abort_grace: Duration::from_millis(cfg.control.abort_grace_ms),
            stderr_capture_bytes: cfg.control.stderr_capture_bytes,
            read_buffer_bytes: cfg.control.read_buffer_bytes,
        }
    }
}

/// Entry point used by the HTTP layer: plans an invocation for `prompt` and
/// streams its transcoded output.
#[derive(Clone)]
pub struct CompletionDriver {
    backend: Arc<dyn BackendStrategy>,
    options: CompletionOptions,
}

impl CompletionDriver {
    pub fn new(backend: Arc<dyn BackendStrategy>, options: CompletionOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Single-pass and not restartable: every call launches a new process.
    pub fn produce_completion(&self, prompt: &str) -> CompletionStream {
        let request = BackendPlanRequest {
            prompt: prompt.to_string(),
            base_envs: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        };
        match self.backend.plan(request) {
            Ok(plan) => produce_completion(plan, self.options.clone()),
            Err(e) => {
                let cmd = self.backend.name().to_string();
                Box::pin(futures::stream::once(async move {
                    Err(CompletionError::ProcessLaunchFailed { cmd, source: e })
                }))
            }
        }
    }
}

fn classify_launch_error(cmd: String, err: anyhow::Error) -> CompletionError {
    let not_found = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io| io.kind() == std::io::ErrorKind::NotFound);
    if not_found {
        CompletionError::ExecutableNotFound { cmd }
    } else {
        CompletionError::ProcessLaunchFailed { cmd, source: err }
    }
}

/// Launch the planned process and stream its answer.
///
/// Nothing is read from the child until the stream is polled, so a slow
/// consumer throttles how fast the child's stdout is drained. Dropping the
/// stream at any point terminates the child.
pub fn produce_completion(plan: BackendPlan, opts: CompletionOptions) -> CompletionStream {
    Box::pin(async_stream::stream! {
        let BackendPlan { runner, session_args } = plan;
        let cmd = session_args.cmd.clone();
        let started_at = Instant::now();

        let session = match runner.start_session(&session_args).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(
                    target: "ocbridge.runner",
                    runner = runner.name(),
                    cmd = %cmd,
                    error = %e,
                    "failed to start session"
                );
                yield Err(classify_launch_error(cmd, e));
                return;
            }
        };

        let mut guard = SessionGuard::new(session, opts.abort_grace);
        tracing::debug!(target: "ocbridge.runner", pid = ?guard.pid(), cmd = %cmd, "process started");

        let (stdin, stdout, stderr) = guard.take_stdio();
        let Some(mut stdout) = stdout else {
            yield Err(CompletionError::ProcessLaunchFailed {
                cmd,
                source: anyhow::anyhow!("no stdout"),
            });
            return;
        };

        let stdin_task = match stdin {
            Some(stdin) => {
                let payload = session_args.stdin_payload.clone().unwrap_or_default();
                tracing::debug!(target: "ocbridge.runner", bytes = payload.len(), "sending prompt");
                Some(control::spawn_stdin_writer(stdin, payload))
            }
            None => {
                tracing::warn!(target: "ocbridge.runner", "no stdin, prompt not sent");
                None
            }
        };

        let ring_err = RingBytes::new(opts.stderr_capture_bytes);
        let err_task = stderr.map(|rd| io_pump::pump_stderr(rd, ring_err.clone()));

        let mut transcoder = Transcoder::new(opts.filter.clone());
        let mut buf = vec![0u8; opts.read_buffer_bytes.max(1)];
        let mut out = String::new();
        let mut reached_end_marker = false;

        loop {
            let n = match stdout.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::error!(target: "ocbridge.runner", error = %e, "stdout read failed");
                    if transcoder.chars_emitted() == 0 {
                        yield Err(CompletionError::StreamIo { stream: "stdout", source: e });
                    }
                    // Dropping the guard terminates the child.
                    return;
                }
            };
            if n == 0 {
                tracing::debug!(target: "ocbridge.runner", "stdout closed");
                break;
            }

            let progress = transcoder.push_bytes(&buf[..n], &mut out);
            let released = std::mem::take(&mut out);
            for ch in released.chars() {
                yield Ok(ch);
            }
            if progress.is_done() {
                reached_end_marker = true;
                break;
            }
        }

        if reached_end_marker {
            // Anything after the end marker is discarded, but still read so the
            // child never blocks on a full pipe while we wait for it.
            match tokio::io::copy(&mut stdout, &mut tokio::io::sink()).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!(target: "ocbridge.runner", bytes = n, "discarded output after end marker"),
                Err(e) => tracing::debug!(target: "ocbridge.runner", error = %e, "draining stdout failed"),
            }
        } else {
            let finished = transcoder.finish(&mut out);
            let released = std::mem::take(&mut out);
            for ch in released.chars() {
                yield Ok(ch);
            }
            if let Err(e) = finished {
                tracing::warn!(target: "ocbridge.runner", error = %e, "output ended mid-character");
            }
        }
        drop(stdout);

        let outcome = guard.wait().await;

        if let Some(task) = stdin_task {
            match task.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(target: "ocbridge.runner", error = %e, "failed to send prompt"),
                Err(e) => tracing::warn!(target: "ocbridge.runner", error = %e, "stdin writer panicked"),
            }
        }
        if let Some(task) = err_task {
            if let Ok(Err(e)) = task.await {
                tracing::debug!(target: "ocbridge.runner", error = %e, "stderr pump failed");
            }
        }
        let stderr_tail = ring_err.to_bytes();
        if !stderr_tail.is_empty() {
            tracing::error!(
                target: "ocbridge.runner",
                stderr = %String::from_utf8_lossy(&stderr_tail),
                "opencode stderr output"
            );
        }

        let emitted = transcoder.chars_emitted();
        let duration_ms = started_at.elapsed().as_millis() as u64;
        if transcoder.lossy_chars() > 0 {
            tracing::warn!(target: "ocbridge.runner", lossy = transcoder.lossy_chars(), "invalid UTF-8 replaced");
        }

        match outcome {
            Ok(outcome) => {
                tracing::info!(
                    target: "ocbridge.runner",
                    exit_code = outcome.exit_code,
                    chars_emitted = emitted,
                    bytes_read = transcoder.bytes_consumed(),
                    duration_ms,
                    "opencode finished"
                );
                if outcome.exit_code != 0 {
                    tracing::error!(
                        target: "ocbridge.runner",
                        exit_code = outcome.exit_code,
                        "opencode exited with non-zero status"
                    );
                    if emitted == 0 {
                        tracing::error!(target: "ocbridge.runner", "no output was generated");
                        yield Err(CompletionError::InvocationFailed { exit_code: outcome.exit_code });
                    }
                } else if emitted == 0 {
                    tracing::warn!(target: "ocbridge.runner", "opencode succeeded but produced no output");
                }
            }
            Err(e) => {
                tracing::error!(target: "ocbridge.runner", error = %e, "waiting for opencode failed");
                if emitted == 0 {
                    yield Err(CompletionError::Wait(e));
                }
            }
        }
    })
}
