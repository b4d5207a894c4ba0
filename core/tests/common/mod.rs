#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use ocbridge_core::api::{
    wrap_prompt, BackendPlan, BackendPlanRequest, BackendStrategy, CompletionOptions, MarkerFilter,
    RunOutcome, RunnerPlugin, RunnerSession, RunnerStartArgs, Signal,
};

/// What the fake child prints and how it exits.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub stdout_chunks: Vec<Vec<u8>>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
    /// Keep stdout open after the last chunk until signalled.
    pub hang: bool,
    pub ignore_term: bool,
    pub launch_error: Option<std::io::ErrorKind>,
}

impl Script {
    pub fn stdout(text: &str) -> Self {
        Self {
            stdout_chunks: vec![text.as_bytes().to_vec()],
            ..Self::default()
        }
    }

    pub fn chunks(chunks: &[&[u8]]) -> Self {
        Self {
            stdout_chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            ..Self::default()
        }
    }

    pub fn exit(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn stderr(mut self, text: &str) -> Self {
        self.stderr = text.as_bytes().to_vec();
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn ignoring_term(mut self) -> Self {
        self.ignore_term = true;
        self
    }

    pub fn failing_launch(kind: std::io::ErrorKind) -> Self {
        Self {
            launch_error: Some(kind),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub signals: Mutex<Vec<Signal>>,
    pub stdin: Mutex<String>,
    pub started: Mutex<Vec<RunnerStartArgs>>,
}

impl Recorder {
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }

    pub fn stdin(&self) -> String {
        self.stdin.lock().unwrap().clone()
    }

    pub fn starts(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    /// Poll until `pred` holds or `timeout` elapses.
    pub async fn wait_for<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&Recorder) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if pred(self) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[derive(Clone)]
pub struct FakePlugin {
    pub script: Script,
    pub recorder: Arc<Recorder>,
}

impl FakePlugin {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            recorder: Arc::new(Recorder::default()),
        }
    }
}

#[async_trait]
impl RunnerPlugin for FakePlugin {
    fn name(&self) -> &str {
        "fake"
    }

    async fn start_session(&self, args: &RunnerStartArgs) -> anyhow::Result<Box<dyn RunnerSession>> {
        if let Some(kind) = self.script.launch_error {
            let io = std::io::Error::new(kind, "scripted launch failure");
            return Err(anyhow::Error::new(io).context(format!("spawn {}", args.cmd)));
        }
        self.recorder.started.lock().unwrap().push(args.clone());
        Ok(Box::new(FakeSession::start(
            self.script.clone(),
            self.recorder.clone(),
        )))
    }
}

pub struct FakeSession {
    stdin: Option<DuplexStream>,
    stdout: Option<DuplexStream>,
    stderr: Option<DuplexStream>,
    writer: Option<JoinHandle<()>>,
    stdin_capture: Option<JoinHandle<()>>,
    recorder: Arc<Recorder>,
    exit_code: i32,
    hang: bool,
    ignore_term: bool,
    terminated_by: Option<Signal>,
}

impl FakeSession {
    fn start(script: Script, recorder: Arc<Recorder>) -> Self {
        let (stdin_wr, mut stdin_rd) = tokio::io::duplex(64 * 1024);
        let (stdout_rd, mut stdout_wr) = tokio::io::duplex(64 * 1024);
        let (stderr_rd, mut stderr_wr) = tokio::io::duplex(64 * 1024);

        let capture_into = recorder.clone();
        let stdin_capture = tokio::spawn(async move {
            let mut s = String::new();
            let _ = stdin_rd.read_to_string(&mut s).await;
            *capture_into.stdin.lock().unwrap() = s;
        });

        let Script {
            stdout_chunks,
            stderr,
            hang,
            ..
        } = script.clone();
        let writer = tokio::spawn(async move {
            let _ = stderr_wr.write_all(&stderr).await;
            drop(stderr_wr);
            for chunk in stdout_chunks {
                if stdout_wr.write_all(&chunk).await.is_err() {
                    return;
                }
                tokio::task::yield_now().await;
            }
            if hang {
                futures::future::pending::<()>().await;
            }
        });

        Self {
            stdin: Some(stdin_wr),
            stdout: Some(stdout_rd),
            stderr: Some(stderr_rd),
            writer: Some(writer),
            stdin_capture: Some(stdin_capture),
            recorder,
            exit_code: script.exit_code,
            hang: script.hang,
            ignore_term: script.ignore_term,
            terminated_by: None,
        }
    }
}

#[async_trait]
impl RunnerSession for FakeSession {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>> {
        self.stdin
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncWrite + Unpin + Send>)
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn signal(&mut self, signal: Signal) -> anyhow::Result<()> {
        self.recorder.signals.lock().unwrap().push(signal);
        if signal == Signal::Term && self.ignore_term {
            return Ok(());
        }
        if let Some(writer) = &self.writer {
            writer.abort();
        }
        self.terminated_by = Some(signal);
        Ok(())
    }

    async fn wait(&mut self) -> anyhow::Result<RunOutcome> {
        match self.terminated_by {
            Some(Signal::Term) => return Ok(outcome(143)),
            Some(Signal::Kill) => return Ok(outcome(137)),
            None => {}
        }
        if self.hang {
            futures::future::pending::<()>().await;
        }
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
        if let Some(capture) = self.stdin_capture.take() {
            let _ = capture.await;
        }
        Ok(outcome(self.exit_code))
    }
}

fn outcome(exit_code: i32) -> RunOutcome {
    RunOutcome {
        exit_code,
        duration_ms: None,
    }
}

/// Backend that always plans the same scripted invocation.
pub struct FakeBackend {
    pub plugin: FakePlugin,
    pub fail_plan: bool,
}

impl FakeBackend {
    pub fn new(script: Script) -> Self {
        Self {
            plugin: FakePlugin::new(script),
            fail_plan: false,
        }
    }

    pub fn recorder(&self) -> Arc<Recorder> {
        self.plugin.recorder.clone()
    }
}

impl BackendStrategy for FakeBackend {
    fn name(&self) -> &str {
        "fake-opencode"
    }

    fn plan(&self, request: BackendPlanRequest) -> anyhow::Result<BackendPlan> {
        if self.fail_plan {
            anyhow::bail!("no usable opencode installation");
        }
        Ok(BackendPlan {
            runner: Box::new(self.plugin.clone()),
            session_args: RunnerStartArgs {
                cmd: "opencode".to_string(),
                args: vec![
                    "--model".to_string(),
                    "github-copilot/gpt-4.1".to_string(),
                    "run".to_string(),
                    "-".to_string(),
                ],
                envs: Default::default(),
                cwd: None,
                stdin_payload: Some(wrap_prompt(&request.prompt)),
            },
        })
    }
}

pub fn fast_options() -> CompletionOptions {
    CompletionOptions {
        filter: MarkerFilter::default(),
        abort_grace: Duration::from_millis(50),
        stderr_capture_bytes: 1024,
        read_buffer_bytes: 16,
    }
}
