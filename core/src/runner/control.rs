use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::error::RunnerError;

/// Write the prompt to the child's stdin, then close it so the tool sees EOF.
///
/// Runs as its own task so a large prompt cannot deadlock against a child that
/// starts writing stdout before it has read all of its input.
pub fn spawn_stdin_writer(
    stdin: Box<dyn AsyncWrite + Unpin + Send>,
    payload: String,
) -> JoinHandle<Result<usize, RunnerError>> {
    let mut stdin = stdin;
    tokio::spawn(async move {
        let io_err = |e| RunnerError::StreamIo {
            stream: "stdin",
            source: e,
        };
        stdin.write_all(payload.as_bytes()).await.map_err(io_err)?;
        stdin.flush().await.map_err(io_err)?;
        stdin.shutdown().await.map_err(io_err)?;
        Ok(payload.len())
    })
}
