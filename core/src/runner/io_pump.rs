use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;

use crate::error::RunnerError;
use crate::util::RingBytes;

/// Drain the child's stderr into a bounded tail buffer.
///
/// stderr must be read concurrently with stdout: a tool that fills its stderr
/// pipe would otherwise block before ever reaching the end marker.
pub fn pump_stderr<R>(rd: R, ring: Arc<RingBytes>) -> JoinHandle<Result<u64, RunnerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    pump(rd, ring, "stderr")
}

fn pump<R>(
    mut rd: R,
    ring: Arc<RingBytes>,
    label: &'static str,
) -> JoinHandle<Result<u64, RunnerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 8 * 1024];
        let mut total = 0u64;

        loop {
            let n = rd.read(&mut buf).await.map_err(|e| RunnerError::StreamIo {
                stream: label,
                source: e,
            })?;
            if n == 0 {
                break;
            }
            ring.push(&buf[..n]);
            total += n as u64;
        }

        Ok(total)
    })
}
