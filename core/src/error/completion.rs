use thiserror::Error;

/// Raised by the byte decoder when the stream ends inside a multi-byte sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("incomplete trailing sequence at end of stream ({} pending bytes: {bytes:02x?})", .bytes.len())]
    IncompleteTrailingSequence { bytes: Vec<u8> },
}

/// Failures surfaced to the consumer of a completion stream.
///
/// Launch failures are always raised before the first character. Failures that
/// happen after output has started are only raised when nothing was emitted.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("opencode executable not found: {cmd}")]
    ExecutableNotFound { cmd: String },

    #[error("failed to launch opencode ({cmd}): {source}")]
    ProcessLaunchFailed {
        cmd: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("opencode command failed with exit code {exit_code}")]
    InvocationFailed { exit_code: i32 },

    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("waiting for opencode failed: {0}")]
    Wait(#[source] anyhow::Error),
}

impl CompletionError {
    /// Stable machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExecutableNotFound { .. } => "executable_not_found",
            Self::ProcessLaunchFailed { .. } => "process_launch_failed",
            Self::InvocationFailed { .. } => "invocation_failed",
            Self::StreamIo { .. } => "stream_io",
            Self::Wait(_) => "process_wait_failed",
        }
    }
}
