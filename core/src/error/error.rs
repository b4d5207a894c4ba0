use thiserror::Error;

/// Top-level failure of the `ocbridge` binary.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Failures of the helper tasks that feed and drain a running process.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },
}
