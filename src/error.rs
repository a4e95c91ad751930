use std::path::PathBuf;

use tokio::task::JoinError;

/// Conditions that bring the whole server down, not just one connection.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("cannot open log file {path:?}: {source}")]
    OpenLog {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write to log file {path:?}: {source}")]
    WriteLog {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("the log writer task is gone")]
    SinkClosed,
    #[error("task panicked: {0}")]
    TaskPanicked(#[from] JoinError),
}
