use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
};

use crate::{error::FatalError, lines::Line};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogMode {
    /// every connection creates or truncates the log file and writes
    /// through its own handle. Concurrent connections race on the file.
    #[default]
    Truncate,
    /// the file is opened once in append mode and a single task
    /// writes all the lines it receives from the connections.
    Shared,
}

/// Where the received lines end up. Cheap to clone, one clone per connection.
#[derive(Debug, Clone)]
pub enum LogSink {
    Truncate {
        path: PathBuf,
    },
    Shared {
        path: PathBuf,
        sender: UnboundedSender<Bytes>,
    },
}

impl LogSink {
    /// In shared mode, the returned writer owns the file and must be driven
    /// (`SharedWriter::run`) for the lines to land on disk.
    pub async fn open(
        path: impl Into<PathBuf>,
        mode: LogMode,
    ) -> Result<(Self, Option<SharedWriter>), FatalError> {
        let path = path.into();
        match mode {
            LogMode::Truncate => Ok((LogSink::Truncate { path }, None)),
            LogMode::Shared => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await
                    .map_err(|source| FatalError::OpenLog {
                        path: path.clone(),
                        source,
                    })?;
                let (sender, receiver) = mpsc::unbounded_channel();
                let writer = SharedWriter {
                    file,
                    path: path.clone(),
                    receiver,
                };
                Ok((LogSink::Shared { path, sender }, Some(writer)))
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            LogSink::Truncate { path } | LogSink::Shared { path, .. } => path,
        }
    }

    /// Acquire the writer for one connection. In truncate mode this is where
    /// the file gets created, or emptied if it already exists.
    pub async fn writer(&self) -> Result<LineWriter, FatalError> {
        match self {
            LogSink::Truncate { path } => {
                let file = File::create(path)
                    .await
                    .map_err(|source| FatalError::OpenLog {
                        path: path.clone(),
                        source,
                    })?;
                Ok(LineWriter::File {
                    file,
                    path: path.clone(),
                })
            }
            LogSink::Shared { sender, .. } => Ok(LineWriter::Channel {
                sender: sender.clone(),
            }),
        }
    }
}

/// Per connection handle on the log sink. The file, if any, is closed on drop.
#[derive(Debug)]
pub enum LineWriter {
    File { file: File, path: PathBuf },
    Channel { sender: UnboundedSender<Bytes> },
}

impl LineWriter {
    /// Append the line as is, no line terminator is added.
    pub async fn append(&mut self, line: &Line) -> Result<(), FatalError> {
        match self {
            LineWriter::File { file, path } => write_and_flush(file, line.as_bytes())
                .await
                .map_err(|source| FatalError::WriteLog {
                    path: path.clone(),
                    source,
                }),
            LineWriter::Channel { sender } => sender
                .send(Bytes::copy_from_slice(line.as_bytes()))
                .map_err(|_| FatalError::SinkClosed),
        }
    }
}

/// Owner of the log file in shared mode.
#[derive(Debug)]
pub struct SharedWriter {
    file: File,
    path: PathBuf,
    receiver: UnboundedReceiver<Bytes>,
}

impl SharedWriter {
    /// Write lines in the order they are received, until every sender is gone.
    pub async fn run(mut self) -> Result<(), FatalError> {
        while let Some(data) = self.receiver.recv().await {
            tracing::trace!("appending {} bytes to {:?}", data.len(), self.path);
            write_and_flush(&mut self.file, &data)
                .await
                .map_err(|source| FatalError::WriteLog {
                    path: self.path.clone(),
                    source,
                })?;
        }
        tracing::debug!("no more writers for {:?}", self.path);
        Ok(())
    }
}

// tokio files buffer in the background, flush so that every line
// has reached the OS once the call returns.
async fn write_and_flush(file: &mut File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}
