use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    path::PathBuf,
};

use tokio::{net::TcpListener, task::JoinSet};

use crate::{
    error::FatalError,
    handler,
    sink::{LogMode, LogSink},
    utils::BoxResult,
};

pub const DEFAULT_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 9999));
pub const DEFAULT_LOG_PATH: &str = "/log/data.txt";

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub log_path: PathBuf,
    pub log_mode: LogMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            log_mode: LogMode::default(),
        }
    }
}

pub struct Server {
    listener: TcpListener,
    sink: LogSink,
    // every connection handler, plus the log writer in shared mode
    tasks: JoinSet<Result<(), FatalError>>,
}

impl Server {
    /// Any error here means the server cannot start at all.
    pub async fn bind(config: &Config) -> BoxResult<Self> {
        let listener = TcpListener::bind(config.addr).await?;
        let (sink, shared_writer) = LogSink::open(&config.log_path, config.log_mode).await?;

        let mut tasks = JoinSet::new();
        if let Some(writer) = shared_writer {
            tasks.spawn(writer.run());
        }

        tracing::info!(
            "listening on {}, logging to {:?} ({:?} mode)",
            listener.local_addr()?,
            sink.path(),
            config.log_mode
        );
        Ok(Self {
            listener,
            sink,
            tasks,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever. This only returns once a task hit a fatal
    /// error, which should then bring the process down.
    pub async fn run(self) -> Result<(), FatalError> {
        let Server {
            listener,
            sink,
            mut tasks,
        } = self;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tasks.spawn(handler::handle(stream, peer, sink.clone()));
                    }
                    Err(err) => tracing::warn!("failed to accept a connection: {err:?}"),
                },
                Some(joined) = tasks.join_next() => match joined {
                    Ok(Ok(())) => (),
                    Ok(Err(err)) => {
                        tracing::error!("fatal error, shutting down: {err}");
                        return Err(err);
                    }
                    Err(err) => {
                        tracing::error!("a task panicked, shutting down: {err}");
                        return Err(err.into());
                    }
                },
            }
        }
    }
}
