use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use linelog::{
    server::{Config, Server, DEFAULT_ADDR, DEFAULT_LOG_PATH},
    sink::LogMode,
};
use tracing_subscriber::EnvFilter;

/// Accept tcp clients, print every line they send and save it in a log file.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value_t = DEFAULT_ADDR)]
    addr: SocketAddr,

    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    log_path: PathBuf,

    #[arg(long, value_enum, default_value_t = LogMode::default())]
    log_mode: LogMode,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout is reserved for the lines received from the clients
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config = Config {
        addr: cli.addr,
        log_path: cli.log_path,
        log_mode: cli.log_mode,
    };
    let server = Server::bind(&config).await?;
    server.run().await?;

    Ok(())
}
