use std::net::SocketAddr;

use futures::StreamExt;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

use crate::{
    error::FatalError,
    lines::{self, Line},
    sink::{LineWriter, LogSink},
};

/// Process one client until it goes away. Every line goes to stdout first,
/// then to the log sink. Nothing is ever sent back to the client.
/// Errors returned from here are fatal for the whole server.
pub async fn handle(stream: TcpStream, peer: SocketAddr, sink: LogSink) -> Result<(), FatalError> {
    tracing::info!("connection from {peer}");
    let mut writer = sink.writer().await?;

    let processed = process_lines(stream, tokio::io::stdout(), &mut writer).await?;

    tracing::info!("client at {peer} disconnected after {processed} lines");
    Ok(())
}

/// Returns how many lines went through.
pub async fn process_lines<R, C>(
    rdr: R,
    mut console: C,
    writer: &mut LineWriter,
) -> Result<usize, FatalError>
where
    R: AsyncRead,
    C: AsyncWrite + Unpin,
{
    let stream = lines::scan(rdr);
    tokio::pin!(stream);

    let mut count = 0;
    while let Some(line) = stream.next().await {
        tracing::trace!("got a line: {:?}", String::from_utf8_lossy(line.as_bytes()));
        if let Err(err) = echo(&mut console, &line).await {
            // the console is best effort, the log file is what matters
            tracing::debug!("couldn't echo line to the console: {err:?}");
        }
        writer.append(&line).await?;
        count += 1;
    }

    Ok(count)
}

async fn echo<C: AsyncWrite + Unpin>(console: &mut C, line: &Line) -> std::io::Result<()> {
    // a single write so that lines from concurrent clients don't get mixed up
    let mut buf = Vec::with_capacity(line.as_bytes().len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    console.write_all(&buf).await?;
    console.flush().await
}
