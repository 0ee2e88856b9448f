//! src/platforms/twitch_irc/client.rs
//!
//! One IRC session: connect, register, then shuttle lines until the peer
//! goes away or shutdown is requested.

use std::time::Duration;

use tokio::io::{split, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_native_tls::{native_tls, TlsConnector, TlsStream};
use tracing::{debug, info, warn};

use twitchbot_common::models::Config;

use crate::services::dispatcher::Dispatcher;
use crate::Error;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Shutdown,
    Disconnected,
}

/// TCP + TLS handshake to the configured chat server.
pub async fn connect_tls(config: &Config) -> Result<TlsStream<TcpStream>, Error> {
    let addr = (config.host.as_str(), config.port);
    let tcp = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await??;

    let connector = TlsConnector::from(native_tls::TlsConnector::new()?);
    let stream = timeout(CONNECT_TIMEOUT, connector.connect(&config.host, tcp)).await??;
    info!("connected to {}:{}", config.host, config.port);
    Ok(stream)
}

/// Lines sent right after connecting. The first one carries the token.
pub fn registration_lines(config: &Config) -> Vec<String> {
    vec![
        format!("PASS {}\r\n", config.oauth_token),
        format!("NICK {}\r\n", config.username),
        format!("JOIN #{}\r\n", config.channel),
        "CAP REQ :twitch.tv/tags\r\n".to_string(),
    ]
}

/// Runs one session over `stream`.
///
/// Inbound lines go to `dispatcher` as they arrive. Lines queued on
/// `outbound` are written whole, one `write_all` each, so concurrent
/// handlers never interleave. On shutdown the write half is flushed and
/// closed; handler tasks still running are left alone.
pub async fn run_session<S>(
    stream: S,
    config: &Config,
    dispatcher: &Dispatcher,
    outbound: &mut UnboundedReceiver<String>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<SessionEnd, Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = split(stream);
    let mut reader = BufReader::new(read_half);
    // Persists across loop turns: an interrupted `read_until` keeps what it
    // read so far here and picks up where it stopped.
    let mut buf = Vec::new();

    for (i, line) in registration_lines(config).iter().enumerate() {
        if i > 0 {
            debug!("> {}", line.trim_end());
        }
        write_half.write_all(line.as_bytes()).await?;
    }
    write_half.flush().await?;

    loop {
        if *shutdown.borrow() {
            close(&mut write_half).await;
            return Ok(SessionEnd::Shutdown);
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    close(&mut write_half).await;
                    return Ok(SessionEnd::Shutdown);
                }
            }

            read = reader.read_until(b'\n', &mut buf) => match read {
                Ok(0) => {
                    info!("server closed the connection");
                    return Ok(SessionEnd::Disconnected);
                }
                Ok(_) => {
                    let line = decode_line(&buf);
                    buf.clear();
                    debug!("< {}", line);
                    dispatcher.handle(&line);
                }
                Err(e) => {
                    warn!("read error: {}", e);
                    return Ok(SessionEnd::Disconnected);
                }
            },

            Some(line) = outbound.recv() => {
                debug!("> {}", line.trim_end());
                if let Err(e) = write_line(&mut write_half, &line).await {
                    warn!("write error: {}", e);
                    return Ok(SessionEnd::Disconnected);
                }
            }
        }
    }
}

/// Decodes one inbound line. Bytes that are not UTF-8 become U+FFFD
/// instead of failing the read; the line terminator is dropped.
pub fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

async fn close<W: AsyncWrite + Unpin>(writer: &mut W) {
    if let Err(e) = writer.flush().await {
        debug!("flush on shutdown failed: {}", e);
    }
    if let Err(e) = writer.shutdown().await {
        debug!("close on shutdown failed: {}", e);
    }
    info!("connection closed");
}
