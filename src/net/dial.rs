//! Host/port resolution and TCP connect.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::ScpError;

/// Connection timeout for each candidate address (30 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Socket-level settings applied while dialing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialOptions {
    pub connect_timeout: Duration,
    /// Read/write deadline on the connected socket. `None` blocks forever.
    pub io_timeout: Option<Duration>,
}

impl Default for DialOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: None,
        }
    }
}

/// Parse a textual port. Only 1..=65535 is accepted.
pub fn parse_port(value: &str) -> Result<u16, ScpError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ScpError::InvalidPort {
            value: value.to_string(),
        }),
    }
}

/// Resolve `host:port` into every candidate address, in resolver order.
pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, ScpError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| ScpError::Resolve {
            host: host.to_string(),
            port,
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(ScpError::Resolve {
            host: host.to_string(),
            port,
            reason: "no addresses found".to_string(),
        });
    }
    Ok(addrs)
}

/// Connect to the first reachable address of `host:port`.
///
/// Candidates are tried in order. A failed attempt's socket is closed before
/// the next one is tried, so when every candidate fails nothing stays open.
pub fn dial(host: &str, port: u16, options: &DialOptions) -> Result<TcpStream, ScpError> {
    let candidates = resolve(host, port)?;
    tracing::debug!(host, port, candidates = candidates.len(), "Resolved host");

    let mut last_err: Option<io::Error> = None;
    for addr in &candidates {
        match TcpStream::connect_timeout(addr, options.connect_timeout) {
            Ok(stream) => {
                configure(&stream, options).map_err(|e| ScpError::ConnectionFailed {
                    host: host.to_string(),
                    port,
                    reason: format!("Cannot configure socket: {}", e),
                })?;
                tracing::debug!(%addr, "Connected");
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(%addr, error = %e, "Connect attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(ScpError::ConnectionFailed {
        host: host.to_string(),
        port,
        reason: format!(
            "all {} address(es) failed, last error: {}",
            candidates.len(),
            last_err.map(|e| e.to_string()).unwrap_or_default()
        ),
    })
}

fn configure(stream: &TcpStream, options: &DialOptions) -> io::Result<()> {
    stream.set_nodelay(true)?;
    stream.set_read_timeout(options.io_timeout)?;
    stream.set_write_timeout(options.io_timeout)?;
    Ok(())
}
