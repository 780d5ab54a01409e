//! TCP dialing
//!
//! The base layer of every transport: resolve host:port, open a stream socket
//! and enable keep-alive probes. TLS and WebSocket dials build on top of the
//! stream returned here.
//!
//! TCP (this module) → TLS (`dial_tls`) → WebSocket (`dial_ws`)

use shared::defaults::TCP_KEEPALIVE;
use socket2::{SockRef, TcpKeepalive};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::debug;

use crate::transport::error::DialError;

/// Resolve a host:port address to every socket address DNS returns
///
/// # Errors
/// `DialError::Resolve` when the lookup fails, `DialError::NoAddresses` when
/// it succeeds with an empty answer.
pub async fn resolve(address: &str) -> Result<Vec<SocketAddr>, DialError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(address)
        .await
        .map_err(DialError::Resolve)?
        .collect();

    if addrs.is_empty() {
        return Err(DialError::NoAddresses(address.to_string()));
    }
    Ok(addrs)
}

/// Open a TCP stream to `address`, trying each resolved address in turn
///
/// Keep-alive is enabled on the returned socket with a 10 second probe
/// interval. When every address fails, the last connect error is returned.
pub async fn connect(address: &str) -> Result<TcpStream, DialError> {
    let addrs = resolve(address).await?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                set_keepalive(&stream)?;
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "TCP connect failed");
                last_err = Some(e);
            }
        }
    }

    Err(DialError::Connect(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no address to connect to")
    })))
}

/// Enable TCP keep-alive probes on an established stream
fn set_keepalive(stream: &TcpStream) -> Result<(), DialError> {
    let keepalive = TcpKeepalive::new().with_time(TCP_KEEPALIVE);
    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "windows"
    ))]
    let keepalive = keepalive.with_interval(TCP_KEEPALIVE);

    SockRef::from(stream)
        .set_tcp_keepalive(&keepalive)
        .map_err(DialError::Connect)
}
