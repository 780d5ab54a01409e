//! Transport abstraction over TCP, TLS, WebSocket and TLS-WebSocket
//!
//! A [`Connector`] turns the configured address and [`TransportKind`] into one
//! established [`Connection`] per call. The dial scheduler only sees the
//! [`Dialer`] and [`Closeable`] traits, which keeps it independent of the
//! concrete stream types.
//!
//! The transport never logs outcomes. Every failure comes back as a
//! [`DialError`] for the caller to render.

use std::future::Future;
use std::net::SocketAddr;

use shared::utils::split_host_port;
use shared::TransportKind;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tokio_tungstenite::WebSocketStream;
use url::Url;

use crate::{dial_tcp, dial_tls, dial_ws};

pub use error::{CloseError, DialError};

/// Error types
///
/// The errors are defined using the `thiserror` crate.
pub mod error {
    use thiserror::Error;

    /// A single dial attempt failed. Never retried.
    #[derive(Error, Debug)]
    pub enum DialError {
        #[error("dns lookup failed: {0}")]
        Resolve(#[source] std::io::Error),
        #[error("dns lookup for {0} returned no addresses")]
        NoAddresses(String),
        #[error("connect failed: {0}")]
        Connect(#[source] std::io::Error),
        #[error("invalid server name {0}")]
        InvalidServerName(String),
        #[error("tls handshake failed: {0}")]
        TlsHandshake(#[source] std::io::Error),
        #[error("websocket upgrade failed: {0}")]
        WebSocketUpgrade(#[source] Box<tokio_tungstenite::tungstenite::Error>),
        #[error("invalid websocket url: {0}")]
        Url(#[from] url::ParseError),
        #[error("invalid address '{0}': expected host:port")]
        InvalidAddress(String),
    }

    /// Closing one handle failed. Reported, never blocks the rest of the teardown.
    #[derive(Error, Debug)]
    pub enum CloseError {
        #[error("io error: {0}")]
        Io(#[from] std::io::Error),
        #[error("websocket close failed: {0}")]
        WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),
    }
}

/// An opened connection plus the endpoints it was observed on
#[derive(Debug)]
pub struct Established<C> {
    pub connection: C,
    pub local_addr: SocketAddr,
    pub remote_addr: SocketAddr,
}

/// Produces one established connection per call
pub trait Dialer: Send + Sync + 'static {
    type Connection: Closeable + Send + 'static;

    fn dial(
        &self,
    ) -> impl Future<Output = Result<Established<Self::Connection>, DialError>> + Send;
}

/// A connection that can be torn down exactly once
pub trait Closeable {
    fn close(self) -> impl Future<Output = Result<(), CloseError>> + Send;
}

/// An open connection of any supported transport
#[derive(Debug)]
pub enum Connection {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    WebSocket(Box<WebSocketStream<TcpStream>>),
    SecureWebSocket(Box<WebSocketStream<TlsStream<TcpStream>>>),
}

impl Closeable for Connection {
    /// TCP and TLS streams are shut down (TLS sends close_notify), WebSocket
    /// connections send a Close frame. The socket is released on drop.
    async fn close(self) -> Result<(), CloseError> {
        match self {
            Connection::Tcp(mut stream) => stream.shutdown().await?,
            Connection::Tls(mut stream) => stream.shutdown().await?,
            Connection::WebSocket(mut ws) => ws.close(None).await.map_err(Box::new)?,
            Connection::SecureWebSocket(mut ws) => ws.close(None).await.map_err(Box::new)?,
        }
        Ok(())
    }
}

/// Layers stacked on top of the TCP stream, prepared once per batch
#[derive(Clone)]
enum Layers {
    Tcp,
    Tls(TlsConnector),
    Ws(Url),
    TlsWs(TlsConnector, Url),
}

/// Dials the configured address with the configured transport
#[derive(Clone)]
pub struct Connector {
    address: String,
    host: String,
    layers: Layers,
}

impl Connector {
    /// Prepare a connector for `address` (host:port)
    ///
    /// TLS transports get a connector with certificate verification disabled;
    /// WebSocket transports get their URL built up front so a malformed address
    /// fails here rather than on every attempt.
    pub fn new(address: &str, kind: TransportKind) -> Result<Self, DialError> {
        let (host, _) = split_host_port(address)
            .ok_or_else(|| DialError::InvalidAddress(address.to_string()))?;

        let layers = match kind {
            TransportKind::Tcp => Layers::Tcp,
            TransportKind::Tls => {
                Layers::Tls(dial_tls::create_tls_connector_without_verification()?)
            }
            TransportKind::Ws => Layers::Ws(dial_ws::websocket_url("ws", address)?),
            TransportKind::TlsWs => Layers::TlsWs(
                dial_tls::create_tls_connector_without_verification()?,
                dial_ws::websocket_url("wss", address)?,
            ),
        };

        Ok(Self {
            address: address.to_string(),
            host: host.to_string(),
            layers,
        })
    }

    pub fn kind(&self) -> TransportKind {
        match self.layers {
            Layers::Tcp => TransportKind::Tcp,
            Layers::Tls(_) => TransportKind::Tls,
            Layers::Ws(_) => TransportKind::Ws,
            Layers::TlsWs(..) => TransportKind::TlsWs,
        }
    }

    /// Open one connection
    pub async fn open(&self) -> Result<Established<Connection>, DialError> {
        let stream = dial_tcp::connect(&self.address).await?;
        let local_addr = stream.local_addr().map_err(DialError::Connect)?;
        let remote_addr = stream.peer_addr().map_err(DialError::Connect)?;

        let connection = match &self.layers {
            Layers::Tcp => Connection::Tcp(stream),
            Layers::Tls(tls) => {
                let stream = dial_tls::handshake(&self.host, stream, tls).await?;
                Connection::Tls(Box::new(stream))
            }
            Layers::Ws(url) => {
                let ws = dial_ws::upgrade(url, stream).await?;
                Connection::WebSocket(Box::new(ws))
            }
            Layers::TlsWs(tls, url) => {
                let stream = dial_tls::handshake(&self.host, stream, tls).await?;
                let ws = dial_ws::upgrade(url, stream).await?;
                Connection::SecureWebSocket(Box::new(ws))
            }
        };

        Ok(Established {
            connection,
            local_addr,
            remote_addr,
        })
    }
}

impl Dialer for Connector {
    type Connection = Connection;

    fn dial(&self) -> impl Future<Output = Result<Established<Connection>, DialError>> + Send {
        self.open()
    }
}
