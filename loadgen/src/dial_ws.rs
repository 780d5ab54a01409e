//! WebSocket upgrade over an already established stream
//!
//! Only the protocol upgrade is performed (HTTP GET with `Upgrade: websocket`);
//! no frames are exchanged afterwards.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::{client_async, WebSocketStream};
use url::Url;

use crate::transport::error::DialError;

/// Build the `ws://` or `wss://` URL for a host:port address
pub fn websocket_url(scheme: &str, address: &str) -> Result<Url, DialError> {
    let url = Url::parse(&format!("{}://{}/", scheme, address))?;
    Ok(url)
}

/// Run the WebSocket client handshake on `stream`
pub async fn upgrade<S>(url: &Url, stream: S) -> Result<WebSocketStream<S>, DialError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (ws, response) = client_async(url.as_str(), stream)
        .await
        .map_err(|e| DialError::WebSocketUpgrade(Box::new(e)))?;
    tracing::debug!(status = %response.status(), %url, "WebSocket upgrade accepted");
    Ok(ws)
}
