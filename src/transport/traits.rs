//! Trait abstractions for the physical connection
//!
//! These traits let the driver run against a real WebSocket or a mock peer.

use super::TransportError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Opens physical connections to an endpoint
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Conn: Connection;

    async fn connect(&self, endpoint: &str) -> Result<Self::Conn, TransportError>;
}

/// One open, text-framed, bidirectional connection
#[async_trait]
pub trait Connection: Send + 'static {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame. `None` once the peer closed the connection.
    ///
    /// Must be cancel-safe: the driver polls it inside `select!`.
    async fn recv_text(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self);
}

// ============================================================================
// WebSocket adapter
// ============================================================================

/// Connector backed by `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connector for WsConnector {
    type Conn = WsConnection;

    async fn connect(&self, endpoint: &str) -> Result<WsConnection, TransportError> {
        let (stream, response) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        tracing::debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(WsConnection { stream })
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(WsMessage::Text(text))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(WsMessage::Text(text)) => return Some(Ok(text)),
                Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        tracing::debug!("Dropping non-UTF-8 binary frame");
                    }
                },
                Ok(WsMessage::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "Peer sent close frame");
                    return None;
                }
                // Ping/pong are answered by tungstenite itself
                Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_)) => {}
                Err(e) => return Some(Err(TransportError::Io(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "Error while closing WebSocket");
        }
    }
}
