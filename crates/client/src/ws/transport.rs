//! The socket seam: a [`Connector`] opens a [`Transport`] for a URL.
//!
//! Production uses tokio-tungstenite; tests script their own.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Close code for a normal, intentional close.
pub const CLOSE_NORMAL: u16 = 1000;

/// What a live socket yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// The peer closed; `None` when no close code was sent.
    Closed { code: Option<u16> },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
}

/// An open socket.
#[async_trait]
pub trait Transport: Send {
    /// Next inbound frame. `None` means the stream ended without a close frame.
    async fn next_frame(&mut self) -> Option<Frame>;

    async fn close(&mut self, code: u16);
}

/// Opens sockets.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError>;
}

/// WebSocket connector backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Box::new(TungsteniteTransport { stream }))
    }
}

struct TungsteniteTransport {
    stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn next_frame(&mut self) -> Option<Frame> {
        while let Some(msg_result) = self.stream.next().await {
            match msg_result {
                Ok(Message::Text(text)) => return Some(Frame::Text(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    return Some(Frame::Closed {
                        code: frame.map(|f| u16::from(f.code)),
                    })
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    tracing::trace!("received ping");
                }
                Ok(_) => {
                    // Ignore binary, pong, etc.
                }
                Err(e) => {
                    tracing::warn!(error = %e, "websocket read error");
                    return None;
                }
            }
        }
        None
    }

    async fn close(&mut self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        if let Err(e) = self.stream.close(Some(frame)).await {
            tracing::debug!(error = %e, "websocket close failed");
        }
    }
}
