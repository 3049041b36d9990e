use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::ChannelError;

/// What a connection yields to the subscriber loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Connection ended; `None` when no close code was received
    Closed(Option<u16>),
}

/// Opens channel connections
#[async_trait]
pub trait ChannelTransport: Send + Sync + std::fmt::Debug {
    async fn connect(&self, url: &str) -> Result<Box<dyn ChannelConnection>, ChannelError>;
}

/// One open channel connection
#[async_trait]
pub trait ChannelConnection: Send {
    /// Next text frame or the close. Control frames are handled internally.
    async fn recv(&mut self) -> Frame;
    async fn close(&mut self, code: u16);
}

/// WebSocket transport
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelTransport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn ChannelConnection>, ChannelError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl ChannelConnection for WsConnection {
    async fn recv(&mut self) -> Frame {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Frame::Text(text.as_str().to_owned()),
                Some(Ok(Message::Close(frame))) => {
                    return Frame::Closed(frame.map(|f| u16::from(f.code)));
                }
                // Pongs are queued by tungstenite and flushed on the next read
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Channel read failed");
                    return Frame::Closed(None);
                }
                None => return Frame::Closed(None),
            }
        }
    }

    async fn close(&mut self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "client closing".into(),
        };
        if let Err(e) = self.stream.close(Some(frame)).await {
            tracing::debug!(error = %e, "Channel close failed");
        }
    }
}
