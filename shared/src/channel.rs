use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("failed to encode job request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),
}

/// Opens one bidirectional text channel per job.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Channel: Channel;

    async fn open(&self, endpoint: &str) -> Result<Self::Channel, ChannelError>;
}

#[async_trait]
pub trait Channel: Send + 'static {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError>;

    /// Next text frame, or `None` once the peer has closed the connection.
    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>>;

    /// Best-effort close; pending frames are not drained.
    async fn close(&mut self);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn open(&self, endpoint: &str) -> Result<WsChannel, ChannelError> {
        let (stream, response) =
            connect_async(endpoint)
                .await
                .map_err(|e| ChannelError::Connect {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;

        info!(
            "Connected to job server at {} (HTTP {})",
            endpoint,
            response.status()
        );
        Ok(WsChannel { stream })
    }
}

#[async_trait]
impl Channel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))
    }

    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    debug!("Job server closed the connection: {:?}", frame);
                    return None;
                }
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => continue,
                Err(e) => return Some(Err(ChannelError::Receive(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("Ignoring error while closing channel: {}", e);
        }
    }
}
