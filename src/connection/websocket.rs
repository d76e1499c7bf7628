//! Websocket transport for the connection manager.

use super::{Channel, ConnectionError, Connector, InboundFrame};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
use tracing::{debug, trace};

/// Connects to a `ws://` or `wss://` endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn connect(&mut self) -> Result<WsChannel, ConnectionError> {
        let (stream, response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        debug!(url = %self.url, status = %response.status(), "websocket handshake complete");
        Ok(WsChannel { stream })
    }
}

pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Channel for WsChannel {
    async fn recv(&mut self) -> Result<Option<InboundFrame>, ConnectionError> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(InboundFrame::Text(text.as_str().to_owned()))),
                Message::Binary(bytes) => return Ok(Some(InboundFrame::Binary(bytes.to_vec()))),
                Message::Close(frame) => {
                    debug!(?frame, "close frame received");
                    return Ok(None);
                }
                // Pongs to incoming pings are queued by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => trace!("control frame"),
            }
        }
        Ok(None)
    }

    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("error closing websocket: {e}");
        }
    }
}
