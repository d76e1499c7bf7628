//! Channel lifecycle: connect, detect failure, back off, reconnect.

pub mod backoff;
pub mod manager;
pub mod websocket;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

pub use backoff::Backoff;
pub use manager::{ChannelEvent, ConnectionManager};
pub use websocket::WsConnector;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Open,
    Closed,
    Reconnecting,
}

/// Lifecycle state owned by [`ConnectionManager`]; everyone else sees copies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Failed attempts since the channel was last open.
    pub retries: u32,
    pub next_retry: Option<Instant>,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        self.status == ConnectionStatus::Open
    }
}

/// A data frame as received from the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection closed by remote")]
    ClosedByRemote,
    #[error("no frame received for {0:?}")]
    IdleTimeout(Duration),
    #[error("connection refused: {0}")]
    Refused(String),
}

/// An established bidirectional channel.
pub trait Channel: Send {
    /// Next data frame. `Ok(None)` means the remote closed the channel.
    fn recv(&mut self) -> impl Future<Output = Result<Option<InboundFrame>, ConnectionError>> + Send;

    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Best-effort orderly close.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens channels to the authoritative event source.
pub trait Connector: Send + 'static {
    type Channel: Channel + 'static;

    fn connect(&mut self) -> impl Future<Output = Result<Self::Channel, ConnectionError>> + Send;
}
