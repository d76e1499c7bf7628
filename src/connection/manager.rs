use super::{
    Backoff, Channel, ConnectionError, ConnectionState, ConnectionStatus, Connector, InboundFrame,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What the manager reports to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    State(ConnectionState),
    Frame(InboundFrame),
}

enum Exit {
    Shutdown,
    Closed(ConnectionError),
}

enum Step {
    Shutdown,
    Received(Result<Option<InboundFrame>, ConnectionError>),
    Idle,
}

/// Owns the channel and its `Connecting → Open → Closed → Reconnecting`
/// state machine. Runs until shut down; failures are only ever retried.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    backoff: Backoff,
    idle_timeout: Option<Duration>,
    subscribe: Option<String>,
    state: ConnectionState,
    events: mpsc::Sender<ChannelEvent>,
}

async fn idle_sleep(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, events: mpsc::Sender<ChannelEvent>) -> Self {
        Self {
            connector,
            backoff: Backoff::default(),
            idle_timeout: None,
            subscribe: None,
            state: ConnectionState::default(),
            events,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Treat the channel as dead after `timeout` without any frame.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout.filter(|d| !d.is_zero());
        self
    }

    /// Frame sent after every successful handshake.
    pub fn with_subscribe(mut self, subscribe: Option<String>) -> Self {
        self.subscribe = subscribe;
        self
    }

    /// Publish a state change. Returns false once nobody is listening.
    async fn transition(&mut self, status: ConnectionStatus) -> bool {
        self.state.status = status;
        if status != ConnectionStatus::Reconnecting {
            self.state.next_retry = None;
        }
        debug!(?status, retries = self.state.retries, "connection state");
        self.events
            .send(ChannelEvent::State(self.state.clone()))
            .await
            .is_ok()
    }

    pub async fn run(mut self, mut shutdown: mpsc::Receiver<()>) {
        loop {
            if !self.transition(ConnectionStatus::Connecting).await {
                break;
            }
            let attempt = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                attempt = self.connector.connect() => attempt,
            };

            match attempt {
                Ok(mut channel) => {
                    self.state.retries = 0;
                    self.backoff.reset();
                    if !self.transition(ConnectionStatus::Open).await {
                        channel.close().await;
                        break;
                    }
                    info!("connected");
                    match self.serve(&mut channel, &mut shutdown).await {
                        Exit::Shutdown => {
                            channel.close().await;
                            break;
                        }
                        Exit::Closed(e) => warn!("connection lost: {e}"),
                    }
                }
                Err(e) => warn!("connection attempt failed: {e}"),
            }

            if !self.transition(ConnectionStatus::Closed).await {
                break;
            }
            let delay = self.backoff.next_delay();
            self.state.retries = self.state.retries.saturating_add(1);
            self.state.next_retry = Some(Instant::now() + delay);
            if !self.transition(ConnectionStatus::Reconnecting).await {
                break;
            }
            info!("reconnecting in {:.1}s", delay.as_secs_f32());
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        debug!("connection manager stopped");
    }

    /// Forward frames until the channel fails or shutdown is requested.
    async fn serve(&mut self, channel: &mut C::Channel, shutdown: &mut mpsc::Receiver<()>) -> Exit {
        if let Some(subscribe) = self.subscribe.clone()
            && let Err(e) = channel.send_text(subscribe).await
        {
            return Exit::Closed(e);
        }

        let idle = self.idle_timeout;
        loop {
            let step = tokio::select! {
                biased;
                _ = shutdown.recv() => Step::Shutdown,
                received = channel.recv() => Step::Received(received),
                () = idle_sleep(idle) => Step::Idle,
            };
            match step {
                Step::Shutdown => return Exit::Shutdown,
                Step::Received(Ok(Some(frame))) => {
                    if self.events.send(ChannelEvent::Frame(frame)).await.is_err() {
                        return Exit::Shutdown;
                    }
                }
                Step::Received(Ok(None)) => return Exit::Closed(ConnectionError::ClosedByRemote),
                Step::Received(Err(e)) => return Exit::Closed(e),
                Step::Idle => {
                    return Exit::Closed(ConnectionError::IdleTimeout(idle.unwrap_or_default()));
                }
            }
        }
    }
}
