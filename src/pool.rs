// pool.rs: Central event loop wiring the channel, decoder, reconciler and store

use crate::connection::{ChannelEvent, ConnectionManager, Connector, InboundFrame};
use crate::event::{self, Event};
use crate::lyrics::{LyricOptions, parse_source};
use crate::progress::ProgressReconciler;
use crate::state::{StateStore, StoreHandle};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Bound on frames queued between the connection task and the pipeline.
const EVENT_QUEUE: usize = 64;

/// The single writer of [`StateStore`]. Applies channel events in receipt
/// order and republishes the reconciled position on every refresh.
pub struct Pipeline {
    store: StateStore,
    reconciler: ProgressReconciler,
    options: LyricOptions,
}

impl Pipeline {
    pub fn new(store: StateStore, reconciler: ProgressReconciler, options: LyricOptions) -> Self {
        Self {
            store,
            reconciler,
            options,
        }
    }

    pub fn handle(&self) -> StoreHandle {
        self.store.handle()
    }

    fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::State(state) => {
                self.store.set_connection(state);
            }
            ChannelEvent::Frame(frame) => self.handle_frame(&frame),
        }
    }

    /// Decode and apply one frame. Malformed frames are logged and dropped.
    fn handle_frame(&mut self, frame: &InboundFrame) {
        let decoded = match frame {
            InboundFrame::Text(text) => event::decode_text(text),
            InboundFrame::Binary(bytes) => event::decode_binary(bytes),
        };
        match decoded {
            Ok(ev) => self.apply(ev),
            Err(e) => warn!("dropping frame: {e}"),
        }
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::SongMetadata(song) => {
                let title = song.title.clone();
                if self.store.set_song(song) {
                    info!(%title, "now playing");
                    self.reconciler.reset();
                    self.store.set_progress(0);
                    self.store.set_lines(Vec::new());
                }
            }
            Event::LyricPayload(source) => {
                let lines = parse_source(&source, &self.options);
                debug!(lines = lines.len(), "lyrics loaded");
                self.store.set_lines(lines);
            }
            Event::PlayerState { paused } => {
                self.reconciler.on_paused(paused);
                self.store.set_paused(paused);
                self.refresh();
            }
            Event::ProgressTick {
                position_ms,
                paused,
            } => {
                // A tick without a flag keeps the last known play state.
                let paused = paused.unwrap_or_else(|| self.store.snapshot().player.paused);
                self.reconciler.on_tick(position_ms, paused);
                self.store.set_paused(paused);
                self.refresh();
            }
            Event::Connection(device) => {
                self.store.set_device(device);
            }
            Event::Unknown(kind) => debug!(%kind, "ignoring event"),
        }
    }

    /// Publish the reconciler's current estimate.
    fn refresh(&self) {
        self.store.set_progress(self.reconciler.current_ms());
    }
}

/// Runs the connection manager and the pipeline until `shutdown_rx` fires or
/// its sender is dropped.
pub async fn listen<C: Connector>(
    mut pipeline: Pipeline,
    connector: C,
    mut shutdown_rx: mpsc::Receiver<()>,
    cfg: crate::Config,
) {
    let (event_tx, mut event_rx) = mpsc::channel(EVENT_QUEUE);
    let (manager_shutdown_tx, manager_shutdown_rx) = mpsc::channel(1);
    let manager = ConnectionManager::new(connector, event_tx)
        .with_backoff(cfg.backoff())
        .with_idle_timeout(cfg.idle_timeout())
        .with_subscribe(cfg.subscribe.clone());
    let manager = tokio::spawn(manager.run(manager_shutdown_rx));

    let mut refresh = tokio::time::interval(cfg.refresh_interval());
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            maybe_event = event_rx.recv() => match maybe_event {
                Some(event) => pipeline.handle_channel_event(event),
                None => break,
            },
            _ = refresh.tick() => pipeline.refresh(),
        }
    }

    debug!("pipeline shutting down");
    let _ = manager_shutdown_tx.send(()).await;
    // Unblock a manager that is waiting on a full queue.
    drop(event_rx);
    if let Err(e) = manager.await {
        warn!("connection task failed: {e}");
    }
}

/// Interval between refreshes for a rate in Hz. Zero is treated as 1 Hz.
pub fn refresh_interval(hz: u32) -> Duration {
    Duration::from_secs(1) / hz.max(1)
}
