// state.rs: Published state for the renderer (single writer, many readers)

use crate::connection::ConnectionState;
use crate::lyrics::LyricLine;
use std::sync::Arc;
use tokio::sync::watch;

/// Identity of the track currently loaded by the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongInfo {
    pub title: String,
    pub author: String,
    pub album: String,
    pub cover: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerState {
    pub paused: bool,
    pub progress_ms: u64,
}

/// Remote device status as reported by the player's own connection events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStatus {
    pub online: bool,
    pub name: Option<String>,
}

/// Everything a renderer reads. Song and lines are shared so snapshots stay
/// cheap to clone on every refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub song: Arc<SongInfo>,
    pub lines: Arc<Vec<LyricLine>>,
    pub player: PlayerState,
    pub connection: ConnectionState,
    pub device: DeviceStatus,
    pub version: u64, // Incremented on any state change
}

impl Snapshot {
    pub fn is_connected(&self) -> bool {
        self.connection.is_open()
    }
}

/// The writable side of the published state. Owned by the pipeline.
pub struct StateStore {
    tx: watch::Sender<Snapshot>,
}

/// Read-only view handed to renderers.
#[derive(Clone)]
pub struct StoreHandle {
    rx: watch::Receiver<Snapshot>,
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        Self { tx }
    }

    pub fn handle(&self) -> StoreHandle {
        StoreHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Apply `f` and notify readers only when it reports a change.
    fn update(&self, f: impl FnOnce(&mut Snapshot) -> bool) -> bool {
        self.tx.send_if_modified(|snap| {
            let changed = f(snap);
            if changed {
                snap.version += 1;
            }
            changed
        })
    }

    pub fn set_song(&self, song: SongInfo) -> bool {
        self.update(|snap| {
            if *snap.song == song {
                return false;
            }
            snap.song = Arc::new(song);
            true
        })
    }

    pub fn set_lines(&self, lines: Vec<LyricLine>) -> bool {
        self.update(|snap| {
            snap.lines = Arc::new(lines);
            true
        })
    }

    pub fn set_paused(&self, paused: bool) -> bool {
        self.update(|snap| {
            if snap.player.paused == paused {
                return false;
            }
            snap.player.paused = paused;
            true
        })
    }

    pub fn set_progress(&self, progress_ms: u64) -> bool {
        self.update(|snap| {
            if snap.player.progress_ms == progress_ms {
                return false;
            }
            snap.player.progress_ms = progress_ms;
            true
        })
    }

    /// Connectivity changes never clear song, lines or player state so a
    /// short reconnect does not blank the display.
    pub fn set_connection(&self, connection: ConnectionState) -> bool {
        self.update(|snap| {
            if snap.connection == connection {
                return false;
            }
            snap.connection = connection;
            true
        })
    }

    pub fn set_device(&self, device: DeviceStatus) -> bool {
        self.update(|snap| {
            if snap.device == device {
                return false;
            }
            snap.device = device;
            true
        })
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreHandle {
    pub fn song_info(&self) -> Arc<SongInfo> {
        self.rx.borrow().song.clone()
    }

    pub fn lyric_lines(&self) -> Arc<Vec<LyricLine>> {
        self.rx.borrow().lines.clone()
    }

    pub fn player_state(&self) -> PlayerState {
        self.rx.borrow().player
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.rx.borrow().connection.clone()
    }

    pub fn device(&self) -> DeviceStatus {
        self.rx.borrow().device.clone()
    }

    /// Latest snapshot, marking it as seen for `changed`.
    pub fn snapshot(&mut self) -> Snapshot {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next change. Errors once the store has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionStatus;
    use crate::lyrics::{LyricFormat, LyricOptions, LyricSource, parse_source};

    fn song(title: &str) -> SongInfo {
        SongInfo {
            title: title.to_string(),
            author: "Someone".to_string(),
            album: "Record".to_string(),
            cover: None,
            duration_ms: 180_000,
        }
    }

    #[test]
    fn song_is_replaced_wholesale() {
        let store = StateStore::new();
        let handle = store.handle();
        assert!(store.set_song(song("First")));
        let first = handle.song_info();
        assert!(store.set_song(song("Second")));
        assert_eq!(first.title, "First");
        assert_eq!(handle.song_info().title, "Second");
        assert!(!store.set_song(song("Second")));
    }

    #[tokio::test]
    async fn readers_are_notified_of_changes() {
        let store = StateStore::new();
        let mut handle = store.handle();
        store.set_progress(1_000);
        handle.changed().await.unwrap();
        let snap = handle.snapshot();
        assert_eq!(snap.player.progress_ms, 1_000);
        assert_eq!(snap.version, 1);

        // No-op writes do not bump the version.
        assert!(!store.set_progress(1_000));
        assert_eq!(store.snapshot().version, 1);
    }

    #[test]
    fn disconnect_keeps_previous_data() {
        let store = StateStore::new();
        let handle = store.handle();
        store.set_song(song("Kept"));
        let source = LyricSource::new(LyricFormat::Lrc, "[00:01.00]line");
        store.set_lines(parse_source(&source, &LyricOptions::default()));
        store.set_paused(true);
        store.set_connection(ConnectionState {
            status: ConnectionStatus::Open,
            ..ConnectionState::default()
        });
        assert!(store.snapshot().is_connected());

        store.set_connection(ConnectionState {
            status: ConnectionStatus::Reconnecting,
            retries: 1,
            ..ConnectionState::default()
        });
        assert!(!store.snapshot().is_connected());
        assert_eq!(handle.song_info().title, "Kept");
        assert_eq!(handle.lyric_lines().len(), 1);
        assert!(handle.player_state().paused);
        assert_eq!(handle.connection_state().retries, 1);
    }
}
