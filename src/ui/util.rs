//! Track identification for renderers.
//!
//! Renderers compare track IDs between snapshots to detect when to reset
//! their display state. A track ID is the (author, title, album) triple.

use crate::state::{SongInfo, Snapshot};

/// Types that can be reduced to a canonical track identifier.
pub trait AsTrackId {
    /// Returns (author, title, album).
    fn as_track_id(&self) -> (String, String, String);
}

impl AsTrackId for SongInfo {
    fn as_track_id(&self) -> (String, String, String) {
        (self.author.clone(), self.title.clone(), self.album.clone())
    }
}

impl AsTrackId for Snapshot {
    fn as_track_id(&self) -> (String, String, String) {
        self.song.as_track_id()
    }
}

/// Extract a track identifier from any type implementing `AsTrackId`.
pub fn track_id<T: AsTrackId>(t: &T) -> (String, String, String) {
    t.as_track_id()
}
