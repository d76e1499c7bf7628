use crate::lyrics::{LyricLine, line_index_at};
use crate::state::{Snapshot, StoreHandle};
use std::io::{self, Write};
use std::sync::Arc;

/// Tracks what has already been printed so each line appears once.
#[derive(Default)]
struct PipePrinter {
    last_track_id: Option<(String, String, String)>,
    last_lines: Option<Arc<Vec<LyricLine>>>,
    last_line_idx: Option<usize>,
    last_track_had_lyric: bool,
}

impl PipePrinter {
    fn render(&mut self, snap: &Snapshot, out: &mut impl Write) -> io::Result<()> {
        let track_id = crate::ui::track_id(snap);
        let has_lyrics = !snap.lines.is_empty();

        if self.last_track_id.as_ref() != Some(&track_id) {
            // Only print a newline if previous track had lyrics and new track has none
            if self.last_track_id.is_some() && self.last_track_had_lyric && !has_lyrics {
                writeln!(out)?;
            }
            self.last_track_id = Some(track_id);
            self.last_line_idx = None;
            self.last_track_had_lyric = false;
        }

        // Fresh lyrics for the same track start over from the current line.
        let same_lines = self
            .last_lines
            .as_ref()
            .is_some_and(|lines| Arc::ptr_eq(lines, &snap.lines));
        if !same_lines {
            self.last_lines = Some(snap.lines.clone());
            self.last_line_idx = None;
        }

        if !has_lyrics {
            return Ok(());
        }
        let idx = line_index_at(&snap.lines, snap.player.progress_ms);
        if idx == self.last_line_idx {
            return Ok(());
        }
        self.last_line_idx = idx;
        if let Some(line) = idx.and_then(|i| snap.lines.get(i)) {
            writeln!(out, "{}", line.text())?;
            if let Some(translation) = &line.translation {
                writeln!(out, "{translation}")?;
            }
            self.last_track_had_lyric = true;
        }
        out.flush()
    }
}

/// Display lyrics in pipe mode (stdout only, for scripting). Returns once the
/// store is dropped.
pub async fn display_lyrics_pipe(
    mut handle: StoreHandle,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut printer = PipePrinter::default();
    loop {
        let snap = handle.snapshot();
        printer.render(&snap, &mut io::stdout().lock())?;
        if handle.changed().await.is_err() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::{LyricFormat, LyricOptions, LyricSource, parse_source};
    use crate::state::{SongInfo, StateStore};

    fn song(title: &str) -> SongInfo {
        SongInfo {
            title: title.to_string(),
            ..SongInfo::default()
        }
    }

    fn render(printer: &mut PipePrinter, store: &StateStore) -> String {
        let mut out = Vec::new();
        printer.render(&store.snapshot(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn prints_each_line_once_with_translation() {
        let store = StateStore::new();
        store.set_song(song("One"));
        let source = LyricSource::new(LyricFormat::Lrc, "[00:01.00]first\n[00:03.00]second")
            .with_translation("[00:01.00]erste\n[00:03.00]zweite");
        store.set_lines(parse_source(&source, &LyricOptions::default()));
        let mut printer = PipePrinter::default();

        assert_eq!(render(&mut printer, &store), "");
        store.set_progress(1_200);
        assert_eq!(render(&mut printer, &store), "first\nerste\n");
        store.set_progress(1_900);
        assert_eq!(render(&mut printer, &store), "");
        store.set_progress(3_000);
        assert_eq!(render(&mut printer, &store), "second\nzweite\n");
    }

    #[test]
    fn track_without_lyrics_gets_separator() {
        let store = StateStore::new();
        store.set_song(song("One"));
        store.set_lines(parse_source(
            &LyricSource::new(LyricFormat::Lrc, "[00:00.00]only"),
            &LyricOptions::default(),
        ));
        let mut printer = PipePrinter::default();
        assert_eq!(render(&mut printer, &store), "only\n");

        store.set_song(song("Two"));
        store.set_lines(Vec::new());
        assert_eq!(render(&mut printer, &store), "\n");
    }
}
