//! Syllable-level karaoke grammar.
//!
//! `[line_start,line_duration](offset,duration)syl(offset,duration)syl...`
//!
//! Syllable stamps are relative: each one starts `offset` ms after the end of
//! the previous syllable (the first one after `line_start`). Syllables join
//! into words until whitespace separates them.

use crate::lyrics::parse::normalize_lines;
use crate::lyrics::types::{LyricLine, Syllable, Word};
use once_cell::sync::Lazy;
use regex::Regex;

static LINE_HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(\d+),(\d+)\]").unwrap());

static SYLLABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+),(\d+)\)").unwrap());

/// One karaoke word: the syllables that make it up plus any trailing spacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KaraokeWord {
    pub text: String,
    pub syllables: Vec<Syllable>,
}

impl KaraokeWord {
    pub fn start_ms(&self) -> u64 {
        self.syllables.first().map(|s| s.start_ms).unwrap_or(0)
    }

    pub fn end_ms(&self) -> u64 {
        self.syllables.last().map(|s| s.end_ms).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KaraokeLine {
    pub start_ms: u64,
    pub duration_ms: u64,
    pub words: Vec<KaraokeWord>,
}

#[derive(Default)]
struct WordBuilder {
    words: Vec<KaraokeWord>,
    current: Option<KaraokeWord>,
}

impl WordBuilder {
    fn close(&mut self) {
        if let Some(word) = self.current.take() {
            self.words.push(word);
        }
    }

    fn push(&mut self, text: &str, start_ms: u64, end_ms: u64) {
        if text.trim().is_empty() {
            match self.current.as_mut() {
                Some(word) => word.text.push_str(text),
                None => {
                    if let Some(prev) = self.words.last_mut() {
                        prev.text.push_str(text);
                    }
                }
            }
            self.close();
            return;
        }
        if text.starts_with(char::is_whitespace) {
            self.close();
        }
        let word = self.current.get_or_insert_with(|| KaraokeWord {
            text: String::new(),
            syllables: Vec::new(),
        });
        word.text.push_str(text);
        word.syllables.push(Syllable {
            text: text.trim().to_string(),
            start_ms,
            end_ms,
        });
        if text.ends_with(char::is_whitespace) {
            self.close();
        }
    }

    fn finish(mut self) -> Vec<KaraokeWord> {
        self.close();
        self.words
    }
}

fn parse_line(line: &str) -> Option<KaraokeLine> {
    let line = line.trim();
    let header = LINE_HEADER_RE.captures(line)?;
    let start_ms: u64 = header.get(1)?.as_str().parse().ok()?;
    let duration_ms: u64 = header.get(2)?.as_str().parse().ok()?;
    let body = &line[header.get(0)?.end()..];

    let stamps: Vec<_> = SYLLABLE_RE.captures_iter(body).collect();
    let mut builder = WordBuilder::default();
    let mut cursor = start_ms;
    for (i, cap) in stamps.iter().enumerate() {
        let Some(whole) = cap.get(0) else { continue };
        let text_end = stamps
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(body.len());
        let (Some(offset), Some(duration)) = (
            cap.get(1).and_then(|m| m.as_str().parse::<u64>().ok()),
            cap.get(2).and_then(|m| m.as_str().parse::<u64>().ok()),
        ) else {
            continue;
        };
        let start = cursor.saturating_add(offset);
        let end = start.saturating_add(duration);
        cursor = end;
        builder.push(&body[whole.end()..text_end], start, end);
    }

    let words = builder.finish();
    if words.is_empty() {
        return None;
    }
    Some(KaraokeLine {
        start_ms,
        duration_ms,
        words,
    })
}

/// Parse a karaoke blob. Lines that are not karaoke lines are skipped.
pub fn parse_karaoke(src: &str) -> Vec<KaraokeLine> {
    src.lines().filter_map(parse_line).collect()
}

/// Build display lines when the karaoke blob is the primary lyric.
pub fn lines_from_karaoke(karaoke: &[KaraokeLine]) -> Vec<LyricLine> {
    let lines = karaoke
        .iter()
        .map(|k| {
            let words = k
                .words
                .iter()
                .map(|kw| {
                    let mut word = Word::new(kw.text.clone(), kw.start_ms(), kw.end_ms());
                    word.syllables = kw.syllables.clone();
                    word
                })
                .collect();
            LyricLine {
                start_ms: k.start_ms,
                end_ms: k.start_ms.saturating_add(k.duration_ms),
                words,
                translation: None,
            }
        })
        .collect();
    normalize_lines(lines)
}
