//! Word-level lyric grammar.
//!
//! `[line_start,line_duration](start,duration,flag)word(start,duration,flag)word...`
//! with absolute millisecond stamps. A non-zero `flag` marks the word as
//! obscene.

use crate::lyrics::parse::normalize_lines;
use crate::lyrics::types::{LyricLine, Word};
use once_cell::sync::Lazy;
use regex::Regex;

static LINE_HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(\d+),(\d+)\]").unwrap());

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+),(\d+),(\d+)\)").unwrap());

fn parse_line(line: &str) -> Option<LyricLine> {
    let line = line.trim();
    let header = LINE_HEADER_RE.captures(line)?;
    let line_start: u64 = header.get(1)?.as_str().parse().ok()?;
    let body = &line[header.get(0)?.end()..];

    let stamps: Vec<_> = WORD_RE.captures_iter(body).collect();
    let mut words: Vec<Word> = Vec::with_capacity(stamps.len());
    for (i, cap) in stamps.iter().enumerate() {
        let Some(whole) = cap.get(0) else { continue };
        let text_end = stamps
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(body.len());
        let text = &body[whole.end()..text_end];

        let (Some(start), Some(duration)) = (
            cap.get(1).and_then(|m| m.as_str().parse::<u64>().ok()),
            cap.get(2).and_then(|m| m.as_str().parse::<u64>().ok()),
        ) else {
            continue;
        };
        let obscene = cap
            .get(3)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .is_some_and(|flag| flag != 0);

        if text.trim().is_empty() {
            // Keep the spacing for display but not as a timed word.
            if let Some(prev) = words.last_mut() {
                prev.text.push_str(text);
            }
            continue;
        }

        let mut word = Word::new(text, start, start.saturating_add(duration));
        word.obscene = obscene;
        words.push(word);
    }

    let end = words.iter().map(|w| w.end_ms).max()?;
    Some(LyricLine {
        start_ms: line_start,
        end_ms: end,
        words,
        translation: None,
    })
}

pub fn parse_yrc(src: &str) -> Vec<LyricLine> {
    let parsed = src.lines().filter_map(parse_line).collect();
    normalize_lines(parsed)
}
