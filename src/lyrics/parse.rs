use crate::lyrics::karaoke;
use crate::lyrics::merge;
use crate::lyrics::types::{LyricFormat, LyricLine, LyricOptions, LyricSource, Word};
use crate::lyrics::yrc;
use once_cell::sync::Lazy;
use regex::Regex;

static LRC_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d{1,3}):(\d{1,2})(?:[.:](\d{1,3}))?\]").unwrap());

static LRC_OFFSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\[offset:\s*([+-]?\d+)\s*\]").unwrap());

static YRC_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\d+,\d+\]\(\d+,\d+,\d+\)").unwrap());

static KARAOKE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\d+,\d+\]\(\d+,\d+\)").unwrap());

/// Parse a lyric payload into display lines, merging the translation and
/// karaoke overlays when `options` allows it.
///
/// Never fails: broken entries are skipped and a source with nothing usable
/// yields an empty vector.
pub fn parse_source(source: &LyricSource, options: &LyricOptions) -> Vec<LyricLine> {
    let format = source
        .format
        .unwrap_or_else(|| detect_format(&source.lyric));
    let mut lines = match format {
        LyricFormat::Lrc => parse_lrc(&source.lyric, options.last_line_ms),
        LyricFormat::Yrc => yrc::parse_yrc(&source.lyric),
        LyricFormat::Karaoke => karaoke::lines_from_karaoke(&karaoke::parse_karaoke(&source.lyric)),
    };

    if options.karaoke
        && format != LyricFormat::Karaoke
        && let Some(raw) = source.karaoke.as_deref()
    {
        let overlay = karaoke::parse_karaoke(raw);
        let matched = merge::merge_karaoke(&mut lines, &overlay);
        tracing::debug!(matched, total = lines.len(), "merged karaoke overlay");
    }

    if options.translation
        && let Some(raw) = source.translation.as_deref()
    {
        merge::merge_translation(&mut lines, &translation_texts(raw, options.last_line_ms));
    }

    lines
}

/// Guess the grammar of a blob from its first timed line.
pub fn detect_format(content: &str) -> LyricFormat {
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if YRC_LINE_RE.is_match(line) {
            return LyricFormat::Yrc;
        }
        if KARAOKE_LINE_RE.is_match(line) {
            return LyricFormat::Karaoke;
        }
        if LRC_TAG_RE.is_match(line) {
            return LyricFormat::Lrc;
        }
    }
    LyricFormat::Lrc
}

/// Parse one `[mm:ss.xx]` tag at the start of `src`.
/// Returns the consumed byte count and the time in milliseconds.
fn parse_lrc_tag(src: &str) -> Option<(usize, u64)> {
    let cap = LRC_TAG_RE.captures(src)?;
    let consumed = cap.get(0)?.end();
    let min: u64 = cap.get(1)?.as_str().parse().ok()?;
    let sec: u64 = cap.get(2)?.as_str().parse().ok()?;
    if sec >= 60 {
        return None;
    }
    let frac = match cap.get(3) {
        Some(m) => {
            let digits = m.as_str();
            let value: u64 = digits.parse().ok()?;
            match digits.len() {
                1 => value * 100,
                2 => value * 10,
                _ => value,
            }
        }
        None => 0,
    };
    Some((consumed, min * 60_000 + sec * 1_000 + frac))
}

/// Parse line-level LRC text.
///
/// Every tagged line becomes one line holding a single word spanning its
/// text. A line ends where the next one starts; the last one lasts
/// `last_line_ms`. Empty tagged lines only terminate their predecessor.
pub fn parse_lrc(src: &str, last_line_ms: u64) -> Vec<LyricLine> {
    let offset = lrc_offset(src);
    let mut entries: Vec<(u64, String)> = Vec::new();

    for line in src.lines() {
        let line = line.trim();
        let mut pos = 0;
        let mut stamps = Vec::new();
        while let Some((consumed, time)) = parse_lrc_tag(&line[pos..]) {
            stamps.push(time);
            pos += consumed;
        }
        if stamps.is_empty() {
            continue;
        }
        let text = line[pos..].trim();
        for time in stamps {
            let shifted = if offset >= 0 {
                time.saturating_sub(offset as u64)
            } else {
                time.saturating_add(offset.unsigned_abs())
            };
            entries.push((shifted, text.to_string()));
        }
    }

    // Stable sort keeps source order among equal stamps so the first wins.
    entries.sort_by_key(|(start, _)| *start);
    entries.dedup_by_key(|(start, _)| *start);

    let mut lines = Vec::with_capacity(entries.len());
    for (i, (start, text)) in entries.iter().enumerate() {
        if text.is_empty() {
            continue;
        }
        let end = entries
            .get(i + 1)
            .map(|(next, _)| *next)
            .unwrap_or_else(|| start.saturating_add(last_line_ms));
        lines.push(LyricLine {
            start_ms: *start,
            end_ms: end,
            words: vec![Word::new(text.clone(), *start, end)],
            translation: None,
        });
    }
    lines
}

/// `[offset:+500]` moves every stamp 500 ms earlier.
fn lrc_offset(src: &str) -> i64 {
    src.lines()
        .filter_map(|l| LRC_OFFSET_RE.captures(l.trim()))
        .find_map(|cap| cap.get(1)?.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Translation texts in line order. Timed translations are read as LRC,
/// anything else as one text per non-empty line.
fn translation_texts(raw: &str, last_line_ms: u64) -> Vec<String> {
    let timed = raw.lines().any(|l| LRC_TAG_RE.is_match(l.trim()));
    if timed {
        parse_lrc(raw, last_line_ms)
            .iter()
            .map(LyricLine::text)
            .collect()
    } else {
        raw.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Enforce the line/word ordering invariants on freshly parsed lines.
///
/// Words are sorted and clipped so they never overlap, a line starts no later
/// than its first word and ends no earlier than its last, lines without words
/// are dropped and lines sharing a start keep only the first.
pub fn normalize_lines(mut lines: Vec<LyricLine>) -> Vec<LyricLine> {
    lines.retain(|l| !l.words.is_empty());
    for line in lines.iter_mut() {
        line.words.sort_by_key(|w| w.start_ms);
        for w in line.words.iter_mut() {
            w.end_ms = w.end_ms.max(w.start_ms);
        }
        for i in 1..line.words.len() {
            let next_start = line.words[i].start_ms;
            let prev = &mut line.words[i - 1];
            if prev.end_ms > next_start {
                prev.end_ms = next_start;
            }
        }
        if let Some(first) = line.words.first() {
            line.start_ms = line.start_ms.min(first.start_ms);
        }
        if let Some(last) = line.words.last() {
            line.end_ms = line.end_ms.max(last.end_ms);
        }
        line.end_ms = line.end_ms.max(line.start_ms);
    }
    lines.sort_by_key(|l| l.start_ms);
    lines.dedup_by_key(|l| l.start_ms);
    lines
}

/// Index of the line active at `position_ms`, if playback has reached any.
pub fn line_index_at(lines: &[LyricLine], position_ms: u64) -> Option<usize> {
    match lines.binary_search_by(|line| line.start_ms.cmp(&position_ms)) {
        Ok(idx) => Some(idx),
        Err(0) => None,
        Err(idx) => Some(idx - 1),
    }
}
