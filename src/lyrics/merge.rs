use crate::lyrics::karaoke::KaraokeLine;
use crate::lyrics::types::{LyricLine, Syllable};

/// Attach karaoke syllables to `lines`, pairing lines by index and words by
/// position.
///
/// A line whose overlay word count differs from its own keeps its base timing
/// and gets no syllables; the other lines are unaffected. Returns the number
/// of lines that received karaoke timing.
pub fn merge_karaoke(lines: &mut [LyricLine], overlay: &[KaraokeLine]) -> usize {
    let mut matched = 0;
    for (index, (line, karaoke)) in lines.iter_mut().zip(overlay).enumerate() {
        if line.words.len() != karaoke.words.len() {
            tracing::trace!(
                index,
                base = line.words.len(),
                overlay = karaoke.words.len(),
                "karaoke word count mismatch, keeping base timing"
            );
            continue;
        }

        // Syllables are clamped into their word and kept from overlapping.
        let mut floor = line.start_ms;
        for (word, kw) in line.words.iter_mut().zip(&karaoke.words) {
            let lo = floor.max(word.start_ms);
            let hi = word.end_ms.max(lo);
            word.syllables = kw
                .syllables
                .iter()
                .map(|s| {
                    let start = s.start_ms.clamp(lo, hi);
                    let end = s.end_ms.clamp(start, hi);
                    floor = end;
                    Syllable {
                        text: s.text.clone(),
                        start_ms: start,
                        end_ms: end,
                    }
                })
                .collect();
        }
        matched += 1;
    }
    matched
}

/// Give line `i` the `i`-th translation. Surplus texts are ignored and lines
/// past the end of `texts` stay untranslated.
pub fn merge_translation(lines: &mut [LyricLine], texts: &[String]) {
    for (line, text) in lines.iter_mut().zip(texts) {
        line.translation = Some(text.clone());
    }
}
