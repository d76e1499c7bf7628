/// Timing grammar of a raw lyric blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricFormat {
    /// Line-level `[mm:ss.xx]text`.
    Lrc,
    /// Word-level `[start,duration](start,duration,flag)word`.
    Yrc,
    /// Syllable-level `[start,duration](offset,duration)syllable`.
    Karaoke,
}

impl LyricFormat {
    /// Map a wire tag to a format. Unrecognised tags return `None` and are
    /// resolved by content detection instead.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "lrc" | "line" => Some(Self::Lrc),
            "yrc" | "word" => Some(Self::Yrc),
            "krc" | "klyric" | "karaoke" | "syllable" => Some(Self::Karaoke),
            _ => None,
        }
    }
}

/// Raw lyric payload as handed over by the lyric provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricSource {
    /// `None` when the payload did not carry a recognisable format tag.
    pub format: Option<LyricFormat>,
    pub lyric: String,
    pub translation: Option<String>,
    pub karaoke: Option<String>,
}

impl LyricSource {
    pub fn new(format: LyricFormat, lyric: impl Into<String>) -> Self {
        Self {
            format: Some(format),
            lyric: lyric.into(),
            translation: None,
            karaoke: None,
        }
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    pub fn with_karaoke(mut self, karaoke: impl Into<String>) -> Self {
        self.karaoke = Some(karaoke.into());
        self
    }
}

/// Sub-word highlight segment taken from a karaoke overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syllable {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub obscene: bool,
    /// Karaoke timing for this word. Empty when no overlay matched.
    pub syllables: Vec<Syllable>,
}

impl Word {
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms,
            obscene: false,
            syllables: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub start_ms: u64,
    pub end_ms: u64,
    pub words: Vec<Word>,
    pub translation: Option<String>,
}

impl LyricLine {
    /// Full line text, words joined as written in the source.
    pub fn text(&self) -> String {
        self.words.iter().map(|w| w.text.as_str()).collect()
    }

    pub fn has_karaoke(&self) -> bool {
        self.words.iter().any(|w| !w.syllables.is_empty())
    }
}

/// Toggles owned by configuration and read by the merge step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LyricOptions {
    pub karaoke: bool,
    pub translation: bool,
    /// End time offset given to the final line of a line-level lyric.
    pub last_line_ms: u64,
}

pub const DEFAULT_LAST_LINE_MS: u64 = 5_000;

impl Default for LyricOptions {
    fn default() -> Self {
        Self {
            karaoke: true,
            translation: true,
            last_line_ms: DEFAULT_LAST_LINE_MS,
        }
    }
}
