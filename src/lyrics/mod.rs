// lyrics/mod.rs - lyric model, grammars and overlay merging
pub mod karaoke;
pub mod merge;
pub mod parse;
pub mod types;
pub mod yrc;

pub use parse::{line_index_at, parse_source};
pub use types::{LyricFormat, LyricLine, LyricOptions, LyricSource};
