//! Classification of inbound channel frames into typed events.
//!
//! Frames are JSON objects of the form `{"type": "<kind>", "data": {...}}`.
//! Unknown fields are ignored so newer senders keep working, and an unknown
//! `type` becomes [`Event::Unknown`] instead of an error.

use crate::lyrics::{LyricFormat, LyricSource};
use crate::state::{DeviceStatus, SongInfo};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SongMetadata(SongInfo),
    LyricPayload(LyricSource),
    PlayerState { paused: bool },
    /// `paused` is `None` when the sender left the flag out.
    ProgressTick { position_ms: u64, paused: Option<bool> },
    Connection(DeviceStatus),
    Unknown(String),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("frame is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame has no \"type\" field")]
    MissingType,
    #[error("frame of type {kind:?} has no \"data\" field")]
    MissingData { kind: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SongInfoData {
    #[serde(default, alias = "name")]
    title: String,
    #[serde(default, alias = "artist")]
    author: String,
    #[serde(default)]
    album: String,
    #[serde(default, alias = "coverUrl")]
    cover: Option<String>,
    #[serde(default)]
    duration: u64,
}

#[derive(Deserialize)]
struct LyricData {
    #[serde(default)]
    format: Option<String>,
    lyric: String,
    #[serde(default, alias = "tlyric")]
    translation: Option<String>,
    #[serde(default, alias = "klyric")]
    karaoke: Option<String>,
}

#[derive(Deserialize)]
struct PlayerStateData {
    paused: bool,
}

#[derive(Deserialize)]
struct ProgressData {
    #[serde(alias = "position")]
    progress: u64,
    #[serde(default)]
    paused: Option<bool>,
}

#[derive(Deserialize)]
struct ConnectionData {
    #[serde(alias = "online")]
    connected: bool,
    #[serde(default, alias = "name")]
    device: Option<String>,
}

fn data<T: DeserializeOwned>(kind: &str, data: Option<Value>) -> Result<T, DecodeError> {
    let data = data.ok_or_else(|| DecodeError::MissingData {
        kind: kind.to_string(),
    })?;
    Ok(serde_json::from_value(data)?)
}

/// Decode one text frame.
pub fn decode_text(text: &str) -> Result<Event, DecodeError> {
    let mut frame: Value = serde_json::from_str(text)?;
    let kind = frame
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();
    let payload = frame.get_mut("data").map(Value::take);

    let event = match kind.as_str() {
        "songInfo" | "song" | "metadata" => {
            let d: SongInfoData = data(&kind, payload)?;
            Event::SongMetadata(SongInfo {
                title: d.title,
                author: d.author,
                album: d.album,
                cover: d.cover,
                duration_ms: d.duration,
            })
        }
        "lyric" | "lyrics" => {
            let d: LyricData = data(&kind, payload)?;
            Event::LyricPayload(LyricSource {
                format: d.format.as_deref().and_then(LyricFormat::from_tag),
                lyric: d.lyric,
                translation: d.translation.filter(|t| !t.trim().is_empty()),
                karaoke: d.karaoke.filter(|k| !k.trim().is_empty()),
            })
        }
        "playerState" | "state" => {
            let d: PlayerStateData = data(&kind, payload)?;
            Event::PlayerState { paused: d.paused }
        }
        "progress" => {
            let d: ProgressData = data(&kind, payload)?;
            Event::ProgressTick {
                position_ms: d.progress,
                paused: d.paused,
            }
        }
        "connection" | "device" => {
            let d: ConnectionData = data(&kind, payload)?;
            Event::Connection(DeviceStatus {
                online: d.connected,
                name: d.device,
            })
        }
        _ => Event::Unknown(kind),
    };
    Ok(event)
}

/// Decode a binary frame carrying the same JSON as a text frame.
pub fn decode_binary(bytes: &[u8]) -> Result<Event, DecodeError> {
    decode_text(std::str::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_song_info_with_extra_fields() {
        let ev = decode_text(
            r#"{"type":"songInfo","data":{"title":"T","artist":"A","album":"B","cover":"c.jpg","duration":201000,"explicit":true},"seq":4}"#,
        )
        .unwrap();
        assert_eq!(
            ev,
            Event::SongMetadata(SongInfo {
                title: "T".to_string(),
                author: "A".to_string(),
                album: "B".to_string(),
                cover: Some("c.jpg".to_string()),
                duration_ms: 201_000,
            })
        );
    }

    #[test]
    fn decodes_lyric_payload() {
        let ev = decode_text(
            r#"{"type":"lyric","data":{"format":"yrc","lyric":"[0,1](0,1,0)a","tlyric":"","klyric":"[0,1](0,1)a"}}"#,
        )
        .unwrap();
        let Event::LyricPayload(source) = ev else {
            panic!("expected lyric payload");
        };
        assert_eq!(source.format, Some(LyricFormat::Yrc));
        assert_eq!(source.translation, None);
        assert_eq!(source.karaoke.as_deref(), Some("[0,1](0,1)a"));
    }

    #[test]
    fn unknown_format_tag_is_left_for_detection() {
        let ev = decode_text(r#"{"type":"lyric","data":{"format":"ttml","lyric":""}}"#).unwrap();
        assert!(matches!(ev, Event::LyricPayload(LyricSource { format: None, .. })));
    }

    #[test]
    fn decodes_progress_and_state() {
        assert_eq!(
            decode_text(r#"{"type":"progress","data":{"progress":10000,"paused":false}}"#).unwrap(),
            Event::ProgressTick {
                position_ms: 10_000,
                paused: Some(false)
            }
        );
        assert_eq!(
            decode_text(r#"{"type":"progress","data":{"position":2500}}"#).unwrap(),
            Event::ProgressTick {
                position_ms: 2_500,
                paused: None
            }
        );
        assert_eq!(
            decode_text(r#"{"type":"playerState","data":{"paused":true}}"#).unwrap(),
            Event::PlayerState { paused: true }
        );
        assert_eq!(
            decode_binary(br#"{"type":"device","data":{"online":true,"name":"desk"}}"#).unwrap(),
            Event::Connection(DeviceStatus {
                online: true,
                name: Some("desk".to_string())
            })
        );
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        assert_eq!(
            decode_text(r#"{"type":"volume","data":{"level":3}}"#).unwrap(),
            Event::Unknown("volume".to_string())
        );
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(decode_text("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode_text(r#"{"data":{}}"#), Err(DecodeError::MissingType)));
        assert!(matches!(
            decode_text(r#"{"type":"progress"}"#),
            Err(DecodeError::MissingData { .. })
        ));
        assert!(matches!(
            decode_text(r#"{"type":"progress","data":{"progress":"soon"}}"#),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(decode_binary(&[0xff, 0xfe]), Err(DecodeError::Utf8(_))));
    }
}
