//! Feed messages - inbound parsing and outbound encoding
//!
//! Inbound frames are JSON text. A frame with a `type` tag is one of the
//! typed messages below; a frame without one is taken as a raw
//! [`LiveContext`]. Anything else is malformed and is dropped by the session.

use anima_core::{AnimaError, AnimaResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::LiveContext;

/// Sample rate assumed when an audio chunk omits it
pub const DEFAULT_SPEECH_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// A new live snapshot
    Context(LiveContext),
    /// Backend mode ("listening", "thinking", ...)
    Status { mode: String },
    /// A spoken response is starting
    ResponseStart {
        text: String,
        emotion: Option<String>,
    },
    /// Base64 little-endian i16 PCM
    AudioChunk {
        payload: String,
        sample_rate: u32,
        emotion: Option<String>,
    },
}

fn field_str(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn require_str(obj: &serde_json::Map<String, Value>, key: &str, kind: &str) -> AnimaResult<String> {
    field_str(obj, key)
        .ok_or_else(|| AnimaError::MalformedMessage(format!("{kind}: missing string field `{key}`")))
}

fn parse_context(value: Value) -> AnimaResult<LiveContext> {
    if !value.is_object() {
        return Err(AnimaError::MalformedMessage(
            "live context must be an object".into(),
        ));
    }
    serde_json::from_value(value).map_err(|e| AnimaError::MalformedMessage(e.to_string()))
}

impl FeedMessage {
    pub fn parse(text: &str) -> AnimaResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| AnimaError::MalformedMessage(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> AnimaResult<Self> {
        let Value::Object(mut obj) = value else {
            return Err(AnimaError::MalformedMessage("expected a JSON object".into()));
        };

        let kind = match obj.get("type") {
            None => return parse_context(Value::Object(obj)).map(FeedMessage::Context),
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(AnimaError::MalformedMessage(format!(
                    "`type` must be a string, got {other}"
                )))
            }
        };

        match kind.as_str() {
            "live_context" | "context" => {
                let payload = obj.remove("payload").ok_or_else(|| {
                    AnimaError::MalformedMessage(format!("{kind}: missing `payload`"))
                })?;
                parse_context(payload).map(FeedMessage::Context)
            }
            "status" => Ok(FeedMessage::Status {
                mode: require_str(&obj, "mode", &kind)?,
            }),
            "response_start" => Ok(FeedMessage::ResponseStart {
                text: field_str(&obj, "text").unwrap_or_default(),
                emotion: field_str(&obj, "emotion"),
            }),
            "audio_chunk" => {
                let sample_rate = match obj.get("sample_rate") {
                    None | Some(Value::Null) => DEFAULT_SPEECH_SAMPLE_RATE,
                    Some(v) => v
                        .as_u64()
                        .and_then(|r| u32::try_from(r).ok())
                        .filter(|r| *r > 0)
                        .ok_or_else(|| {
                            AnimaError::MalformedMessage(format!("audio_chunk: bad sample_rate {v}"))
                        })?,
                };
                Ok(FeedMessage::AudioChunk {
                    payload: require_str(&obj, "payload", &kind)?,
                    sample_rate,
                    emotion: field_str(&obj, "emotion"),
                })
            }
            other => Err(AnimaError::MalformedMessage(format!(
                "unknown message type `{other}`"
            ))),
        }
    }
}

/// Messages sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Session handshake
    Config { user_id: String, username: String },
    /// Base64 i16 PCM microphone chunk
    Audio { payload: String },
    /// Base64 encoded camera frame
    Video { payload: String },
}

impl OutboundMessage {
    pub fn to_json(&self) -> AnimaResult<String> {
        serde_json::to_string(self).map_err(|e| AnimaError::MalformedMessage(e.to_string()))
    }
}
