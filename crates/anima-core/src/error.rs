//! Error types for ANIMA
//!
//! Only I/O-facing code returns these. The animation core treats a missing
//! bone, expression or spring manager as absence (`Option`), never as an error.

use thiserror::Error;

/// Core ANIMA errors
#[derive(Error, Debug)]
pub enum AnimaError {
    // Config errors
    #[error("Failed to read config {path}: {reason}")]
    ConfigRead { path: String, reason: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    // Feed errors
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Feed connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Feed connection closed")]
    ConnectionClosed,

    #[error("Poll failed: {0}")]
    PollFailed(String),

    #[error("Session shut down")]
    SessionClosed,

    // Codec errors
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("Odd PCM byte length: {0}")]
    OddPcmLength(usize),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    // Asset errors
    #[error("Avatar asset unavailable: {0}")]
    AssetUnavailable(String),
}

/// Result type for ANIMA operations
pub type AnimaResult<T> = Result<T, AnimaError>;
