//! ANIMA Speech - Audio in and out of the avatar
//!
//! - PCM16 base64 codec for the wire
//! - Gapless playback scheduling of incoming speech chunks
//! - Browser-style spectrum analyser
//! - Lip sync (amplitude and event driven)
//! - Microphone chunking for the outbound feed

pub mod analyser;
pub mod capture;
pub mod codec;
pub mod lipsync;
pub mod playback;

pub use analyser::*;
pub use capture::*;
pub use codec::*;
pub use lipsync::*;
pub use playback::*;
