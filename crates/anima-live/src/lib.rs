//! ANIMA Live - Live context feed
//!
//! - `LiveContext` - the externally produced mood/attention snapshot
//! - `LiveContextController` - smooths a snapshot into face, gaze and posture
//! - `FeedSession` - push connection with polling fallback and reconnect
//! - `HttpPoller` - the polling side over HTTP

pub mod context;
pub mod controller;
pub mod http;
pub mod message;
pub mod session;

pub use context::*;
pub use controller::*;
pub use http::*;
pub use message::*;
pub use session::*;
