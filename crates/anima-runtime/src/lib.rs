//! ANIMA Runtime - Frame composition and the render loop
//!
//! Ties every motion source into one per-frame pass:
//!
//! ```text
//! base pose → body weight → live context → idle face → idle intensity
//!   → idle body → hands → physics → lip sync → commit → render
//! ```
//!
//! Also hosts the TOML configuration and the tracing subscriber setup.

pub mod compositor;
pub mod config;
pub mod logging;
pub mod render_loop;

pub use compositor::*;
pub use config::*;
pub use logging::*;
pub use render_loop::*;
