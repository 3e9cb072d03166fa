//! ANIMA Motion
//!
//! Procedural motion sources. Each controller owns only its own smoothed
//! state; bones are reached through the rig's `Skeleton` capability and
//! every rest-relative write goes through the shared [`BoneOffsetEngine`].
//!
//! # Sources
//!
//! - Pose: re-asserts the A-pose every frame
//! - Body: body-weight scaling of torso and legs
//! - Idle body: breathing, sway and head micro-motion
//! - Hands: finger curl and wrist dangle
//! - Face: blink state machine and saccades
//! - Physics: wind on spring-bone gravity
//! - Emotion: discrete emotion presets
//! - Turntable: drag-to-rotate with momentum

pub mod body;
pub mod emotion;
pub mod face;
pub mod hands;
pub mod idle_body;
pub mod offset;
pub mod physics;
pub mod pose;
pub mod turntable;

pub use body::*;
pub use emotion::*;
pub use face::*;
pub use hands::*;
pub use idle_body::*;
pub use offset::*;
pub use physics::*;
pub use pose::*;
pub use turntable::*;
