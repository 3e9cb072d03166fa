//! ANIMA Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by every motion source:
//! - Math primitives (Vec3, Rotation)
//! - Noise and critically-damped smoothing
//! - Damped spring integration
//! - Humanoid bone schema and expression names
//! - Rig capabilities (Skeleton, ExpressionSet, SpringBones) and an in-memory rig
//! - Frame stages, the expression pipeline, and the frame clock

pub mod bone;
pub mod error;
pub mod expression;
pub mod math;
pub mod noise;
pub mod rig;
pub mod spring;
pub mod stage;
pub mod time;

pub use bone::*;
pub use error::*;
pub use expression::*;
pub use math::*;
pub use noise::*;
pub use rig::*;
pub use spring::*;
pub use stage::*;
pub use time::*;
