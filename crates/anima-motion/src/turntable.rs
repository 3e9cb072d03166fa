//! Turntable - drag-to-rotate the avatar with momentum
//!
//! Hosts feed pointer positions; while dragging the yaw follows the pointer,
//! after release it keeps spinning and slows by `friction` per 60 Hz frame.

use serde::{Deserialize, Serialize};

/// Velocity below which momentum stops
const REST_VELOCITY: f32 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurntableConfig {
    /// Radians per pointer unit
    pub sensitivity: f32,
    /// Velocity kept per reference frame after release
    pub friction: f32,
}

impl Default for TurntableConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.01,
            friction: 0.95,
        }
    }
}

#[derive(Debug, Default)]
pub struct TurntableController {
    cfg: TurntableConfig,
    yaw: f32,
    /// Radians per reference frame
    velocity: f32,
    dragging: bool,
    last_x: f32,
}

impl TurntableController {
    pub fn new(cfg: TurntableConfig) -> Self {
        Self {
            cfg,
            ..Default::default()
        }
    }

    pub fn begin_drag(&mut self, x: f32) {
        self.dragging = true;
        self.last_x = x;
    }

    pub fn drag_to(&mut self, x: f32) {
        if !self.dragging {
            return;
        }
        let delta = (x - self.last_x) * self.cfg.sensitivity;
        self.yaw += delta;
        self.velocity = delta;
        self.last_x = x;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Apply momentum; returns the current yaw
    pub fn update(&mut self, dt: f32) -> f32 {
        if !self.dragging && self.velocity.abs() > REST_VELOCITY {
            // momentum is defined per 60 Hz frame
            let frames = dt * 60.0;
            self.yaw += self.velocity * frames;
            self.velocity *= self.cfg.friction.powf(frames);
        }
        self.yaw
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }
}
