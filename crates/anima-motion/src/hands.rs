//! Idle Hand Controller - gravity dangle of wrists and fingers
//!
//! Middle and ring fingers are heaviest and curl most. Curl falls off toward
//! the fingertip, fingers splay outward from the middle, and a slow wave
//! keeps everything from looking frozen. Rotations are absolute
//! (rest * offset), not blended.

use anima_core::{Finger, HumanBone, MotionTime, Phalanx, Side, Skeleton, Vec3};
use serde::{Deserialize, Serialize};

use crate::{BoneOffsetEngine, OffsetMode};

/// Base curl of index, middle, ring and little
pub const FINGER_WEIGHTS: [f32; 4] = [0.28, 0.48, 0.45, 0.38];

/// Curl lost per joint toward the tip
const JOINT_FALLOFF: f32 = 0.22;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandsConfig {
    pub enabled: bool,
}

impl Default for HandsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Wrist offset (x = gravity pull)
pub fn wrist_offset(t: MotionTime, side: Side) -> Vec3 {
    let sway = t.sin(0.45, 0.0) * 0.04;
    Vec3::new(0.12 + sway, 0.0, 0.05 * side.sign())
}

/// Long-finger offset; `finger` indexes [`Finger::LONG`]
pub fn finger_offset(t: MotionTime, side: Side, finger: usize, phalanx: Phalanx) -> Vec3 {
    let f = finger as f32;
    let noise = t.sin(1.2, f * 0.5) * 0.04;
    let base = FINGER_WEIGHTS[finger.min(3)] + noise;
    let curl = base * (1.0 - phalanx.index() as f32 * JOINT_FALLOFF);
    let splay = (f - 1.5) * 0.08 * side.sign();
    Vec3::new(curl, 0.0, splay)
}

pub fn thumb_offset(t: MotionTime, side: Side, phalanx: Phalanx) -> Vec3 {
    let s = side.sign();
    let x = (0.28 + t.sin(0.8, 0.0) * 0.02) * (1.0 - phalanx.index() as f32 * 0.3);
    Vec3::new(x, 0.45 * s, 0.2 * s)
}

#[derive(Debug, Default)]
pub struct HandController {
    cfg: HandsConfig,
    t: MotionTime,
}

impl HandController {
    pub fn new(cfg: HandsConfig) -> Self {
        Self {
            cfg,
            t: MotionTime::ZERO,
        }
    }

    /// Continue from a session already `t` in
    pub fn resume_at(&mut self, t: MotionTime) {
        self.t = t;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.cfg.enabled = enabled;
    }

    pub fn update(&mut self, dt: f32, skeleton: &mut dyn Skeleton, engine: &mut BoneOffsetEngine) {
        if !self.cfg.enabled {
            return;
        }
        self.t.advance(dt);
        for side in Side::BOTH {
            self.apply_side(side, skeleton, engine);
        }
    }

    fn apply_side(&self, side: Side, skeleton: &mut dyn Skeleton, engine: &mut BoneOffsetEngine) {
        let t = self.t;
        engine.apply(skeleton, HumanBone::Hand(side), wrist_offset(t, side), OffsetMode::Assign);

        for (i, finger) in Finger::LONG.into_iter().enumerate() {
            for phalanx in Phalanx::ALL {
                let bone = HumanBone::Finger(side, finger, phalanx);
                engine.apply(skeleton, bone, finger_offset(t, side, i, phalanx), OffsetMode::Assign);
            }
        }

        for phalanx in Phalanx::ALL {
            let bone = HumanBone::Finger(side, Finger::Thumb, phalanx);
            engine.apply(skeleton, bone, thumb_offset(t, side, phalanx), OffsetMode::Assign);
        }
    }
}
