//! Secondary Physics Controller - wind on spring-bone gravity
//!
//! The solver integrates spring bones (hair, cloth) against each joint's
//! gravity direction. Bending that direction with slow noise makes them sway
//! even when the avatar stands still. Must run before the solver step.

use anima_core::{HumanBone, MotionTime, Skeleton, SpringBones, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    pub enabled: bool,
    pub gravity_power: f32,
    /// Gust speed multiplier on time
    pub gust_speed: f32,
    /// Sideways breeze amplitude
    pub wind_x: f32,
    /// Forward/back breeze amplitude
    pub wind_z: f32,
    pub pulse: f32,
    pub pulse_speed: f32,
    /// Hips micro-shake when the model has no spring joints
    pub fallback_shake: f32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gravity_power: 0.5,
            gust_speed: 0.5,
            wind_x: 0.2,
            wind_z: 0.15,
            pulse: 0.05,
            pulse_speed: 2.0,
            fallback_shake: 0.0002,
        }
    }
}

impl WindConfig {
    /// Gravity direction at time `t`
    pub fn gravity_at(&self, t: MotionTime) -> Vec3 {
        Vec3::new(
            t.noise(self.gust_speed, 0.0) * self.wind_x,
            -1.0 + t.sin(self.pulse_speed, 0.0) * self.pulse,
            t.noise(self.gust_speed, 42.0) * self.wind_z,
        )
    }
}

#[derive(Debug, Default)]
pub struct SecondaryPhysicsController {
    cfg: WindConfig,
    t: MotionTime,
    /// Hips x before the fallback shake first touched it
    hips_rest: Option<f32>,
}

impl SecondaryPhysicsController {
    pub fn new(cfg: WindConfig) -> Self {
        Self {
            cfg,
            t: MotionTime::ZERO,
            hips_rest: None,
        }
    }

    /// Continue from a session already `t` in
    pub fn resume_at(&mut self, t: MotionTime) {
        self.t = t;
    }

    /// Drop the remembered hips rest without touching any skeleton
    pub fn forget(&mut self) {
        self.hips_rest = None;
    }

    /// Put the hips back where the shake found them and forget the avatar
    pub fn restore(&mut self, skeleton: &mut dyn Skeleton) {
        if let Some(x) = self.hips_rest.take() {
            if let Some(hips) = skeleton.bone_mut(HumanBone::Hips) {
                hips.position.x = x;
            }
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.cfg.enabled = enabled;
    }

    pub fn update(
        &mut self,
        dt: f32,
        skeleton: &mut dyn Skeleton,
        springs: Option<&mut dyn SpringBones>,
    ) {
        if !self.cfg.enabled {
            return;
        }
        self.t.advance(dt);

        match springs {
            Some(springs) if springs.joint_count() > 0 => {
                let gravity = self.cfg.gravity_at(self.t);
                for joint in springs.joints_mut() {
                    joint.gravity_dir = gravity;
                    joint.gravity_power = self.cfg.gravity_power;
                }
            }
            _ => {
                // wake the solver with an invisible hips shake
                if let Some(hips) = skeleton.bone_mut(HumanBone::Hips) {
                    let rest = *self.hips_rest.get_or_insert(hips.position.x);
                    hips.position.x = rest + self.t.sin(20.0, 0.0) * self.cfg.fallback_shake;
                }
            }
        }
    }
}
