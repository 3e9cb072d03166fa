//! Body Controller - continuous body-weight scaling

use anima_core::{damp_factor, HumanBone, Side, Skeleton, Vec3};

/// Convergence rate of the weight toward its target (1/s)
pub const BODY_WEIGHT_RATE: f32 = 3.0;

/// Drives a 0 (slim) .. 1 (heavy) scalar and scales torso and legs in X/Z
#[derive(Debug, Clone, Default)]
pub struct BodyController {
    target: f32,
    current: f32,
}

impl BodyController {
    pub fn new(initial: f32) -> Self {
        let w = initial.clamp(0.0, 1.0);
        Self {
            target: w,
            current: w,
        }
    }

    pub fn set_body_weight(&mut self, weight: f32) {
        self.target = if weight.is_finite() {
            weight.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn target_weight(&self) -> f32 {
        self.target
    }

    pub fn current_weight(&self) -> f32 {
        self.current
    }

    pub fn update(&mut self, dt: f32, skeleton: &mut dyn Skeleton) {
        self.current += (self.target - self.current) * damp_factor(BODY_WEIGHT_RATE, dt);
        for (bone, xz) in Self::scales(self.current) {
            if let Some(transform) = skeleton.bone_mut(bone) {
                transform.scale = Vec3::new(xz, 1.0, xz);
            }
        }
    }

    /// X/Z scale per bone for weight `w`; Y is never scaled
    pub fn scales(w: f32) -> [(HumanBone, f32); 6] {
        let s = 1.0 + w * 0.25;
        let leg = 1.0 + w * 0.15;
        [
            (HumanBone::Hips, s),
            (HumanBone::Spine, s * 0.95),
            (HumanBone::Chest, s * 0.9),
            (HumanBone::Neck, 1.0 + w * 0.1),
            (HumanBone::UpperLeg(Side::Left), leg),
            (HumanBone::UpperLeg(Side::Right), leg),
        ]
    }
}
