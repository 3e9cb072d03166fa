//! Pose Controller - static A-pose, re-asserted every frame
//!
//! The solver and the authored animation would otherwise pull the arms back
//! to the model's T-pose, so this is a per-frame override, not a one-time
//! initialisation. The authored rotations are kept for `restore()`.

use anima_core::{HumanBone, Rotation, Side, Skeleton};
use serde::{Deserialize, Serialize};

use crate::BoneOffsetEngine;

/// Arm angles of the base pose (radians, left side; right is mirrored)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmPose {
    /// Upper arms lowered about Z (~65 degrees)
    pub upper_arm_z: f32,
    /// Slight elbow bend about Y
    pub lower_arm_y: f32,
    pub hand_z: f32,
}

impl Default for ArmPose {
    fn default() -> Self {
        Self {
            upper_arm_z: 1.1,
            lower_arm_y: 0.2,
            hand_z: 0.1,
        }
    }
}

impl ArmPose {
    /// Target rotation per overridden bone
    pub fn targets(&self) -> Vec<(HumanBone, Rotation)> {
        let mut out = Vec::with_capacity(6);
        for side in Side::BOTH {
            let s = side.sign();
            out.push((
                HumanBone::UpperArm(side),
                Rotation::from_euler(0.0, 0.0, self.upper_arm_z * s),
            ));
            out.push((
                HumanBone::LowerArm(side),
                Rotation::from_euler(0.0, self.lower_arm_y * s, 0.0),
            ));
            out.push((
                HumanBone::Hand(side),
                Rotation::from_euler(0.0, 0.0, self.hand_z * s),
            ));
        }
        out
    }
}

pub struct PoseController {
    targets: Vec<(HumanBone, Rotation)>,
    authored: Vec<(HumanBone, Rotation)>,
}

impl PoseController {
    /// Snapshot the authored rotations of every bone the pose overrides
    pub fn new(skeleton: &dyn Skeleton, pose: ArmPose) -> Self {
        let targets = pose.targets();
        let authored = targets
            .iter()
            .filter_map(|(bone, _)| skeleton.bone(*bone).map(|t| (*bone, t.rotation)))
            .collect();
        Self { targets, authored }
    }

    pub fn update(&self, skeleton: &mut dyn Skeleton, engine: &mut BoneOffsetEngine) {
        for (bone, rotation) in &self.targets {
            engine.apply_absolute(skeleton, *bone, *rotation);
        }
    }

    /// Write the authored rotations back
    pub fn restore(&self, skeleton: &mut dyn Skeleton) {
        for (bone, rotation) in &self.authored {
            if let Some(transform) = skeleton.bone_mut(*bone) {
                transform.rotation = *rotation;
            }
        }
    }

    /// Bones that exist on the rig and are overridden
    pub fn overridden(&self) -> usize {
        self.authored.len()
    }
}
