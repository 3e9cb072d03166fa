//! Bone Offset Engine - rest-relative bone rotation
//!
//! INVARIANT: a bone's rest orientation is captured once, the first time any
//! controller touches it, and is never overwritten until `invalidate()`.
//! Offsets are always composed onto rest (`rest * offset`), so repeated
//! application never accumulates.

use std::collections::HashMap;

use anima_core::{HumanBone, Rotation, Skeleton, Vec3};
use tracing::debug;

/// How a computed target reaches the bone
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffsetMode {
    /// Overwrite the current rotation
    Assign,
    /// Slerp the current rotation toward the target by this factor
    Blend(f32),
}

/// Shared rest-orientation cache
#[derive(Debug, Default)]
pub struct BoneOffsetEngine {
    rest: HashMap<HumanBone, Rotation>,
}

impl BoneOffsetEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rest orientation, capturing it from the skeleton on first use
    pub fn capture(&mut self, skeleton: &dyn Skeleton, bone: HumanBone) -> Option<Rotation> {
        if let Some(rest) = self.rest.get(&bone) {
            return Some(*rest);
        }
        let current = skeleton.bone(bone)?.rotation;
        debug!(%bone, "captured rest orientation");
        self.rest.insert(bone, current);
        Some(current)
    }

    /// Apply `rest * fromEuler(euler)` (XYZ order). Missing bones are a no-op.
    ///
    /// Returns whether the bone exists.
    pub fn apply(
        &mut self,
        skeleton: &mut dyn Skeleton,
        bone: HumanBone,
        euler: Vec3,
        mode: OffsetMode,
    ) -> bool {
        let Some(rest) = self.capture(skeleton, bone) else {
            return false;
        };
        let target = rest.compose(&Rotation::from_euler_vec(euler));

        let Some(transform) = skeleton.bone_mut(bone) else {
            return false;
        };
        transform.rotation = match mode {
            OffsetMode::Assign => target,
            OffsetMode::Blend(t) => transform.rotation.slerp(&target, t.clamp(0.0, 1.0)),
        };
        true
    }

    /// Assign an absolute rotation, bypassing rest composition
    pub fn apply_absolute(
        &mut self,
        skeleton: &mut dyn Skeleton,
        bone: HumanBone,
        rotation: Rotation,
    ) -> bool {
        match skeleton.bone_mut(bone) {
            Some(transform) => {
                transform.rotation = rotation;
                true
            }
            None => false,
        }
    }

    /// Cached rest orientation, if captured
    pub fn rest(&self, bone: HumanBone) -> Option<Rotation> {
        self.rest.get(&bone).copied()
    }

    /// Drop every cached rest orientation (skeleton reload)
    pub fn invalidate(&mut self) {
        debug!(cached = self.rest.len(), "rest cache invalidated");
        self.rest.clear();
    }

    pub fn cached(&self) -> usize {
        self.rest.len()
    }
}
