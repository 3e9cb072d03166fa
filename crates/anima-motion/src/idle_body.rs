//! Idle Body Controller - breathing, sway and head micro-motion
//!
//! Three layered sinusoid pairs (a primary at the configured speed and a
//! detuned secondary harmonic) drive tiny rest-relative rotations of the
//! torso chain, neck, head and shoulders. Values stay in the 0.01-0.05 rad
//! range. Every signal, secondaries included, scales with `intensity`, so an
//! intensity of zero holds every bone exactly at rest.

use anima_core::{HumanBone, MotionTime, Side, Skeleton, SpringSimulator, Vec3};
use serde::{Deserialize, Serialize};

use crate::{BoneOffsetEngine, OffsetMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleBodyConfig {
    pub enabled: bool,

    /// Overall multiplier, 0..1 (live energy may push it to 1.2)
    pub intensity: f32,
    pub breathe: f32,
    pub sway: f32,
    pub head: f32,

    /// Hz
    pub breathe_speed: f32,
    pub sway_speed: f32,
    pub head_speed: f32,

    /// Per-frame slerp blend toward the target
    pub slerp: f32,

    /// Spring-driven chest bounce from hips motion
    pub chest_jiggle: bool,
}

impl Default for IdleBodyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: 1.0,
            breathe: 1.0,
            sway: 1.0,
            head: 1.0,
            breathe_speed: 0.22,
            sway_speed: 0.12,
            head_speed: 0.20,
            slerp: 0.25,
            chest_jiggle: false,
        }
    }
}

impl IdleBodyConfig {
    /// Slow, shallow motion
    pub fn calm() -> Self {
        Self {
            intensity: 0.6,
            breathe_speed: 0.18,
            sway_speed: 0.09,
            head_speed: 0.15,
            ..Default::default()
        }
    }

    /// Quicker, fuller motion with chest bounce
    pub fn lively() -> Self {
        Self {
            intensity: 1.0,
            breathe_speed: 0.28,
            sway_speed: 0.16,
            head_speed: 0.26,
            chest_jiggle: true,
            ..Default::default()
        }
    }

    /// Apply only the fields present in `patch`
    pub fn merge(&mut self, patch: &IdleBodyPatch) {
        if let Some(v) = patch.enabled {
            self.enabled = v;
        }
        if let Some(v) = patch.intensity {
            self.intensity = v;
        }
        if let Some(v) = patch.breathe {
            self.breathe = v;
        }
        if let Some(v) = patch.sway {
            self.sway = v;
        }
        if let Some(v) = patch.head {
            self.head = v;
        }
        if let Some(v) = patch.breathe_speed {
            self.breathe_speed = v;
        }
        if let Some(v) = patch.sway_speed {
            self.sway_speed = v;
        }
        if let Some(v) = patch.head_speed {
            self.head_speed = v;
        }
        if let Some(v) = patch.slerp {
            self.slerp = v;
        }
        if let Some(v) = patch.chest_jiggle {
            self.chest_jiggle = v;
        }
    }
}

/// Partial update of [`IdleBodyConfig`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleBodyPatch {
    pub enabled: Option<bool>,
    pub intensity: Option<f32>,
    pub breathe: Option<f32>,
    pub sway: Option<f32>,
    pub head: Option<f32>,
    pub breathe_speed: Option<f32>,
    pub sway_speed: Option<f32>,
    pub head_speed: Option<f32>,
    pub slerp: Option<f32>,
    pub chest_jiggle: Option<bool>,
}

impl IdleBodyPatch {
    pub fn intensity(intensity: f32) -> Self {
        Self {
            intensity: Some(intensity),
            ..Default::default()
        }
    }
}

/// Signal values at one instant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IdleSignals {
    pub breathe: f32,
    pub breathe2: f32,
    pub sway: f32,
    pub sway2: f32,
    pub head: f32,
    pub head2: f32,
}

impl IdleSignals {
    pub fn at(t: MotionTime, cfg: &IdleBodyConfig) -> Self {
        let i = cfg.intensity;
        let wave = |hz: f32| t.wave(hz);
        Self {
            breathe: wave(cfg.breathe_speed) * cfg.breathe * i,
            breathe2: wave(cfg.breathe_speed * 2.0 + 0.03) * 0.35 * i,
            sway: wave(cfg.sway_speed) * cfg.sway * i,
            sway2: wave(cfg.sway_speed * 1.7 + 0.01) * 0.35 * i,
            head: wave(cfg.head_speed) * cfg.head * i,
            head2: wave(cfg.head_speed * 2.3 + 0.02) * 0.35 * i,
        }
    }

    /// Euler offsets (XYZ, radians) per bone
    pub fn offsets(&self) -> [(HumanBone, Vec3); 8] {
        let Self {
            breathe: br,
            breathe2: br2,
            sway: sw,
            sway2: sw2,
            head: hd,
            head2: hd2,
        } = *self;

        [
            // weight shift and tiny yaw
            (HumanBone::Hips, Vec3::new(0.02 * sw, 0.03 * sw, 0.05 * sw)),
            // counter to hips, plus breath
            (
                HumanBone::Spine,
                Vec3::new(0.015 * br + 0.01 * sw2, -0.01 * sw, -0.02 * sw),
            ),
            (
                HumanBone::Chest,
                Vec3::new(0.035 * br + 0.01 * br2, -0.015 * sw, -0.015 * sw2),
            ),
            (
                HumanBone::UpperChest,
                Vec3::new(0.02 * br, -0.01 * sw2, -0.01 * sw),
            ),
            (
                HumanBone::Neck,
                Vec3::new(0.01 * hd, 0.015 * hd2, 0.01 * sw2),
            ),
            (
                HumanBone::Head,
                Vec3::new(0.02 * hd2, 0.02 * hd, 0.015 * sw),
            ),
            (
                HumanBone::Shoulder(Side::Left),
                Vec3::new(0.01 * br, 0.0, 0.01 * br),
            ),
            (
                HumanBone::Shoulder(Side::Right),
                Vec3::new(0.01 * br, 0.0, -0.01 * br),
            ),
        ]
    }
}

/// Secondary chest bounce driven by hips angular velocity
#[derive(Debug, Clone)]
pub struct ChestJiggle {
    spring: SpringSimulator,
    prev_hips: Option<Vec3>,
    /// Force per unit of hips angular velocity
    pub gain: f32,
}

impl Default for ChestJiggle {
    fn default() -> Self {
        Self {
            spring: SpringSimulator::new(140.0, 8.0, 1.2),
            prev_hips: None,
            gain: 30.0,
        }
    }
}

impl ChestJiggle {
    /// Advance and return the extra chest offset
    pub fn update(&mut self, dt: f32, hips_offset: Vec3) -> Vec3 {
        let velocity = match self.prev_hips {
            Some(prev) if dt > 0.0 => (hips_offset - prev) * (1.0 / dt),
            _ => Vec3::ZERO,
        };
        self.prev_hips = Some(hips_offset);
        // the chest lags behind the hips
        self.spring.update(dt, velocity * -self.gain);
        self.spring.offset()
    }

    pub fn reset(&mut self) {
        self.spring.reset();
        self.prev_hips = None;
    }
}

pub struct IdleBodyController {
    cfg: IdleBodyConfig,
    t: MotionTime,
    jiggle: ChestJiggle,
}

impl IdleBodyController {
    pub fn new(cfg: IdleBodyConfig) -> Self {
        Self {
            cfg,
            t: MotionTime::ZERO,
            jiggle: ChestJiggle::default(),
        }
    }

    pub fn config(&self) -> &IdleBodyConfig {
        &self.cfg
    }

    pub fn set_config(&mut self, patch: &IdleBodyPatch) {
        self.cfg.merge(patch);
    }

    pub fn enable(&mut self) {
        self.cfg.enabled = true;
    }

    pub fn disable(&mut self) {
        self.cfg.enabled = false;
    }

    pub fn update(&mut self, dt: f32, skeleton: &mut dyn Skeleton, engine: &mut BoneOffsetEngine) {
        if !self.cfg.enabled {
            return;
        }
        self.t.advance(dt);

        let mut offsets = IdleSignals::at(self.t, &self.cfg).offsets();

        if self.cfg.chest_jiggle {
            let bounce = self.jiggle.update(dt, offsets[0].1);
            offsets[2].1 += bounce;
        }

        let mode = OffsetMode::Blend(self.cfg.slerp);
        for (bone, euler) in offsets {
            engine.apply(skeleton, bone, euler, mode);
        }
    }

    /// Seconds of idle time so far
    pub fn elapsed(&self) -> f64 {
        self.t.secs()
    }

    /// Continue from a session already `t` in
    pub fn resume_at(&mut self, t: MotionTime) {
        self.t = t;
        self.jiggle.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anima_core::{MemorySkeleton, Rotation};

    #[test]
    fn test_zero_intensity_is_identity() {
        let cfg = IdleBodyConfig {
            intensity: 0.0,
            ..Default::default()
        };
        let mut t = 0.0;
        while t < 30.0 {
            for (_, euler) in IdleSignals::at(MotionTime::from_secs(t), &cfg).offsets() {
                assert_eq!(euler, Vec3::ZERO);
            }
            t += 0.37;
        }
    }

    #[test]
    fn test_zero_intensity_holds_rest() {
        let mut skeleton = MemorySkeleton::humanoid();
        let mut engine = BoneOffsetEngine::new();
        let mut idle = IdleBodyController::new(IdleBodyConfig {
            intensity: 0.0,
            chest_jiggle: true,
            ..Default::default()
        });

        for _ in 0..120 {
            idle.update(1.0 / 60.0, &mut skeleton, &mut engine);
        }
        for bone in HumanBone::TORSO {
            let r = skeleton.bone(bone).map(|b| b.rotation).unwrap_or_default();
            assert!(r.approx_eq(&Rotation::IDENTITY, 1e-6), "{bone} moved");
        }
    }

    #[test]
    fn test_breathing_moves_chest() {
        let mut skeleton = MemorySkeleton::humanoid();
        let mut engine = BoneOffsetEngine::new();
        let mut idle = IdleBodyController::new(IdleBodyConfig::default());

        let mut max_angle: f32 = 0.0;
        for _ in 0..300 {
            idle.update(1.0 / 60.0, &mut skeleton, &mut engine);
            let r = skeleton.bone(HumanBone::Chest).map(|b| b.rotation).unwrap_or_default();
            max_angle = max_angle.max(r.angle_to(&Rotation::IDENTITY));
        }
        assert!(max_angle > 0.005);
        assert!(max_angle < 0.1);
    }

    #[test]
    fn test_breathing_continues_after_days() {
        let mut skeleton = MemorySkeleton::humanoid();
        let mut engine = BoneOffsetEngine::new();
        let mut idle = IdleBodyController::new(IdleBodyConfig::default());
        idle.resume_at(MotionTime::from_secs(6.0 * 86_400.0));

        let start = idle.elapsed();
        let mut angles = Vec::new();
        for _ in 0..300 {
            idle.update(1.0 / 60.0, &mut skeleton, &mut engine);
            let r = skeleton.bone(HumanBone::Chest).map(|b| b.rotation).unwrap_or_default();
            angles.push(r.angle_to(&Rotation::IDENTITY));
        }

        assert!((idle.elapsed() - start - 5.0).abs() < 1e-6);
        let (lo, hi) = angles
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), a| (lo.min(*a), hi.max(*a)));
        assert!(hi - lo > 0.005, "chest frozen: {lo}..{hi}");
    }

    #[test]
    fn test_patch_is_partial() {
        let mut idle = IdleBodyController::new(IdleBodyConfig::default());
        idle.set_config(&IdleBodyPatch::intensity(0.4));

        assert_eq!(idle.config().intensity, 0.4);
        assert_eq!(idle.config().breathe_speed, 0.22);
        assert!(idle.config().enabled);
    }

    #[test]
    fn test_disabled_does_nothing() {
        let mut skeleton = MemorySkeleton::humanoid();
        let mut engine = BoneOffsetEngine::new();
        let mut idle = IdleBodyController::new(IdleBodyConfig::default());
        idle.disable();
        idle.update(0.5, &mut skeleton, &mut engine);

        assert_eq!(idle.elapsed(), 0.0);
        assert_eq!(engine.cached(), 0);
        idle.enable();
        idle.update(0.5, &mut skeleton, &mut engine);
        assert!(engine.cached() > 0);
    }

    #[test]
    fn test_jiggle_settles_when_hips_still() {
        let mut jiggle = ChestJiggle::default();
        jiggle.update(1.0 / 60.0, Vec3::ZERO);
        jiggle.update(1.0 / 60.0, Vec3::new(0.0, 0.0, 0.05));
        assert!(jiggle.update(1.0 / 60.0, Vec3::new(0.0, 0.0, 0.05)).length() > 0.0);

        for _ in 0..600 {
            jiggle.update(1.0 / 60.0, Vec3::new(0.0, 0.0, 0.05));
        }
        assert!(jiggle.update(1.0 / 60.0, Vec3::new(0.0, 0.0, 0.05)).length() < 1e-4);
    }
}
