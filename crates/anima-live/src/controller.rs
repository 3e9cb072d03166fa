//! Live Context Controller
//!
//! Smooths the latest snapshot into per-frame motion: four emotion weights
//! gated by confidence, a subtle head/neck look toward the tracked user, a
//! torso lean, and the energy that drives idle intensity. Every field decays
//! exponentially toward its target at the same rate, so the result is stable
//! across frame rates.

use std::sync::Arc;

use anima_core::{damp_factor, Expression, ExpressionFrame, HumanBone, Skeleton, Vec3};
use anima_motion::{BoneOffsetEngine, OffsetMode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LiveContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Smoothing rate for every field (1/s)
    pub rate: f32,

    // Defaults for absent fields
    pub default_confidence: f32,
    pub default_energy: f32,
    pub default_gaze: f32,

    /// Emotion gate = clamp(confidence * gain)
    pub confidence_gain: f32,

    /// Max head yaw/pitch at full look and gaze (radians)
    pub look_yaw: f32,
    pub look_pitch: f32,
    /// Share of the look taken by the neck; the head gets the rest
    pub neck_share: f32,

    pub max_lean: f32,
    pub lean_to_spine: f32,

    /// Idle intensity = base + energy * gain
    pub idle_base: f32,
    pub idle_energy_gain: f32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            rate: 10.0,
            default_confidence: 0.2,
            default_energy: 0.6,
            default_gaze: 0.7,
            confidence_gain: 1.6,
            look_yaw: 0.35,
            look_pitch: 0.25,
            neck_share: 0.4,
            max_lean: 0.3,
            lean_to_spine: 0.5,
            idle_base: 0.5,
            idle_energy_gain: 0.7,
        }
    }
}

/// Smoothed motion state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveState {
    pub happy: f32,
    pub sad: f32,
    pub angry: f32,
    pub surprised: f32,
    pub energy: f32,
    pub gaze: f32,
    pub look_x: f32,
    pub look_y: f32,
    pub lean: f32,
    pub confidence: f32,
}

impl LiveState {
    fn initial(cfg: &LiveConfig) -> Self {
        Self {
            happy: 0.0,
            sad: 0.0,
            angry: 0.0,
            surprised: 0.0,
            energy: cfg.default_energy,
            gaze: cfg.default_gaze,
            look_x: 0.0,
            look_y: 0.0,
            lean: 0.0,
            confidence: cfg.default_confidence,
        }
    }
}

fn clamp01(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn approach(current: &mut f32, target: f32, a: f32) {
    *current += (target - *current) * a;
}

pub struct LiveContextController {
    cfg: LiveConfig,
    context: Option<Arc<LiveContext>>,
    state: LiveState,
}

impl LiveContextController {
    pub fn new(cfg: LiveConfig) -> Self {
        let state = LiveState::initial(&cfg);
        Self {
            cfg,
            context: None,
            state,
        }
    }

    /// Replace the snapshot; an older timestamp than the current one is
    /// dropped. Returns whether the snapshot was taken.
    pub fn set_context(&mut self, context: Arc<LiveContext>) -> bool {
        if let Some(current) = &self.context {
            if Arc::ptr_eq(current, &context) {
                return true;
            }
            if context.is_older_than(current) {
                debug!(
                    incoming = ?context.timestamp,
                    current = ?current.timestamp,
                    "dropping out-of-order live snapshot"
                );
                return false;
            }
        }
        self.context = Some(context);
        true
    }

    pub fn context(&self) -> Option<&LiveContext> {
        self.context.as_deref()
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn state(&self) -> &LiveState {
        &self.state
    }

    pub fn energy(&self) -> f32 {
        self.state.energy
    }

    pub fn gaze_strength(&self) -> f32 {
        self.state.gaze
    }

    pub fn tracking_visible(&self) -> bool {
        self.context
            .as_ref()
            .map(|c| c.tracking_visible())
            .unwrap_or(false)
    }

    /// Idle amplitude implied by the smoothed energy
    pub fn idle_intensity(&self) -> f32 {
        self.cfg.idle_base + self.state.energy * self.cfg.idle_energy_gain
    }

    /// No-op until a snapshot has arrived
    pub fn update(
        &mut self,
        dt: f32,
        expressions: &mut ExpressionFrame,
        skeleton: &mut dyn Skeleton,
        engine: &mut BoneOffsetEngine,
    ) {
        let Some(ctx) = self.context.clone() else {
            return;
        };
        let cfg = &self.cfg;
        let s = &mut self.state;
        let a = damp_factor(cfg.rate, dt);

        let confidence = clamp01(ctx.state_confidence.unwrap_or(cfg.default_confidence));
        approach(&mut s.confidence, confidence, a);
        let gate = (s.confidence * cfg.confidence_gain).clamp(0.0, 1.0);

        let prob = |label: &str| clamp01(ctx.probability(label).unwrap_or(0.0));
        approach(&mut s.happy, prob("happy") * gate, a);
        approach(&mut s.sad, prob("sad") * gate, a);
        approach(&mut s.angry, prob("angry") * gate, a);
        approach(&mut s.surprised, clamp01(ctx.surprise().unwrap_or(0.0)) * gate, a);

        approach(&mut s.energy, clamp01(ctx.energy_level.unwrap_or(cfg.default_energy)), a);
        approach(&mut s.gaze, clamp01(ctx.gaze_score().unwrap_or(cfg.default_gaze)), a);

        let (look_x, look_y) = match &ctx.tracking {
            Some(t) if t.visible == Some(true) => (
                ((t.x.unwrap_or(0.5) - 0.5) * 2.0).clamp(-1.0, 1.0),
                ((0.5 - t.y.unwrap_or(0.5)) * 2.0).clamp(-1.0, 1.0),
            ),
            _ => (0.0, 0.0),
        };
        approach(&mut s.look_x, look_x, a);
        approach(&mut s.look_y, look_y, a);

        let lean = ctx.inclination().unwrap_or(0.0);
        let lean = if lean.is_finite() { lean } else { 0.0 };
        approach(&mut s.lean, lean.clamp(-cfg.max_lean, cfg.max_lean), a);

        expressions.set(Expression::Happy, s.happy);
        expressions.set(Expression::Sad, s.sad);
        expressions.set(Expression::Angry, s.angry);
        expressions.set(Expression::Surprised, s.surprised);

        let yaw = s.look_x * cfg.look_yaw * s.gaze;
        let pitch = s.look_y * cfg.look_pitch * s.gaze;
        let neck = cfg.neck_share;
        let head = 1.0 - neck;

        engine.apply(
            skeleton,
            HumanBone::Neck,
            Vec3::new(pitch * neck, yaw * neck, 0.0),
            OffsetMode::Assign,
        );
        engine.apply(
            skeleton,
            HumanBone::Head,
            Vec3::new(pitch * head, yaw * head, 0.0),
            OffsetMode::Assign,
        );
        engine.apply(
            skeleton,
            HumanBone::Spine,
            Vec3::new(s.lean * cfg.lean_to_spine, 0.0, 0.0),
            OffsetMode::Assign,
        );
    }
}
