//! Idle Face Controller - blinking and saccadic eye motion
//!
//! Blink is a small state machine (idle -> closing -> opening -> idle)
//! scheduled at random 2-6 s intervals. Saccades pick tiny random eye
//! targets at 0.4-1.2 s intervals and the eye bones are damped toward them.
//!
//! While live tracking sees the user and gaze strength is high, saccades
//! stop and the eyes return to center.

use std::f32::consts::{FRAC_PI_2, PI};

use anima_core::{
    damp_factor, Expression, ExpressionFrame, HumanBone, MotionTime, Side, Skeleton, Vec3,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{BoneOffsetEngine, OffsetMode};

/// Blink lid curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlinkProfile {
    /// Half a sine: phase 0..PI at 12 rad/s, value `sin(phase)`
    #[default]
    Symmetric,
    /// Fast close (15/s), slow open (6/s), value `alpha^2`
    Asymmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkPhase {
    Idle,
    Closing,
    Opening,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    pub blink_profile: BlinkProfile,
    /// Seconds between blinks
    pub blink_interval_min: f32,
    pub blink_interval_max: f32,
    /// Seconds between saccades
    pub saccade_interval_min: f32,
    pub saccade_interval_max: f32,
    /// Full yaw range (radians); targets are centered on zero
    pub saccade_yaw_range: f32,
    pub saccade_pitch_range: f32,
    /// Eye damping rate (1/s)
    pub eye_rate: f32,
    /// Gaze strength above which saccades are suppressed
    pub suppress_threshold: f32,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            blink_profile: BlinkProfile::Symmetric,
            blink_interval_min: 2.0,
            blink_interval_max: 6.0,
            saccade_interval_min: 0.4,
            saccade_interval_max: 1.2,
            saccade_yaw_range: 0.18,
            saccade_pitch_range: 0.12,
            eye_rate: 16.0,
            suppress_threshold: 0.35,
            seed: None,
        }
    }
}

// Symmetric profile
const PHASE_RATE: f32 = 12.0;
// Asymmetric profile
const CLOSE_RATE: f32 = 15.0;
const OPEN_RATE: f32 = 6.0;

pub struct IdleFaceController {
    cfg: FaceConfig,
    rng: StdRng,
    elapsed: MotionTime,

    // Blink
    blink_phase: BlinkPhase,
    /// Phase angle (symmetric) or lid alpha (asymmetric)
    blink_progress: f32,
    blink_value: f32,
    next_blink: f64,

    // Live signals
    gaze_strength: f32,
    tracking_visible: bool,

    // Eyes
    next_saccade: f64,
    target_yaw: f32,
    target_pitch: f32,
    yaw: f32,
    pitch: f32,
}

impl IdleFaceController {
    pub fn new(cfg: FaceConfig) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut face = Self {
            cfg,
            rng,
            elapsed: MotionTime::ZERO,
            blink_phase: BlinkPhase::Idle,
            blink_progress: 0.0,
            blink_value: 0.0,
            next_blink: 0.0,
            gaze_strength: 0.0,
            tracking_visible: false,
            next_saccade: 0.0,
            target_yaw: 0.0,
            target_pitch: 0.0,
            yaw: 0.0,
            pitch: 0.0,
        };
        face.schedule_blink();
        face.schedule_saccade();
        face
    }

    /// Update live gaze flags; `None` leaves a field unchanged
    pub fn set_live_gaze(&mut self, strength: Option<f32>, visible: Option<bool>) {
        if let Some(s) = strength {
            self.gaze_strength = s.clamp(0.0, 1.0);
        }
        if let Some(v) = visible {
            self.tracking_visible = v;
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.tracking_visible && self.gaze_strength > self.cfg.suppress_threshold
    }

    /// Continue from a session already `t` in; pending blink and saccade are rescheduled
    pub fn resume_at(&mut self, t: MotionTime) {
        self.elapsed = t;
        self.schedule_blink();
        self.schedule_saccade();
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed.secs()
    }

    pub fn blink_value(&self) -> f32 {
        self.blink_value
    }

    pub fn blink_phase(&self) -> BlinkPhase {
        self.blink_phase
    }

    /// Current eye (yaw, pitch)
    pub fn eye_angles(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    pub fn saccade_target(&self) -> (f32, f32) {
        (self.target_yaw, self.target_pitch)
    }

    fn random_between(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    fn schedule_blink(&mut self) {
        let (min, max) = (self.cfg.blink_interval_min, self.cfg.blink_interval_max);
        self.next_blink = self.elapsed.secs() + f64::from(self.random_between(min, max));
    }

    fn schedule_saccade(&mut self) {
        let (min, max) = (self.cfg.saccade_interval_min, self.cfg.saccade_interval_max);
        self.next_saccade = self.elapsed.secs() + f64::from(self.random_between(min, max));
        self.target_yaw = (self.rng.gen::<f32>() - 0.5) * self.cfg.saccade_yaw_range;
        self.target_pitch = (self.rng.gen::<f32>() - 0.5) * self.cfg.saccade_pitch_range;
    }

    fn step_blink(&mut self, dt: f32) {
        if self.blink_phase == BlinkPhase::Idle && self.elapsed.secs() >= self.next_blink {
            self.blink_phase = BlinkPhase::Closing;
            self.blink_progress = 0.0;
        }

        match (self.cfg.blink_profile, self.blink_phase) {
            (_, BlinkPhase::Idle) => self.blink_value = 0.0,

            (BlinkProfile::Symmetric, BlinkPhase::Closing) => {
                // land exactly on the peak before descending
                self.blink_progress = (self.blink_progress + dt * PHASE_RATE).min(FRAC_PI_2);
                self.blink_value = self.blink_progress.sin();
                if self.blink_progress >= FRAC_PI_2 {
                    self.blink_value = 1.0;
                    self.blink_phase = BlinkPhase::Opening;
                }
            }
            (BlinkProfile::Symmetric, BlinkPhase::Opening) => {
                self.blink_progress = (self.blink_progress + dt * PHASE_RATE).min(PI);
                self.blink_value = self.blink_progress.sin().max(0.0);
                if self.blink_progress >= PI {
                    self.finish_blink();
                }
            }

            (BlinkProfile::Asymmetric, BlinkPhase::Closing) => {
                self.blink_progress = (self.blink_progress + dt * CLOSE_RATE).min(1.0);
                self.blink_value = self.blink_progress * self.blink_progress;
                if self.blink_progress >= 1.0 {
                    self.blink_phase = BlinkPhase::Opening;
                }
            }
            (BlinkProfile::Asymmetric, BlinkPhase::Opening) => {
                self.blink_progress = (self.blink_progress - dt * OPEN_RATE).max(0.0);
                self.blink_value = self.blink_progress * self.blink_progress;
                if self.blink_progress <= 0.0 {
                    self.finish_blink();
                }
            }
        }
    }

    fn finish_blink(&mut self) {
        self.blink_phase = BlinkPhase::Idle;
        self.blink_progress = 0.0;
        self.blink_value = 0.0;
        self.schedule_blink();
    }

    pub fn update(
        &mut self,
        dt: f32,
        expressions: &mut ExpressionFrame,
        skeleton: &mut dyn Skeleton,
        engine: &mut BoneOffsetEngine,
    ) {
        self.elapsed.advance(dt);

        self.step_blink(dt);
        expressions.set(Expression::BlinkLeft, self.blink_value);
        expressions.set(Expression::BlinkRight, self.blink_value);
        expressions.set(Expression::Blink, self.blink_value);

        let (target_yaw, target_pitch) = if self.is_suppressed() {
            (0.0, 0.0)
        } else {
            if self.elapsed.secs() >= self.next_saccade {
                self.schedule_saccade();
            }
            (self.target_yaw, self.target_pitch)
        };

        let k = damp_factor(self.cfg.eye_rate, dt);
        self.yaw += (target_yaw - self.yaw) * k;
        self.pitch += (target_pitch - self.pitch) * k;

        let euler = Vec3::new(self.pitch, self.yaw, 0.0);
        for side in Side::BOTH {
            engine.apply(skeleton, HumanBone::eye(side), euler, OffsetMode::Assign);
        }
    }
}
