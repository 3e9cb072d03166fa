//! Simulation harness - a compositor driving an in-memory avatar
//!
//! Frames are stepped with explicit deltas (optionally jittered), and every
//! frame is sampled so scenarios can assert on whole trajectories.

use std::sync::Arc;
use std::time::Duration;

use anima_core::{Expression, HumanBone, MemoryRig, Rotation, Skeleton};
use anima_live::{FeedEvent, LiveContext};
use anima_runtime::{AnimaConfig, Compositor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Frame delta model
#[derive(Clone, Debug)]
pub struct FrameTiming {
    /// Nominal frame delta
    pub base: Duration,
    /// Random jitter per frame (microseconds)
    pub jitter_us: u32,
    rng: StdRng,
}

impl FrameTiming {
    pub fn new(fps: u32, jitter_us: u32, seed: u64) -> Self {
        FrameTiming {
            base: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            jitter_us,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Perfect frame pacing
    pub fn steady(fps: u32) -> Self {
        Self::new(fps, 0, 0)
    }

    /// Browser-like pacing with a few milliseconds of jitter
    pub fn unstable(fps: u32, seed: u64) -> Self {
        Self::new(fps, 4_000, seed)
    }

    pub fn next_delta(&mut self) -> Duration {
        if self.jitter_us == 0 {
            return self.base;
        }
        let jitter = self
            .rng
            .gen_range(-(self.jitter_us as i64)..=self.jitter_us as i64);
        let us = (self.base.as_micros() as i64 + jitter).max(0) as u64;
        Duration::from_micros(us)
    }
}

/// What the avatar looked like after one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSample {
    pub t: f64,
    pub dt: f32,
    pub blink: f32,
    pub happy: f32,
    pub sad: f32,
    pub angry: f32,
    pub surprised: f32,
    pub aa: f32,
    pub oh: f32,
    pub hips_x: f32,
    pub spine: Option<Rotation>,
    pub chest: Option<Rotation>,
    pub head: Option<Rotation>,
    pub hips_scale_x: f32,
    pub eye_yaw: f32,
    pub eye_pitch: f32,
}

pub struct Simulation {
    pub compositor: Compositor,
    pub rig: MemoryRig,
    timing: FrameTiming,
    samples: Vec<FrameSample>,
}

impl Simulation {
    /// Full humanoid at a steady 60 fps
    pub fn new(cfg: AnimaConfig) -> Self {
        Self::with_rig(cfg, MemoryRig::humanoid())
    }

    pub fn with_rig(cfg: AnimaConfig, rig: MemoryRig) -> Self {
        Simulation {
            compositor: Compositor::new(cfg),
            rig,
            timing: FrameTiming::steady(60),
            samples: Vec::new(),
        }
    }

    /// Default config with a fixed face seed
    pub fn seeded(seed: u64) -> Self {
        let mut cfg = AnimaConfig::default();
        cfg.face.seed = Some(seed);
        Self::new(cfg)
    }

    pub fn with_timing(mut self, timing: FrameTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Start as if the avatar had already been up for `offset`
    pub fn resumed_at(mut self, offset: Duration) -> Self {
        self.compositor.resume_at(offset);
        self
    }

    pub fn context(&mut self, context: LiveContext) -> bool {
        self.compositor.set_context(Arc::new(context))
    }

    pub fn event(&mut self, event: FeedEvent) {
        self.compositor.apply_event(&event);
    }

    pub fn step(&mut self) -> FrameSample {
        let delta = self.timing.next_delta();
        let time = self.compositor.step(&mut self.rig, delta);
        let sample = self.sample(time.elapsed, time.dt);
        self.samples.push(sample);
        sample
    }

    /// Run for `seconds` of animation time; returns the frames it took
    pub fn run_for(&mut self, seconds: f64) -> &[FrameSample] {
        let start = self.samples.len();
        let until = self.elapsed() + seconds;
        while self.elapsed() < until {
            self.step();
        }
        &self.samples[start..]
    }

    pub fn samples(&self) -> &[FrameSample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&FrameSample> {
        self.samples.last()
    }

    pub fn elapsed(&self) -> f64 {
        self.compositor.elapsed()
    }

    fn sample(&self, t: f64, dt: f32) -> FrameSample {
        let rig = &self.rig;
        let (eye_yaw, eye_pitch) = self.compositor.face().eye_angles();
        let hips = rig.skeleton.bone(HumanBone::Hips);
        FrameSample {
            t,
            dt,
            blink: rig.weight(Expression::Blink),
            happy: rig.weight(Expression::Happy),
            sad: rig.weight(Expression::Sad),
            angry: rig.weight(Expression::Angry),
            surprised: rig.weight(Expression::Surprised),
            aa: rig.weight(Expression::Aa),
            oh: rig.weight(Expression::Oh),
            hips_x: hips.map(|h| h.position.x).unwrap_or(0.0),
            hips_scale_x: hips.map(|h| h.scale.x).unwrap_or(1.0),
            spine: rig.rotation(HumanBone::Spine),
            chest: rig.rotation(HumanBone::Chest),
            head: rig.rotation(HumanBone::Head),
            eye_yaw,
            eye_pitch,
        }
    }
}
