//! Frame clock
//!
//! Animation time is monotonic and smooth: the delta reported per frame is
//! clamped so a stall (tab in background, system sleep, debugger) never
//! produces a single giant step that would overshoot every integrator.
//!
//! Accumulated time is kept in `f64`. A 60 Hz delta vanishes against an
//! `f32` total after a few days of uptime.

use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use crate::noise::pseudo_noise_at;

/// Largest delta handed to controllers in one frame
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// One tick of animation time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the clock started (sum of clamped deltas)
    pub elapsed: f64,
    /// Clamped seconds since the previous tick
    pub dt: f32,
    /// Frame counter, starting at 1 for the first tick
    pub frame: u64,
}

/// Monotonic frame clock
#[derive(Debug)]
pub struct FrameClock {
    elapsed: Duration,
    frame: u64,
    last_update: Instant,
    max_delta: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_max_delta(MAX_FRAME_DELTA)
    }

    pub fn with_max_delta(max_delta: Duration) -> Self {
        FrameClock {
            elapsed: Duration::ZERO,
            frame: 0,
            last_update: Instant::now(),
            max_delta,
        }
    }

    /// Advance from the OS monotonic clock
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let real = now.duration_since(self.last_update);
        self.last_update = now;
        self.advance(real)
    }

    /// Advance by an explicit delta (simulation, tests)
    pub fn advance(&mut self, delta: Duration) -> FrameTime {
        let clamped = delta.min(self.max_delta);
        self.elapsed = self.elapsed.saturating_add(clamped);
        self.frame += 1;
        FrameTime {
            elapsed: self.elapsed.as_secs_f64(),
            dt: clamped.as_secs_f32(),
            frame: self.frame,
        }
    }

    /// Seconds of animation time so far
    pub fn elapsed(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Continue a session that has already run for `elapsed`
    pub fn resume_at(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
        self.last_update = Instant::now();
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller-local seconds
///
/// Periodic signals are evaluated in `f64` and only the result is narrowed,
/// so phases stay exact however long the avatar has been running.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct MotionTime(f64);

impl MotionTime {
    pub const ZERO: MotionTime = MotionTime(0.0);

    pub fn from_secs(secs: f64) -> Self {
        MotionTime(secs)
    }

    pub fn secs(self) -> f64 {
        self.0
    }

    pub fn advance(&mut self, dt: f32) {
        self.0 += f64::from(dt);
    }

    /// `sin(rate * t + offset)`, angle reduced to one turn before narrowing
    pub fn sin(self, rate: f32, offset: f32) -> f32 {
        let angle = self.0 * f64::from(rate) + f64::from(offset);
        angle.rem_euclid(TAU).sin() as f32
    }

    /// `sin(2π * hz * t)`
    pub fn wave(self, hz: f32) -> f32 {
        let turns = (self.0 * f64::from(hz)).rem_euclid(1.0);
        (turns * TAU).sin() as f32
    }

    /// [`pseudo_noise`](crate::pseudo_noise) at `rate * t + offset`
    pub fn noise(self, rate: f32, offset: f32) -> f32 {
        pseudo_noise_at(self.0 * f64::from(rate) + f64::from(offset))
    }
}
