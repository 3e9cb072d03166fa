//! Lip Sync Controller
//!
//! Two mouth drivers, combined by taking the larger:
//! - amplitude: spectrum average of the samples under the playhead
//! - events: `trigger(level)` pulses, held briefly, then settling to a
//!   speaking level until `stop()`
//!
//! Writes `aa` and a touch of `oh`. It is the last facial writer of a frame.

use anima_core::{clamp01, damp, Expression, ExpressionFrame};
use serde::{Deserialize, Serialize};

use crate::SpectrumAnalyser;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    pub enabled: bool,
    /// mouth = min(1, average / 128 * sensitivity)
    pub sensitivity: f32,
    /// Seconds a trigger holds its full level
    pub pulse_hold: f32,
    /// Level kept after the hold, as a share of the trigger level
    pub sustain: f32,
    /// Rate the event mouth follows its target (1/s)
    pub rate: f32,
    /// `oh` weight relative to `aa`
    pub oh_share: f32,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitivity: 2.0,
            pulse_hold: 0.12,
            sustain: 0.45,
            rate: 18.0,
            oh_share: 0.2,
        }
    }
}

#[derive(Debug)]
pub struct LipSyncController {
    cfg: LipSyncConfig,
    analyser: SpectrumAnalyser,
    amplitude: f32,
    target: f32,
    current: f32,
    /// Time left at full pulse level, with the level to settle from
    hold: Option<(f32, f32)>,
    output: f32,
}

impl LipSyncController {
    pub fn new(cfg: LipSyncConfig) -> Self {
        Self {
            cfg,
            analyser: SpectrumAnalyser::default(),
            amplitude: 0.0,
            target: 0.0,
            current: 0.0,
            hold: None,
            output: 0.0,
        }
    }

    pub fn config(&self) -> &LipSyncConfig {
        &self.cfg
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.cfg.enabled = enabled;
    }

    /// Pulse the mouth open to `level`
    pub fn trigger(&mut self, level: f32) {
        let level = if level.is_nan() { 0.0 } else { clamp01(level) };
        self.target = level;
        self.hold = Some((self.cfg.pulse_hold, level));
    }

    /// Close the mouth; any pending pulse is cancelled
    pub fn stop(&mut self) {
        self.target = 0.0;
        self.hold = None;
    }

    /// Amplitude from the samples currently playing; empty means silence
    pub fn feed_playing(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            self.amplitude = 0.0;
            return;
        }
        self.analyser.process(samples);
        self.amplitude = (self.analyser.average() / 128.0 * self.cfg.sensitivity).min(1.0);
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Mouth opening written last frame
    pub fn value(&self) -> f32 {
        self.output
    }

    pub fn update(&mut self, dt: f32, frame: &mut ExpressionFrame) {
        if let Some((left, level)) = self.hold {
            let left = left - dt;
            if left <= 0.0 {
                self.target = level * self.cfg.sustain;
                self.hold = None;
            } else {
                self.hold = Some((left, level));
            }
        }
        self.current = damp(self.current, self.target, self.cfg.rate, dt).max(0.0);

        self.output = if self.cfg.enabled {
            clamp01(self.amplitude.max(self.current))
        } else {
            0.0
        };

        frame.set(Expression::Aa, self.output);
        frame.set(Expression::Oh, self.output * self.cfg.oh_share);
    }
}

impl Default for LipSyncController {
    fn default() -> Self {
        Self::new(LipSyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anima_core::Stage;

    const DT: f32 = 1.0 / 60.0;

    fn frame() -> ExpressionFrame {
        let mut frame = ExpressionFrame::new();
        frame.enter(Stage::LipSync);
        frame
    }

    #[test]
    fn test_trigger_then_stop() {
        let mut lips = LipSyncController::default();
        let mut f = frame();

        lips.trigger(0.85);
        let mut peak: f32 = 0.0;
        for _ in 0..6 {
            lips.update(DT, &mut f);
            peak = peak.max(lips.value());
        }
        assert!(peak > 0.5 && peak <= 0.85);

        lips.stop();
        for _ in 0..120 {
            lips.update(DT, &mut f);
            let v = lips.value();
            assert!((0.0..=1.0).contains(&v));
        }
        assert!(lips.value() < 1e-3);
    }

    #[test]
    fn test_pulse_settles_to_sustain() {
        let mut lips = LipSyncController::default();
        let mut f = frame();
        lips.trigger(1.0);
        for _ in 0..120 {
            lips.update(DT, &mut f);
        }
        assert!((lips.target() - 0.45).abs() < 1e-6);
        assert!((lips.value() - 0.45).abs() < 1e-3);
    }

    #[test]
    fn test_writes_aa_and_oh() {
        let mut lips = LipSyncController::default();
        let mut f = frame();
        lips.trigger(1.0);
        for _ in 0..3 {
            lips.update(DT, &mut f);
        }
        let aa = f.get(Expression::Aa).unwrap();
        let oh = f.get(Expression::Oh).unwrap();
        assert!(aa > 0.0);
        assert!((oh - aa * 0.2).abs() < 1e-6);
        assert_eq!(f.writer(Expression::Aa), Some(Stage::LipSync));
    }

    #[test]
    fn test_amplitude_mode() {
        let mut lips = LipSyncController::default();
        let loud: Vec<f32> = (0..256).map(|i| if i % 2 == 0 { 0.9 } else { -0.9 }).collect();
        for _ in 0..30 {
            lips.feed_playing(&loud);
        }
        assert!(lips.amplitude() > 0.0 && lips.amplitude() <= 1.0);

        lips.feed_playing(&[]);
        assert_eq!(lips.amplitude(), 0.0);
    }

    #[test]
    fn test_trigger_clamped() {
        let mut lips = LipSyncController::default();
        let mut f = frame();
        lips.trigger(7.0);
        assert_eq!(lips.target(), 1.0);
        lips.trigger(f32::NAN);
        assert_eq!(lips.target(), 0.0);
        lips.update(DT, &mut f);
        assert!(lips.value() >= 0.0);
    }

    #[test]
    fn test_disabled_closes_mouth() {
        let mut lips = LipSyncController::default();
        let mut f = frame();
        lips.set_enabled(false);
        lips.trigger(1.0);
        lips.update(DT, &mut f);
        assert_eq!(f.get(Expression::Aa), Some(0.0));
    }
}
