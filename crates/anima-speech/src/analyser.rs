//! Spectrum analyser with browser-style byte output
//!
//! Blackman-windowed FFT, magnitudes smoothed over time, converted to dB and
//! mapped linearly from [min_db, max_db] onto 0..=255.

use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    pub fft_size: usize,
    /// Weight of the previous frame's magnitude, 0..1
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

pub struct SpectrumAnalyser {
    cfg: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("cfg", &self.cfg)
            .field("bins", &self.bytes.len())
            .finish()
    }
}

fn blackman(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    let denom = n.max(2) as f32;
    (0..n)
        .map(|i| {
            let x = std::f32::consts::TAU * i as f32 / denom;
            A0 - A1 * x.cos() + A2 * (2.0 * x).cos()
        })
        .collect()
}

impl SpectrumAnalyser {
    pub fn new(mut cfg: AnalyserConfig) -> Self {
        cfg.fft_size = cfg.fft_size.max(2);
        cfg.smoothing = cfg.smoothing.clamp(0.0, 1.0);
        let n = cfg.fft_size;
        let bins = n / 2;
        Self {
            fft: FftPlanner::new().plan_fft_forward(n),
            window: blackman(n),
            scratch: vec![Complex::default(); n],
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
            cfg,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.cfg.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.bytes.len()
    }

    /// Analyse the most recent `fft_size` samples (zero padded) and return
    /// the byte spectrum
    pub fn process(&mut self, samples: &[f32]) -> &[u8] {
        let n = self.cfg.fft_size;
        let tail = &samples[samples.len().saturating_sub(n)..];

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let s = tail.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let tau = self.cfg.smoothing;
        let range = (self.cfg.max_db - self.cfg.min_db).max(f32::EPSILON);
        for (k, byte) in self.bytes.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() / n as f32;
            let smoothed = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            self.smoothed[k] = smoothed;

            let db = if smoothed > 0.0 {
                20.0 * smoothed.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 * (db - self.cfg.min_db) / range;
            *byte = scaled.clamp(0.0, 255.0) as u8;
        }
        &self.bytes
    }

    /// Last byte spectrum
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mean of the last byte spectrum
    pub fn average(&self) -> f32 {
        if self.bytes.is_empty() {
            return 0.0;
        }
        self.bytes.iter().map(|&b| f32::from(b)).sum::<f32>() / self.bytes.len() as f32
    }

    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.bytes.fill(0);
    }
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new(AnalyserConfig::default())
    }
}
