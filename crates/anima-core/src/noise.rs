//! Noise and smoothing - the shared building blocks of every motion source
//!
//! All smoothing here is frame-rate independent: the blend factor is derived
//! from a decay rate and the frame delta, never a fixed per-frame fraction.

/// Smooth, non-repeating value in [-1, 1] driven by time.
///
/// Four incommensurate sines; deterministic for a given `t`.
#[inline]
pub fn pseudo_noise(t: f32) -> f32 {
    pseudo_noise_at(f64::from(t))
}

/// [`pseudo_noise`] evaluated in `f64`
pub fn pseudo_noise_at(t: f64) -> f32 {
    let n = t.sin() + (2.2 * t + 5.52).sin() + (2.9 * t + 0.93).sin() + (4.6 * t + 8.94).sin();
    (n / 4.0) as f32
}

/// Blend factor for exponential decay at `rate` over `dt` seconds
#[inline]
pub fn damp_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Move `current` toward `target` with exponential decay
#[inline]
pub fn damp(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * damp_factor(rate, dt)
}

#[inline]
pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_bounded_and_deterministic() {
        let mut t = 0.0;
        while t < 200.0 {
            let n = pseudo_noise(t);
            assert!((-1.0..=1.0).contains(&n));
            assert_eq!(n, pseudo_noise(t));
            t += 0.173;
        }
    }

    #[test]
    fn test_noise_is_continuous() {
        let mut t = 0.0;
        while t < 50.0 {
            let step = pseudo_noise(t + 0.001) - pseudo_noise(t);
            assert!(step.abs() < 0.01);
            t += 0.05;
        }
    }

    #[test]
    fn test_damp_never_overshoots() {
        let mut v = 0.0;
        for _ in 0..500 {
            let next = damp(v, 1.0, 3.0, 1.0 / 60.0);
            assert!(next >= v);
            assert!(next <= 1.0);
            v = next;
        }
        assert!((v - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_damp_factor_frame_rate_independent() {
        // Two half steps equal one full step
        let full = damp(0.0, 1.0, 10.0, 0.1);
        let half = damp(damp(0.0, 1.0, 10.0, 0.05), 1.0, 10.0, 0.05);
        assert!((full - half).abs() < 1e-5);
    }

    #[test]
    fn test_damp_factor_zero_dt() {
        assert_eq!(damp_factor(10.0, 0.0), 0.0);
    }

    proptest::proptest! {
        #[test]
        fn damp_stays_between_current_and_target(
            current in -10.0f32..10.0,
            target in -10.0f32..10.0,
            rate in 0.0f32..50.0,
            dt in 0.0f32..0.5,
        ) {
            let v = damp(current, target, rate, dt);
            let (lo, hi) = if current < target { (current, target) } else { (target, current) };
            proptest::prop_assert!(v >= lo - 1e-5 && v <= hi + 1e-5);
        }
    }
}
