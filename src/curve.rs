//! Sampled easing curves and scalar blending helpers.
//!
//! Tuning curves (wall-run drag, high-speed horizontal drag, grapple
//! acceleration, headbob) are stored as evenly spaced samples over `[0, 1]`
//! and evaluated with linear interpolation between neighbouring samples.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of samples used when a curve is built from a function.
pub const DEFAULT_RESOLUTION: usize = 32;

/// A 1D easing function sampled over the domain `[0, 1]`.
///
/// Inputs outside the domain are clamped. The samples are usually monotonic,
/// but nothing enforces it.
///
/// # Example
///
/// ```rust
/// use freerun_controller::curve::ResponseCurve;
///
/// let falloff = ResponseCurve::linear(1.0, 0.0);
/// assert_eq!(falloff.evaluate(0.0), 1.0);
/// assert_eq!(falloff.evaluate(0.5), 0.5);
/// assert_eq!(falloff.evaluate(2.0), 0.0);
/// ```
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResponseCurve {
    samples: Vec<f32>,
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self::linear(0.0, 1.0)
    }
}

impl ResponseCurve {
    /// Build a curve from raw samples, evenly spaced across `[0, 1]`.
    pub fn from_samples(samples: Vec<f32>) -> Result<Self, ConfigError> {
        let curve = Self { samples };
        curve.validate()?;
        Ok(curve)
    }

    /// Sample `f` at `resolution` evenly spaced points (at least two).
    pub fn from_fn(resolution: usize, f: impl Fn(f32) -> f32) -> Self {
        let count = resolution.max(2);
        let last = (count - 1) as f32;
        Self {
            samples: (0..count).map(|i| f(i as f32 / last)).collect(),
        }
    }

    /// Straight line from `start` at `t = 0` to `end` at `t = 1`.
    pub fn linear(start: f32, end: f32) -> Self {
        Self {
            samples: vec![start, end],
        }
    }

    /// Smoothstep from `start` to `end`, flat at both ends.
    pub fn ease_in_out(start: f32, end: f32) -> Self {
        Self::from_fn(DEFAULT_RESOLUTION, |t| {
            let s = t * t * (3.0 - 2.0 * t);
            start.lerp(end, s)
        })
    }

    /// Quadratic ease-out from `start` to `end`: fast at first, settling at the end.
    pub fn ease_out(start: f32, end: f32) -> Self {
        Self::from_fn(DEFAULT_RESOLUTION, |t| {
            let s = 1.0 - (1.0 - t) * (1.0 - t);
            start.lerp(end, s)
        })
    }

    /// The same value everywhere.
    pub fn constant(value: f32) -> Self {
        Self::linear(value, value)
    }

    /// Evaluate the curve at `t`, clamped to `[0, 1]`.
    pub fn evaluate(&self, t: f32) -> f32 {
        match self.samples.len() {
            0 => 0.0,
            1 => self.samples[0],
            len => {
                let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
                let scaled = t * (len - 1) as f32;
                let index = (scaled.floor() as usize).min(len - 2);
                let frac = scaled - index as f32;
                self.samples[index].lerp(self.samples[index + 1], frac)
            }
        }
    }

    /// The raw samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Check that the curve has at least two finite samples.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples.len() < 2 {
            return Err(ConfigError::TooFewSamples {
                field: "curve samples",
                min: 2,
                value: self.samples.len(),
            });
        }
        if let Some(index) = self.samples.iter().position(|s| !s.is_finite()) {
            return Err(ConfigError::NonFiniteSample { index });
        }
        Ok(())
    }
}

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + diff.signum() * max_delta
    }
}

/// Blend factor for a rate-per-second smoothing step, clamped to `[0, 1]`.
#[inline]
pub fn blend_factor(rate: f32, dt: f32) -> f32 {
    (rate * dt).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_curve_interpolates() {
        let curve = ResponseCurve::linear(0.0, 10.0);
        assert_eq!(curve.evaluate(0.0), 0.0);
        assert_eq!(curve.evaluate(0.25), 2.5);
        assert_eq!(curve.evaluate(1.0), 10.0);
    }

    #[test]
    fn constant_curve_is_flat() {
        let curve = ResponseCurve::constant(0.7);
        assert_eq!(curve.evaluate(0.0), 0.7);
        assert_eq!(curve.evaluate(0.5), 0.7);
        assert_eq!(curve.evaluate(1.0), 0.7);
    }

    #[test]
    fn evaluate_clamps_domain() {
        let curve = ResponseCurve::linear(1.0, 0.0);
        assert_eq!(curve.evaluate(-3.0), 1.0);
        assert_eq!(curve.evaluate(7.0), 0.0);
        assert_eq!(curve.evaluate(f32::NAN), 1.0);
    }

    #[test]
    fn ease_in_out_hits_endpoints_and_midpoint() {
        let curve = ResponseCurve::ease_in_out(0.0, 1.0);
        assert!(curve.evaluate(0.0).abs() < 1e-6);
        assert!((curve.evaluate(1.0) - 1.0).abs() < 1e-6);
        assert!((curve.evaluate(0.5) - 0.5).abs() < 0.01);
        // Flat near the start
        assert!(curve.evaluate(0.1) < 0.1);
    }

    #[test]
    fn ease_out_is_ahead_of_linear() {
        let curve = ResponseCurve::ease_out(0.0, 1.0);
        assert!(curve.evaluate(0.3) > 0.3);
    }

    #[test]
    fn from_samples_rejects_short_or_non_finite() {
        assert!(ResponseCurve::from_samples(vec![1.0]).is_err());
        assert!(ResponseCurve::from_samples(vec![0.0, f32::INFINITY]).is_err());
        assert!(ResponseCurve::from_samples(vec![0.0, 0.5, 1.0]).is_ok());
    }

    #[test]
    fn move_towards_never_overshoots() {
        assert_eq!(move_towards(0.0, 10.0, 3.0), 3.0);
        assert_eq!(move_towards(9.0, 10.0, 3.0), 10.0);
        assert_eq!(move_towards(20.0, 10.0, 3.0), 17.0);
        assert_eq!(move_towards(5.0, 5.0, 0.0), 5.0);
    }

    #[test]
    fn blend_factor_is_clamped() {
        assert!((blend_factor(3.0, 0.1) - 0.3).abs() < 1e-6);
        assert_eq!(blend_factor(100.0, 0.1), 1.0);
    }
}
