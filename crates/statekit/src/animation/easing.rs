//! Easing curves for state transitions.
//!
//! An easing curve maps linear progress (0.0 to 1.0) to eased progress.
//! Backends that animate in their own engine can use [`Easing::as_str`] to
//! pick the matching named curve instead of sampling.

use std::fmt;

/// The easing curves used by transition timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Easing {
    /// Linear interpolation (no easing).
    Linear,
    /// Quadratic ease-in (starts slow, accelerates).
    EaseIn,
    /// Quadratic ease-out (starts fast, decelerates).
    EaseOut,
    /// Quadratic ease-in-out (smooth start and end).
    #[default]
    EaseInOut,
    /// Cubic ease-in-out, more pronounced than [`EaseInOut`](Self::EaseInOut).
    EaseInOutCubic,
}

impl Easing {
    /// Sample the curve at progress `t`.
    ///
    /// `t` is clamped to `0.0..=1.0`.
    ///
    /// ```
    /// use statekit::animation::Easing;
    ///
    /// assert_eq!(Easing::Linear.sample(0.5), 0.5);
    /// assert!(Easing::EaseOut.sample(0.5) > 0.5);
    /// assert_eq!(Easing::EaseInOutCubic.sample(1.0), 1.0);
    /// ```
    #[inline]
    pub fn sample(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }

    /// Interpolate between `start` and `end` at progress `t`.
    #[inline]
    pub fn lerp(self, start: f32, end: f32, t: f32) -> f32 {
        start + (end - start) * self.sample(t)
    }

    /// The kebab-case name of this curve.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseIn => "ease-in",
            Self::EaseOut => "ease-out",
            Self::EaseInOut => "ease-in-out",
            Self::EaseInOutCubic => "ease-in-out-cubic",
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 5] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::EaseInOutCubic,
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert!(easing.sample(0.0).abs() < 1e-6, "{easing} at 0");
            assert!((easing.sample(1.0) - 1.0).abs() < 1e-6, "{easing} at 1");
        }
    }

    #[test]
    fn test_clamping() {
        for easing in ALL {
            assert_eq!(easing.sample(-1.0), easing.sample(0.0));
            assert_eq!(easing.sample(2.0), easing.sample(1.0));
        }
    }

    #[test]
    fn test_midpoints() {
        assert!(Easing::EaseIn.sample(0.5) < 0.5);
        assert!(Easing::EaseOut.sample(0.5) > 0.5);
        assert!((Easing::EaseInOut.sample(0.5) - 0.5).abs() < 1e-6);
        assert!((Easing::EaseInOutCubic.sample(0.5) - 0.5).abs() < 1e-6);
        // Cubic is flatter near the ends than quadratic.
        assert!(Easing::EaseInOutCubic.sample(0.2) < Easing::EaseInOut.sample(0.2));
    }

    #[test]
    fn test_monotonic() {
        for easing in ALL {
            let mut prev = easing.sample(0.0);
            for step in 1..=100 {
                let value = easing.sample(step as f32 / 100.0);
                assert!(value >= prev - 1e-6, "{easing} decreased at step {step}");
                prev = value;
            }
        }
    }

    #[test]
    fn test_lerp() {
        assert_eq!(Easing::Linear.lerp(10.0, 20.0, 0.5), 15.0);
        assert_eq!(Easing::EaseOut.lerp(0.0, 100.0, 1.0), 100.0);
    }
}
