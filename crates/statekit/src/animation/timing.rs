//! The speed preset table.

use std::time::Duration;

use super::easing::Easing;
use crate::state::AnimationSpeed;

/// Duration and easing of a transition.
///
/// [`TransitionTiming::for_speed`] is the only place durations are decided;
/// nothing else in the crate picks a transition length on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTiming {
    pub duration: Duration,
    pub easing: Easing,
}

impl TransitionTiming {
    /// Look up the timing for a speed preset.
    ///
    /// | speed    | duration | easing              |
    /// |----------|----------|---------------------|
    /// | `fast`   | 150 ms   | `ease-out`          |
    /// | `normal` | 300 ms   | `ease-in-out`       |
    /// | `slow`   | 500 ms   | `ease-in-out-cubic` |
    pub const fn for_speed(speed: AnimationSpeed) -> Self {
        match speed {
            AnimationSpeed::Fast => Self {
                duration: Duration::from_millis(150),
                easing: Easing::EaseOut,
            },
            AnimationSpeed::Normal => Self {
                duration: Duration::from_millis(300),
                easing: Easing::EaseInOut,
            },
            AnimationSpeed::Slow => Self {
                duration: Duration::from_millis(500),
                easing: Easing::EaseInOutCubic,
            },
        }
    }

    /// Eased progress after `elapsed` has passed.
    pub fn progress(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.easing.sample(t)
    }
}

impl From<AnimationSpeed> for TransitionTiming {
    fn from(speed: AnimationSpeed) -> Self {
        Self::for_speed(speed)
    }
}
