//! Animation timing and the backend seam.
//!
//! This module provides the easing curves and speed presets that decide how
//! long a state transition takes, and the [`AnimationBackend`] trait through
//! which the actual visuals are delegated.
//!
//! # Example
//!
//! ```
//! use statekit::animation::TransitionTiming;
//! use statekit::AnimationSpeed;
//! use std::time::Duration;
//!
//! let timing = TransitionTiming::for_speed(AnimationSpeed::Fast);
//! assert_eq!(timing.duration, Duration::from_millis(150));
//! assert_eq!(timing.easing.as_str(), "ease-out");
//! ```

mod backend;
mod easing;
mod timing;

pub(crate) use backend::panic_message;
pub use backend::{AnimationBackend, ElementRef, LoadingLoop};
pub use easing::Easing;
pub use timing::TransitionTiming;
