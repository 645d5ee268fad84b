//! The closed vocabularies a widget is described with.
//!
//! Every enum here has a lowercase name form (`"loading"`, `"ghost"`, `"xl"`,
//! `"fast"`) used for parsing untyped input and for the derived class name.
//! Parsing is strict: names are matched exactly, so `"Loading"` is rejected.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The interaction state of a widget. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StateValue {
    /// Ready for interaction.
    #[default]
    Idle,
    /// Waiting on work the widget started.
    Loading,
    /// The last action failed.
    Error,
    /// The last action succeeded.
    Success,
    /// Not interactive.
    Disabled,
    /// Queued but not started yet.
    Pending,
}

impl StateValue {
    /// All states, in declaration order.
    pub const ALL: [StateValue; 6] = [
        Self::Idle,
        Self::Loading,
        Self::Error,
        Self::Success,
        Self::Disabled,
        Self::Pending,
    ];

    /// The lowercase name of this state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Error => "error",
            Self::Success => "success",
            Self::Disabled => "disabled",
            Self::Pending => "pending",
        }
    }

    /// Whether this state dismisses itself after a delay.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Error | Self::Success)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| Error::InvalidState(s.to_owned()))
    }
}

/// The visual role of a widget, orthogonal to its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    #[default]
    Primary,
    Secondary,
    Tertiary,
    Danger,
    Success,
    Ghost,
}

impl Variant {
    /// All variants, in declaration order.
    pub const ALL: [Variant; 6] = [
        Self::Primary,
        Self::Secondary,
        Self::Tertiary,
        Self::Danger,
        Self::Success,
        Self::Ghost,
    ];

    /// The lowercase name of this variant.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
            Self::Danger => "danger",
            Self::Success => "success",
            Self::Ghost => "ghost",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.as_str() == s)
            .ok_or_else(|| Error::InvalidVariant(s.to_owned()))
    }
}

/// The size of a widget, ordered from smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Size {
    Xs,
    Sm,
    #[default]
    Md,
    Lg,
    Xl,
}

impl Size {
    /// All sizes, smallest first.
    pub const ALL: [Size; 5] = [Self::Xs, Self::Sm, Self::Md, Self::Lg, Self::Xl];

    /// The lowercase name of this size.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xs => "xs",
            Self::Sm => "sm",
            Self::Md => "md",
            Self::Lg => "lg",
            Self::Xl => "xl",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Size {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| Error::InvalidSize(s.to_owned()))
    }
}

/// How fast state transitions animate.
///
/// The concrete duration and easing for each speed live in
/// [`TransitionTiming::for_speed`](crate::animation::TransitionTiming::for_speed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnimationSpeed {
    Fast,
    #[default]
    Normal,
    Slow,
}

impl AnimationSpeed {
    /// All speeds, fastest first.
    pub const ALL: [AnimationSpeed; 3] = [Self::Fast, Self::Normal, Self::Slow];

    /// The lowercase name of this speed.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Normal => "normal",
            Self::Slow => "slow",
        }
    }
}

impl fmt::Display for AnimationSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationSpeed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|speed| speed.as_str() == s)
            .ok_or_else(|| Error::InvalidSpeed(s.to_owned()))
    }
}

/// Check whether `name` is a known state.
pub fn is_valid_state(name: &str) -> bool {
    name.parse::<StateValue>().is_ok()
}

/// Check whether `name` is a known variant.
pub fn is_valid_variant(name: &str) -> bool {
    name.parse::<Variant>().is_ok()
}

/// Check whether `name` is a known size.
pub fn is_valid_size(name: &str) -> bool {
    name.parse::<Size>().is_ok()
}

/// A change from one state to another, as reported by signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateChange {
    pub from: StateValue,
    pub to: StateValue,
}

impl StateChange {
    /// Create a new state change.
    pub const fn new(from: StateValue, to: StateValue) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
