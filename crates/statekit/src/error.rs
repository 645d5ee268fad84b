//! Error types for the widget state layer.

use statekit_core::CoreError;

/// Result type alias for statekit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the widget state layer.
///
/// Mutations on a [`WidgetStateMachine`](crate::WidgetStateMachine) never
/// return these; they log and ignore invalid input instead. The parsing
/// helpers and the required-provider lookups do.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A string did not name a known interaction state.
    #[error("Invalid state '{0}'")]
    InvalidState(String),

    /// A string did not name a known variant.
    #[error("Invalid variant '{0}'")]
    InvalidVariant(String),

    /// A string did not name a known size.
    #[error("Invalid size '{0}'")]
    InvalidSize(String),

    /// A string did not name a known animation speed.
    #[error("Invalid animation speed '{0}'")]
    InvalidSpeed(String),

    /// A consumer required a shared provider and none was in scope.
    #[error("{consumer} must be used within a {provider}")]
    MissingProvider {
        provider: &'static str,
        consumer: String,
    },

    /// Provider options could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An error from the core systems.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl Error {
    /// Create a missing-provider error for `consumer`.
    pub fn missing_provider(consumer: impl Into<String>) -> Self {
        Self::MissingProvider {
            provider: "StateProvider",
            consumer: consumer.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Failures reported by an [`AnimationBackend`](crate::animation::AnimationBackend).
///
/// The orchestrator logs these and treats the transition as finished.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnimationError {
    /// The element is no longer attached to anything that can be animated.
    #[error("Element {0} is detached")]
    Detached(u64),

    /// The backend refused or failed to run the animation.
    #[error("Animation backend failed: {0}")]
    Backend(String),

    /// The backend panicked while running the animation.
    #[error("Animation backend panicked: {0}")]
    Panicked(String),
}

impl AnimationError {
    /// Create a backend failure.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}
