//! Widget configuration and provider/machine options.
//!
//! A widget's [`WidgetConfig`] is seeded at construction by layering, lowest
//! priority first: the system defaults, the provider's `defaults` patch, and
//! the widget's own patch. Afterwards it only changes through the machine's
//! mutation methods.
//!
//! Options can be built in code or loaded from TOML:
//!
//! ```
//! use statekit::{ProviderOptions, Variant};
//!
//! let options = ProviderOptions::from_toml_str(r#"
//!     performance_monitoring = true
//!     summary_interval = 50
//!
//!     [defaults]
//!     variant = "ghost"
//!     animation_speed = "fast"
//! "#).unwrap();
//!
//! assert!(options.performance_monitoring());
//! assert_eq!(options.defaults().variant, Some(Variant::Ghost));
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::animation::AnimationBackend;
use crate::error::{Error, Result};
use crate::state::{AnimationSpeed, Size, StateValue, Variant};

/// How long an `error` state stays before returning to `idle`.
pub const DEFAULT_ERROR_DISMISS_AFTER: Duration = Duration::from_millis(5000);

/// How long a `success` state stays before returning to `idle`.
pub const DEFAULT_SUCCESS_DISMISS_AFTER: Duration = Duration::from_millis(3000);

/// The full configuration of one widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub variant: Variant,
    pub state: StateValue,
    pub size: Size,
    pub animated: bool,
    pub animation_speed: AnimationSpeed,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
    pub loading_text: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Primary,
            state: StateValue::Idle,
            size: Size::Md,
            animated: true,
            animation_speed: AnimationSpeed::Normal,
            error_message: None,
            success_message: None,
            loading_text: None,
        }
    }
}

impl WidgetConfig {
    /// A copy of this config with `patch` applied on top.
    pub fn merged(&self, patch: &ConfigPatch) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }

    /// Apply every field `patch` sets.
    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(variant) = patch.variant {
            self.variant = variant;
        }
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(animated) = patch.animated {
            self.animated = animated;
        }
        if let Some(speed) = patch.animation_speed {
            self.animation_speed = speed;
        }
        if let Some(message) = &patch.error_message {
            self.error_message = Some(message.clone());
        }
        if let Some(message) = &patch.success_message {
            self.success_message = Some(message.clone());
        }
        if let Some(text) = &patch.loading_text {
            self.loading_text = Some(text.clone());
        }
    }
}

/// A typed partial [`WidgetConfig`]. Unset fields leave the target unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    pub variant: Option<Variant>,
    pub state: Option<StateValue>,
    pub size: Option<Size>,
    pub animated: Option<bool>,
    pub animation_speed: Option<AnimationSpeed>,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
    pub loading_text: Option<String>,
}

impl ConfigPatch {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn with_state(mut self, state: StateValue) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_animated(mut self, animated: bool) -> Self {
        self.animated = Some(animated);
        self
    }

    pub fn with_animation_speed(mut self, speed: AnimationSpeed) -> Self {
        self.animation_speed = Some(speed);
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    pub fn with_loading_text(mut self, text: impl Into<String>) -> Self {
        self.loading_text = Some(text.into());
        self
    }

    /// Layer `other` over this patch; fields set in `other` win.
    pub fn overlay(&self, other: &ConfigPatch) -> ConfigPatch {
        ConfigPatch {
            variant: other.variant.or(self.variant),
            state: other.state.or(self.state),
            size: other.size.or(self.size),
            animated: other.animated.or(self.animated),
            animation_speed: other.animation_speed.or(self.animation_speed),
            error_message: other.error_message.clone().or_else(|| self.error_message.clone()),
            success_message: other
                .success_message
                .clone()
                .or_else(|| self.success_message.clone()),
            loading_text: other.loading_text.clone().or_else(|| self.loading_text.clone()),
        }
    }

    /// Whether the patch sets nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A [`ConfigPatch`] whose enum fields are still strings.
///
/// This is the shape untyped callers and configuration files produce.
/// [`RawConfigPatch::into_patch`] converts it leniently: a field that does not
/// parse is dropped with a warning and the rest of the patch survives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfigPatch {
    pub variant: Option<String>,
    pub state: Option<String>,
    pub size: Option<String>,
    pub animated: Option<bool>,
    pub animation_speed: Option<String>,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
    pub loading_text: Option<String>,
}

impl RawConfigPatch {
    /// Convert to a typed patch, dropping fields that do not parse.
    pub fn into_patch(self) -> ConfigPatch {
        ConfigPatch {
            variant: parse_field("variant", self.variant),
            state: parse_field("state", self.state),
            size: parse_field("size", self.size),
            animated: self.animated,
            animation_speed: parse_field("animation_speed", self.animation_speed),
            error_message: self.error_message,
            success_message: self.success_message,
            loading_text: self.loading_text,
        }
    }
}

impl From<RawConfigPatch> for ConfigPatch {
    fn from(raw: RawConfigPatch) -> Self {
        raw.into_patch()
    }
}

fn parse_field<T>(field: &'static str, value: Option<String>) -> Option<T>
where
    T: std::str::FromStr<Err = Error>,
{
    let value = value?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(target: "statekit::machine", field, %value, error = %err, "dropping invalid config field");
            None
        }
    }
}

// =============================================================================
// Provider options
// =============================================================================

/// Options for a [`StateProvider`](crate::StateProvider).
///
/// ```
/// use statekit::{AnimationSpeed, ConfigPatch, ProviderOptions};
///
/// let options = ProviderOptions::new()
///     .with_defaults(ConfigPatch::new().with_animation_speed(AnimationSpeed::Slow))
///     .with_performance_monitoring(true)
///     .with_summary_interval(100);
/// assert!(options.global_animations());
/// ```
#[derive(Clone)]
pub struct ProviderOptions {
    defaults: ConfigPatch,
    global_animations: bool,
    performance_monitoring: bool,
    summary_interval: Option<u64>,
    backend: Option<Arc<dyn AnimationBackend>>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            defaults: ConfigPatch::default(),
            global_animations: true,
            performance_monitoring: false,
            summary_interval: None,
            backend: None,
        }
    }
}

/// The on-disk form of [`ProviderOptions`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProviderFile {
    defaults: RawConfigPatch,
    global_animations: Option<bool>,
    performance_monitoring: Option<bool>,
    summary_interval: Option<u64>,
}

impl ProviderOptions {
    /// Options with animations on and monitoring off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a TOML document.
    ///
    /// Unknown keys and type mismatches are errors. Enum values inside the
    /// `[defaults]` table that do not parse are dropped with a warning.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: ProviderFile = toml::from_str(source)?;
        let mut options = Self::new().with_defaults(file.defaults.into_patch());
        if let Some(enabled) = file.global_animations {
            options = options.with_global_animations(enabled);
        }
        if let Some(enabled) = file.performance_monitoring {
            options = options.with_performance_monitoring(enabled);
        }
        if let Some(every) = file.summary_interval {
            options = options.with_summary_interval(every);
        }
        Ok(options)
    }

    /// Read and parse a TOML options file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| {
            Error::config(format!("failed to read '{}': {err}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Set the patch every widget under the provider starts from.
    pub fn with_defaults(mut self, defaults: ConfigPatch) -> Self {
        self.defaults = defaults;
        self
    }

    /// Turn animations off for every widget under the provider.
    pub fn with_global_animations(mut self, enabled: bool) -> Self {
        self.global_animations = enabled;
        self
    }

    /// Record transition timings.
    pub fn with_performance_monitoring(mut self, enabled: bool) -> Self {
        self.performance_monitoring = enabled;
        self
    }

    /// Log a metrics summary every `every` recorded transitions. Zero disables it.
    pub fn with_summary_interval(mut self, every: u64) -> Self {
        self.summary_interval = (every > 0).then_some(every);
        self
    }

    /// Delegate visuals to `backend`.
    pub fn with_backend(mut self, backend: Arc<dyn AnimationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn defaults(&self) -> &ConfigPatch {
        &self.defaults
    }

    pub fn global_animations(&self) -> bool {
        self.global_animations
    }

    pub fn performance_monitoring(&self) -> bool {
        self.performance_monitoring
    }

    pub fn summary_interval(&self) -> Option<u64> {
        self.summary_interval
    }

    pub fn backend(&self) -> Option<&Arc<dyn AnimationBackend>> {
        self.backend.as_ref()
    }
}

impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("defaults", &self.defaults)
            .field("global_animations", &self.global_animations)
            .field("performance_monitoring", &self.performance_monitoring)
            .field("summary_interval", &self.summary_interval)
            .field("has_backend", &self.backend.is_some())
            .finish()
    }
}

// =============================================================================
// Machine options
// =============================================================================

/// Per-widget options for a [`WidgetStateMachine`](crate::WidgetStateMachine).
#[derive(Clone)]
pub struct MachineOptions {
    patch: ConfigPatch,
    error_dismiss_after: Option<Duration>,
    success_dismiss_after: Option<Duration>,
    backend: Option<Arc<dyn AnimationBackend>>,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            patch: ConfigPatch::default(),
            error_dismiss_after: Some(DEFAULT_ERROR_DISMISS_AFTER),
            success_dismiss_after: Some(DEFAULT_SUCCESS_DISMISS_AFTER),
            backend: None,
        }
    }
}

impl MachineOptions {
    /// Default options: errors dismiss after 5 s, successes after 3 s.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the widget's own config patch, applied over provider defaults.
    pub fn with_config(mut self, patch: ConfigPatch) -> Self {
        self.patch = patch;
        self
    }

    /// Return from `error` to `idle` after `after`, or never with `None`.
    pub fn with_error_dismiss_after(mut self, after: Option<Duration>) -> Self {
        self.error_dismiss_after = after;
        self
    }

    /// Return from `success` to `idle` after `after`, or never with `None`.
    pub fn with_success_dismiss_after(mut self, after: Option<Duration>) -> Self {
        self.success_dismiss_after = after;
        self
    }

    /// Backend for a widget that ends up without a shared provider.
    ///
    /// Ignored when the widget resolves to a provider; the provider's backend
    /// is used instead.
    pub fn with_backend(mut self, backend: Arc<dyn AnimationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn config(&self) -> &ConfigPatch {
        &self.patch
    }

    pub fn error_dismiss_after(&self) -> Option<Duration> {
        self.error_dismiss_after
    }

    pub fn success_dismiss_after(&self) -> Option<Duration> {
        self.success_dismiss_after
    }

    pub fn backend(&self) -> Option<&Arc<dyn AnimationBackend>> {
        self.backend.as_ref()
    }
}

impl fmt::Debug for MachineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineOptions")
            .field("patch", &self.patch)
            .field("error_dismiss_after", &self.error_dismiss_after)
            .field("success_dismiss_after", &self.success_dismiss_after)
            .field("has_backend", &self.backend.is_some())
            .finish()
    }
}
