//! Transition timing metrics.
//!
//! A [`PerformanceMonitor`] belongs to one orchestrator and lives exactly as
//! long as it does. Widgets sharing a provider share its monitor; there is no
//! process-wide instance.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;

use crate::animation::TransitionTiming;
use crate::state::{AnimationSpeed, StateChange, StateValue};

/// Scheduling slack allowed on top of the slowest preset.
pub const SLOW_TRANSITION_TOLERANCE: Duration = Duration::from_millis(100);

/// Transitions slower than this are counted and warned about.
///
/// A `slow` transition finishing on a real clock always overshoots its
/// nominal duration a little, so the threshold sits above it.
pub const SLOW_TRANSITION_THRESHOLD: Duration = TransitionTiming::for_speed(AnimationSpeed::Slow)
    .duration
    .saturating_add(SLOW_TRANSITION_TOLERANCE);

/// A snapshot of recorded transition timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerformanceMetrics {
    /// Number of completed transitions.
    pub transition_count: u64,
    /// Running average of transition durations.
    pub average_transition_time: Duration,
    /// Number of transitions slower than [`SLOW_TRANSITION_THRESHOLD`].
    pub slow_transitions: u64,
    /// Duration of the most recent transition.
    pub last_transition_time: Duration,
}

impl PerformanceMetrics {
    /// A loggable one-line summary.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary(*self)
    }
}

/// Display adapter for [`PerformanceMetrics`].
#[derive(Debug, Clone, Copy)]
pub struct MetricsSummary(PerformanceMetrics);

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{} transitions, avg {:.1}ms, last {:.1}ms, {} slow",
            m.transition_count,
            m.average_transition_time.as_secs_f64() * 1000.0,
            m.last_transition_time.as_secs_f64() * 1000.0,
            m.slow_transitions,
        )
    }
}

#[derive(Default)]
struct MonitorState {
    count: u64,
    // Kept as f64 nanoseconds so repeated averaging does not accumulate
    // rounding from Duration conversions.
    average_nanos: f64,
    slow: u64,
    last: Duration,
}

impl MonitorState {
    fn snapshot(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            transition_count: self.count,
            average_transition_time: Duration::from_nanos(self.average_nanos.round().max(0.0) as u64),
            slow_transitions: self.slow,
            last_transition_time: self.last,
        }
    }
}

/// Records transition durations.
pub struct PerformanceMonitor {
    enabled: bool,
    summary_interval: Option<u64>,
    state: Mutex<MonitorState>,
}

impl PerformanceMonitor {
    /// Create a monitor. A disabled monitor ignores every [`record`](Self::record).
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            summary_interval: None,
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// A monitor that records nothing.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Log a summary at `info` every `every` recorded transitions.
    pub fn with_summary_interval(mut self, every: Option<u64>) -> Self {
        self.summary_interval = every.filter(|&n| n > 0);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one completed transition.
    pub fn record(&self, from: StateValue, to: StateValue, duration: Duration) {
        if !self.enabled {
            return;
        }

        let (metrics, summary_due) = {
            let mut state = self.state.lock();
            state.count = state.count.saturating_add(1);
            let nanos = duration.as_nanos() as f64;
            state.average_nanos += (nanos - state.average_nanos) / state.count as f64;
            state.last = duration;
            if duration > SLOW_TRANSITION_THRESHOLD {
                state.slow = state.slow.saturating_add(1);
            }
            let summary_due = self
                .summary_interval
                .is_some_and(|every| state.count % every == 0);
            (state.snapshot(), summary_due)
        };

        if duration > SLOW_TRANSITION_THRESHOLD {
            tracing::warn!(
                target: "statekit::monitor",
                transition = %StateChange::new(from, to),
                from = from.as_str(),
                to = to.as_str(),
                ?duration,
                threshold = ?SLOW_TRANSITION_THRESHOLD,
                "slow transition"
            );
        } else {
            tracing::trace!(
                target: "statekit::monitor",
                from = from.as_str(),
                to = to.as_str(),
                ?duration,
                "transition recorded"
            );
        }

        if summary_due {
            tracing::info!(
                target: "statekit::monitor",
                transition_count = metrics.transition_count,
                slow_transitions = metrics.slow_transitions,
                "{}",
                metrics.summary()
            );
        }
    }

    /// A snapshot of the metrics so far.
    pub fn metrics(&self) -> PerformanceMetrics {
        self.state.lock().snapshot()
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("enabled", &self.enabled)
            .field("summary_interval", &self.summary_interval)
            .field("metrics", &self.metrics())
            .finish()
    }
}

static_assertions::assert_impl_all!(PerformanceMonitor: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_running_average() {
        let monitor = PerformanceMonitor::new(true);
        monitor.record(StateValue::Idle, StateValue::Loading, ms(100));
        assert_eq!(monitor.metrics().average_transition_time, ms(100));

        monitor.record(StateValue::Loading, StateValue::Success, ms(300));
        monitor.record(StateValue::Success, StateValue::Idle, ms(200));

        let metrics = monitor.metrics();
        assert_eq!(metrics.transition_count, 3);
        assert_eq!(metrics.average_transition_time, ms(200));
        assert_eq!(metrics.last_transition_time, ms(200));
        assert_eq!(metrics.slow_transitions, 0);
    }

    #[test]
    fn test_slow_threshold_is_exclusive() {
        let monitor = PerformanceMonitor::new(true);
        monitor.record(StateValue::Idle, StateValue::Loading, ms(600));
        assert_eq!(monitor.metrics().slow_transitions, 0);

        monitor.record(StateValue::Loading, StateValue::Error, ms(601));
        assert_eq!(monitor.metrics().slow_transitions, 1);
    }

    #[test]
    fn test_threshold_clears_slowest_preset() {
        let slowest = TransitionTiming::for_speed(AnimationSpeed::Slow).duration;
        assert_eq!(SLOW_TRANSITION_THRESHOLD, ms(600));
        assert!(SLOW_TRANSITION_THRESHOLD > slowest);

        let monitor = PerformanceMonitor::new(true);
        monitor.record(StateValue::Idle, StateValue::Loading, slowest + ms(15));
        assert_eq!(monitor.metrics().slow_transitions, 0);
    }

    #[test]
    fn test_disabled_never_changes() {
        let monitor = PerformanceMonitor::disabled();
        for _ in 0..5 {
            monitor.record(StateValue::Idle, StateValue::Loading, ms(900));
        }
        assert_eq!(monitor.metrics(), PerformanceMetrics::default());
        assert!(!monitor.is_enabled());
    }

    #[test]
    fn test_counts_never_decrease() {
        let monitor = PerformanceMonitor::new(true).with_summary_interval(Some(2));
        let mut previous = monitor.metrics();
        for n in 0..10u64 {
            monitor.record(StateValue::Idle, StateValue::Pending, ms(n * 120));
            let current = monitor.metrics();
            assert!(current.transition_count > previous.transition_count);
            assert!(current.slow_transitions >= previous.slow_transitions);
            previous = current;
        }
        // 720, 840, 960 and 1080 ms are over the threshold.
        assert_eq!(previous.slow_transitions, 4);
    }

    #[test]
    fn test_zero_duration() {
        let monitor = PerformanceMonitor::new(true);
        monitor.record(StateValue::Idle, StateValue::Idle, Duration::ZERO);
        let metrics = monitor.metrics();
        assert_eq!(metrics.transition_count, 1);
        assert_eq!(metrics.average_transition_time, Duration::ZERO);
    }

    #[test]
    fn test_summary_display() {
        let metrics = PerformanceMetrics {
            transition_count: 4,
            average_transition_time: ms(250),
            slow_transitions: 1,
            last_transition_time: ms(600),
        };
        assert_eq!(
            metrics.summary().to_string(),
            "4 transitions, avg 250.0ms, last 600.0ms, 1 slow"
        );
    }
}
