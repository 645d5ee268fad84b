//! Shared helpers for statekit integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use statekit::animation::{AnimationBackend, ElementRef, LoadingLoop};
use statekit::{AnimationError, AnimationSpeed, StateValue, Variant};

/// Install a test subscriber once; `RUST_LOG=statekit=debug` shows the events.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Everything a [`RecordingBackend`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Transition {
        element: ElementRef,
        from: StateValue,
        to: StateValue,
        variant: Variant,
        speed: AnimationSpeed,
    },
    Hover {
        element: ElementRef,
        variant: Variant,
        entering: bool,
    },
    LoopStarted {
        element: ElementRef,
        variant: Variant,
    },
    LoopStopped {
        element: ElementRef,
    },
    Cleanup,
}

/// How [`RecordingBackend::execute_state_transition`] behaves.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Resolve `Ok` after the given time.
    Succeed(Duration),
    /// Resolve `Err` right away.
    Fail,
    /// Panic while the returned future is polled.
    PanicInFuture,
    /// Panic before returning a future.
    PanicOnCall,
}

/// A backend that records its calls.
pub struct RecordingBackend {
    calls: Arc<Mutex<Vec<Call>>>,
    behavior: Mutex<Behavior>,
}

impl RecordingBackend {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            behavior: Mutex::new(behavior),
        })
    }

    /// Succeeds after `delay`.
    pub fn succeeding(delay: Duration) -> Arc<Self> {
        Self::new(Behavior::Succeed(delay))
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn transitions(&self) -> Vec<(StateValue, StateValue)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Transition { from, to, .. } => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

fn explode() -> Result<(), AnimationError> {
    panic!("backend exploded mid-animation")
}

impl AnimationBackend for RecordingBackend {
    fn execute_state_transition(
        &self,
        element: ElementRef,
        from: StateValue,
        to: StateValue,
        variant: Variant,
        speed: AnimationSpeed,
    ) -> BoxFuture<'static, Result<(), AnimationError>> {
        self.record(Call::Transition {
            element,
            from,
            to,
            variant,
            speed,
        });
        let behavior = *self.behavior.lock();
        match behavior {
            Behavior::Succeed(delay) => Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(())
            }),
            Behavior::Fail => Box::pin(async { Err(AnimationError::backend("gpu context lost")) }),
            Behavior::PanicInFuture => Box::pin(async { explode() }),
            Behavior::PanicOnCall => panic!("backend refused synchronously"),
        }
    }

    fn apply_hover_animation(&self, element: ElementRef, variant: Variant, is_entering: bool) {
        self.record(Call::Hover {
            element,
            variant,
            entering: is_entering,
        });
    }

    fn create_loading_loop(&self, element: ElementRef, variant: Variant) -> LoadingLoop {
        self.record(Call::LoopStarted { element, variant });
        let log = self.calls.clone();
        LoadingLoop::new(move || log.lock().push(Call::LoopStopped { element }))
    }

    fn cleanup(&self) {
        self.record(Call::Cleanup);
    }
}
