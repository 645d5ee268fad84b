//! End-to-end widget scenarios on virtual time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use statekit::{
    ContextScope, MachineOptions, ProviderOptions, StateChange, StateProvider, StateValue,
    WidgetStateMachine,
};

use common::{init_tracing, ms};

fn monitored_scope() -> (ContextScope, Arc<StateProvider>) {
    let scope = ContextScope::root();
    let provider = scope.provide(StateProvider::new(
        ProviderOptions::new().with_performance_monitoring(true),
    ));
    (scope, provider)
}

fn finished_log(machine: &WidgetStateMachine) -> Arc<Mutex<Vec<StateChange>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let clone = log.clone();
    machine
        .transition_finished()
        .connect(move |change| clone.lock().push(*change));
    log
}

#[tokio::test(start_paused = true)]
async fn test_loading_completes_after_normal_duration() {
    init_tracing();
    let (scope, provider) = monitored_scope();
    let button = WidgetStateMachine::in_scope(&scope, MachineOptions::new());
    let finished = finished_log(&button);

    button.set_state(StateValue::Loading);
    assert!(button.view().is_loading);
    assert!(button.is_transitioning());

    tokio::time::sleep(ms(290)).await;
    assert!(finished.lock().is_empty());
    assert_eq!(provider.metrics().transition_count, 0);

    tokio::time::sleep(ms(20)).await;
    assert_eq!(
        *finished.lock(),
        vec![StateChange::new(StateValue::Idle, StateValue::Loading)]
    );
    assert!(!button.is_transitioning());
    assert_eq!(provider.metrics().transition_count, 1);
    assert!(provider.metrics().average_transition_time >= ms(300));
}

#[tokio::test(start_paused = true)]
async fn test_error_auto_dismisses() {
    init_tracing();
    let input = WidgetStateMachine::new(
        MachineOptions::new().with_error_dismiss_after(Some(Duration::from_millis(1000))),
    );

    input.set_state(StateValue::Error);
    assert!(input.view().has_error);

    tokio::time::sleep(ms(990)).await;
    assert_eq!(input.state(), StateValue::Error);

    tokio::time::sleep(ms(20)).await;
    assert_eq!(input.state(), StateValue::Idle);
    assert!(!input.has_recovery_timer());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_loading_then_error() {
    init_tracing();
    let (scope, provider) = monitored_scope();
    let button = WidgetStateMachine::in_scope(&scope, MachineOptions::new());
    let finished = finished_log(&button);

    button.set_state(StateValue::Loading);
    tokio::time::sleep(ms(5)).await;
    button.set_state(StateValue::Error);

    tokio::time::sleep(ms(400)).await;
    assert_eq!(button.state(), StateValue::Error);
    // Only the surviving transition completes and is recorded.
    assert_eq!(
        *finished.lock(),
        vec![StateChange::new(StateValue::Loading, StateValue::Error)]
    );
    assert_eq!(provider.metrics().transition_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_standalone_and_shared_agree_on_state() {
    init_tracing();
    let (scope, _provider) = monitored_scope();
    let shared = WidgetStateMachine::in_scope(&scope, MachineOptions::new());
    let standalone = WidgetStateMachine::in_scope(&ContextScope::root(), MachineOptions::new());
    assert!(shared.is_shared());
    assert!(!standalone.is_shared());

    let trace = |machine: &WidgetStateMachine| {
        let log = Arc::new(Mutex::new(Vec::new()));
        let clone = log.clone();
        machine
            .state_changed()
            .connect(move |change| clone.lock().push(*change));
        log
    };
    let shared_log = trace(&shared);
    let standalone_log = trace(&standalone);

    for machine in [&shared, &standalone] {
        machine.set_state(StateValue::Loading);
        machine.set_state_named("bogus");
        machine.set_state(StateValue::Success);
    }
    tokio::time::sleep(ms(3100)).await;
    for machine in [&shared, &standalone] {
        machine.set_state(StateValue::Pending);
    }

    assert_eq!(shared.state(), standalone.state());
    assert_eq!(*shared_log.lock(), *standalone_log.lock());
    assert_eq!(
        *shared_log.lock(),
        vec![
            StateChange::new(StateValue::Idle, StateValue::Loading),
            StateChange::new(StateValue::Loading, StateValue::Success),
            StateChange::new(StateValue::Success, StateValue::Idle),
            StateChange::new(StateValue::Idle, StateValue::Pending),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_idempotent_set_state_never_counts() {
    let (scope, provider) = monitored_scope();
    let card = WidgetStateMachine::in_scope(&scope, MachineOptions::new());

    for _ in 0..5 {
        card.set_state(StateValue::Idle);
    }
    tokio::time::sleep(ms(1000)).await;
    assert_eq!(provider.metrics().transition_count, 0);
    assert!(!provider.is_transitioning());
}

#[tokio::test(start_paused = true)]
async fn test_metrics_stay_zero_without_monitoring() {
    let scope = ContextScope::root();
    let provider = scope.provide(StateProvider::new(ProviderOptions::new()));
    let card = WidgetStateMachine::in_scope(&scope, MachineOptions::new());

    card.set_state(StateValue::Loading);
    tokio::time::sleep(ms(400)).await;
    card.set_state(StateValue::Idle);
    tokio::time::sleep(ms(400)).await;

    assert_eq!(provider.metrics(), statekit::PerformanceMetrics::default());
}
