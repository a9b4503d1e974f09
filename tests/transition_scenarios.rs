//! End-to-end transition scenarios against an in-memory state registry.

use futures_util::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stillwater::effect::BoxedEffect;
use stillwater::prelude::*;
use tokio::sync::oneshot;
use waypoint::builder::{StateBuilder, StateRegistry};
use waypoint::core::{MatchCriteria, ParamSpec, RecordedOutcome};
use waypoint::hooks::{Callback, HookError, HookOptions, HookPhase, HookResult};
use waypoint::resolve::{resolved, Locals, ResolveDeclaration, ResolveError, ResolvedData};
use waypoint::trace::{TraceEvent, Tracer};
use waypoint::transition::{RejectionCause, RejectionKind, TargetState, TransitionService};
use waypoint::{params, RouterConfig};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Callback appending `label:state` to the log.
fn record(log: &Log, label: &'static str) -> Callback {
    let log = Arc::clone(log);
    Callback::<()>::new(move |ctx| {
        let state = ctx.state.map(|s| s.name().to_string()).unwrap_or_default();
        log.lock().unwrap().push(format!("{label}:{state}"));
        pure(HookResult::Continue).boxed()
    })
}

fn answer(result: HookResult) -> Callback {
    Callback::<()>::new(move |_| pure(result.clone()).boxed())
}

/// Resolve factory appending its label to the log when it runs.
fn logged(
    log: &Log,
    label: &'static str,
) -> impl Fn(Locals) -> BoxedEffect<ResolvedData, ResolveError, ()> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |_| {
        log.lock().unwrap().push(label.to_string());
        pure(resolved(label)).boxed()
    }
}

fn target(state: &str) -> TargetState {
    TargetState::new(state, params!())
}

/// `a.b.c` and `x.y.z` chains, each state logging its own lifecycle callbacks.
fn two_chains(log: &Log) -> StateRegistry {
    let registry: StateRegistry = StateRegistry::new();
    for name in ["a", "a.b", "a.b.c", "a.b.d", "x", "x.y", "x.y.z"] {
        registry
            .register(
                StateBuilder::new(name)
                    .on_enter(record(log, "own-enter"))
                    .on_exit(record(log, "own-exit"))
                    .on_retain(record(log, "own-retain")),
            )
            .unwrap();
    }
    registry
}

#[tokio::test]
async fn exits_leaf_first_then_enters_root_first() {
    let log = new_log();
    let service = TransitionService::new(two_chains(&log), RouterConfig::default());
    service.go(target("a.b.c"), &()).await.unwrap();
    log.lock().unwrap().clear();

    service.on_exit(MatchCriteria::any(), record(&log, "exit"), HookOptions::default());
    service.on_enter(MatchCriteria::any(), record(&log, "enter"), HookOptions::default());
    let state = service.go(target("x.y.z"), &()).await.unwrap();

    assert_eq!(state.name(), "x.y.z");
    assert_eq!(
        entries(&log),
        vec![
            "exit:a.b.c",
            "own-exit:a.b.c",
            "exit:a.b",
            "own-exit:a.b",
            "exit:a",
            "own-exit:a",
            "enter:x",
            "own-enter:x",
            "enter:x.y",
            "own-enter:x.y",
            "enter:x.y.z",
            "own-enter:x.y.z",
        ]
    );
}

#[tokio::test]
async fn retained_states_run_on_retain_root_first() {
    let log = new_log();
    let service = TransitionService::new(two_chains(&log), RouterConfig::default());
    service.go(target("a.b.c"), &()).await.unwrap();
    log.lock().unwrap().clear();

    service.on_retain(MatchCriteria::any(), record(&log, "retain"), HookOptions::default());
    service.go(target("a.b.d"), &()).await.unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "own-exit:a.b.c",
            "retain:a",
            "own-retain:a",
            "retain:a.b",
            "own-retain:a.b",
            "own-enter:a.b.d",
        ]
    );
}

#[tokio::test]
async fn phases_run_in_pipeline_order() {
    let log = new_log();
    let service = TransitionService::new(two_chains(&log), RouterConfig::default());
    let options = HookOptions::default;
    service.on_success(MatchCriteria::any(), record(&log, "success"), options());
    service.on_finish(MatchCriteria::any(), record(&log, "finish"), options());
    service.on(MatchCriteria::any(), record(&log, "on"), options());
    service.on_start(MatchCriteria::any(), record(&log, "start"), options());
    service.on_before(MatchCriteria::any(), record(&log, "before"), options());

    service.go(target("x"), &()).await.unwrap();

    assert_eq!(
        entries(&log),
        vec!["before:", "start:", "on:", "own-enter:x", "finish:", "success:"]
    );
}

#[tokio::test]
async fn before_hook_rejection_stops_everything() {
    let log = new_log();
    let service = TransitionService::new(two_chains(&log), RouterConfig::default());
    service.on_before(
        MatchCriteria::any().to("x.**"),
        answer(HookResult::reject("not allowed")),
        HookOptions::default(),
    );
    service.on_start(MatchCriteria::any(), record(&log, "start"), HookOptions::default());

    let transition = service.create(target("x.y")).unwrap();
    let rejection = transition.run(&()).await.unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::Rejected);
    assert_eq!(rejection.message, "not allowed");
    assert!(entries(&log).is_empty());
    assert_eq!(transition.promise().await.unwrap().unwrap_err(), rejection);
    assert!(service.current_state().is_none());
}

#[tokio::test]
async fn suspending_before_hook_is_an_error() {
    let log = new_log();
    let service = TransitionService::new(two_chains(&log), RouterConfig::default());
    service.on_before(
        MatchCriteria::any(),
        Callback::new(|_| {
            from_async(|_: &()| async {
                std::future::pending::<()>().await;
                Ok::<_, HookError>(HookResult::Continue)
            })
            .boxed()
        }),
        HookOptions::default(),
    );

    let rejection = service.go(target("x"), &()).await.unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::Error);
    assert_eq!(
        rejection.cause,
        Some(RejectionCause::Hook(HookError::NotSynchronous {
            phase: HookPhase::OnBefore
        }))
    );
}

#[tokio::test]
async fn cancelling_hook_aborts() {
    let log = new_log();
    let service = TransitionService::new(two_chains(&log), RouterConfig::default());
    service.on(MatchCriteria::any(), answer(HookResult::Cancel), HookOptions::default());

    let rejection = service.go(target("a"), &()).await.unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::Aborted);
    assert!(entries(&log).is_empty());
    assert_eq!(service.history().last().unwrap().outcome, RecordedOutcome::Aborted);
}

#[tokio::test]
async fn navigating_to_current_position_is_ignored() {
    let log = new_log();
    let service = TransitionService::new(two_chains(&log), RouterConfig::default());
    service.go(target("a.b"), &()).await.unwrap();
    log.lock().unwrap().clear();
    service.on_start(MatchCriteria::any(), record(&log, "start"), HookOptions::default());

    let rejection = service.go(target("a.b"), &()).await.unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::Ignored);
    assert!(entries(&log).is_empty());
    assert_eq!(service.current_state().unwrap().name(), "a.b");
    assert_eq!(service.history().last().unwrap().outcome, RecordedOutcome::Ignored);
}

#[tokio::test]
async fn redirect_runs_a_new_transition_from_the_same_origin() {
    let registry: StateRegistry = StateRegistry::new();
    for name in ["home", "login", "admin"] {
        registry.register(StateBuilder::new(name)).unwrap();
    }
    let service = TransitionService::new(registry, RouterConfig::default());
    service.go(target("home"), &()).await.unwrap();

    service.on_start(
        MatchCriteria::any().to("admin"),
        answer(HookResult::redirect(target("login"))),
        HookOptions::default(),
    );
    let seen = new_log();
    let seen_in = Arc::clone(&seen);
    service.on_enter(
        MatchCriteria::any().to("login"),
        Callback::new(move |ctx| {
            let transition = ctx.transition;
            seen_in.lock().unwrap().push(format!(
                "from={} previous_to={}",
                transition.from().map_or("", |s| s.name()),
                transition.previous().map_or("", |p| p.to().name()),
            ));
            pure(HookResult::Continue).boxed()
        }),
        HookOptions::default(),
    );

    let first = service.create(target("admin")).unwrap();
    let result = first.run(&()).await.unwrap();

    assert_eq!(result.name(), "login");
    assert_eq!(entries(&seen), vec!["from=home previous_to=admin"]);
    assert_eq!(
        first.promise().await.unwrap().unwrap_err().kind,
        RejectionKind::Redirected { to: "login".into() }
    );
    assert_eq!(first.redirects().await.unwrap().unwrap().name(), "login");
    assert_eq!(service.history().visited(), vec!["home", "login"]);
}

#[tokio::test]
async fn endless_redirects_are_cut_off() {
    let registry: StateRegistry = StateRegistry::new();
    registry
        .register(StateBuilder::new("loop").param(ParamSpec::new("n")))
        .unwrap();
    let service = TransitionService::new(registry, RouterConfig::default().with_max_redirects(3));
    service.on_start(
        MatchCriteria::any(),
        Callback::new(|ctx| {
            let n = ctx.transition.target().params.get("n").and_then(|v| v.as_u64()).unwrap_or(0);
            pure(HookResult::redirect(TargetState::new("loop", params! { "n" => n + 1 }))).boxed()
        }),
        HookOptions::default(),
    );

    let rejection = service.go(target("loop"), &()).await.unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::Error);
    assert!(rejection.message.contains("too many redirects"));
    let outcomes: Vec<_> = service
        .history()
        .records()
        .iter()
        .map(|r| r.outcome.clone())
        .collect();
    assert_eq!(outcomes.len(), 4);
    assert!(matches!(outcomes[3], RecordedOutcome::Error(_)));
}

#[tokio::test]
async fn newer_transition_supersedes_a_running_one() {
    let registry: StateRegistry = StateRegistry::new();
    for name in ["slow", "fast"] {
        registry.register(StateBuilder::new(name)).unwrap();
    }
    let service = TransitionService::new(registry, RouterConfig::default());
    let (release, gate) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate)));
    service.on_start(
        MatchCriteria::any().to("slow"),
        Callback::new(move |_| {
            let gate = gate.lock().unwrap().take();
            from_async(move |_: &()| async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok::<_, HookError>(HookResult::Continue)
            })
            .boxed()
        }),
        HookOptions::default(),
    );
    let errors = new_log();
    service.on_error(MatchCriteria::any(), record(&errors, "error"), HookOptions::default());
    let handled = Arc::new(AtomicUsize::new(0));
    let handled_in = Arc::clone(&handled);
    service.set_default_error_handler(move |_| {
        handled_in.fetch_add(1, Ordering::SeqCst);
    });

    let slow = service.create(target("slow")).unwrap();
    let mut running = slow.run(&());
    assert!((&mut running).now_or_never().is_none());
    assert!(slow.is_active());

    let fast = service.go(target("fast"), &()).await.unwrap();
    assert!(!slow.is_active());
    release.send(()).unwrap();
    let rejection = running.await.unwrap_err();

    assert_eq!(fast.name(), "fast");
    assert_eq!(rejection.kind, RejectionKind::Superseded);
    assert_eq!(service.current_state().unwrap().name(), "fast");
    assert_eq!(entries(&errors), vec!["error:"]);
    assert_eq!(handled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn superseded_transition_cannot_redirect() {
    let registry: StateRegistry = StateRegistry::new();
    for name in ["slow", "fast", "login"] {
        registry.register(StateBuilder::new(name)).unwrap();
    }
    let service = TransitionService::new(registry, RouterConfig::default());
    let (release, gate) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate)));
    service.on_start(
        MatchCriteria::any().to("slow"),
        Callback::new(move |_| {
            let gate = gate.lock().unwrap().take();
            from_async(move |_: &()| async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok::<_, HookError>(HookResult::Redirect(target("login")))
            })
            .boxed()
        }),
        HookOptions::default(),
    );

    let slow = service.create(target("slow")).unwrap();
    let mut running = slow.run(&());
    assert!((&mut running).now_or_never().is_none());

    service.go(target("fast"), &()).await.unwrap();
    release.send(()).unwrap();
    let rejection = running.await.unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::Superseded);
    assert_eq!(service.current_state().unwrap().name(), "fast");
    assert_eq!(slow.redirects().await.unwrap().unwrap_err().kind, RejectionKind::Superseded);
    assert_eq!(service.history().visited(), vec!["fast"]);
    assert_eq!(service.history().last().unwrap().outcome, RecordedOutcome::Superseded);
}

#[tokio::test]
async fn panic_inside_hook_effect_is_an_error() {
    let log = new_log();
    let service = TransitionService::new(two_chains(&log), RouterConfig::default());
    service.on_enter(
        MatchCriteria::any().to("x"),
        Callback::new(|_| {
            from_fn(|_: &()| -> Result<HookResult, HookError> { panic!("hook exploded") }).boxed()
        }),
        HookOptions::default(),
    );
    let errors = new_log();
    service.on_error(MatchCriteria::any(), record(&errors, "error"), HookOptions::default());

    let rejection = service.go(target("x"), &()).await.unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::Error);
    assert_eq!(
        rejection.cause,
        Some(RejectionCause::Hook(HookError::Panicked {
            phase: HookPhase::OnEnter,
            message: "hook exploded".into()
        }))
    );
    assert_eq!(entries(&errors), vec!["error:"]);
    assert!(service.current_state().is_none());
}

#[tokio::test]
async fn panic_inside_resolve_factory_is_cached_as_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let registry: StateRegistry = StateRegistry::new();
    registry
        .register(StateBuilder::new("report").resolve(ResolveDeclaration::new(
            "totals",
            Vec::<String>::new(),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                from_fn(|_: &()| -> Result<ResolvedData, ResolveError> { panic!("division by zero") })
                    .boxed()
            },
        )))
        .unwrap();
    let service = TransitionService::new(registry, RouterConfig::default());

    let rejection = service.go(target("report"), &()).await.unwrap_err();

    assert_eq!(
        rejection.cause,
        Some(RejectionCause::Resolve(ResolveError::Panicked {
            name: "totals".into(),
            message: "division by zero".into()
        }))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resolve_failure_reaches_error_hooks() {
    let registry: StateRegistry = StateRegistry::new();
    registry
        .register(StateBuilder::new("account").resolve(ResolveDeclaration::new(
            "balance",
            Vec::<String>::new(),
            |_| fail(ResolveError::factory("ledger offline")).boxed(),
        )))
        .unwrap();
    let service = TransitionService::new(registry, RouterConfig::default());
    let causes = Arc::new(Mutex::new(Vec::new()));
    let causes_in = Arc::clone(&causes);
    service.on_error(
        MatchCriteria::any(),
        Callback::new(move |ctx| {
            if let Some(rejection) = ctx.error {
                causes_in.lock().unwrap().push(rejection.cause.clone());
            }
            pure(HookResult::Continue).boxed()
        }),
        HookOptions::default(),
    );

    let rejection = service.go(target("account"), &()).await.unwrap_err();

    let expected = ResolveError::Failed {
        name: "balance".into(),
        message: "ledger offline".into(),
    };
    assert_eq!(rejection.kind, RejectionKind::Error);
    assert_eq!(rejection.cause, Some(RejectionCause::Resolve(expected.clone())));
    assert_eq!(*causes.lock().unwrap(), vec![Some(RejectionCause::Resolve(expected))]);
    assert!(service.current_state().is_none());
}

#[tokio::test]
async fn unclaimed_failure_goes_to_default_handler() {
    let registry: StateRegistry = StateRegistry::new();
    registry.register(StateBuilder::new("vault")).unwrap();
    let service = TransitionService::new(registry, RouterConfig::default());
    service.on_enter(
        MatchCriteria::any(),
        Callback::new(|_| fail(HookError::failed("vault sealed")).boxed()),
        HookOptions::default(),
    );
    let handled = new_log();
    let handled_in = Arc::clone(&handled);
    service.set_default_error_handler(move |rejection| {
        handled_in.lock().unwrap().push(rejection.message.clone());
    });

    let rejection = service.go(target("vault"), &()).await.unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::Error);
    assert_eq!(entries(&handled), vec![rejection.message.clone()]);
}

#[tokio::test]
async fn shared_dependency_resolves_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let registry: StateRegistry = StateRegistry::new();
    registry
        .register(StateBuilder::new("app").resolve(ResolveDeclaration::new(
            "user",
            Vec::<String>::new(),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                pure(resolved("ada".to_string())).boxed()
            },
        )))
        .unwrap();
    registry
        .register(StateBuilder::new("app.profile").resolve(ResolveDeclaration::new(
            "profile",
            ["user"],
            |locals: Locals| {
                let user = locals.get::<String>("user").cloned().unwrap_or_default();
                pure(resolved(format!("profile of {user}"))).boxed()
            },
        )))
        .unwrap();
    let service = TransitionService::new(registry, RouterConfig::default());
    let seen = new_log();
    let seen_in = Arc::clone(&seen);
    service.on_enter(
        MatchCriteria::any().to("app.profile"),
        Callback::new(move |ctx| {
            for name in ["user", "profile"] {
                if let Some(value) = ctx.locals.get::<String>(name) {
                    seen_in.lock().unwrap().push(value.clone());
                }
            }
            pure(HookResult::Continue).boxed()
        })
        .with_deps(["user", "profile"]),
        HookOptions::default(),
    );
    let finished_in = Arc::clone(&seen);
    service.on_finish(
        MatchCriteria::any(),
        Callback::new(move |ctx| {
            if let Some(user) = ctx.locals.get::<String>("user") {
                finished_in.lock().unwrap().push(format!("finish with {user}"));
            }
            pure(HookResult::Continue).boxed()
        })
        .with_deps(["user"]),
        HookOptions::default(),
    );

    service.go(target("app.profile"), &()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        entries(&seen),
        vec!["ada", "profile of ada", "finish with ada"]
    );
}

#[tokio::test]
async fn dependency_cycle_rejects_with_the_cycle() {
    let registry: StateRegistry = StateRegistry::new();
    registry
        .register(
            StateBuilder::new("tangle")
                .resolve(ResolveDeclaration::new("a", ["b"], |_| pure(resolved(1u8)).boxed()))
                .resolve(ResolveDeclaration::new("b", ["a"], |_| pure(resolved(2u8)).boxed())),
        )
        .unwrap();
    let service = TransitionService::new(registry, RouterConfig::default());

    let rejection = service.go(target("tangle"), &()).await.unwrap_err();

    match rejection.cause {
        Some(RejectionCause::Resolve(ResolveError::Cycle { cycle })) => {
            assert!(cycle.contains(&"a".to_string()));
            assert!(cycle.contains(&"b".to_string()));
            assert_eq!(cycle.first(), cycle.last());
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[tokio::test]
async fn eager_resolves_run_before_any_state_is_entered() {
    let log = new_log();
    let registry: StateRegistry = StateRegistry::new();
    registry
        .register(
            StateBuilder::new("app")
                .resolve(ResolveDeclaration::new("settings", Vec::<String>::new(), logged(&log, "settings")).eager())
                .on_enter(record(&log, "enter")),
        )
        .unwrap();
    registry
        .register(
            StateBuilder::new("app.page")
                .resolve(ResolveDeclaration::new("page", Vec::<String>::new(), logged(&log, "page")))
                .on_enter(record(&log, "enter")),
        )
        .unwrap();
    let service = TransitionService::new(registry, RouterConfig::default());
    service.on(MatchCriteria::any(), record(&log, "on"), HookOptions::default());

    service.go(target("app.page"), &()).await.unwrap();

    assert_eq!(
        entries(&log),
        vec!["on:", "settings", "enter:app", "page", "enter:app.page"]
    );
}

#[tokio::test]
async fn inherit_copies_missing_params_from_origin() {
    let registry: StateRegistry = StateRegistry::new();
    registry
        .register(StateBuilder::new("org").param(ParamSpec::new("org")))
        .unwrap();
    registry.register(StateBuilder::new("org.settings")).unwrap();
    registry.register(StateBuilder::new("org.members")).unwrap();
    let service = TransitionService::new(registry, RouterConfig::default());
    service
        .go(TargetState::new("org.settings", params! { "org" => "acme" }), &())
        .await
        .unwrap();

    let inherited = TargetState::new("org.members", params!())
        .with_options(waypoint::TransitionOptions::default().inherit());
    service.go(inherited, &()).await.unwrap();

    assert_eq!(
        service.current_path().param_values(),
        params! { "org" => "acme" }
    );
}

#[tokio::test]
async fn traced_transition_reports_to_the_sink() {
    let registry: StateRegistry = StateRegistry::new();
    registry
        .register(StateBuilder::new("feed").resolve(ResolveDeclaration::new(
            "items",
            Vec::<String>::new(),
            |_| pure(resolved(3u32)).boxed(),
        )))
        .unwrap();
    registry.register(StateBuilder::new("quiet")).unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_in = Arc::clone(&events);
    let sink = move |event: &TraceEvent| events_in.lock().unwrap().push(event.clone());
    let tracer = Tracer::new(Some(Arc::new(sink)));
    let service = TransitionService::with_tracer(registry, RouterConfig::default(), tracer);

    service.go(target("quiet"), &()).await.unwrap();
    assert!(events.lock().unwrap().is_empty());

    let traced = TargetState::new("feed", params!())
        .with_options(waypoint::TransitionOptions::default().traced());
    service.go(traced, &()).await.unwrap();

    let events = events.lock().unwrap().clone();
    assert!(matches!(
        events.first(),
        Some(TraceEvent::TransitionStart { to, .. }) if to == "feed"
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, TraceEvent::ResolveEnd { name, ok: true, .. } if name == "items")));
    assert!(matches!(events.last(), Some(TraceEvent::TransitionSettled { .. })));
}
