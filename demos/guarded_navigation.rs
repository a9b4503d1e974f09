//! Guarded Navigation
//!
//! This example protects part of a state tree with transition hooks.
//!
//! Key concepts:
//! - States declared with `StateBuilder` and nested by dotted name
//! - An `onStart` hook that reads the environment and redirects to `login`
//! - An `onBefore` hook that rejects navigation into a frozen area
//! - A resolve shared by the entered state and an `onSuccess` hook
//!
//! Run with: cargo run --example guarded_navigation

use stillwater::prelude::*;
use waypoint::builder::{StateBuilder, StateRegistry};
use waypoint::core::{MatchCriteria, ParamSpec};
use waypoint::hooks::{Callback, HookError, HookOptions, HookResult};
use waypoint::resolve::{resolved, ResolveDeclaration};
use waypoint::{params, RouterConfig, TargetState, TransitionService};

// Environment every hook and resolve effect runs against
#[derive(Clone, Debug)]
struct Session {
    user: Option<String>,
}

fn registry() -> StateRegistry<Session> {
    let registry = StateRegistry::new();
    let states = [
        StateBuilder::new("home"),
        StateBuilder::new("login"),
        StateBuilder::new("admin").resolve(ResolveDeclaration::new(
            "operator",
            Vec::<String>::new(),
            |_| {
                from_fn(|session: &Session| {
                    session
                        .user
                        .clone()
                        .map(resolved)
                        .ok_or_else(|| waypoint::resolve::ResolveError::factory("no session"))
                })
                .boxed()
            },
        )),
        StateBuilder::new("admin.users").param(ParamSpec::new("page").with_default(1).dynamic()),
        StateBuilder::new("admin.billing"),
    ];
    for state in states {
        if let Err(err) = registry.register(state) {
            eprintln!("  [Registry] {err}");
        }
    }
    registry
}

fn install_guards(service: &TransitionService<Session>) {
    // Anonymous sessions are sent to the login page
    service.on_start(
        MatchCriteria::any().to("admin.**"),
        Callback::new(|_| {
            from_fn(|session: &Session| {
                Ok::<_, HookError>(match session.user {
                    Some(_) => HookResult::Continue,
                    None => HookResult::redirect(TargetState::new("login", params!())),
                })
            })
            .boxed()
        }),
        HookOptions::default(),
    );

    // Billing is frozen for everyone
    service.on_before(
        MatchCriteria::any().to("admin.billing"),
        Callback::new(|_| pure(HookResult::reject("billing is frozen")).boxed()),
        HookOptions::default(),
    );

    service.on_success(
        MatchCriteria::any().to("admin.**"),
        Callback::new(|ctx| {
            if let Some(user) = ctx.locals.get::<String>("operator") {
                println!("  [Hook] welcome back, {user}");
            }
            pure(HookResult::Continue).boxed()
        })
        .with_deps(["operator"]),
        HookOptions::default(),
    );
}

async fn navigate(service: &TransitionService<Session>, session: &Session, to: TargetState) {
    let name = to.state.clone();
    match service.go(to, session).await {
        Ok(state) => println!("  {name} -> now at '{}'", state.name()),
        Err(rejection) => println!("  {name} -> rejected: {rejection}"),
    }
}

#[tokio::main]
async fn main() {
    println!("=== Guarded Navigation ===\n");

    let service = TransitionService::new(registry(), RouterConfig::default());
    install_guards(&service);

    println!("Anonymous session:");
    let anonymous = Session { user: None };
    navigate(&service, &anonymous, TargetState::new("home", params!())).await;
    navigate(&service, &anonymous, TargetState::new("admin.users", params!())).await;

    println!("\nSigned-in session:");
    let signed_in = Session {
        user: Some("ada".to_string()),
    };
    navigate(&service, &signed_in, TargetState::new("admin.users", params! { "page" => 2 })).await;
    navigate(&service, &signed_in, TargetState::new("admin.users", params! { "page" => 3 })).await;
    navigate(&service, &signed_in, TargetState::new("admin.billing", params!())).await;

    println!("\nHistory:");
    for record in service.history().records() {
        println!("  #{} {:?} -> {}: {:?}", record.id, record.from, record.to, record.outcome);
    }
    println!("\nVisited: {:?}", service.history().visited());
}
