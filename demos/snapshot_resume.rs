//! Snapshot and Resume
//!
//! This example saves the current navigation position and restores it
//! into a fresh service, as an application would across restarts.
//!
//! Key concepts:
//! - Capturing a `PathSnapshot` from a running service
//! - JSON for readability, bincode for compactness
//! - Restoring validates every state against the registry
//! - Navigation continues from the restored position
//!
//! Run with: cargo run --example snapshot_resume

use waypoint::builder::{StateBuilder, StateRegistry};
use waypoint::checkpoint::CheckpointError;
use waypoint::core::ParamSpec;
use waypoint::{params, PathSnapshot, RouterConfig, TargetState, TransitionService};

fn registry() -> Result<StateRegistry, waypoint::builder::BuildError> {
    let registry: StateRegistry = StateRegistry::new();
    registry.register(StateBuilder::new("docs"))?;
    registry.register(StateBuilder::new("docs.section").param(ParamSpec::new("slug")))?;
    registry.register(
        StateBuilder::new("docs.section.page")
            .param(ParamSpec::new("page").with_default(1))
            .param(ParamSpec::new("anchor").dynamic()),
    )?;
    Ok(registry)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let registry = registry()?;

    println!("Session 1: reading the guide");
    let first = TransitionService::new(registry.clone(), RouterConfig::default());
    first
        .go(
            TargetState::new(
                "docs.section.page",
                params! { "slug" => "getting-started", "page" => 3, "anchor" => "install" },
            ),
            &(),
        )
        .await?;
    if let Some(state) = first.current_state() {
        println!("  at '{}' {}", state.name(), first.current_path().param_values());
    }

    let snapshot = PathSnapshot::capture(&first);
    let json = snapshot.to_json()?;
    let bytes = snapshot.to_bytes()?;
    println!("  [Snapshot] {} ({} bytes JSON, {} bytes binary)", snapshot.id, json.len(), bytes.len());

    println!("\nSession 2: resuming");
    let restored = PathSnapshot::from_bytes(&bytes)?;
    let second = TransitionService::new(registry.clone(), RouterConfig::default());
    restored.restore_into(&second)?;
    println!("  resumed at {:?}", second.current_state().map(|s| s.name().to_string()));

    second
        .go(
            TargetState::new("docs.section.page", params! { "slug" => "getting-started", "page" => 4 }),
            &(),
        )
        .await?;
    println!("  moved on to {}", second.current_path().param_values());

    println!("\nA snapshot taken against an older tree:");
    let mut stale = snapshot.clone();
    stale.nodes[1].state = "docs.chapter".to_string();
    match stale.restore(&registry) {
        Err(CheckpointError::UnknownState { name }) => println!("  refused: unknown state '{name}'"),
        other => println!("  unexpected: {other:?}"),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    println!("=== Snapshot and Resume ===\n");
    if let Err(err) = run().await {
        eprintln!("error: {err}");
    }
}
