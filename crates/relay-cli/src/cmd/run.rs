use super::actions::print_active;
use super::Ctx;
use crate::output::print_json;
use anyhow::Result;
use relay_core::{ActionId, Intent};

/// Validate, run the staged plan to completion, then report what was sent
/// and what is active afterwards.
pub fn run(ctx: &Ctx, intent: Intent, id: ActionId) -> Result<()> {
    let host = ctx.host()?;

    match intent {
        Intent::Activate => host.engine.activate(id)?,
        Intent::Deactivate => host.engine.deactivate(id)?,
    }
    let name = host
        .engine
        .action(id)
        .map(|a| a.name.clone())
        .unwrap_or_else(|| format!("action {id}"));
    tracing::info!(%intent, action_id = id, "waiting for panel automation");
    host.settle()?;

    let sent = host.sim.dispatched();
    let active = host.engine.active_actions();

    if ctx.json {
        return print_json(&serde_json::json!({
            "intent": intent,
            "action_id": id,
            "name": name,
            "sent": sent,
            "active": active,
        }));
    }

    let verb = match intent {
        Intent::Activate => "Activated",
        Intent::Deactivate => "Deactivated",
    };
    println!("{verb} {name} [{id}]");
    for call in &sent {
        println!("  {} <- {}", call.panel.name, call.event);
    }
    println!();
    print_active(&active);
    Ok(())
}
