use super::Ctx;
use crate::output::{print_json, print_table};
use anyhow::Result;

// ---------------------------------------------------------------------------
// actions
// ---------------------------------------------------------------------------

pub fn list(ctx: &Ctx) -> Result<()> {
    let host = ctx.host()?;
    let actions = host.engine.all_actions();

    if ctx.json {
        return print_json(&actions);
    }
    if actions.is_empty() {
        println!("No company actions in the catalog.");
        return Ok(());
    }

    let rows = actions
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.name.clone(),
                a.cost.to_string(),
                a.description.clone(),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&["ID", "NAME", "COST", "DESCRIPTION"], &rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// active
// ---------------------------------------------------------------------------

pub fn active(ctx: &Ctx) -> Result<()> {
    let host = ctx.host()?;
    let active = host.engine.active_actions();

    if ctx.json {
        return print_json(&active);
    }
    print_active(&active);
    Ok(())
}

pub(crate) fn print_active(active: &[relay_core::ActiveActionState]) {
    if active.is_empty() {
        println!("No company actions are active.");
        return;
    }
    let rows = active
        .iter()
        .map(|a| {
            vec![
                (a.slot_index + 1).to_string(),
                a.id.to_string(),
                a.name.clone(),
                a.time_remaining.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&["SLOT", "ID", "NAME", "REMAINING"], &rows);
}
