use super::Ctx;
use crate::output::{print_json, print_table};
use anyhow::Result;
use relay_core::{ActionId, ExecutionPlan, Intent, StageStep};
use std::time::Duration;

/// Print the stages a request would run, with the callback each one sends.
/// Nothing is validated or executed.
pub fn run(ctx: &Ctx, intent: Intent, id: ActionId) -> Result<()> {
    let host = ctx.host()?;
    let config = &host.config;
    let plan = ExecutionPlan::build(intent, id, &config.timing);

    let mut at = Duration::ZERO;
    let mut rows = Vec::with_capacity(plan.stages.len());
    for stage in &plan.stages {
        at += stage.delay;
        let (panel, event) = match stage.step {
            StageStep::OpenPanel => (config.panels.actions.as_str(), None),
            StageStep::SelectTab => (
                config.panels.actions.as_str(),
                Some(config.callbacks.select_tab.render(id)?),
            ),
            StageStep::SelectRow => {
                let template = match intent {
                    Intent::Activate => &config.callbacks.activate_row,
                    Intent::Deactivate => &config.callbacks.deactivate_row,
                };
                (config.panels.actions.as_str(), Some(template.render(id)?))
            }
            StageStep::ConfirmYes => (
                config.panels.confirm.as_str(),
                Some(config.callbacks.confirm_yes.render(id)?),
            ),
        };
        rows.push((stage.step, at, panel.to_string(), event));
    }

    if ctx.json {
        let stages = rows
            .iter()
            .map(|(step, at, panel, event)| {
                serde_json::json!({
                    "step": step.as_str(),
                    "at_ms": at.as_millis() as u64,
                    "panel": panel,
                    "event": event,
                })
            })
            .collect::<Vec<_>>();
        return print_json(&serde_json::json!({
            "intent": intent,
            "action_id": id,
            "stages": stages,
        }));
    }

    let table = rows
        .into_iter()
        .map(|(step, at, panel, event)| {
            vec![
                format!("+{}ms", at.as_millis()),
                step.as_str().to_string(),
                panel,
                event.map(|e| e.to_string()).unwrap_or_else(|| "show".to_string()),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&["AT", "STAGE", "PANEL", "CALLBACK"], &table);
    Ok(())
}
