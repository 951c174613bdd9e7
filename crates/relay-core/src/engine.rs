use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::active::ActiveStateReader;
use crate::catalog::Catalog;
use crate::config::{CallbackSet, PanelNames, RelayConfig, Timing};
use crate::error::{RelayError, Result, ScheduleError};
use crate::scheduler::TickScheduler;
use crate::surface::{resolve_visible, CompanyState, Surface};
use crate::types::{ActionDefinition, ActionId, ActiveActionState, Intent, SLOT_COUNT};

// ─── Plans ────────────────────────────────────────────────────────────────

/// What a single stage does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStep {
    /// Show the actions panel unless it is already visible.
    OpenPanel,
    /// Switch the actions panel to its actions tab.
    SelectTab,
    /// Pick the target row with the intent's callback.
    SelectRow,
    /// Answer "yes" on the confirmation panel.
    ConfirmYes,
}

impl StageStep {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStep::OpenPanel => "open_panel",
            StageStep::SelectTab => "select_tab",
            StageStep::SelectRow => "select_row",
            StageStep::ConfirmYes => "confirm_yes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub step: StageStep,
    /// Wait before running, measured from the previous stage's completion.
    pub delay: Duration,
}

/// The ordered stages that click through the panel for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub intent: Intent,
    pub action_id: ActionId,
    pub stages: Vec<Stage>,
}

impl ExecutionPlan {
    pub fn build(intent: Intent, action_id: ActionId, timing: &Timing) -> Self {
        let mut stages = vec![
            Stage {
                step: StageStep::OpenPanel,
                delay: timing.open(),
            },
            Stage {
                step: StageStep::SelectTab,
                delay: timing.select_tab(),
            },
            Stage {
                step: StageStep::SelectRow,
                delay: timing.select_row(),
            },
        ];
        if intent == Intent::Activate {
            stages.push(Stage {
                step: StageStep::ConfirmYes,
                delay: timing.confirm(),
            });
        }
        Self {
            intent,
            action_id,
            stages,
        }
    }
}

// ─── Plan execution ───────────────────────────────────────────────────────

/// Counts a plan as outstanding until the last owner of it drops.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    /// Claim the engine for a plan only if no other plan is outstanding.
    fn acquire_exclusive(count: &Arc<AtomicUsize>) -> Option<Self> {
        count
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(count.clone()))
    }

    fn acquire_shared(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        Self(count.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

struct Outstanding {
    plan: ExecutionPlan,
    next: usize,
    _guard: InFlightGuard,
}

struct PlanRunner {
    surface: Arc<dyn Surface>,
    scheduler: Arc<dyn TickScheduler>,
    panels: PanelNames,
    callbacks: CallbackSet,
    halt_on_failure: bool,
}

impl PlanRunner {
    /// Queue the next stage of `outstanding`. Each stage re-queues its
    /// successor after it runs, so delays chain from completion.
    fn schedule_next(self: &Arc<Self>, outstanding: Outstanding) -> std::result::Result<(), ScheduleError> {
        let Some(stage) = outstanding.plan.stages.get(outstanding.next).cloned() else {
            debug!(
                intent = %outstanding.plan.intent,
                action_id = outstanding.plan.action_id,
                "plan complete"
            );
            return Ok(());
        };

        let runner = Arc::clone(self);
        self.scheduler.run_after(
            stage.delay,
            Box::new(move || runner.run_and_continue(stage, outstanding)),
        )
    }

    fn run_and_continue(self: Arc<Self>, stage: Stage, mut outstanding: Outstanding) {
        let plan = &outstanding.plan;
        if let Err(e) = self.run_stage(plan, stage.step) {
            warn!(
                stage = stage.step.as_str(),
                intent = %plan.intent,
                action_id = plan.action_id,
                error = %e,
                "stage skipped"
            );
            if self.halt_on_failure {
                warn!(action_id = plan.action_id, "halting plan after failed stage");
                return;
            }
        }

        outstanding.next += 1;
        if let Err(e) = self.schedule_next(outstanding) {
            error!(error = %e, "could not queue next stage");
        }
    }

    fn run_stage(&self, plan: &ExecutionPlan, step: StageStep) -> Result<()> {
        match step {
            StageStep::OpenPanel => {
                let name = &self.panels.actions;
                if let Some(handle) = self.surface.resolve(name) {
                    if self.surface.is_visible(&handle) {
                        info!(panel = %name, "actions panel already open, skipping show");
                        return Ok(());
                    }
                }
                self.surface.show(name)?;
                info!(panel = %name, "opened actions panel");
            }
            StageStep::SelectTab => {
                let handle = resolve_visible(self.surface.as_ref(), &self.panels.actions)?;
                let event = self.callbacks.select_tab.render(plan.action_id)?;
                self.surface.dispatch(&handle, &event);
                info!(panel = %handle.name, %event, "selected actions tab");
            }
            StageStep::SelectRow => {
                let handle = resolve_visible(self.surface.as_ref(), &self.panels.actions)?;
                let template = match plan.intent {
                    Intent::Activate => &self.callbacks.activate_row,
                    Intent::Deactivate => &self.callbacks.deactivate_row,
                };
                let event = template.render(plan.action_id)?;
                self.surface.dispatch(&handle, &event);
                info!(
                    panel = %handle.name,
                    intent = %plan.intent,
                    action_id = plan.action_id,
                    %event,
                    "selected action row"
                );
            }
            StageStep::ConfirmYes => {
                let handle = resolve_visible(self.surface.as_ref(), &self.panels.confirm)?;
                let event = self.callbacks.confirm_yes.render(plan.action_id)?;
                self.surface.dispatch(&handle, &event);
                info!(panel = %handle.name, %event, "confirmed yes");
            }
        }
        Ok(())
    }
}

// ─── ActionEngine ─────────────────────────────────────────────────────────

/// Collaborators the engine is built from.
pub struct EngineDeps {
    pub surface: Arc<dyn Surface>,
    pub state: Arc<dyn CompanyState>,
    pub scheduler: Arc<dyn TickScheduler>,
    pub catalog: Arc<Catalog>,
}

/// Validates requests and schedules the staged panel automation.
///
/// `activate` and `deactivate` return as soon as validation passes and the
/// first stage is queued; the clicks themselves happen on later ticks and
/// are fire-and-forget. Failures in those stages are logged, never returned.
pub struct ActionEngine {
    state: Arc<dyn CompanyState>,
    catalog: Arc<Catalog>,
    reader: ActiveStateReader,
    runner: Arc<PlanRunner>,
    timing: Timing,
    exclusive: bool,
    in_flight: Arc<AtomicUsize>,
}

impl ActionEngine {
    pub fn new(deps: EngineDeps, config: &RelayConfig) -> Self {
        let reader = ActiveStateReader::new(
            deps.state.clone(),
            deps.catalog.clone(),
            Arc::new(config.status_map.clone()),
        );
        let runner = Arc::new(PlanRunner {
            surface: deps.surface,
            scheduler: deps.scheduler,
            panels: config.panels.clone(),
            callbacks: config.callbacks.clone(),
            halt_on_failure: config.engine.halt_on_stage_failure,
        });
        Self {
            state: deps.state,
            catalog: deps.catalog,
            reader,
            runner,
            timing: config.timing.clone(),
            exclusive: config.engine.exclusive_plans,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn all_actions(&self) -> Vec<ActionDefinition> {
        self.catalog.all()
    }

    pub fn active_actions(&self) -> Vec<ActiveActionState> {
        self.reader.active_actions()
    }

    pub fn action(&self, id: ActionId) -> Option<&ActionDefinition> {
        self.catalog.get(id)
    }

    /// Whether any plan still has stages queued.
    pub fn is_busy(&self) -> bool {
        self.plans_in_flight() > 0
    }

    /// Plans started and not yet finished or halted.
    pub fn plans_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn activate(&self, id: ActionId) -> Result<()> {
        self.check_identity(Intent::Activate)?;
        let action = self.catalog.get(id).ok_or(RelayError::ActionNotFound(id))?;

        let active = self.reader.active_actions();
        if active.iter().any(|a| a.id == id) {
            return Err(RelayError::AlreadyActive(action.name.clone()));
        }
        if active.len() >= SLOT_COUNT {
            return Err(RelayError::CapacityReached(SLOT_COUNT));
        }

        self.start(ExecutionPlan::build(Intent::Activate, id, &self.timing))
    }

    pub fn deactivate(&self, id: ActionId) -> Result<()> {
        self.check_identity(Intent::Deactivate)?;

        if !self.reader.active_actions().iter().any(|a| a.id == id) {
            return Err(RelayError::NotActive(id));
        }

        self.start(ExecutionPlan::build(Intent::Deactivate, id, &self.timing))
    }

    fn check_identity(&self, intent: Intent) -> Result<()> {
        if self.state.local_player().is_none() {
            return Err(RelayError::NotLoggedIn(intent));
        }
        match self.state.company() {
            Some(company) if company.has_membership => Ok(()),
            _ => Err(RelayError::NotInCompany(intent)),
        }
    }

    fn start(&self, plan: ExecutionPlan) -> Result<()> {
        let guard = if self.exclusive {
            InFlightGuard::acquire_exclusive(&self.in_flight).ok_or(RelayError::PlanInFlight)?
        } else {
            InFlightGuard::acquire_shared(&self.in_flight)
        };

        let intent = plan.intent;
        let action_id = plan.action_id;
        let stages = plan.stages.len();
        self.runner
            .schedule_next(Outstanding {
                plan,
                next: 0,
                _guard: guard,
            })
            .map_err(|e| {
                error!(%intent, action_id, error = %e, "failed to start panel automation");
                RelayError::from(e)
            })?;

        info!(%intent, action_id, stages, "queued panel automation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::scheduler::FrameScheduler;
    use crate::sim::SimSurface;
    use crate::types::{CallbackEvent, CallbackValue};

    const FRAME: Duration = Duration::from_millis(16);

    struct Harness {
        sim: Arc<SimSurface>,
        sched: Arc<FrameScheduler>,
        engine: ActionEngine,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(RelayConfig::default())
        }

        fn with_config(config: RelayConfig) -> Self {
            let sim = Arc::new(SimSurface::default());
            let sched = Arc::new(FrameScheduler::new());
            let engine = ActionEngine::new(
                EngineDeps {
                    surface: sim.clone(),
                    state: sim.clone(),
                    scheduler: sched.clone(),
                    catalog: Arc::new(Catalog::builtin()),
                },
                &config,
            );
            Self { sim, sched, engine }
        }

        fn settle(&self) {
            assert!(self.sched.run_until_idle(FRAME, Duration::from_secs(5)));
        }

        fn sent(&self) -> Vec<(String, CallbackEvent)> {
            self.sim
                .dispatched()
                .into_iter()
                .map(|c| (c.panel.name, c.event))
                .collect()
        }
    }

    #[test]
    fn plans_have_expected_stages() {
        let timing = Timing::default();
        let activate = ExecutionPlan::build(Intent::Activate, 5, &timing);
        let steps: Vec<_> = activate.stages.iter().map(|s| s.step).collect();
        assert_eq!(
            steps,
            vec![
                StageStep::OpenPanel,
                StageStep::SelectTab,
                StageStep::SelectRow,
                StageStep::ConfirmYes
            ]
        );
        assert_eq!(activate.stages[1].delay, Duration::from_millis(250));

        let deactivate = ExecutionPlan::build(Intent::Deactivate, 5, &timing);
        assert_eq!(deactivate.stages.len(), 3);
    }

    #[test]
    fn activate_unknown_id_schedules_nothing() {
        let h = Harness::new();
        for id in [32, 100, u32::MAX] {
            let err = h.engine.activate(id).unwrap_err();
            assert!(matches!(err, RelayError::ActionNotFound(x) if x == id));
        }
        assert!(h.sched.is_idle());
        assert!(!h.engine.is_busy());
    }

    #[test]
    fn precondition_failures_are_synchronous() {
        let h = Harness::new();
        h.sim.set_logged_in(false);
        let err = h.engine.activate(5).unwrap_err();
        assert_eq!(err.to_string(), "you must be logged in to activate company actions");

        h.sim.set_logged_in(true);
        h.sim.set_membership(false);
        let err = h.engine.deactivate(5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "you must belong to a company to deactivate company actions"
        );

        h.sim.leave_company();
        assert!(matches!(
            h.engine.activate(5),
            Err(RelayError::NotInCompany(Intent::Activate))
        ));
        assert!(h.sched.is_idle());
    }

    #[test]
    fn activate_already_active_is_rejected() {
        let h = Harness::new();
        h.sim.force_active(0, 5, 600);
        let err = h.engine.activate(5).unwrap_err();
        assert_eq!(err.to_string(), "In Control III is already active");
        assert!(h.sched.is_idle());
    }

    #[test]
    fn third_activation_hits_capacity_for_any_pair() {
        for (a, b) in [(0, 1), (5, 9), (30, 31)] {
            let h = Harness::new();
            h.sim.force_active(0, a, 600);
            h.sim.force_active(1, b, 600);
            let err = h.engine.activate(12).unwrap_err();
            assert!(matches!(err, RelayError::CapacityReached(2)));
            assert!(h.sched.is_idle());
        }
    }

    #[test]
    fn deactivate_inactive_is_rejected() {
        let h = Harness::new();
        h.sim.force_active(0, 9, 600);
        for id in [0, 5, 31] {
            assert!(matches!(h.engine.deactivate(id), Err(RelayError::NotActive(x)) if x == id));
        }
        assert!(h.sched.is_idle());
    }

    #[test]
    fn activate_sends_tab_row_confirm_in_order() {
        let h = Harness::new();
        h.engine.activate(5).unwrap();
        assert!(h.sent().is_empty(), "nothing is sent before the first tick");
        assert!(h.engine.is_busy());

        h.settle();

        assert_eq!(
            h.sent(),
            vec![
                (
                    "FreeCompany".to_string(),
                    CallbackEvent::new(1, vec![CallbackValue::Int(0), CallbackValue::Int(4)])
                ),
                (
                    "FreeCompany".to_string(),
                    CallbackEvent::new(3, vec![CallbackValue::Int(0), CallbackValue::UInt(5)])
                ),
                (
                    "SelectYesno".to_string(),
                    CallbackEvent::new(1, vec![CallbackValue::Int(0)])
                ),
            ]
        );
        assert!(!h.engine.is_busy());

        let active = h.engine.active_actions();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 5);
    }

    #[test]
    fn stage_delays_chain_from_previous_stage() {
        let h = Harness::new();
        h.engine.activate(5).unwrap();

        // open at 0ms (first tick), tab 250ms later, row 150ms later, confirm 100ms later
        h.sched.tick(Duration::ZERO);
        assert!(h.sim.resolve("FreeCompany").is_some());
        h.sched.tick(Duration::from_millis(249));
        assert!(h.sent().is_empty());
        h.sched.tick(Duration::from_millis(1));
        assert_eq!(h.sent().len(), 1);
        h.sched.tick(Duration::from_millis(150));
        assert_eq!(h.sent().len(), 2);
        h.sched.tick(Duration::from_millis(99));
        assert_eq!(h.sent().len(), 2);
        h.sched.tick(Duration::from_millis(1));
        assert_eq!(h.sent().len(), 3);
        assert!(h.sched.is_idle());
    }

    #[test]
    fn already_open_panel_is_not_reshown() {
        let h = Harness::new();
        h.sim.show("FreeCompany").unwrap();
        let before = h.sim.resolve("FreeCompany").unwrap();
        h.engine.activate(5).unwrap();
        h.settle();
        assert_eq!(h.sim.show_calls(), 1);
        assert_eq!(h.sim.resolve("FreeCompany").unwrap().id, before.id);
    }

    #[test]
    fn deactivate_sends_tab_and_row_without_confirm() {
        let h = Harness::new();
        h.sim.force_active(0, 9, 600);
        h.engine.deactivate(9).unwrap();
        h.settle();

        let sent = h.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[1].1,
            CallbackEvent::new(2, vec![CallbackValue::Int(4), CallbackValue::Int(9)])
        );
        assert!(h.engine.active_actions().is_empty());
    }

    #[test]
    fn hidden_panel_skips_stage_but_later_stages_still_run() {
        let h = Harness::new();
        h.engine.activate(5).unwrap();
        h.sched.tick(Duration::ZERO); // open
        h.sim.hide_panel("FreeCompany");
        h.settle();

        // tab and row skipped, confirm panel never appeared so confirm skipped too
        assert!(h.sent().is_empty());
        assert!(!h.engine.is_busy());
        assert!(h.engine.active_actions().is_empty());
    }

    #[test]
    fn halt_on_stage_failure_stops_the_plan() {
        let mut config = RelayConfig::default();
        config.engine.halt_on_stage_failure = true;
        let h = Harness::with_config(config);
        h.sim.set_show_blocked(true);

        h.engine.activate(5).unwrap();
        assert_eq!(h.sched.tick(Duration::ZERO), 1);
        assert!(h.sched.is_idle(), "no stage queued after the failed open");
        assert!(!h.engine.is_busy());
    }

    #[test]
    fn exclusive_engine_rejects_overlapping_requests() {
        let h = Harness::new();
        h.engine.activate(5).unwrap();
        assert!(matches!(h.engine.activate(9), Err(RelayError::PlanInFlight)));

        h.settle();
        h.engine.activate(9).unwrap();
        h.settle();
        let ids: Vec<_> = h.engine.active_actions().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![5, 9]);
    }

    #[test]
    fn non_exclusive_engine_lets_both_requests_through() {
        let config = RelayConfig {
            engine: EngineConfig {
                exclusive_plans: false,
                halt_on_stage_failure: false,
            },
            ..RelayConfig::default()
        };
        let h = Harness::with_config(config);

        // Both pass validation because neither plan has touched the slots yet.
        assert!(h.engine.activate(5).is_ok());
        assert!(h.engine.activate(9).is_ok());
        assert!(h.engine.is_busy());
        assert_eq!(h.engine.plans_in_flight(), 2);
        h.settle();
        assert!(!h.engine.is_busy());
        // Which plan wins the race is not asserted.
        assert!(h.engine.active_actions().len() <= 2);
    }

    #[test]
    fn schedule_failure_is_surfaced_and_releases_the_engine() {
        let h = Harness::new();
        h.sched.shutdown();
        let err = h.engine.activate(5).unwrap_err();
        assert!(matches!(err, RelayError::Schedule(ScheduleError::Closed)));
        assert!(err.to_string().contains("failed to start panel automation"));
        assert!(!h.engine.is_busy());
    }
}
