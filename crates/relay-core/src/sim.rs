//! An in-memory stand-in for the automated external UI.
//!
//! `SimSurface` behaves like the real panels closely enough to drive full
//! activate/deactivate flows: the actions panel opens on its default tab, an
//! activate-row click raises the confirmation dialog, "yes" fills a free
//! slot and applies the matching status effect, and a deactivate-row click
//! frees the slot. All traffic goes through the hook site, so an installed
//! interception hook sees it exactly as it would in the real host.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::active::StatusMap;
use crate::config::{CallbackSet, PanelNames, RelayConfig};
use crate::error::SurfaceError;
use crate::hook::{DispatchTarget, HookSite};
use crate::surface::{CompanySnapshot, CompanyState, PlayerSnapshot, Surface};
use crate::types::{ActionId, CallbackCall, CallbackEvent, PanelHandle, SLOT_COUNT};

/// How the simulated UI interprets traffic.
#[derive(Debug, Clone)]
pub struct SimOptions {
    pub panels: PanelNames,
    pub callbacks: CallbackSet,
    pub status_map: StatusMap,
    /// Countdown given to a newly activated action.
    pub action_duration: u32,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

impl SimOptions {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            panels: config.panels.clone(),
            callbacks: config.callbacks.clone(),
            status_map: config.status_map.clone(),
            action_duration: 1800,
        }
    }
}

// ─── State ────────────────────────────────────────────────────────────────

struct SimPanel {
    id: u32,
    visible: bool,
}

struct SimCompany {
    membership: bool,
    countdowns: [u32; SLOT_COUNT],
    slot_actions: [Option<ActionId>; SLOT_COUNT],
}

impl SimCompany {
    fn new() -> Self {
        Self {
            membership: true,
            countdowns: [0; SLOT_COUNT],
            slot_actions: [None; SLOT_COUNT],
        }
    }
}

struct SimState {
    logged_in: bool,
    player_name: String,
    statuses: Vec<u32>,
    company: Option<SimCompany>,
    panels: BTreeMap<String, SimPanel>,
    next_panel_id: u32,
    actions_tab: bool,
    pending_confirm: Option<ActionId>,
    show_blocked: bool,
    show_calls: usize,
    dispatched: Vec<CallbackCall>,
}

impl SimState {
    fn new() -> Self {
        Self {
            logged_in: true,
            player_name: "Test Player".to_string(),
            statuses: Vec::new(),
            company: Some(SimCompany::new()),
            panels: BTreeMap::new(),
            next_panel_id: 1,
            actions_tab: false,
            pending_confirm: None,
            show_blocked: false,
            show_calls: 0,
            dispatched: Vec::new(),
        }
    }

    /// Make `name` visible, instantiating it if needed. Returns `true` if the
    /// panel was not visible before.
    fn open(&mut self, name: &str) -> bool {
        if let Some(panel) = self.panels.get_mut(name) {
            let was_hidden = !panel.visible;
            panel.visible = true;
            return was_hidden;
        }
        let id = self.next_panel_id;
        self.next_panel_id += 1;
        self.panels
            .insert(name.to_string(), SimPanel { id, visible: true });
        true
    }

    fn is_live(&self, handle: &PanelHandle) -> bool {
        self.panels
            .get(&handle.name)
            .is_some_and(|p| p.id == handle.id && p.visible)
    }

    fn fill_slot(&mut self, id: ActionId, status_map: &StatusMap, duration: u32) {
        let Some(company) = self.company.as_mut() else {
            return;
        };
        let Some(slot) = company.countdowns.iter().position(|&t| t == 0) else {
            debug!(action_id = id, "sim: no free slot, activation ignored");
            return;
        };
        company.countdowns[slot] = duration;
        company.slot_actions[slot] = Some(id);
        if let Some(status) = status_map.status_for(id) {
            self.statuses.push(status);
        }
    }

    fn free_slot(&mut self, id: ActionId, status_map: &StatusMap) {
        let Some(company) = self.company.as_mut() else {
            return;
        };
        if let Some(slot) = company.slot_actions.iter().position(|&a| a == Some(id)) {
            company.countdowns[slot] = 0;
            company.slot_actions[slot] = None;
        }
        if let Some(status) = status_map.status_for(id) {
            self.statuses.retain(|&s| s != status);
        }
    }
}

// ─── Dispatch ─────────────────────────────────────────────────────────────

/// The simulated system's own callback handler.
struct SimDispatch {
    state: Arc<Mutex<SimState>>,
    options: SimOptions,
}

impl DispatchTarget for SimDispatch {
    fn fire(&self, call: &CallbackCall) {
        let mut st = lock(&self.state);
        st.dispatched.push(call.clone());

        if !st.is_live(&call.panel) {
            debug!(panel = %call.panel.name, "sim: callback sent to a stale or hidden panel");
            return;
        }

        let cb = &self.options.callbacks;
        let panels = &self.options.panels;
        let event = &call.event;

        if call.panel.name == panels.actions {
            if cb.select_tab.capture(event).is_some() {
                st.actions_tab = true;
            } else if !st.actions_tab {
                debug!("sim: row callback ignored outside the actions tab");
            } else if let Some(Some(id)) = cb.activate_row.capture(event) {
                st.open(&panels.confirm);
                st.pending_confirm = Some(id);
            } else if let Some(Some(id)) = cb.deactivate_row.capture(event) {
                st.free_slot(id, &self.options.status_map);
            }
        } else if call.panel.name == panels.confirm && cb.confirm_yes.capture(event).is_some() {
            if let Some(id) = st.pending_confirm.take() {
                st.fill_slot(id, &self.options.status_map, self.options.action_duration);
            }
            if let Some(panel) = st.panels.get_mut(&panels.confirm) {
                panel.visible = false;
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── SimSurface ───────────────────────────────────────────────────────────

pub struct SimSurface {
    state: Arc<Mutex<SimState>>,
    original: Arc<SimDispatch>,
    detour: Mutex<Option<Arc<dyn DispatchTarget>>>,
    actions_panel: String,
}

impl Default for SimSurface {
    fn default() -> Self {
        Self::new(SimOptions::default())
    }
}

impl SimSurface {
    pub fn new(options: SimOptions) -> Self {
        let state = Arc::new(Mutex::new(SimState::new()));
        let actions_panel = options.panels.actions.clone();
        Self {
            original: Arc::new(SimDispatch {
                state: state.clone(),
                options,
            }),
            state,
            detour: Mutex::new(None),
            actions_panel,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        lock(&self.state)
    }

    /// Every call that reached the simulated system, in order.
    pub fn dispatched(&self) -> Vec<CallbackCall> {
        self.state().dispatched.clone()
    }

    pub fn show_calls(&self) -> usize {
        self.state().show_calls
    }

    pub fn is_hooked(&self) -> bool {
        lock(&self.detour).is_some()
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.state().logged_in = logged_in;
    }

    /// Set the membership flag, joining a company first if needed.
    pub fn set_membership(&self, membership: bool) {
        let mut st = self.state();
        st.company.get_or_insert_with(SimCompany::new).membership = membership;
    }

    pub fn leave_company(&self) {
        self.state().company = None;
    }

    /// Fail every `show` call, as if the owning controller were gone.
    pub fn set_show_blocked(&self, blocked: bool) {
        self.state().show_blocked = blocked;
    }

    /// Instantiate and show an arbitrary panel.
    pub fn open_panel(&self, name: &str) {
        self.state().open(name);
    }

    /// Keep the panel instantiated but hidden.
    pub fn hide_panel(&self, name: &str) {
        if let Some(panel) = self.state().panels.get_mut(name) {
            panel.visible = false;
        }
    }

    /// Tear the panel down; the next open gets a new id.
    pub fn close_panel(&self, name: &str) {
        self.state().panels.remove(name);
    }

    /// Put `action` in `slot` with `remaining` on the clock.
    pub fn force_active(&self, slot: usize, action: ActionId, remaining: u32) {
        let status = self.original.options.status_map.status_for(action);
        let mut st = self.state();
        let Some(company) = st.company.as_mut() else {
            return;
        };
        let (Some(countdown), Some(occupant)) = (
            company.countdowns.get_mut(slot),
            company.slot_actions.get_mut(slot),
        ) else {
            debug!(slot, action_id = action, "sim: no such slot, force_active ignored");
            return;
        };
        *countdown = remaining;
        *occupant = Some(action);
        if let Some(status) = status {
            st.statuses.push(status);
        }
    }

    pub fn set_slot_countdown(&self, slot: usize, remaining: u32) {
        let mut st = self.state();
        let Some(company) = st.company.as_mut() else {
            return;
        };
        match company.countdowns.get_mut(slot) {
            Some(countdown) => *countdown = remaining,
            None => debug!(slot, "sim: no such slot, countdown ignored"),
        }
    }

    pub fn push_status(&self, status: u32) {
        self.state().statuses.push(status);
    }

    /// Run every countdown down by `elapsed`, expiring finished actions.
    pub fn advance(&self, elapsed: u32) {
        let mut st = self.state();
        let mut expired = Vec::new();
        if let Some(company) = st.company.as_mut() {
            for slot in 0..SLOT_COUNT {
                if company.countdowns[slot] == 0 {
                    continue;
                }
                company.countdowns[slot] = company.countdowns[slot].saturating_sub(elapsed);
                if company.countdowns[slot] == 0 {
                    if let Some(action) = company.slot_actions[slot].take() {
                        expired.push(action);
                    }
                }
            }
        }
        for action in expired {
            if let Some(status) = self.original.options.status_map.status_for(action) {
                st.statuses.retain(|&s| s != status);
            }
        }
    }
}

impl Surface for SimSurface {
    fn resolve(&self, name: &str) -> Option<PanelHandle> {
        self.state().panels.get(name).map(|p| PanelHandle {
            id: p.id,
            name: name.to_string(),
        })
    }

    fn is_visible(&self, handle: &PanelHandle) -> bool {
        self.state().is_live(handle)
    }

    fn show(&self, name: &str) -> Result<(), SurfaceError> {
        let mut st = self.state();
        st.show_calls += 1;
        if st.show_blocked || name != self.actions_panel || st.company.is_none() {
            return Err(SurfaceError::ControllerMissing(name.to_string()));
        }
        if st.open(name) {
            st.actions_tab = false;
        }
        Ok(())
    }

    fn dispatch(&self, handle: &PanelHandle, event: &CallbackEvent) {
        let call = CallbackCall {
            panel: handle.clone(),
            event: event.clone(),
            update_state: 0,
        };
        let target: Arc<dyn DispatchTarget> = match lock(&self.detour).clone() {
            Some(detour) => detour,
            None => self.original.clone(),
        };
        target.fire(&call);
    }
}

impl HookSite for SimSurface {
    fn original(&self) -> Arc<dyn DispatchTarget> {
        self.original.clone()
    }

    fn attach(&self, detour: Arc<dyn DispatchTarget>) -> Result<(), SurfaceError> {
        let mut slot = lock(&self.detour);
        if slot.is_some() {
            return Err(SurfaceError::AlreadyHooked);
        }
        *slot = Some(detour);
        Ok(())
    }

    fn detach(&self) -> bool {
        lock(&self.detour).take().is_some()
    }
}

impl CompanyState for SimSurface {
    fn local_player(&self) -> Option<PlayerSnapshot> {
        let st = self.state();
        st.logged_in.then(|| PlayerSnapshot {
            name: st.player_name.clone(),
            status_ids: st.statuses.clone(),
        })
    }

    fn company(&self) -> Option<CompanySnapshot> {
        self.state().company.as_ref().map(|c| CompanySnapshot {
            slot_time_remaining: c.countdowns,
            has_membership: c.membership,
        })
    }
}
