//! The boundary to the automated external UI system.
//!
//! Everything the engine knows about the outside world comes through the two
//! traits here. Neither caches anything: every call is a fresh query against
//! the external system's current state.

use crate::error::SurfaceError;
use crate::types::{CallbackEvent, PanelHandle, SLOT_COUNT};

/// Named-panel lookup, visibility, "show", and the callback entry point.
pub trait Surface: Send + Sync {
    /// Look up a panel by name. `None` if it is not currently instantiated.
    fn resolve(&self, name: &str) -> Option<PanelHandle>;

    /// Whether `handle` still refers to a live, visible panel.
    fn is_visible(&self, handle: &PanelHandle) -> bool;

    /// Ask the panel's owning controller to show it.
    fn show(&self, name: &str) -> Result<(), SurfaceError>;

    /// Send one callback event to the panel's dispatch entry point.
    fn dispatch(&self, handle: &PanelHandle, event: &CallbackEvent);
}

/// The local player, as far as action state is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub name: String,
    /// Currently applied status-effect ids, in the order the external system
    /// reports them.
    pub status_ids: Vec<u32>,
}

/// The player's company: the aggregate that owns the action slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanySnapshot {
    /// Per-slot countdown; zero means the slot is free.
    pub slot_time_remaining: [u32; SLOT_COUNT],
    /// The company's membership data is loaded (the player actually belongs).
    pub has_membership: bool,
}

/// Read-side view of identity and action slots.
pub trait CompanyState: Send + Sync {
    fn local_player(&self) -> Option<PlayerSnapshot>;
    fn company(&self) -> Option<CompanySnapshot>;
}

/// Resolve `name` and check it is visible, in one step.
pub fn resolve_visible(surface: &dyn Surface, name: &str) -> Result<PanelHandle, SurfaceError> {
    let handle = surface
        .resolve(name)
        .ok_or_else(|| SurfaceError::PanelMissing(name.to_string()))?;
    if !surface.is_visible(&handle) {
        return Err(SurfaceError::PanelHidden(name.to_string()));
    }
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimSurface;

    #[test]
    fn resolve_visible_distinguishes_missing_and_hidden() {
        let sim = SimSurface::default();
        assert_eq!(
            resolve_visible(&sim, "FreeCompany"),
            Err(SurfaceError::PanelMissing("FreeCompany".into()))
        );

        sim.show("FreeCompany").unwrap();
        let handle = resolve_visible(&sim, "FreeCompany").unwrap();
        assert_eq!(handle.name, "FreeCompany");

        sim.hide_panel("FreeCompany");
        assert_eq!(
            resolve_visible(&sim, "FreeCompany"),
            Err(SurfaceError::PanelHidden("FreeCompany".into()))
        );
    }

    #[test]
    fn handles_go_stale_when_panel_is_recreated() {
        let sim = SimSurface::default();
        sim.show("FreeCompany").unwrap();
        let old = sim.resolve("FreeCompany").unwrap();

        sim.close_panel("FreeCompany");
        assert!(!sim.is_visible(&old));

        sim.show("FreeCompany").unwrap();
        let new = sim.resolve("FreeCompany").unwrap();
        assert_ne!(old.id, new.id);
        assert!(!sim.is_visible(&old));
        assert!(sim.is_visible(&new));
    }
}
