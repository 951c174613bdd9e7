use crate::catalog::Catalog;
use crate::surface::CompanyState;
use crate::types::{ActionId, ActiveActionState, SLOT_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// ─── StatusMap ────────────────────────────────────────────────────────────

/// Status-effect id → action id.
///
/// There is no direct "which action is in slot N" query, so the reader
/// infers it from the status effects an active action applies to the
/// player. The ids depend on the external system's version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMap(BTreeMap<u32, ActionId>);

const DEFAULT_STATUS_MAP: &[(u32, ActionId)] = &[
    (414, 0),
    (50, 1),
    (51, 2),
    (415, 3),
    (52, 4),
    (53, 5),
    (416, 6),
    (54, 7),
    (55, 8),
    (56, 9),
    (57, 10),
    (58, 11),
    (59, 12),
    (60, 13),
    (61, 14),
    (62, 15),
    (63, 16),
    (64, 17),
    (65, 18),
    (66, 19),
    (67, 20),
    (68, 21),
    (69, 22),
    (70, 23),
    (71, 24),
    (72, 25),
    (73, 26),
    (74, 27),
    (75, 28),
    (76, 29),
    (77, 30),
    (78, 31),
];

impl Default for StatusMap {
    fn default() -> Self {
        Self(DEFAULT_STATUS_MAP.iter().copied().collect())
    }
}

impl FromIterator<(u32, ActionId)> for StatusMap {
    fn from_iter<I: IntoIterator<Item = (u32, ActionId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl StatusMap {
    pub fn action_for(&self, status_id: u32) -> Option<ActionId> {
        self.0.get(&status_id).copied()
    }

    /// Reverse lookup: the first status id that maps to `action`.
    pub fn status_for(&self, action: ActionId) -> Option<u32> {
        self.0
            .iter()
            .find(|(_, &a)| a == action)
            .map(|(&status, _)| status)
    }

    pub fn insert(&mut self, status_id: u32, action: ActionId) {
        self.0.insert(status_id, action);
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, ActionId)> + '_ {
        self.0.iter().map(|(&s, &a)| (s, a))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ─── ActiveStateReader ────────────────────────────────────────────────────

/// Reconstructs the set of active actions from indirect signals.
///
/// For each slot with a nonzero countdown, the player's status list is
/// scanned in order and the first status that maps to a catalog action not
/// already claimed by an earlier slot wins.
#[derive(Clone)]
pub struct ActiveStateReader {
    state: Arc<dyn CompanyState>,
    catalog: Arc<Catalog>,
    status_map: Arc<StatusMap>,
}

impl ActiveStateReader {
    pub fn new(
        state: Arc<dyn CompanyState>,
        catalog: Arc<Catalog>,
        status_map: Arc<StatusMap>,
    ) -> Self {
        Self {
            state,
            catalog,
            status_map,
        }
    }

    /// Currently active actions. Empty (never an error) when there is no
    /// player or no company.
    pub fn active_actions(&self) -> Vec<ActiveActionState> {
        let mut active = Vec::new();

        let Some(player) = self.state.local_player() else {
            return active;
        };
        let Some(company) = self.state.company() else {
            return active;
        };

        let mut claimed = BTreeSet::new();
        for slot in 0..SLOT_COUNT {
            let time_remaining = company.slot_time_remaining[slot];
            if time_remaining == 0 {
                continue;
            }

            let found = player.status_ids.iter().find_map(|&status| {
                let id = self.status_map.action_for(status)?;
                if claimed.contains(&id) {
                    return None;
                }
                self.catalog.get(id)
            });

            match found {
                Some(action) => {
                    claimed.insert(action.id);
                    active.push(ActiveActionState {
                        id: action.id,
                        name: action.name.clone(),
                        slot_index: slot,
                        time_remaining,
                    });
                }
                None => {
                    tracing::debug!(slot, time_remaining, "slot is counting down but no status maps to it");
                }
            }
        }

        active
    }

    pub fn is_active(&self, id: ActionId) -> bool {
        self.active_actions().iter().any(|a| a.id == id)
    }
}
