use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a company action in the catalog.
pub type ActionId = u32;

/// Number of concurrent activity slots the external system reserves.
pub const SLOT_COUNT: usize = 2;

// ─── Catalog records ──────────────────────────────────────────────────────

/// Immutable metadata for one company action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub id: ActionId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_id: u16,
    #[serde(default)]
    pub cost: u32,
}

/// An action currently occupying one of the two activity slots.
///
/// Never stored: rebuilt on every query from slot countdowns and the local
/// player's status list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveActionState {
    pub id: ActionId,
    pub name: String,
    /// 0 or 1.
    pub slot_index: usize,
    /// Countdown reported by the external system. Always nonzero.
    pub time_remaining: u32,
}

// ─── Intent ───────────────────────────────────────────────────────────────

/// What the caller asked the engine to do with an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Activate,
    Deactivate,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Activate => "activate",
            Intent::Deactivate => "deactivate",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Panels ───────────────────────────────────────────────────────────────

/// A resolved, possibly stale reference to a named panel.
///
/// Handles are only valid for the tick they were resolved on; the external
/// system may tear the panel down and recreate it under a new `id` between
/// ticks. Re-resolve before every use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PanelHandle {
    pub id: u32,
    pub name: String,
}

// ─── Callbacks ────────────────────────────────────────────────────────────

/// One typed value in a callback sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CallbackValue {
    Int(i32),
    UInt(u32),
    /// Sentinel slot the external system expects but ignores.
    Undefined,
}

impl CallbackValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            CallbackValue::Int(_) => "int",
            CallbackValue::UInt(_) => "uint",
            CallbackValue::Undefined => "undefined",
        }
    }

    /// Signed view of the payload (`0` for `Undefined`).
    pub fn as_int(&self) -> i64 {
        match *self {
            CallbackValue::Int(v) => i64::from(v),
            CallbackValue::UInt(v) => i64::from(v),
            CallbackValue::Undefined => 0,
        }
    }
}

impl fmt::Display for CallbackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackValue::Int(v) => write!(f, "int({v})"),
            CallbackValue::UInt(v) => write!(f, "uint({v})"),
            CallbackValue::Undefined => f.write_str("undefined"),
        }
    }
}

/// A tagged, ordered value sequence sent atomically to a panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackEvent {
    pub kind: i32,
    pub values: Vec<CallbackValue>,
}

impl CallbackEvent {
    pub fn new(kind: i32, values: Vec<CallbackValue>) -> Self {
        Self { kind, values }
    }
}

impl fmt::Display for CallbackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback {} [", self.kind)?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

/// A callback as it crosses the dispatch entry point, addressed to a panel.
///
/// This is what the interception hook sees for every piece of traffic,
/// whether the engine produced it or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackCall {
    pub panel: PanelHandle,
    pub event: CallbackEvent,
    pub update_state: u8,
}

// ─── Tests ────────────────────────────────────────────────────────────────
