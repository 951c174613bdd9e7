use crate::active::StatusMap;
use crate::catalog::{Catalog, CatalogSource};
use crate::error::{RelayError, Result};
use crate::hook::PanelFilter;
use crate::types::{ActionId, CallbackEvent, CallbackValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// PanelNames
// ---------------------------------------------------------------------------

/// Names of the external panels the engine drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelNames {
    #[serde(default = "default_actions_panel")]
    pub actions: String,
    #[serde(default = "default_confirm_panel")]
    pub confirm: String,
}

fn default_actions_panel() -> String {
    "FreeCompany".to_string()
}

fn default_confirm_panel() -> String {
    "SelectYesno".to_string()
}

impl Default for PanelNames {
    fn default() -> Self {
        Self {
            actions: default_actions_panel(),
            confirm: default_confirm_panel(),
        }
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Delay before each stage, measured from the previous stage's completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    #[serde(default)]
    pub open_ms: u64,
    #[serde(default = "default_select_tab_ms")]
    pub select_tab_ms: u64,
    #[serde(default = "default_select_row_ms")]
    pub select_row_ms: u64,
    #[serde(default = "default_confirm_ms")]
    pub confirm_ms: u64,
}

fn default_select_tab_ms() -> u64 {
    250
}

fn default_select_row_ms() -> u64 {
    150
}

fn default_confirm_ms() -> u64 {
    100
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            open_ms: 0,
            select_tab_ms: default_select_tab_ms(),
            select_row_ms: default_select_row_ms(),
            confirm_ms: default_confirm_ms(),
        }
    }
}

impl Timing {
    pub fn open(&self) -> Duration {
        Duration::from_millis(self.open_ms)
    }

    pub fn select_tab(&self) -> Duration {
        Duration::from_millis(self.select_tab_ms)
    }

    pub fn select_row(&self) -> Duration {
        Duration::from_millis(self.select_row_ms)
    }

    pub fn confirm(&self) -> Duration {
        Duration::from_millis(self.confirm_ms)
    }

    /// Total delay of the longest plan (activation).
    pub fn activation_total(&self) -> Duration {
        self.open() + self.select_tab() + self.select_row() + self.confirm()
    }
}

// ---------------------------------------------------------------------------
// CallbackTemplate
// ---------------------------------------------------------------------------

/// One slot of a callback template: a literal, or the target action id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TemplateValue {
    Int(i32),
    UInt(u32),
    Undefined,
    /// The target action id, sent as a signed int.
    ActionIdInt,
    /// The target action id, sent as an unsigned int.
    ActionIdUint,
}

/// A fixed (kind, values) mapping for one UI intent.
///
/// These mappings were recovered by watching live traffic and are not
/// derived by the engine; re-check them when the external system updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackTemplate {
    pub kind: i32,
    pub values: Vec<TemplateValue>,
}

impl CallbackTemplate {
    pub fn new(kind: i32, values: Vec<TemplateValue>) -> Self {
        Self { kind, values }
    }

    /// Build the concrete event for `action_id`.
    pub fn render(&self, action_id: ActionId) -> Result<CallbackEvent> {
        let values = self
            .values
            .iter()
            .map(|v| match *v {
                TemplateValue::Int(n) => Ok(CallbackValue::Int(n)),
                TemplateValue::UInt(n) => Ok(CallbackValue::UInt(n)),
                TemplateValue::Undefined => Ok(CallbackValue::Undefined),
                TemplateValue::ActionIdUint => Ok(CallbackValue::UInt(action_id)),
                TemplateValue::ActionIdInt => i32::try_from(action_id)
                    .map(CallbackValue::Int)
                    .map_err(|_| {
                        RelayError::Config(format!(
                            "action id {action_id} does not fit a signed callback value"
                        ))
                    }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CallbackEvent::new(self.kind, values))
    }

    /// Match `event` against this template.
    ///
    /// Returns `None` on mismatch, otherwise `Some` with the action id
    /// captured from a placeholder slot (if the template has one).
    pub fn capture(&self, event: &CallbackEvent) -> Option<Option<ActionId>> {
        if event.kind != self.kind || event.values.len() != self.values.len() {
            return None;
        }
        let mut captured = None;
        for (slot, value) in self.values.iter().zip(&event.values) {
            match (*slot, *value) {
                (TemplateValue::Int(a), CallbackValue::Int(b)) if a == b => {}
                (TemplateValue::UInt(a), CallbackValue::UInt(b)) if a == b => {}
                (TemplateValue::Undefined, CallbackValue::Undefined) => {}
                (TemplateValue::ActionIdUint, CallbackValue::UInt(id)) => captured = Some(id),
                (TemplateValue::ActionIdInt, CallbackValue::Int(id)) => {
                    captured = Some(u32::try_from(id).ok()?);
                }
                _ => return None,
            }
        }
        Some(captured)
    }
}

/// Callback templates for every UI intent the engine synthesises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackSet {
    #[serde(default = "default_select_tab")]
    pub select_tab: CallbackTemplate,
    #[serde(default = "default_activate_row")]
    pub activate_row: CallbackTemplate,
    #[serde(default = "default_deactivate_row")]
    pub deactivate_row: CallbackTemplate,
    #[serde(default = "default_confirm_yes")]
    pub confirm_yes: CallbackTemplate,
}

fn default_select_tab() -> CallbackTemplate {
    CallbackTemplate::new(1, vec![TemplateValue::Int(0), TemplateValue::Int(4)])
}

fn default_activate_row() -> CallbackTemplate {
    CallbackTemplate::new(3, vec![TemplateValue::Int(0), TemplateValue::ActionIdUint])
}

fn default_deactivate_row() -> CallbackTemplate {
    CallbackTemplate::new(2, vec![TemplateValue::Int(4), TemplateValue::ActionIdInt])
}

fn default_confirm_yes() -> CallbackTemplate {
    CallbackTemplate::new(1, vec![TemplateValue::Int(0)])
}

impl Default for CallbackSet {
    fn default() -> Self {
        Self {
            select_tab: default_select_tab(),
            activate_row: default_activate_row(),
            deactivate_row: default_deactivate_row(),
            confirm_yes: default_confirm_yes(),
        }
    }
}

// ---------------------------------------------------------------------------
// HookConfig
// ---------------------------------------------------------------------------

/// A panel-name rule for the interception allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelPattern {
    Exact(String),
    Contains(String),
    Regex(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(default = "default_watch")]
    pub watch: Vec<PanelPattern>,
    #[serde(default = "default_max_logged_values")]
    pub max_logged_values: usize,
}

fn default_watch() -> Vec<PanelPattern> {
    vec![
        PanelPattern::Exact("FreeCompany".to_string()),
        PanelPattern::Contains("Context".to_string()),
        PanelPattern::Contains("Menu".to_string()),
        PanelPattern::Exact("SelectYesno".to_string()),
    ]
}

fn default_max_logged_values() -> usize {
    10
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            watch: default_watch(),
            max_logged_values: default_max_logged_values(),
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Reject a new request while a previous plan still has stages pending.
    #[serde(default = "default_exclusive_plans")]
    pub exclusive_plans: bool,
    /// Stop a plan at the first stage whose panel is missing or hidden.
    #[serde(default)]
    pub halt_on_stage_failure: bool,
}

fn default_exclusive_plans() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exclusive_plans: default_exclusive_plans(),
            halt_on_stage_failure: false,
        }
    }
}

// ---------------------------------------------------------------------------
// RelayConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub panels: PanelNames,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub callbacks: CallbackSet,
    #[serde(default)]
    pub hook: HookConfig,
    #[serde(default)]
    pub status_map: StatusMap,
    #[serde(default)]
    pub catalog: CatalogSource,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl RelayConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, catalog: &Catalog) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Panel names must be non-empty
        for (role, name) in [
            ("actions", &self.panels.actions),
            ("confirm", &self.panels.confirm),
        ] {
            if name.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("panels.{role} is empty"),
                });
            }
        }

        // 2. Status map targets must exist in the catalog
        for (status, action) in self.status_map.iter() {
            if catalog.get(action).is_none() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "status_map: status {status} points at action {action}, which is not in the catalog"
                    ),
                });
            }
        }

        // 3. Two statuses resolving to the same action hide each other
        let mut seen = BTreeSet::new();
        for (_, action) in self.status_map.iter() {
            if !seen.insert(action) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("status_map: action {action} is mapped by more than one status"),
                });
            }
        }

        // 4. Watch patterns must compile
        if let Err(e) = PanelFilter::compile(&self.hook.watch) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("hook.watch: {e}"),
            });
        }

        // 5. Logging zero values makes the hook useless for recovering callbacks
        if self.hook.max_logged_values == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "hook.max_logged_values is 0; intercepted values will not be logged"
                    .to_string(),
            });
        }

        // 6. Row templates need a placeholder or every row gets the same click
        for (name, template) in [
            ("activate_row", &self.callbacks.activate_row),
            ("deactivate_row", &self.callbacks.deactivate_row),
        ] {
            let has_placeholder = template.values.iter().any(|v| {
                matches!(v, TemplateValue::ActionIdInt | TemplateValue::ActionIdUint)
            });
            if !has_placeholder {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("callbacks.{name} has no action_id placeholder"),
                });
            }
        }

        warnings
    }
}
