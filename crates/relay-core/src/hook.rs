//! Interception of the external dispatch entry point.
//!
//! [`CallbackHook`] is a decorator around the host's true dispatch target.
//! Every callback, from any source, passes through it: calls addressed to a
//! watched panel are handed to a [`TrafficObserver`], then the call is
//! forwarded unmodified. Observation is best-effort; forwarding is not.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, error, info};

use crate::config::{HookConfig, PanelPattern};
use crate::error::{RelayError, Result, SurfaceError};
use crate::types::CallbackCall;

// ─── Dispatch seam ────────────────────────────────────────────────────────

/// The single entry point all callback traffic goes through.
pub trait DispatchTarget: Send + Sync {
    fn fire(&self, call: &CallbackCall);
}

/// Where the host lets one detour be attached in front of its entry point.
pub trait HookSite: Send + Sync {
    /// The true dispatch target, bypassing any detour.
    fn original(&self) -> Arc<dyn DispatchTarget>;

    /// Route all traffic through `detour`. Fails if one is already attached.
    fn attach(&self, detour: Arc<dyn DispatchTarget>) -> std::result::Result<(), SurfaceError>;

    /// Remove the attached detour. Returns `false` if none was attached.
    fn detach(&self) -> bool;
}

// ─── PanelFilter ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Rule {
    Exact(String),
    Contains(String),
    Regex(Regex),
}

/// Compiled allow-list of panel names worth logging.
#[derive(Debug, Clone, Default)]
pub struct PanelFilter {
    rules: Vec<Rule>,
}

impl PanelFilter {
    pub fn compile(patterns: &[PanelPattern]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| match p {
                PanelPattern::Exact(s) => Ok(Rule::Exact(s.clone())),
                PanelPattern::Contains(s) => Ok(Rule::Contains(s.clone())),
                PanelPattern::Regex(s) => Regex::new(s)
                    .map(Rule::Regex)
                    .map_err(|e| RelayError::Config(format!("invalid panel regex '{s}': {e}"))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| match rule {
            Rule::Exact(s) => name == s,
            Rule::Contains(s) => name.contains(s.as_str()),
            Rule::Regex(re) => re.is_match(name),
        })
    }
}

// ─── Observers ────────────────────────────────────────────────────────────

/// Receives watched callback traffic.
pub trait TrafficObserver: Send + Sync {
    fn observe(&self, call: &CallbackCall);
}

/// Logs watched traffic through `tracing` at debug level.
pub struct TracingObserver {
    max_values: usize,
}

impl TracingObserver {
    pub fn new(max_values: usize) -> Self {
        Self { max_values }
    }
}

impl TrafficObserver for TracingObserver {
    fn observe(&self, call: &CallbackCall) {
        debug!(
            panel = %call.panel.name,
            kind = call.event.kind,
            value_count = call.event.values.len(),
            update_state = call.update_state,
            "callback intercepted"
        );
        for (i, value) in call.event.values.iter().take(self.max_values).enumerate() {
            debug!(
                index = i,
                value_type = value.kind_name(),
                int = value.as_int(),
                "  value"
            );
        }
    }
}

// ─── CallbackHook ─────────────────────────────────────────────────────────

/// The detour installed in front of the original dispatch target.
pub struct CallbackHook {
    original: Arc<dyn DispatchTarget>,
    filter: PanelFilter,
    observer: Arc<dyn TrafficObserver>,
}

impl CallbackHook {
    fn inspect(&self, call: &CallbackCall) {
        if self.filter.matches(&call.panel.name) {
            self.observer.observe(call);
        }
    }
}

impl DispatchTarget for CallbackHook {
    fn fire(&self, call: &CallbackCall) {
        if catch_unwind(AssertUnwindSafe(|| self.inspect(call))).is_err() {
            error!(panel = %call.panel.name, "callback observer panicked; forwarding anyway");
        }
        self.original.fire(call);
    }
}

/// A hook attached to a [`HookSite`]. Detaches exactly once: on
/// [`InstalledHook::uninstall`] or on drop, whichever comes first.
pub struct InstalledHook {
    site: Arc<dyn HookSite>,
    attached: bool,
}

impl InstalledHook {
    /// Attach a [`CallbackHook`] to `site`.
    pub fn install(
        site: Arc<dyn HookSite>,
        filter: PanelFilter,
        observer: Arc<dyn TrafficObserver>,
    ) -> Result<Self> {
        let hook = CallbackHook {
            original: site.original(),
            filter,
            observer,
        };
        site.attach(Arc::new(hook))?;
        info!("callback hook installed");
        Ok(Self {
            site,
            attached: true,
        })
    }

    /// Install with the tracing observer and allow-list from `config`.
    pub fn install_from_config(site: Arc<dyn HookSite>, config: &HookConfig) -> Result<Self> {
        let filter = PanelFilter::compile(&config.watch)?;
        let observer = Arc::new(TracingObserver::new(config.max_logged_values));
        Self::install(site, filter, observer)
    }

    pub fn uninstall(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        if self.site.detach() {
            info!("callback hook removed");
        }
    }
}

impl Drop for InstalledHook {
    fn drop(&mut self) {
        self.detach();
    }
}
