//! `relay-core`: staged automation of company actions in an external UI.
//!
//! The external system exposes named panels, a callback entry point per
//! panel, and read-only views of the local player and their company. This
//! crate reads which company actions are running from that state, and turns
//! "activate X" / "deactivate X" into a timed sequence of synthetic panel
//! callbacks that click through the UI on the host's tick thread.
//!
//! # Architecture
//!
//! ```text
//! CommandHandler      ← chat text in, chat replies out
//!     │
//!     ▼
//! ActionEngine        ← precondition checks against CompanyState + Catalog
//!     │                  ActiveStateReader: slot countdowns × status map
//!     ▼
//! ExecutionPlan       ← open panel → select tab → select row → confirm
//!     │                  each stage queued on a TickScheduler
//!     ▼
//! Surface::dispatch   ← through the HookSite, where an InstalledHook may
//!                        observe traffic before forwarding it
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use relay_core::{ActionEngine, Catalog, EngineDeps, FrameScheduler, RelayConfig, SimSurface};
//!
//! let sim = Arc::new(SimSurface::default());
//! let sched = Arc::new(FrameScheduler::new());
//! let engine = ActionEngine::new(
//!     EngineDeps {
//!         surface: sim.clone(),
//!         state: sim.clone(),
//!         scheduler: sched.clone(),
//!         catalog: Arc::new(Catalog::builtin()),
//!     },
//!     &RelayConfig::default(),
//! );
//!
//! engine.activate(5)?;
//! sched.run_until_idle(Duration::from_millis(16), Duration::from_secs(5));
//! assert_eq!(engine.active_actions()[0].id, 5);
//! ```

pub mod active;
pub mod catalog;
pub mod chat;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod hook;
pub mod scheduler;
pub mod sim;
pub mod surface;
pub mod types;


pub use active::{ActiveStateReader, StatusMap};
pub use catalog::{Catalog, CatalogSource, SheetRow};
pub use chat::{BufferSink, ChatSender, ChatSink};
pub use command::{Command, CommandHandler};
pub use config::{ConfigWarning, RelayConfig, WarnLevel};
pub use engine::{ActionEngine, EngineDeps, ExecutionPlan, Stage, StageStep};
pub use error::{RelayError, Result, ScheduleError, SurfaceError};
pub use hook::{DispatchTarget, HookSite, InstalledHook, PanelFilter, TrafficObserver};
pub use scheduler::{FrameScheduler, Task, TickScheduler};
pub use sim::{SimOptions, SimSurface};
pub use surface::{CompanySnapshot, CompanyState, PlayerSnapshot, Surface};
pub use types::{
    ActionDefinition, ActionId, ActiveActionState, CallbackCall, CallbackEvent, CallbackValue,
    Intent, PanelHandle, SLOT_COUNT,
};
