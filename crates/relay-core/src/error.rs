use thiserror::Error;

use crate::types::{ActionId, Intent};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("you must be logged in to {0} company actions")]
    NotLoggedIn(Intent),

    #[error("you must belong to a company to {0} company actions")]
    NotInCompany(Intent),

    #[error("company action with id {0} not found")]
    ActionNotFound(ActionId),

    #[error("{0} is already active")]
    AlreadyActive(String),

    #[error("a maximum of {0} company actions can be active at once")]
    CapacityReached(usize),

    #[error("company action {0} is not currently active")]
    NotActive(ActionId),

    #[error("another company action request is still in progress")]
    PlanInFlight,

    #[error("failed to start panel automation: {0}")]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Failures reported by the external panel surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("panel '{0}' is not instantiated")]
    PanelMissing(String),

    #[error("panel '{0}' is not visible")]
    PanelHidden(String),

    #[error("no controller available to show panel '{0}'")]
    ControllerMissing(String),

    #[error("dispatch entry point is already hooked")]
    AlreadyHooked,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("tick scheduler is shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, RelayError>;
