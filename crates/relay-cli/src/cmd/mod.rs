pub mod actions;
pub mod chat;
pub mod config;
pub mod plan;
pub mod run;

use crate::host::{Host, HostOptions, Seed};
use std::path::PathBuf;

/// Global flags shared by every subcommand.
pub struct Ctx {
    pub config: Option<PathBuf>,
    pub seeds: Vec<Seed>,
    pub hook: bool,
    pub json: bool,
}

impl Ctx {
    pub fn host(&self) -> anyhow::Result<Host> {
        Host::build(HostOptions {
            config_path: self.config.as_deref(),
            seeds: &self.seeds,
            hook: self.hook,
        })
    }
}
