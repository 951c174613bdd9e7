use anyhow::{Context, Result};
use relay_core::{
    ActionEngine, ActionId, Catalog, EngineDeps, FrameScheduler, InstalledHook, RelayConfig,
    SimOptions, SimSurface, SLOT_COUNT,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Frame length the scheduler is ticked with.
const FRAME: Duration = Duration::from_millis(16);

/// Give up on a plan that has not drained after this long.
const SETTLE_LIMIT: Duration = Duration::from_secs(10);

/// A pre-existing active action: `ID` or `ID:REMAINING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed {
    pub id: ActionId,
    pub remaining: u32,
}

pub fn parse_seed(s: &str) -> Result<Seed, String> {
    let (id, remaining) = match s.split_once(':') {
        Some((id, rem)) => (id, rem),
        None => (s, "1800"),
    };
    let id = id
        .parse()
        .map_err(|_| format!("'{id}' is not an action id"))?;
    let remaining = remaining
        .parse()
        .map_err(|_| format!("'{remaining}' is not a countdown"))?;
    if remaining == 0 {
        return Err("countdown must be greater than zero".to_string());
    }
    Ok(Seed { id, remaining })
}

/// Everything needed to stand up a host from the command line.
pub struct HostOptions<'a> {
    pub config_path: Option<&'a Path>,
    pub seeds: &'a [Seed],
    pub hook: bool,
}

/// A simulated host: panels, tick loop, and the engine wired to them.
pub struct Host {
    pub config: RelayConfig,
    pub sim: Arc<SimSurface>,
    pub sched: Arc<FrameScheduler>,
    pub engine: Arc<ActionEngine>,
    _hook: Option<InstalledHook>,
}

impl Host {
    pub fn build(opts: HostOptions<'_>) -> Result<Self> {
        let (config, base_dir) = load_config(opts.config_path)?;
        let catalog = Catalog::from_source(&config.catalog, &base_dir)
            .context("failed to load action catalog")?;

        if opts.seeds.len() > SLOT_COUNT {
            anyhow::bail!("at most {SLOT_COUNT} actions can be seeded");
        }

        let sim = Arc::new(SimSurface::new(SimOptions::from_config(&config)));
        for (slot, seed) in opts.seeds.iter().enumerate() {
            if catalog.get(seed.id).is_none() {
                anyhow::bail!("cannot seed unknown action {}", seed.id);
            }
            sim.force_active(slot, seed.id, seed.remaining);
        }

        let hook = if opts.hook {
            Some(
                InstalledHook::install_from_config(sim.clone(), &config.hook)
                    .context("failed to install callback hook")?,
            )
        } else {
            None
        };

        let sched = Arc::new(FrameScheduler::new());
        let engine = ActionEngine::new(
            EngineDeps {
                surface: sim.clone(),
                state: sim.clone(),
                scheduler: sched.clone(),
                catalog: Arc::new(catalog),
            },
            &config,
        );

        Ok(Self {
            config,
            sim,
            sched,
            engine: Arc::new(engine),
            _hook: hook,
        })
    }

    /// Tick the scheduler in real time until every queued stage has run.
    pub fn settle(&self) -> Result<()> {
        let rt = tokio::runtime::Handle::try_current()
            .map(|_| None)
            .or_else(|_| tokio::runtime::Runtime::new().map(Some))
            .context("failed to start tokio runtime")?;

        let drained = match rt {
            Some(rt) => rt.block_on(drive(&self.sched)),
            None => tokio::task::block_in_place(|| {
                tokio::runtime::Handle::current().block_on(drive(&self.sched))
            }),
        };

        if !drained {
            anyhow::bail!(
                "panel automation did not finish within {}s",
                SETTLE_LIMIT.as_secs()
            );
        }
        Ok(())
    }
}

async fn drive(sched: &FrameScheduler) -> bool {
    let mut interval = tokio::time::interval(FRAME);
    let start = tokio::time::Instant::now();
    let mut last = start;
    while !sched.is_idle() {
        if start.elapsed() >= SETTLE_LIMIT {
            return false;
        }
        let now = interval.tick().await;
        sched.tick(now.saturating_duration_since(last));
        last = now;
    }
    true
}

/// Load the config at `path`, or defaults if there is none. Also returns
/// the directory relative paths in the config resolve against.
pub(crate) fn load_config(path: Option<&Path>) -> Result<(RelayConfig, PathBuf)> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match path {
        Some(p) => {
            let config = RelayConfig::load(p)
                .with_context(|| format!("failed to load config from {}", p.display()))?;
            let base = p
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or(cwd);
            Ok((config, base))
        }
        None => Ok((RelayConfig::default(), cwd)),
    }
}
