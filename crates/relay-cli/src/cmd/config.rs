use super::Ctx;
use crate::host::load_config;
use crate::output::{print_json, print_warnings};
use crate::root::CONFIG_FILE;
use anyhow::Context;
use clap::Subcommand;
use relay_core::{Catalog, ConfigWarning, RelayConfig, WarnLevel};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective config (file merged over defaults)
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Write the default config to relay.yaml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Ctx, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
        ConfigSubcommand::Init { force } => init(Path::new(CONFIG_FILE), force),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Ctx) -> anyhow::Result<()> {
    let (config, _) = load_config(ctx.config.as_deref())?;
    if ctx.json {
        return print_json(&config);
    }
    print!("{}", config.to_yaml()?);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(ctx: &Ctx) -> anyhow::Result<()> {
    let (config, base_dir) = load_config(ctx.config.as_deref())?;

    let mut warnings = Vec::new();
    match Catalog::from_source(&config.catalog, &base_dir) {
        Ok(catalog) => warnings.extend(config.validate(&catalog)),
        Err(e) => warnings.push(ConfigWarning {
            level: WarnLevel::Error,
            message: format!("catalog: {e}"),
        }),
    }

    if ctx.json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        print_warnings(&warnings);
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let yaml = RelayConfig::default().to_yaml()?;
    std::fs::write(path, yaml).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
