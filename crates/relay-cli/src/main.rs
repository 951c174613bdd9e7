mod cmd;
mod host;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, Ctx};
use host::{parse_seed, Seed};
use relay_core::{ActionId, Intent};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "relay",
    about = "Drive company actions through the panel UI, against a simulated host",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest relay.yaml upward from cwd, else built-in defaults)
    #[arg(long, global = true, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Start with an action already running: ID or ID:REMAINING (repeatable)
    #[arg(long = "seed", global = true, value_name = "ID[:REMAINING]", value_parser = parse_seed)]
    seeds: Vec<Seed>,

    /// Install the callback hook and log watched traffic (shown with -v)
    #[arg(long, global = true)]
    hook: bool,

    /// Verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every action in the catalog
    Actions,

    /// Show the actions currently occupying slots
    Active,

    /// Activate an action and wait for the panel automation to finish
    Activate { id: ActionId },

    /// Deactivate an action and wait for the panel automation to finish
    Deactivate { id: ActionId },

    /// Print the stages a request would run without running them
    Plan {
        /// activate or deactivate
        #[arg(value_parser = parse_intent)]
        intent: Intent,
        id: ActionId,
    },

    /// Feed chat commands (e.g. "on 5", "active") to the command handler
    Chat {
        #[arg(required = true)]
        messages: Vec<String>,
    },

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn parse_intent(s: &str) -> Result<Intent, String> {
    match s {
        "activate" | "on" => Ok(Intent::Activate),
        "deactivate" | "off" => Ok(Intent::Deactivate),
        other => Err(format!("unknown intent '{other}' (expected activate or deactivate)")),
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Ctx {
        config: root::resolve_config(cli.config.as_deref()),
        seeds: cli.seeds,
        hook: cli.hook,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Actions => cmd::actions::list(&ctx),
        Commands::Active => cmd::actions::active(&ctx),
        Commands::Activate { id } => cmd::run::run(&ctx, Intent::Activate, id),
        Commands::Deactivate { id } => cmd::run::run(&ctx, Intent::Deactivate, id),
        Commands::Plan { intent, id } => cmd::plan::run(&ctx, intent, id),
        Commands::Chat { messages } => cmd::chat::run(&ctx, &messages),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
