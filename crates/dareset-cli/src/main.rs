mod cmd;
mod output;
mod root;

use clap::{Args, Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "da-reset",
    about = "Drop the Data accounting tables and let the wiki's update script recreate them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .da-reset/ or .git/)
    #[arg(long, global = true, env = "DA_RESET_ROOT")]
    root: Option<PathBuf>,

    /// Config file (default: <root>/.da-reset/config.yaml)
    #[arg(long, global = true, env = "DA_RESET_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Per-invocation overrides of the config's gate and preflight settings.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct GateArgs {
    /// Run the rebuild even if the drop fails
    #[arg(long)]
    pub unconditional: bool,

    /// Skip the container running check
    #[arg(long)]
    pub no_preflight: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop the tables, then run the update script (default)
    Run {
        #[command(flatten)]
        gate: GateArgs,
    },

    /// Print the commands that would run, without running them
    Plan {
        #[command(flatten)]
        gate: GateArgs,
    },

    /// Create, inspect, and validate the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        None | Some(Commands::Run { .. }) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let config_path = cli
        .config
        .unwrap_or_else(|| dareset_core::paths::config_path(&root));

    let result = match cli.command {
        None => cmd::run::run(&config_path, GateArgs::default(), cli.json),
        Some(Commands::Run { gate }) => cmd::run::run(&config_path, gate, cli.json),
        Some(Commands::Plan { gate }) => cmd::plan::run(&config_path, gate, cli.json).map(|_| 0),
        Some(Commands::Config { subcommand }) => {
            cmd::config::run(&config_path, subcommand, cli.json).map(|_| 0)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
