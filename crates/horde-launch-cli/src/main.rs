//! horde-launch - interactive launcher for Horde inference workers.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Pick a model, tune the server and run it as a Horde worker inside tmux
///
/// Arguments after the launcher's own options (or after `--`) are passed to
/// the server unchanged.
#[derive(Parser)]
#[command(name = "horde-launch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: <config dir>/horde-launch/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    launch: LaunchArgs,
}

#[derive(Args)]
struct LaunchArgs {
    /// Start the session without attaching to it
    #[arg(long)]
    detach: bool,

    /// Extra arguments forwarded verbatim to the server
    ///
    /// Server flags that collide with the launcher's own (`-c`/`--config`,
    /// `-v`/`--verbose`, `--detach`) or words that name a subcommand are taken
    /// by the launcher. Put them after `--`, e.g. `horde-launch -- -c 4096`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    server_args: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the model files available for launch
    Models {
        /// Also look up each model's Horde name
        #[arg(long)]
        names: bool,
    },

    /// Show the resolved configuration and session status
    Info,

    /// Attach to the running server session
    Attach,

    /// Stop the running server session
    Stop,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "warn" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let config = cli.config.as_deref();
    match cli.command {
        None => commands::launch::run(config, cli.launch.detach, &cli.launch.server_args),
        Some(Commands::Models { names }) => commands::models::run(config, names),
        Some(Commands::Info) => commands::info::run(config),
        Some(Commands::Attach) => commands::session::attach(config),
        Some(Commands::Stop) => commands::session::stop(config),
    }
}
