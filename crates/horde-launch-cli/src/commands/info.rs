//! Info command - show the resolved configuration.

use horde_launch::{paths, SessionState};
use std::path::Path;

use super::{load_config, report, session_manager};

pub(crate) fn run(config_path: Option<&Path>) -> miette::Result<()> {
    let config = load_config(config_path)?;
    let defaults = config.defaults();

    println!("horde-launch {}", env!("CARGO_PKG_VERSION"));
    println!("===================");
    println!();
    println!(
        "Config file:      {}",
        config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(paths::config_file)
            .display()
    );
    println!("Models directory: {}", config.models_dir().display());
    println!("Reference DB:     {}", config.reference_db().display());
    println!("Server:           {}", config.server_path().display());
    match &defaults.lookup_script {
        Some(script) => println!("Name lookup:      {}", script.display()),
        None => println!("Name lookup:      built-in GGUF matcher"),
    }
    println!();
    println!("Worker name:      {}", config.worker_name());
    println!("API key:          {}", config.masked_api_key());
    println!();
    println!(
        "Context sizes:    {}",
        defaults
            .context_sizes
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Default context:  {} local, {} Horde", defaults.context, defaults.horde_context);
    println!("Gen length:       {}", defaults.gen_length);
    println!("GPU layers:       {}", defaults.gpu_layers);
    println!("Port:             {}", defaults.port);
    println!();

    let sessions = session_manager(&config);
    let state = match sessions.state().map_err(report)? {
        SessionState::Active => "running",
        SessionState::Absent => "not running",
    };
    println!("Session '{}':  {}", sessions.name(), state);

    Ok(())
}
