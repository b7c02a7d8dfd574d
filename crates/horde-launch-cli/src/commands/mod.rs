//! CLI commands.

pub mod info;
pub mod launch;
pub mod models;
pub mod session;

use horde_launch::{LaunchError, RuntimeConfig, SessionManager, Settings, Tmux};
use std::path::Path;

/// Load and validate the configuration. Nothing else runs if this fails.
pub(crate) fn load_config(path: Option<&Path>) -> miette::Result<RuntimeConfig> {
    Settings::load(path)
        .and_then(Settings::validate)
        .map_err(|e| miette::miette!("{}", e))
}

/// Session manager for the configured tmux session.
pub(crate) fn session_manager(config: &RuntimeConfig) -> SessionManager<Tmux> {
    let defaults = config.defaults();
    SessionManager::new(
        Tmux::new(defaults.multiplexer.clone()),
        defaults.session_name.clone(),
    )
}

/// Convert a library error into a report.
pub(crate) fn report(e: LaunchError) -> miette::Report {
    miette::miette!("{}", e)
}
