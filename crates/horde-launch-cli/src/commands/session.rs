//! Session commands - attach to or stop the server session.

use std::path::Path;

use super::{load_config, report, session_manager};

/// Attach to the running session.
pub(crate) fn attach(config_path: Option<&Path>) -> miette::Result<()> {
    let config = load_config(config_path)?;
    session_manager(&config).attach().map_err(report)
}

/// Stop the running session.
pub(crate) fn stop(config_path: Option<&Path>) -> miette::Result<()> {
    let config = load_config(config_path)?;
    let mut sessions = session_manager(&config);

    if sessions.stop().map_err(report)? {
        println!("Stopped session '{}'.", sessions.name());
    } else {
        println!("Session '{}' is not running.", sessions.name());
    }

    Ok(())
}
