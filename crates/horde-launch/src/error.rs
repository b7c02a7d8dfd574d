//! Error types for launcher operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigField;

/// Errors that can occur while preparing or launching a worker.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A required setting is empty.
    #[error("{0} is not set (set `{key}` in the config file or {env})", key = .0.key(), env = .0.env_var())]
    MissingSetting(ConfigField),

    /// A required path setting points at nothing.
    #[error("{field} does not exist: {}", .path.display())]
    PathNotFound { field: ConfigField, path: PathBuf },

    /// A path setting that must name a directory names something else.
    #[error("{field} is not a directory: {}", .path.display())]
    NotADirectory { field: ConfigField, path: PathBuf },

    /// The model directory holds no model files.
    #[error("No .{extension} model files found in {}", .dir.display())]
    NoModels { dir: PathBuf, extension: String },

    /// The config file could not be parsed.
    #[error("Invalid config file {}: {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The config file named on the command line is missing.
    #[error("Config file not found: {}", .0.display())]
    ConfigFileNotFound(PathBuf),

    /// The model name lookup failed.
    #[error("Model name lookup failed: {0}")]
    Lookup(String),

    /// The operator quit or closed the input stream.
    #[error("Aborted by operator")]
    Aborted,

    /// The multiplexer binary could not be executed.
    #[error("Terminal multiplexer '{0}' not found. Install tmux or set `multiplexer` in the config file")]
    MultiplexerNotFound(String),

    /// A multiplexer command ran but failed.
    #[error("Multiplexer error: {0}")]
    Multiplexer(String),

    /// No session to attach to.
    #[error("Session '{0}' is not running")]
    SessionNotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
