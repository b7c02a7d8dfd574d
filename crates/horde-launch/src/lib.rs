//! Launcher core for Horde inference workers.
//!
//! This crate turns an operator's choices into a running worker: it validates
//! the configured paths and credentials, lets the operator pick a model and
//! tuning parameters, builds the server invocation and hosts it inside a
//! named tmux session that survives disconnects.

mod command;
mod config;
mod console;
mod error;
mod gguf;
mod lookup;
mod models;
mod params;
pub mod paths;
mod session;

pub use command::{LaunchCommand, LaunchRequest};
pub use config::{ConfigField, LaunchDefaults, RuntimeConfig, Settings};
pub use console::Console;
pub use error::LaunchError;
pub use lookup::{name_lookup, resolve_public_name, GgufLookup, NameLookup, ScriptLookup};
pub use models::{find_models, list_models, select_model, ModelSelection};
pub use params::{
    collect_advanced, collect_gen_length, select_context, AdvancedParams, ContextCatalog,
    ContextSizes, TensorSplit,
};
pub use session::{
    wrap_with_exit_notice, LaunchOutcome, Multiplexer, SessionManager, SessionState, Tmux,
};

/// Default port the inference server listens on.
pub const DEFAULT_PORT: &str = "5001";

/// Default name of the tmux session hosting the server.
pub const DEFAULT_SESSION_NAME: &str = "horde";

/// Default model file extension.
pub const DEFAULT_MODEL_EXTENSION: &str = "gguf";
