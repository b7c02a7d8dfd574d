//! Model discovery and selection.

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::console::Console;
use crate::error::LaunchError;
use crate::paths::has_extension;

/// The model the operator picked.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSelection {
    /// Path to the model file.
    pub path: PathBuf,
    /// Horde model name, when the lookup found one.
    pub public_name: Option<String>,
}

impl ModelSelection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            public_name: None,
        }
    }

    /// Attach the resolved Horde model name.
    pub fn with_public_name(mut self, name: Option<String>) -> Self {
        self.public_name = name;
        self
    }

    /// File name shown in menus.
    pub fn display_name(&self) -> String {
        file_label(&self.path)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// List model files in `dir`, sorted by file name.
///
/// An empty directory yields an empty list; callers decide whether that is
/// fatal.
pub fn list_models(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, LaunchError> {
    let mut models: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, extension))
        .collect();

    models.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));
    debug!("Found {} model file(s) in {:?}", models.len(), dir);

    Ok(models)
}

/// Like [`list_models`], but an empty result is [`LaunchError::NoModels`].
pub fn find_models(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, LaunchError> {
    let models = list_models(dir, extension)?;
    if models.is_empty() {
        return Err(LaunchError::NoModels {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
        });
    }
    Ok(models)
}

/// Show a numbered menu of `candidates` and return the operator's pick.
///
/// Typing `q` aborts. `candidates` must not be empty; see [`find_models`].
pub fn select_model<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    candidates: &[PathBuf],
) -> Result<ModelSelection, LaunchError> {
    console.say("Available models:")?;
    for (i, path) in candidates.iter().enumerate() {
        console.say(format_args!("  {:>2}) {}", i + 1, file_label(path)))?;
    }

    let prompt = format!("Select a model [1-{}, q to quit]: ", candidates.len());
    let choice = console.ask_until(&prompt, |answer| {
        if answer.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=candidates.len()).contains(&n) => Ok(Some(n - 1)),
            _ => Err(format!(
                "Invalid selection '{}'. Enter a number between 1 and {}.",
                answer,
                candidates.len()
            )),
        }
    })?;

    let index = choice.ok_or(LaunchError::Aborted)?;
    Ok(ModelSelection::new(candidates[index].clone()))
}
