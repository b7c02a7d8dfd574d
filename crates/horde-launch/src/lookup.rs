//! Horde model name lookup.
//!
//! By default the name is found natively: the model's `general.name` (or its
//! file name without the quantization suffix) is fuzzy-matched against the
//! `model_name` entries of the reference database. A configured lookup script
//! replaces the native matcher. Any failure just means the name stays unknown.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::console::Console;
use crate::error::LaunchError;
use crate::gguf;

/// Maps a model file to its Horde model name.
pub trait NameLookup {
    /// Return the public name, or an empty string when nothing matched.
    fn lookup(&self, model: &Path, reference_db: &Path) -> Result<String, LaunchError>;
}

/// The lookup configured for `config`: the script if one is set, else [`GgufLookup`].
pub fn name_lookup(config: &RuntimeConfig) -> Box<dyn NameLookup> {
    let defaults = config.defaults();
    match &defaults.lookup_script {
        Some(script) => Box::new(ScriptLookup::new(defaults.python.clone(), script.clone())),
        None => Box::new(GgufLookup::default()),
    }
}

/// Runs `<python> <script> <model> <reference_db>` and reads the name from stdout.
#[derive(Debug, Clone)]
pub struct ScriptLookup {
    python: String,
    script: PathBuf,
}

impl ScriptLookup {
    pub fn new(python: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
        }
    }
}

impl NameLookup for ScriptLookup {
    fn lookup(&self, model: &Path, reference_db: &Path) -> Result<String, LaunchError> {
        debug!("Running {} {:?} on {:?}", self.python, self.script, model);
        let output = Command::new(&self.python)
            .arg(&self.script)
            .arg(model)
            .arg(reference_db)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| LaunchError::Lookup(format!("failed to run {}: {}", self.python, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LaunchError::Lookup(format!(
                "{:?} exited with {}: {}",
                self.script,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string())
    }
}

/// One entry of the reference database. Other fields are ignored.
#[derive(Debug, Deserialize)]
struct ReferenceEntry {
    #[serde(default)]
    model_name: String,
}

/// Native matcher over GGUF metadata and the JSON reference database.
#[derive(Debug, Clone)]
pub struct GgufLookup {
    /// Lowest score accepted as a match.
    threshold: f64,
    /// Score given when one normalized name contains the other.
    containment_score: f64,
}

impl Default for GgufLookup {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            containment_score: 0.7,
        }
    }
}

impl GgufLookup {
    /// Name the model identifies itself by.
    fn identifier(model: &Path) -> Result<String, LaunchError> {
        if let Some(name) = gguf::read_general_name(model)? {
            debug!("general.name of {:?}: {}", model, name);
            return Ok(name);
        }
        let file = model
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(strip_quant_suffix(&file))
    }

    /// Best-scoring `model_name` for `identifier`, if it clears the threshold.
    fn best_match<'a>(
        &self,
        identifier: &str,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Option<&'a str> {
        let wanted = normalize(identifier);
        if wanted.is_empty() {
            return None;
        }

        let mut best: Option<(&str, f64)> = None;
        for name in names {
            let candidate = normalize(name);
            if candidate.is_empty() {
                continue;
            }
            let mut score = strsim::normalized_levenshtein(&wanted, &candidate);
            if candidate.contains(&wanted) || wanted.contains(&candidate) {
                score = score.max(self.containment_score);
            }
            if best.map_or(score > 0.0, |(_, top)| score > top) {
                best = Some((name, score));
            }
        }

        best.filter(|(_, score)| *score >= self.threshold)
            .map(|(name, _)| name)
    }
}

impl NameLookup for GgufLookup {
    fn lookup(&self, model: &Path, reference_db: &Path) -> Result<String, LaunchError> {
        let text = fs::read_to_string(reference_db)?;
        let entries: BTreeMap<String, ReferenceEntry> = serde_json::from_str(&text)
            .map_err(|e| LaunchError::Lookup(format!("invalid reference database: {}", e)))?;

        let identifier = Self::identifier(model)?;
        let found = self.best_match(
            &identifier,
            entries.values().map(|entry| entry.model_name.as_str()),
        );
        debug!("Best match for '{}': {:?}", identifier, found);
        Ok(found.unwrap_or_default().to_string())
    }
}

/// Drop the `.gguf` extension and a trailing quantization tag like `-Q4_K_M`.
fn strip_quant_suffix(file_name: &str) -> String {
    static SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();
    let stem = file_name.strip_suffix(".gguf").unwrap_or(file_name);
    match SUFFIX.get_or_init(|| Regex::new(r"[-_]?Q\d+(?:_[A-Z_]+)?$").ok()) {
        Some(suffix) => suffix.replace(stem, "").into_owned(),
        None => stem.to_string(),
    }
}

/// Lowercase ASCII letters and digits only.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Resolve the Horde name for `model`, warning the operator when it stays unknown.
pub fn resolve_public_name<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    lookup: &dyn NameLookup,
    model: &Path,
    reference_db: &Path,
) -> Result<Option<String>, LaunchError> {
    match lookup.lookup(model, reference_db) {
        Ok(name) if !name.is_empty() => {
            info!("Resolved Horde model name: {}", name);
            console.say(format_args!("Horde model name: {}", name))?;
            Ok(Some(name))
        }
        Ok(_) => {
            warn!("No Horde model name matched {:?}", model);
            console.say("Warning: no Horde model name matched this file; launching without one.")?;
            Ok(None)
        }
        Err(e) => {
            warn!("{}", e);
            console.say(format_args!(
                "Warning: could not resolve the Horde model name ({}); launching without one.",
                e
            ))?;
            Ok(None)
        }
    }
}
