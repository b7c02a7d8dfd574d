//! Launcher configuration.
//!
//! Settings are layered once at startup: built-in defaults, then the JSON
//! config file, then environment overrides. [`Settings::validate`] turns them
//! into a [`RuntimeConfig`], which every later step borrows and none mutate.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::LaunchError;
use crate::paths;
use crate::{DEFAULT_MODEL_EXTENSION, DEFAULT_PORT, DEFAULT_SESSION_NAME};

/// Context sizes offered when the config file does not list its own.
const DEFAULT_CONTEXT_SIZES: [u32; 9] = [
    2048, 4096, 8192, 12288, 16384, 24576, 32768, 65536, 131072,
];

/// A required setting, named in validation diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    ModelsDir,
    ApiKey,
    WorkerName,
    ReferenceDb,
    ServerPath,
}

impl ConfigField {
    /// Key in the JSON config file.
    pub fn key(self) -> &'static str {
        match self {
            Self::ModelsDir => "models_dir",
            Self::ApiKey => "api_key",
            Self::WorkerName => "worker_name",
            Self::ReferenceDb => "reference_db",
            Self::ServerPath => "server_path",
        }
    }

    /// Environment variable overriding the setting.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::ModelsDir => "HORDE_LAUNCH_MODELS_DIR",
            Self::ApiKey => "HORDE_LAUNCH_API_KEY",
            Self::WorkerName => "HORDE_LAUNCH_WORKER_NAME",
            Self::ReferenceDb => "HORDE_LAUNCH_REFERENCE_DB",
            Self::ServerPath => "HORDE_LAUNCH_SERVER",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ModelsDir => "Model directory",
            Self::ApiKey => "Horde API key",
            Self::WorkerName => "Horde worker name",
            Self::ReferenceDb => "Horde model reference database",
            Self::ServerPath => "Server entry point",
        };
        f.write_str(name)
    }
}

/// Raw settings as read from the config file and environment.
///
/// Empty strings mean "unset".
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory scanned for model files.
    pub models_dir: String,
    /// Horde API key.
    pub api_key: String,
    /// Horde worker name.
    pub worker_name: String,
    /// JSON database of Horde-approved model names.
    pub reference_db: String,
    /// Server entry point (a `.py` script or an executable).
    pub server_path: String,
    /// Interpreter used for `.py` entry points and the lookup script.
    pub python: String,
    /// Script mapping a model file to its Horde model name.
    pub lookup_script: String,
    /// tmux session name.
    pub session_name: String,
    /// Multiplexer binary.
    pub multiplexer: String,
    /// Model file extension, without the dot.
    pub model_extension: String,
    /// Context sizes offered in the menus.
    pub context_sizes: Vec<u32>,
    /// Default local context size.
    pub default_context: u32,
    /// Default context size advertised to the Horde.
    pub default_horde_context: u32,
    /// Default generation length advertised to the Horde.
    pub default_gen_length: String,
    /// Default GPU layer count.
    pub default_gpu_layers: String,
    /// Default server port.
    pub default_port: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models_dir: String::new(),
            api_key: String::new(),
            worker_name: String::new(),
            reference_db: String::new(),
            server_path: String::new(),
            python: "python3".to_string(),
            lookup_script: String::new(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            multiplexer: "tmux".to_string(),
            model_extension: DEFAULT_MODEL_EXTENSION.to_string(),
            context_sizes: DEFAULT_CONTEXT_SIZES.to_vec(),
            default_context: 8192,
            default_horde_context: 4096,
            default_gen_length: "512".to_string(),
            default_gpu_layers: "999".to_string(),
            default_port: DEFAULT_PORT.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, a config file and the environment.
    ///
    /// An explicit `path` must exist. Without one, the default config file is
    /// read if present.
    pub fn load(path: Option<&Path>) -> Result<Self, LaunchError> {
        let mut settings = match path {
            Some(path) if !path.exists() => {
                return Err(LaunchError::ConfigFileNotFound(path.to_path_buf()))
            }
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = paths::config_file();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No config file at {:?}, using defaults", default_path);
                    Self::default()
                }
            }
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Parse a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, LaunchError> {
        debug!("Reading config file {:?}", path);
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| LaunchError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets: [(&str, &mut String); 7] = [
            (ConfigField::ModelsDir.env_var(), &mut self.models_dir),
            (ConfigField::ApiKey.env_var(), &mut self.api_key),
            (ConfigField::WorkerName.env_var(), &mut self.worker_name),
            (ConfigField::ReferenceDb.env_var(), &mut self.reference_db),
            (ConfigField::ServerPath.env_var(), &mut self.server_path),
            ("HORDE_LAUNCH_LOOKUP_SCRIPT", &mut self.lookup_script),
            ("HORDE_LAUNCH_SESSION", &mut self.session_name),
        ];
        for (key, target) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                debug!("{} overrides config file", key);
                *target = value;
            }
        }
    }

    /// Check every required setting, stopping at the first problem.
    pub fn validate(self) -> Result<RuntimeConfig, LaunchError> {
        let models_dir = required_dir(ConfigField::ModelsDir, &self.models_dir)?;
        let api_key = required(ConfigField::ApiKey, &self.api_key)?.to_string();
        let worker_name = required(ConfigField::WorkerName, &self.worker_name)?.to_string();
        let reference_db = required_path(ConfigField::ReferenceDb, &self.reference_db)?;
        let server_path = required_path(ConfigField::ServerPath, &self.server_path)?;

        let lookup_script = Some(self.lookup_script.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(RuntimeConfig {
            models_dir,
            api_key,
            worker_name,
            reference_db,
            server_path,
            defaults: LaunchDefaults {
                python: self.python,
                lookup_script,
                session_name: self.session_name,
                multiplexer: self.multiplexer,
                model_extension: self.model_extension.trim_start_matches('.').to_string(),
                context_sizes: self.context_sizes,
                context: self.default_context,
                horde_context: self.default_horde_context,
                gen_length: self.default_gen_length,
                gpu_layers: self.default_gpu_layers,
                port: self.default_port,
            },
        })
    }
}

fn required(field: ConfigField, value: &str) -> Result<&str, LaunchError> {
    let value = value.trim();
    if value.is_empty() {
        Err(LaunchError::MissingSetting(field))
    } else {
        Ok(value)
    }
}

fn required_path(field: ConfigField, value: &str) -> Result<PathBuf, LaunchError> {
    let path = PathBuf::from(required(field, value)?);
    if !path.exists() {
        return Err(LaunchError::PathNotFound { field, path });
    }
    Ok(path)
}

fn required_dir(field: ConfigField, value: &str) -> Result<PathBuf, LaunchError> {
    let path = required_path(field, value)?;
    if !path.is_dir() {
        return Err(LaunchError::NotADirectory { field, path });
    }
    Ok(path)
}

/// Launch defaults and collaborator settings carried by a validated config.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchDefaults {
    pub python: String,
    pub lookup_script: Option<PathBuf>,
    pub session_name: String,
    pub multiplexer: String,
    pub model_extension: String,
    pub context_sizes: Vec<u32>,
    pub context: u32,
    pub horde_context: u32,
    pub gen_length: String,
    pub gpu_layers: String,
    pub port: String,
}

/// Validated configuration. Only obtainable through [`Settings::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    models_dir: PathBuf,
    api_key: String,
    worker_name: String,
    reference_db: PathBuf,
    server_path: PathBuf,
    defaults: LaunchDefaults,
}

impl RuntimeConfig {
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The API key with all but its last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        let visible = chars.len().saturating_sub(4);
        chars
            .iter()
            .enumerate()
            .map(|(i, c)| if i < visible { '*' } else { *c })
            .collect()
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    pub fn reference_db(&self) -> &Path {
        &self.reference_db
    }

    pub fn server_path(&self) -> &Path {
        &self.server_path
    }

    pub fn defaults(&self) -> &LaunchDefaults {
        &self.defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::{tempdir, TempDir};

    fn complete_settings() -> (TempDir, Settings) {
        let dir = tempdir().unwrap();
        let db = dir.path().join("db.json");
        let server = dir.path().join("koboldcpp.py");
        fs::write(&db, "{}").unwrap();
        fs::write(&server, "").unwrap();

        let settings = Settings {
            models_dir: dir.path().display().to_string(),
            api_key: "0000000000".to_string(),
            worker_name: "my worker".to_string(),
            reference_db: db.display().to_string(),
            server_path: server.display().to_string(),
            ..Settings::default()
        };
        (dir, settings)
    }

    fn missing_field(settings: Settings) -> ConfigField {
        match settings.validate() {
            Err(LaunchError::MissingSetting(field)) => field,
            other => panic!("expected missing setting, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_settings_validate() {
        let (_dir, settings) = complete_settings();
        let config = settings.validate().unwrap();
        assert_eq!(config.worker_name(), "my worker");
        assert_eq!(config.defaults().context, 8192);
        assert_eq!(config.defaults().lookup_script, None);
    }

    #[test]
    fn test_each_empty_field_is_named() {
        let (_dir, settings) = complete_settings();

        let cases = [
            (
                ConfigField::ModelsDir,
                Settings {
                    models_dir: String::new(),
                    ..settings.clone()
                },
            ),
            (
                ConfigField::ApiKey,
                Settings {
                    api_key: "  ".to_string(),
                    ..settings.clone()
                },
            ),
            (
                ConfigField::WorkerName,
                Settings {
                    worker_name: String::new(),
                    ..settings.clone()
                },
            ),
            (
                ConfigField::ReferenceDb,
                Settings {
                    reference_db: String::new(),
                    ..settings.clone()
                },
            ),
            (
                ConfigField::ServerPath,
                Settings {
                    server_path: String::new(),
                    ..settings.clone()
                },
            ),
        ];
        for (expected, settings) in cases {
            assert_eq!(missing_field(settings), expected);
        }
    }

    #[test]
    fn test_first_failure_wins() {
        let settings = Settings::default();
        assert_eq!(missing_field(settings), ConfigField::ModelsDir);
    }

    #[test]
    fn test_missing_paths_are_reported() {
        let (dir, settings) = complete_settings();
        let gone = dir.path().join("missing.json");

        let err = Settings {
            reference_db: gone.display().to_string(),
            ..settings.clone()
        }
        .validate()
        .unwrap_err();
        match err {
            LaunchError::PathNotFound { field, path } => {
                assert_eq!(field, ConfigField::ReferenceDb);
                assert_eq!(path, gone);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = Settings {
            server_path: gone.display().to_string(),
            ..settings
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().starts_with("Server entry point does not exist"));
    }

    #[test]
    fn test_models_dir_must_be_a_directory() {
        let (_dir, settings) = complete_settings();
        let file = settings.reference_db.clone();

        let err = Settings {
            models_dir: file.clone(),
            ..settings
        }
        .validate()
        .unwrap_err();
        match &err {
            LaunchError::NotADirectory { field, path } => {
                assert_eq!(*field, ConfigField::ModelsDir);
                assert_eq!(*path, PathBuf::from(&file));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().starts_with("Model directory is not a directory"));
    }

    #[test]
    fn test_missing_setting_message_names_key() {
        let msg = LaunchError::MissingSetting(ConfigField::ApiKey).to_string();
        assert!(msg.contains("Horde API key"));
        assert!(msg.contains("api_key"));
        assert!(msg.contains("HORDE_LAUNCH_API_KEY"));
    }

    #[test]
    fn test_config_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"worker_name": "box", "default_port": "5002"}"#).unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.worker_name, "box");
        assert_eq!(settings.default_port, "5002");
        assert_eq!(settings.python, "python3");
        assert_eq!(settings.context_sizes, DEFAULT_CONTEXT_SIZES.to_vec());
    }

    #[test]
    fn test_malformed_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Settings::from_file(&path),
            Err(LaunchError::ConfigFile { .. })
        ));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(matches!(
            Settings::load(Some(path.as_path())),
            Err(LaunchError::ConfigFileNotFound(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HORDE_LAUNCH_API_KEY", "from-env"),
            ("HORDE_LAUNCH_WORKER_NAME", ""),
            ("HORDE_LAUNCH_SESSION", "primary"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings {
            worker_name: "from-file".to_string(),
            ..Settings::default()
        };
        settings.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.api_key, "from-env");
        assert_eq!(settings.worker_name, "from-file");
        assert_eq!(settings.session_name, "primary");
    }

    #[test]
    fn test_masked_api_key() {
        let (_dir, settings) = complete_settings();
        let config = Settings {
            api_key: "abcdef123456".to_string(),
            ..settings
        }
        .validate()
        .unwrap();
        assert_eq!(config.masked_api_key(), "********3456");
    }
}
