//! Configuration loading and management.

use crate::types::{DEFAULT_PROJECT, TodoStates};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub todo: TodoConfig,

    #[serde(default)]
    pub editor: EditorConfig,

    /// Project for tasks whose title has no `project:` prefix.
    #[serde(default = "default_project")]
    pub default_project: String,

    /// Log to this file when no explicit log target is given.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            todo: TodoConfig::default(),
            editor: EditorConfig::default(),
            default_project: default_project(),
            log_file: None,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Workflow states cycled by the todo toggle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoConfig {
    #[serde(default)]
    pub states: TodoStates,
}

/// External editor used for task drafts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Editor command; `$EDITOR` or vim when unset.
    #[serde(default)]
    pub command: Option<String>,

    /// Directory holding draft files.
    #[serde(default = "default_draft_dir")]
    pub draft_dir: PathBuf,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: None,
            draft_dir: default_draft_dir(),
        }
    }
}

impl EditorConfig {
    pub fn command(&self) -> String {
        self.command.clone().unwrap_or_else(|| "vim".to_string())
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mort")
}

fn default_db_path() -> PathBuf {
    data_dir().join("tasks.db")
}

fn default_draft_dir() -> PathBuf {
    data_dir().join("draft")
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_string()
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mort").join("config.yaml"))
    }

    /// Load configuration from the explicit path, `$MORT_CONFIG` or the
    /// default location, then apply environment overrides.
    ///
    /// An explicit path that cannot be loaded is an error; the implicit
    /// locations fall back to defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit {
            Self::load(path)?
        } else if let Ok(path) = std::env::var("MORT_CONFIG") {
            Self::load(&path)?
        } else {
            match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path).unwrap_or_else(|err| {
                    warn!(path = %path.display(), error = %err, "Ignoring unreadable config");
                    Self::default()
                }),
                _ => Self::default(),
            }
        };

        config.apply_env();
        debug!(db = %config.store.db_path.display(), "Loaded configuration");
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(db_path) = std::env::var("MORT_DB")
            && !db_path.is_empty()
        {
            self.store.db_path = PathBuf::from(db_path);
        }

        if self.editor.command.is_none()
            && let Ok(editor) = std::env::var("EDITOR")
            && !editor.is_empty()
        {
            self.editor.command = Some(editor);
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.store.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
