//! Game configuration
//!
//! Persisted as JSON. Every field may be absent on disk and falls back to
//! its default.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::input::{default_commands, rebind, Action, BindError, Binding, Commands};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub window_size: WindowSize,
    pub use_vsync: bool,
    pub language: String,
    /// Free-form game settings.
    pub game: BTreeMap<String, serde_json::Value>,
    pub commands: Commands,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_size: WindowSize { x: 1280, y: 720 },
            use_vsync: true,
            language: "fr".to_string(),
            game: BTreeMap::new(),
            commands: default_commands(),
        }
    }
}

impl GameConfig {
    /// Read `path`, writing the defaults there first when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            info!(path = %path.display(), "default config written");
            return Ok(config);
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        // actions missing from older files get their default bindings
        for (name, action) in default_commands() {
            config.commands.entry(name).or_insert(action);
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(io_err)
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.commands.get(name)
    }

    pub fn rebind(&mut self, action: &str, binding: Binding) -> Result<(), BindError> {
        rebind(&mut self.commands, action, binding)
    }

    pub fn game_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.game.get(key)
    }
}
