use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const APP_DIR: &str = "voxlate";
const CONFIG_FILE: &str = "config.yaml";

pub const HTTP_URL_ENV: &str = "VOXLATE_HTTP_URL";
pub const WS_URL_ENV: &str = "VOXLATE_WS_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the user config directory")]
    NoConfigDir,

    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub job: JobConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_url: String,
    pub ws_url: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub default_target_language: Option<String>,
    pub default_voice: String,
    pub keep_original_audio: bool,
    pub generate_target_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_partial_text: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_url: "http://localhost:5000".to_string(),
            ws_url: "ws://localhost:5000".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            default_target_language: None,
            default_voice: "alloy".to_string(),
            keep_original_audio: false,
            generate_target_audio: false,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_partial_text: true,
        }
    }
}

/// Per-user directory holding the config and credential files.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

impl Config {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join(CONFIG_FILE))
    }

    /// Loads `path` (or the per-user config), falling back to defaults when
    /// no file exists, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load_from(&Self::default_path()?)?,
        };
        config.apply_env_overrides(lookup);
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let yaml = serde_yaml::to_string(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, yaml).map_err(io_err)?;

        info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(HTTP_URL_ENV).filter(|v| !v.is_empty()) {
            self.server.http_url = url;
        }
        if let Some(url) = lookup(WS_URL_ENV).filter(|v| !v.is_empty()) {
            self.server.ws_url = url;
        }
    }

    /// Command-line URLs, which win over both the file and the environment.
    pub fn override_urls(&mut self, http_url: Option<String>, ws_url: Option<String>) {
        if let Some(url) = http_url {
            self.server.http_url = url;
        }
        if let Some(url) = ws_url {
            self.server.ws_url = url;
        }
    }
}
