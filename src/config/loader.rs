//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `~/.config/repogauge/config.toml` (global defaults)
//! 4. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::env::Env;
use crate::models::Backend;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config directory")]
    NoConfigDir,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub credentials: CredentialsConfig,
}

/// Stored API secrets. Loaded into the credential vault at startup
/// alongside any environment-supplied ones.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub github_tokens: Vec<String>,
    pub llm_keys: Vec<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("github_tokens", &format!("[{} REDACTED]", self.github_tokens.len()))
            .field("llm_keys", &format!("[{} REDACTED]", self.llm_keys.len()))
            .finish()
    }
}

/// LLM backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub backend: Backend,
    /// Explicit model identifier. `None` means the backend's default.
    pub model: Option<String>,
    /// Override of the backend's API root (self-hosted daemon, proxy).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// The model to request: the configured one, or the backend default.
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.backend.default_model().to_string())
    }
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads the global config file if present, then applies environment
    /// variable overrides. CLI flags are merged by the caller.
    pub fn load(env: &Env) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load a config from a specific file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("config.toml"))
    }

    /// Load only the global config file, for read-modify-write edits.
    /// Missing file yields the default config.
    pub fn load_global_file() -> Result<Self, ConfigError> {
        match Self::global_config_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            Some(_) => Ok(Config::default()),
            None => Err(ConfigError::NoConfigDir),
        }
    }

    /// Write this config to the global config file, creating the
    /// directory if needed.
    pub fn save_global(&self) -> Result<(), ConfigError> {
        let path = Self::global_config_path().ok_or(ConfigError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
                path: path.clone(),
                source: e,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content).map_err(|e| ConfigError::WriteFile { path, source: e })
    }

    /// Merge another config into this one (other takes precedence for
    /// non-default values).
    fn merge(&mut self, other: Config) {
        if other.provider.backend != Backend::default() {
            self.provider.backend = other.provider.backend;
        }
        if other.provider.model.is_some() {
            self.provider.model = other.provider.model;
        }
        if other.provider.base_url.is_some() {
            self.provider.base_url = other.provider.base_url;
        }
        if !other.credentials.github_tokens.is_empty() {
            self.credentials.github_tokens = other.credentials.github_tokens;
        }
        if !other.credentials.llm_keys.is_empty() {
            self.credentials.llm_keys = other.credentials.llm_keys;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Ok(val) = env.var(crate::constants::ENV_BACKEND) {
            if let Ok(backend) = val.parse::<Backend>() {
                self.provider.backend = backend;
            } else {
                eprintln!(
                    "Warning: ignoring invalid {} value: {val}",
                    crate::constants::ENV_BACKEND
                );
            }
        }
        if let Ok(val) = env.var(crate::constants::ENV_MODEL) {
            self.provider.model = Some(val);
        }
        if let Ok(val) = env.var(crate::constants::ENV_BASE_URL) {
            self.provider.base_url = Some(val);
        }
    }
}
