use dirs::home_dir;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::provider::ProviderInfo;
use crate::provider::built_in_providers;

/// Filename of the persisted unified model registry inside `~/.modeldock`.
const REGISTRY_FILENAME: &str = "registry.json";

fn default_daemon_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

/// Application configuration loaded from disk and merged with overrides.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Base URL of the local model daemon.
    #[serde(default = "default_daemon_base_url")]
    pub daemon_base_url: String,

    /// User-defined provider entries; they override or extend the built-in
    /// defaults keyed by provider id.
    #[serde(default)]
    pub providers: HashMap<String, ProviderInfo>,
}

/// Optional overrides for user configuration (e.g., from CLI flags).
#[derive(Default, Debug, Clone)]
pub struct ConfigOverrides {
    pub daemon_base_url: Option<String>,
}

impl Config {
    /// Load configuration, optionally applying overrides (CLI flags). Merges
    /// ~/.modeldock/config.toml, built-in provider defaults, and any values
    /// provided in `overrides` (highest precedence).
    pub fn load_with_overrides(overrides: ConfigOverrides) -> std::io::Result<Self> {
        let mut cfg = Self::load_from_toml()?;

        // Built-in providers fill in anything the user did not define.
        for (id, info) in built_in_providers() {
            cfg.providers.entry(id).or_insert(info);
        }

        let ConfigOverrides { daemon_base_url } = overrides;
        if let Some(daemon_base_url) = daemon_base_url {
            cfg.daemon_base_url = daemon_base_url;
        }
        Ok(cfg)
    }

    /// Attempt to parse the file at `~/.modeldock/config.toml` into a Config.
    fn load_from_toml() -> std::io::Result<Self> {
        let config_toml_path = modeldock_dir()?.join("config.toml");
        match std::fs::read_to_string(&config_toml_path) {
            Ok(contents) => toml::from_str::<Self>(&contents).map_err(|e| {
                tracing::error!("Failed to parse config.toml: {e}");
                std::io::Error::new(std::io::ErrorKind::InvalidData, e)
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("config.toml not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => {
                tracing::error!("Failed to read config.toml: {e}");
                Err(e)
            }
        }
    }

    /// Path where the unified model registry is persisted.
    pub fn registry_path(&self) -> std::io::Result<PathBuf> {
        Ok(modeldock_dir()?.join(REGISTRY_FILENAME))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_base_url: default_daemon_base_url(),
            providers: HashMap::new(),
        }
    }
}

/// Returns the path to the modeldock configuration directory, `~/.modeldock`.
/// Does not create the directory.
pub fn modeldock_dir() -> std::io::Result<PathBuf> {
    let mut p = home_dir().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "could not find home directory")
    })?;
    p.push(".modeldock");
    Ok(p)
}
