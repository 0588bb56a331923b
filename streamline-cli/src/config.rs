use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use streamline::{roles::Role, ApiUrl};

pub const ENV_PREFIX: &str = "STREAMLINE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamlineConfig {
    /// Base URL of the API, e.g. "http://localhost:4000/api"
    pub api_url: String,
    /// Role used by `--dev` runs when no session is saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Default for StreamlineConfig {
    fn default() -> Self {
        Self {
            api_url: ApiUrl::DEFAULT.to_string(),
            role: None,
        }
    }
}

pub fn root_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Cannot determine config directory")?
        .join("streamline"))
}

impl StreamlineConfig {
    pub fn config_path() -> Result<PathBuf> {
        Ok(root_path()?.join("config.toml"))
    }

    /// Defaults, then the config file if present, then `STREAMLINE_*` variables.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("api_url", ApiUrl::DEFAULT)?
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).prefix_separator("_"))
            .build()
            .with_context(|| format!("Failed to read config at {}", path.display()))?;

        settings
            .try_deserialize::<Self>()
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn api_url(&self) -> ApiUrl {
        ApiUrl::new(self.api_url.clone())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Returns the config path, writing a default file there first if missing.
    pub fn ensure_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }
}
