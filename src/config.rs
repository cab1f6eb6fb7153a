use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointsConfig {
    /// Listing endpoint serving the per-exchange code listings.
    pub listing_base_url: String,
    /// Quote endpoint serving single-symbol price/volume data.
    pub quote_base_url: String,
    /// Fund site serving the profile and distribution-history pages.
    pub fund_base_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        EndpointsConfig {
            listing_base_url: "https://53.push2.eastmoney.com".to_string(),
            quote_base_url: "https://push2.eastmoney.com".to_string(),
            fund_base_url: "https://fundf10.eastmoney.com".to_string(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Vehicle codes to build; empty means every code on both exchanges.
    #[serde(default)]
    pub codes: Vec<String>,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "reitwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
