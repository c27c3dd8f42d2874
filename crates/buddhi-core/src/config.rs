use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::reveal::{DEFAULT_REVEAL_DELAY, MIN_REVEAL_DELAY};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/gemini";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// User settings stored as JSON under the platform config directory.
/// Every field is optional; unset fields fall back to the defaults above.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Option<String>,
    pub reveal_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn endpoint_url(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn reveal_delay(&self) -> Duration {
        self.reveal_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REVEAL_DELAY)
            .max(MIN_REVEAL_DELAY)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Overlay values given on the command line or environment.
    pub fn merge(
        mut self,
        endpoint: Option<String>,
        reveal_delay_ms: Option<u64>,
        request_timeout_secs: Option<u64>,
    ) -> Self {
        if endpoint.is_some() {
            self.endpoint = endpoint;
        }
        if reveal_delay_ms.is_some() {
            self.reveal_delay_ms = reveal_delay_ms;
        }
        if request_timeout_secs.is_some() {
            self.request_timeout_secs = request_timeout_secs;
        }
        self
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("buddhi").join("config.json"))
    }

    /// Where the log file goes; the terminal itself belongs to the UI.
    pub fn log_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::cache_dir)
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("buddhi").join("buddhi.log"))
    }
}
