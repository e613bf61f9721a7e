use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::debounce::{ForegroundDebouncer, DEFAULT_DEBOUNCE_WINDOW_MS};
use crate::engine::{BlockDecisionEngine, DEFAULT_REDIRECT_DELAY_MS};
use crate::exemption::ExemptionFilter;
use crate::policy::BlockPolicy;

pub const DEFAULT_HOST_APP_ID: &str = "com.example.blockwatch";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the local data directory for blockwatch.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("blockwatch");
    Ok(path)
}

/// Tunables of the monitor, read from `config.toml` in the data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Identifier of the host application; never blocked, and the target of redirects
    pub host_app_id: String,
    pub debounce_window_ms: u32,
    pub redirect_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host_app_id: DEFAULT_HOST_APP_ID.to_string(),
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            redirect_delay_ms: DEFAULT_REDIRECT_DELAY_MS,
        }
    }
}

impl MonitorConfig {
    /// Load `config.toml` from `data_dir`, falling back to defaults when absent
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
        log::info!("Loaded monitor config from {}", path.display());
        Ok(config)
    }

    #[must_use]
    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    /// Assemble a decision engine wired to this configuration
    #[must_use]
    pub fn build_engine(&self, policy: std::sync::Arc<dyn BlockPolicy>) -> BlockDecisionEngine {
        BlockDecisionEngine::new(
            ForegroundDebouncer::with_window(self.debounce_window_ms),
            ExemptionFilter::new(self.host_app_id.clone()),
            policy,
        )
        .with_redirect_delay(self.redirect_delay())
    }
}
