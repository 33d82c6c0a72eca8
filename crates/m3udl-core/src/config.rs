use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::FetchOptions;
use crate::progress::PanelOptions;
use crate::retry::RetryPolicy;

/// Network timeouts (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connect timeout in seconds for probes and transfers.
    pub connect_secs: u64,
    /// Abort a transfer when it stays below 1 KiB/s for this many seconds.
    pub low_speed_secs: u64,
    /// Overall timeout in seconds for a metadata probe.
    pub probe_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 15,
            low_speed_secs: 30,
            probe_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/m3udl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct M3udlConfig {
    /// Maximum number of transfers running at once.
    pub concurrency: usize,
    /// Retry passes run after the main pass for failed tasks.
    pub max_retries: u32,
    /// Fixed delay in seconds before each retry attempt.
    pub retry_delay_secs: f64,
    /// Directory holding `.part` staging files.
    pub staging_dir: PathBuf,
    /// Receive buffer size in bytes for streaming transfers.
    pub chunk_size: usize,
    /// Lines kept free below the progress panel.
    #[serde(default = "default_panel_margin")]
    pub panel_margin: u16,
    /// Optional timeouts; if missing, built-in defaults are used.
    #[serde(default)]
    pub timeouts: Option<TimeoutConfig>,
}

fn default_panel_margin() -> u16 {
    3
}

impl Default for M3udlConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_retries: 3,
            retry_delay_secs: 1.0,
            staging_dir: PathBuf::from("downloads"),
            chunk_size: 8192,
            panel_margin: default_panel_margin(),
            timeouts: None,
        }
    }
}

impl M3udlConfig {
    /// Negative delays clamp to zero; non-finite or out-of-range ones fall
    /// back to the default delay.
    pub fn retry_policy(&self) -> RetryPolicy {
        let fallback = RetryPolicy::default();
        let secs = if self.retry_delay_secs < 0.0 {
            0.0
        } else {
            self.retry_delay_secs
        };
        let delay = match Duration::try_from_secs_f64(secs) {
            Ok(delay) => delay,
            Err(_) => {
                tracing::warn!(
                    retry_delay_secs = self.retry_delay_secs,
                    "unusable retry delay in config, using default"
                );
                fallback.delay
            }
        };
        RetryPolicy {
            max_retries: self.max_retries,
            delay,
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        let t = self.timeouts.clone().unwrap_or_default();
        FetchOptions {
            chunk_size: self.chunk_size,
            connect_timeout: Duration::from_secs(t.connect_secs),
            low_speed_time: Duration::from_secs(t.low_speed_secs),
            probe_timeout: Duration::from_secs(t.probe_secs),
            ..FetchOptions::default()
        }
    }

    pub fn panel_options(&self) -> PanelOptions {
        PanelOptions {
            margin: self.panel_margin,
            ..PanelOptions::default()
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("m3udl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<M3udlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = M3udlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: M3udlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
