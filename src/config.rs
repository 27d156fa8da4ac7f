//! Configuration management for dm-side

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Remote endpoints for identifier lookups and comment retrieval
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Channel id resolution timing
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Timeline synchronization timing
    #[serde(default)]
    pub sync: SyncConfig,

    /// Playback source rebinding
    #[serde(default)]
    pub rebind: RebindConfig,

    /// Panel display switches
    #[serde(default)]
    pub display: DisplayConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    /// Base URL for the page list, season and binary comment APIs
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Base URL for the legacy XML comment files
    #[serde(default = "default_comment_base")]
    pub comment_base: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// How long in-page state is polled before falling back to the network (ms)
    #[serde(default = "default_max_wait")]
    pub max_wait_ms: u64,

    /// Delay between in-page state polls (ms)
    #[serde(default = "default_resolver_poll")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Periodic tick interval (ms)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Minimum playback time change that triggers a continuous update (seconds)
    #[serde(default = "default_dead_band")]
    pub dead_band_secs: f64,

    /// Delay before the one-shot alignment after binding a source (ms)
    #[serde(default = "default_align_delay")]
    pub initial_align_delay_ms: u64,

    /// Fraction of the viewport height above the current comment after scrolling
    #[serde(default = "default_anchor_ratio")]
    pub scroll_anchor_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RebindConfig {
    /// Interval between scans for a better playback source (ms)
    #[serde(default = "default_scan_interval")]
    pub scan_interval_ms: u64,

    /// Consecutive scans a new candidate must win before it is bound
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Whether continuous highlight updates run at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

// Default value functions
fn default_api_base() -> String {
    "https://api.bilibili.com".to_string()
}

fn default_comment_base() -> String {
    "https://comment.bilibili.com".to_string()
}

fn default_user_agent() -> String {
    concat!("dm-side/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_wait() -> u64 {
    5000
}

fn default_resolver_poll() -> u64 {
    200
}

fn default_tick_interval() -> u64 {
    200
}

fn default_dead_band() -> f64 {
    0.05
}

fn default_align_delay() -> u64 {
    350
}

fn default_anchor_ratio() -> f64 {
    0.3
}

fn default_scan_interval() -> u64 {
    1000
}

fn default_stability_threshold() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            comment_base: default_comment_base(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: default_max_wait(),
            poll_interval_ms: default_resolver_poll(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            dead_band_secs: default_dead_band(),
            initial_align_delay_ms: default_align_delay(),
            scroll_anchor_ratio: default_anchor_ratio(),
        }
    }
}

impl Default for RebindConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: default_scan_interval(),
            stability_threshold: default_stability_threshold(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            resolver: ResolverConfig::default(),
            sync: SyncConfig::default(),
            rebind: RebindConfig::default(),
            display: DisplayConfig::default(),
            config_path: None,
        }
    }
}

impl ResolverConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl SyncConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn initial_align_delay(&self) -> Duration {
        Duration::from_millis(self.initial_align_delay_ms)
    }
}

impl RebindConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(1))
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let mut config = Config::default();
            config.config_path = Some(config_path);
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "dm-side", "dm-side")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}
