// Settings file loading

use liquiscrape_scanner::RetryPolicy;
use liquiscrape_scanner::ValidationPolicy;
use liquiscrape_scanner::proxy::{
    COMMON_PROXY_PORTS, DEFAULT_LISTING_URL, DEFAULT_MIN_LIVE, DEFAULT_PROBE_CONCURRENCY,
    DEFAULT_TARGET_URL, MAX_LISTING_ROWS,
};
use liquiscrape_scanner::roster::DEFAULT_STATISTICS_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SETTINGS_PATH: &str = "./settings/settings.json";
pub const DEFAULT_LOG_DIR: &str = "./logs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

fn default_image_threads() -> usize {
    2
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_DIR)
}

fn default_site_url() -> String {
    "https://liquipedia.net".to_string()
}

fn default_export_format() -> String {
    "csv".to_string()
}

/// Contents of `settings.json`. The first four fields are required; every
/// section below them falls back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Page workers
    pub thread_num: usize,
    /// Seed file: CSV with a `Link` column or one URL per line
    pub input_file_path: PathBuf,
    /// Directory export files are written to
    pub output_file_path: PathBuf,
    pub image_dir: PathBuf,
    #[serde(default = "default_image_threads")]
    pub image_thread_num: usize,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Base for relative links on roster pages
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_export_format")]
    pub export_format: String,
    #[serde(default)]
    pub proxy: ProxySettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub active: ActiveSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyName {
    #[default]
    UntilMinimum,
    SinglePass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub listing_url: String,
    pub target_url: String,
    pub ports: Vec<u16>,
    pub max_listing_rows: usize,
    pub probe_concurrency: usize,
    pub probe_timeout_secs: u64,
    pub min_live: usize,
    pub policy: PolicyName,
    /// Discovery rounds before giving up; `null` keeps trying.
    pub max_rounds: Option<u32>,
    pub round_delay_ms: u64,
    /// `host:port` entries used as-is instead of discovery
    pub static_proxies: Vec<String>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            target_url: DEFAULT_TARGET_URL.to_string(),
            ports: COMMON_PROXY_PORTS.to_vec(),
            max_listing_rows: MAX_LISTING_ROWS,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            probe_timeout_secs: 10,
            min_live: DEFAULT_MIN_LIVE,
            policy: PolicyName::default(),
            max_rounds: None,
            round_delay_ms: 2000,
            static_proxies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub image_timeout_secs: u64,
    /// `null` retries forever.
    pub max_attempts: Option<u32>,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub min_image_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            image_timeout_secs: 30,
            max_attempts: Some(8),
            backoff_base_ms: 250,
            backoff_max_ms: 10_000,
            min_image_bytes: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveSettings {
    pub statistics_url: String,
}

impl Default for ActiveSettings {
    fn default() -> Self {
        Self {
            statistics_url: DEFAULT_STATISTICS_URL.to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let mut settings: Settings =
            serde_json::from_str(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_num == 0 {
            return Err(ConfigError::Invalid("thread_num must be at least 1".to_string()));
        }
        if self.image_thread_num == 0 {
            return Err(ConfigError::Invalid(
                "image_thread_num must be at least 1".to_string(),
            ));
        }
        if self.proxy.ports.is_empty() && self.proxy.static_proxies.is_empty() {
            return Err(ConfigError::Invalid("proxy.ports must not be empty".to_string()));
        }
        if self.fetch.max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "fetch.max_attempts must be at least 1 or null".to_string(),
            ));
        }
        Ok(())
    }

    fn expand_paths(&mut self) {
        for path in [
            &mut self.input_file_path,
            &mut self.output_file_path,
            &mut self.image_dir,
            &mut self.log_dir,
        ] {
            *path = expand(path);
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let base = RetryPolicy {
            max_attempts: self.fetch.max_attempts,
            ..RetryPolicy::default()
        };
        base.with_backoff(
            Duration::from_millis(self.fetch.backoff_base_ms),
            Duration::from_millis(self.fetch.backoff_max_ms),
        )
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        match self.proxy.policy {
            PolicyName::UntilMinimum => ValidationPolicy::UntilMinimum(self.proxy.min_live),
            PolicyName::SinglePass => ValidationPolicy::SinglePass,
        }
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.image_timeout_secs)
    }
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}
