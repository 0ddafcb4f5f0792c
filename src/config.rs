use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::calendar::festival::is_known_month;
use crate::error::ConfigError;
use crate::theme::ThemeConfig;

const APP_DIR: &str = "festival-calendar";
const CONFIG_ENV: &str = "FESTIVAL_CALENDAR_CONFIG";

pub const DEFAULT_YEAR: i32 = 2073;
pub const DEFAULT_MONTHS: [&str; 2] = ["Ashwin", "Kartik"];
pub const DEFAULT_ENDPOINT: &str =
    "https://bibhuticoder.github.io/nepali-calendar-api/api/{year}.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub year: i32,
    pub months: Vec<String>,
    /// Leave days without an event out of the list view.
    pub hide_non_events: bool,
    pub notes_path: Option<PathBuf>,
    pub source: SourceConfig,
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            year: DEFAULT_YEAR,
            months: DEFAULT_MONTHS.iter().map(|m| m.to_string()).collect(),
            hide_non_events: true,
            notes_path: None,
            source: SourceConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// URL template; `{year}` is replaced with the requested year.
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl Config {
    /// Load from the env override or the platform config dir. A missing file
    /// means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(content)?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        self.months.retain(|m| !m.trim().is_empty());
        if self.months.is_empty() {
            self.months = DEFAULT_MONTHS.iter().map(|m| m.to_string()).collect();
        }
        for month in &self.months {
            if !is_known_month(month) {
                warn!(month = %month, "configured month is not a known month name");
            }
        }
        if self.source.timeout_secs == 0 {
            warn!("source.timeout_secs must be at least 1, using 1");
            self.source.timeout_secs = 1;
        }
    }

    pub fn notes_path(&self) -> PathBuf {
        self.notes_path
            .clone()
            .unwrap_or_else(|| data_dir().join("notes.json"))
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Where notes and the log file live.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
