//! Ingest configuration: an optional TOML file, CLI overrides, and the
//! credentials read from the process environment.
//!
//! ```toml
//! tickers_file = "tickers.txt"
//! start = "2015-01-01"
//! end = "2025-12-31"     # omit for today
//! delay_secs = 12.5
//! limit = 50000
//! base_url = "https://api.polygon.io"
//! ```

use crate::data::polygon::{DEFAULT_BASE_URL, DEFAULT_LIMIT};
use crate::domain::{DateRange, InvalidRange, TickerError, TickerList};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const API_KEY_ENV: &str = "POLYGON_API_KEY";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("delay_secs must be a finite, non-negative number (got {0})")]
    InvalidDelay(f64),

    #[error("limit must be at least 1")]
    InvalidLimit,

    #[error(transparent)]
    Range(#[from] InvalidRange),

    #[error(transparent)]
    Tickers(#[from] TickerError),
}

/// Settings for one ingest run. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Whitespace-delimited ticker list.
    pub tickers_file: PathBuf,
    /// First day requested (inclusive).
    pub start: NaiveDate,
    /// Last day requested (inclusive). `None` means today.
    pub end: Option<NaiveDate>,
    /// Pause between tickers, in seconds.
    pub delay_secs: f64,
    /// Provider record cap per request.
    pub limit: u32,
    pub base_url: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tickers_file: PathBuf::from("tickers.txt"),
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            end: None,
            delay_secs: 12.5,
            limit: DEFAULT_LIMIT,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Values given on the command line; `Some` wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub tickers_file: Option<PathBuf>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub delay_secs: Option<f64>,
    pub limit: Option<u32>,
}

impl IngestConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.tickers_file {
            self.tickers_file = path;
        }
        if let Some(start) = overrides.start {
            self.start = start;
        }
        if let Some(end) = overrides.end {
            self.end = Some(end);
        }
        if let Some(delay) = overrides.delay_secs {
            self.delay_secs = delay;
        }
        if let Some(limit) = overrides.limit {
            self.limit = limit;
        }
    }

    /// Resolve the requested range, with `today` standing in for a missing end.
    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange, ConfigError> {
        Ok(DateRange::new(self.start, self.end.unwrap_or(today))?)
    }

    pub fn delay(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.delay_secs)
            .map_err(|_| ConfigError::InvalidDelay(self.delay_secs))
    }

    pub fn checked_limit(&self) -> Result<u32, ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::InvalidLimit);
        }
        Ok(self.limit)
    }

    /// Relative ticker paths resolve against `base_dir` (the config file's
    /// directory when one was given).
    pub fn load_tickers(&self, base_dir: Option<&Path>) -> Result<TickerList, ConfigError> {
        let path = match base_dir {
            Some(dir) if self.tickers_file.is_relative() => dir.join(&self.tickers_file),
            _ => self.tickers_file.clone(),
        };
        Ok(TickerList::from_file(&path)?)
    }
}

/// Provider API key and database connection string.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub database_url: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("database_url", &"***")
            .finish()
    }
}

/// Load `.env` from the working directory if one exists.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Read a required, non-blank value through `lookup`.
pub fn require_var(
    name: &'static str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(name))
}

impl Credentials {
    /// Read both values from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require_var(API_KEY_ENV, &lookup)?,
            database_url: require_var(DATABASE_URL_ENV, &lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = IngestConfig::from_toml("").unwrap();
        assert_eq!(cfg, IngestConfig::default());
        assert_eq!(cfg.delay().unwrap(), Duration::from_millis(12_500));
        assert_eq!(cfg.limit, 50_000);
        assert_eq!(cfg.start, d(2015, 1, 1));
    }

    #[test]
    fn toml_fields_parse() {
        let cfg = IngestConfig::from_toml(
            r#"
            tickers_file = "universe/us.txt"
            start = "2020-01-01"
            end = "2020-12-31"
            delay_secs = 0.5
            limit = 100
            "#,
        )
        .unwrap();
        assert_eq!(cfg.tickers_file, PathBuf::from("universe/us.txt"));
        assert_eq!(cfg.date_range(d(2030, 1, 1)).unwrap().end(), d(2020, 12, 31));
        assert_eq!(cfg.delay().unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(matches!(
            IngestConfig::from_toml("delay = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn overrides_win_over_file() {
        let mut cfg = IngestConfig::from_toml("delay_secs = 5.0\nlimit = 10").unwrap();
        cfg.apply(ConfigOverrides {
            delay_secs: Some(1.0),
            end: Some(d(2021, 6, 30)),
            ..Default::default()
        });
        assert_eq!(cfg.delay_secs, 1.0);
        assert_eq!(cfg.limit, 10);
        assert_eq!(cfg.end, Some(d(2021, 6, 30)));
    }

    #[test]
    fn missing_end_means_today() {
        let cfg = IngestConfig::default();
        let range = cfg.date_range(d(2026, 10, 15)).unwrap();
        assert_eq!(range.end(), d(2026, 10, 15));
    }

    #[test]
    fn reversed_range_is_config_error() {
        let mut cfg = IngestConfig::default();
        cfg.end = Some(d(2010, 1, 1));
        assert!(matches!(
            cfg.date_range(d(2026, 1, 1)),
            Err(ConfigError::Range(_))
        ));
    }

    #[test]
    fn negative_delay_rejected() {
        let mut cfg = IngestConfig::default();
        cfg.delay_secs = -1.0;
        assert!(matches!(cfg.delay(), Err(ConfigError::InvalidDelay(_))));
        cfg.delay_secs = f64::NAN;
        assert!(cfg.delay().is_err());
    }

    #[test]
    fn zero_limit_rejected() {
        let mut cfg = IngestConfig::default();
        cfg.limit = 0;
        assert!(matches!(cfg.checked_limit(), Err(ConfigError::InvalidLimit)));
    }

    #[test]
    fn credentials_require_both_vars() {
        let env: HashMap<&str, &str> = [(API_KEY_ENV, "key")].into_iter().collect();
        let err = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(DATABASE_URL_ENV)));
    }

    #[test]
    fn blank_credentials_are_missing() {
        let err = require_var(API_KEY_ENV, |_| Some("  ".into())).unwrap_err();
        assert_eq!(err.to_string(), "environment variable POLYGON_API_KEY is not set");
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials {
            api_key: "secret".into(),
            database_url: "postgres://u:p@h/db".into(),
        };
        let shown = format!("{creds:?}");
        assert!(!shown.contains("secret"));
        assert!(!shown.contains("u:p"));
    }

    #[test]
    fn relative_tickers_file_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tickers.txt"), "AAA BBB").unwrap();
        let cfg = IngestConfig::default();
        let list = cfg.load_tickers(Some(dir.path())).unwrap();
        assert_eq!(list.len(), 2);
    }
}
