// Settings: one explicit value built at startup and passed to every component

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use leadbase_collect::{CollectorConfig, PlacesOptions};
use leadbase_recon::{MergeConfig, PrefixClassifier};
use serde::Deserialize;

/// Environment variable holding the lookup API key. Never read from the settings file.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Settings file looked up in the working directory.
pub const LOCAL_FILE_NAME: &str = "leadbase.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse { path: Option<PathBuf>, message: String },
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Parse { path: Some(path), message } => {
                write!(f, "invalid settings in {}: {message}", path.display())
            }
            Self::Parse { path: None, message } => write!(f, "invalid settings: {message}"),
            Self::Validation(msg) => write!(f, "settings validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub merged_dir: PathBuf,
    pub backup_dir: PathBuf,
    /// File name the promoted master gets in `input_dir`.
    pub master_name: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        let data = PathBuf::from("data");
        Self {
            input_dir: data.join("input"),
            output_dir: data.join("output"),
            merged_dir: data.join("merged"),
            backup_dir: data.join("backup"),
            master_name: "master.xlsx".to_string(),
        }
    }
}

impl PathSettings {
    /// Default master location: `<input_dir>/<master_name>`.
    pub fn master_path(&self) -> PathBuf {
        self.input_dir.join(&self.master_name)
    }
}

/// Phone classification for the target market.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocaleSettings {
    pub country_code: String,
    pub mobile_prefix: char,
    /// Region bias sent to the lookup source (ISO 3166 alpha-2).
    pub region: String,
    pub language: String,
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self {
            country_code: "57".to_string(),
            mobile_prefix: '3',
            region: "co".to_string(),
            language: "es".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectSettings {
    /// Enrichment worker threads; 1 runs sequentially.
    pub workers: usize,
    pub rate_limit_per_minute: u32,
    pub max_attempts: usize,
    /// Appended to the category on attempts after the first.
    pub qualifiers: Vec<String>,
    /// Floor for the per-attempt result limit.
    pub min_results_per_attempt: usize,
    pub scan_emails: bool,
    /// Pages fetched per website when scanning for emails.
    pub max_pages: usize,
    pub timeout_secs: u64,
    /// Override for the lookup API base URL.
    pub base_url: Option<String>,
}

impl Default for CollectSettings {
    fn default() -> Self {
        let collector = CollectorConfig::default();
        let places = PlacesOptions::default();
        Self {
            workers: 1,
            rate_limit_per_minute: places.rate_limit_per_minute,
            max_attempts: collector.max_attempts,
            qualifiers: collector.qualifiers,
            min_results_per_attempt: collector.min_results_per_attempt,
            scan_emails: true,
            max_pages: 5,
            timeout_secs: places.timeout.as_secs(),
            base_url: None,
        }
    }
}

impl CollectSettings {
    /// Iterative-collection settings for [`leadbase_collect::IterativeCollector`].
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            max_attempts: self.max_attempts,
            qualifiers: self.qualifiers.clone(),
            min_results_per_attempt: self.min_results_per_attempt,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleanupSettings {
    pub max_age_days: u64,
    pub keep_merged: usize,
    pub keep_backups: usize,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self { max_age_days: 30, keep_merged: 5, keep_backups: 20 }
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub locale: LocaleSettings,
    pub merge: MergeConfig,
    pub collect: CollectSettings,
    pub cleanup: CleanupSettings,
}

impl Settings {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(input)
            .map_err(|e| ConfigError::Parse { path: None, message: e.to_string() })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.merge
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        if !self.locale.mobile_prefix.is_ascii_digit() {
            return Err(ConfigError::Validation(format!(
                "locale.mobile_prefix must be a digit, got '{}'",
                self.locale.mobile_prefix
            )));
        }
        if !self.locale.country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Validation(format!(
                "locale.country_code must be digits, got '{}'",
                self.locale.country_code
            )));
        }
        if self.collect.workers == 0 {
            return Err(ConfigError::Validation("collect.workers must be at least 1".into()));
        }
        if self.collect.max_attempts == 0 {
            return Err(ConfigError::Validation("collect.max_attempts must be at least 1".into()));
        }
        if self.collect.rate_limit_per_minute == 0 {
            return Err(ConfigError::Validation(
                "collect.rate_limit_per_minute must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Per-user settings file: `<config dir>/leadbase/settings.toml`.
    pub fn user_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("leadbase")
            .join("settings.toml")
    }

    /// Load settings from the first file found, falling back to defaults.
    ///
    /// Order: `explicit` (must exist), `./leadbase.toml`, the per-user file.
    /// Returns the settings and the file they came from, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Self::load_file(path).map(|s| (s, Some(path.to_path_buf())));
        }
        for candidate in [PathBuf::from(LOCAL_FILE_NAME), Self::user_config_path()] {
            if candidate.is_file() {
                let settings = Self::load_file(&candidate)?;
                return Ok((settings, Some(candidate)));
            }
        }
        log::debug!("no settings file found, using defaults");
        Ok((Self::default(), None))
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::Parse { message, .. } => {
                ConfigError::Parse { path: Some(path.to_path_buf()), message }
            }
            other => other,
        })?;
        log::debug!("settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Phone classifier for the configured locale.
    pub fn classifier(&self) -> PrefixClassifier {
        PrefixClassifier::new(self.locale.country_code.clone(), self.locale.mobile_prefix)
    }

    /// Lookup API key from the environment. Blank values count as unset.
    pub fn api_key() -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}
