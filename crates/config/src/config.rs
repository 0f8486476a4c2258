//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
    /// TOML serialization error
    Serialize(toml::ser::Error),
    /// A value is outside its allowed range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Serialize(e) => write!(f, "Failed to serialize config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigError::Serialize(e)
    }
}

/// Folder and tool locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Folder holding raw downloads to normalize
    #[serde(default = "default_input_folder")]
    pub input_folder: PathBuf,
    /// Folder receiving normalized mp3 files
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,
    /// Folder the extractor downloads into
    #[serde(default = "default_download_folder")]
    pub download_folder: PathBuf,
    /// ffmpeg binary (name on PATH or absolute path)
    #[serde(default = "default_encoder_binary")]
    pub encoder_binary: PathBuf,
    /// yt-dlp binary (name on PATH or absolute path)
    #[serde(default = "default_extractor_binary")]
    pub extractor_binary: PathBuf,
}

fn library_root() -> PathBuf {
    dirs::audio_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("harvest")
}

fn default_input_folder() -> PathBuf {
    library_root().join("incoming")
}

fn default_output_folder() -> PathBuf {
    library_root().join("normalized")
}

// Downloads land where the converter picks them up.
fn default_download_folder() -> PathBuf {
    default_input_folder()
}

fn default_encoder_binary() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_extractor_binary() -> PathBuf {
    PathBuf::from("yt-dlp")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_folder: default_input_folder(),
            output_folder: default_output_folder(),
            download_folder: default_download_folder(),
            encoder_binary: default_encoder_binary(),
            extractor_binary: default_extractor_binary(),
        }
    }
}

/// Download batch limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcquisitionConfig {
    /// Number of concurrent download workers (>= 1)
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,
    /// Attempts per identifier (>= 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff in seconds, multiplied by the attempt number
    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: f64,
}

fn default_max_workers() -> u32 {
    3
}

fn default_max_retries() -> u32 {
    6
}

fn default_retry_backoff_seconds() -> f64 {
    2.0
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            max_retries: default_max_retries(),
            retry_backoff_seconds: default_retry_backoff_seconds(),
        }
    }
}

impl AcquisitionConfig {
    /// Base backoff as a duration. Negative or non-finite values collapse to zero.
    pub fn retry_backoff(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_backoff_seconds).unwrap_or(Duration::ZERO)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading `~` component (including `~user/...`) are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) if rest.as_os_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Parses the file and fills missing optional fields with defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - HARVEST_INPUT_FOLDER -> paths.input_folder
    /// - HARVEST_OUTPUT_FOLDER -> paths.output_folder
    /// - HARVEST_DOWNLOAD_FOLDER -> paths.download_folder
    /// - HARVEST_ENCODER_BINARY -> paths.encoder_binary
    /// - HARVEST_EXTRACTOR_BINARY -> paths.extractor_binary
    /// - HARVEST_MAX_WORKERS -> acquisition.max_workers
    /// - HARVEST_MAX_RETRIES -> acquisition.max_retries
    /// - HARVEST_RETRY_BACKOFF_SECONDS -> acquisition.retry_backoff_seconds
    ///
    /// Empty path values and unparsable numbers are ignored.
    pub fn apply_env_overrides(&mut self) {
        let path_overrides = [
            ("HARVEST_INPUT_FOLDER", &mut self.paths.input_folder),
            ("HARVEST_OUTPUT_FOLDER", &mut self.paths.output_folder),
            ("HARVEST_DOWNLOAD_FOLDER", &mut self.paths.download_folder),
            ("HARVEST_ENCODER_BINARY", &mut self.paths.encoder_binary),
            ("HARVEST_EXTRACTOR_BINARY", &mut self.paths.extractor_binary),
        ];
        for (key, slot) in path_overrides {
            if let Ok(val) = env::var(key) {
                let val = val.trim();
                if !val.is_empty() {
                    *slot = PathBuf::from(val);
                }
            }
        }

        if let Ok(val) = env::var("HARVEST_MAX_WORKERS") {
            if let Ok(workers) = val.trim().parse::<u32>() {
                self.acquisition.max_workers = workers;
            }
        }

        if let Ok(val) = env::var("HARVEST_MAX_RETRIES") {
            if let Ok(retries) = val.trim().parse::<u32>() {
                self.acquisition.max_retries = retries;
            }
        }

        if let Ok(val) = env::var("HARVEST_RETRY_BACKOFF_SECONDS") {
            if let Ok(secs) = val.trim().parse::<f64>() {
                self.acquisition.retry_backoff_seconds = secs;
            }
        }
    }

    /// Expand `~` in every configured folder and tool path
    pub fn expand_paths(&mut self) {
        for slot in [
            &mut self.paths.input_folder,
            &mut self.paths.output_folder,
            &mut self.paths.download_folder,
            &mut self.paths.encoder_binary,
            &mut self.paths.extractor_binary,
        ] {
            *slot = expand_home(slot);
        }
    }

    /// Check the acquisition limits
    ///
    /// `max_workers` and `max_retries` must be at least 1 and the backoff must be
    /// a finite, non-negative number of seconds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let acq = &self.acquisition;
        if acq.max_workers < 1 {
            return Err(ConfigError::Invalid(
                "acquisition.max_workers must be at least 1".to_string(),
            ));
        }
        if acq.max_retries < 1 {
            return Err(ConfigError::Invalid(
                "acquisition.max_retries must be at least 1".to_string(),
            ));
        }
        if !acq.retry_backoff_seconds.is_finite() || acq.retry_backoff_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "acquisition.retry_backoff_seconds must be a non-negative number, got {}",
                acq.retry_backoff_seconds
            )));
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Self, ConfigError> {
        self.apply_env_overrides();
        self.expand_paths();
        self.validate()?;
        Ok(self)
    }

    /// Load configuration from file, apply environment overrides and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_from_file(path)?.finish()
    }

    /// Like [`Config::load`], but a missing file yields the defaults
    ///
    /// Environment overrides and validation still apply. Returns whether the file existed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<(Self, bool), ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Ok((Self::load(path)?, true))
        } else {
            Ok((Self::default().finish()?, false))
        }
    }
}
