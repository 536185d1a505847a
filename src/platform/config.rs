// LogSift - platform/config.rs
//
// Platform directory resolution and config.toml loading with per-field
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogSift configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logsift/ or %APPDATA%\LogSift\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub paths: PathsSection,
    pub analysis: AnalysisSection,
    pub listing: ListingSection,
    pub logging: LoggingSection,
}

/// `[paths]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// Directory holding the logs to analyse.
    pub log_dir: Option<String>,
    /// Directory for the snapshot and chart artifacts.
    pub output_dir: Option<String>,
}

/// `[analysis]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub top_n: Option<usize>,
    pub high_frequency_sigma: Option<f64>,
    pub large_request_percentile: Option<f64>,
}

/// `[listing]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ListingSection {
    pub page_size: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration.
///
/// Out-of-range values produce warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub log_dir: PathBuf,
    pub output_dir: PathBuf,
    pub top_n: usize,
    pub high_frequency_sigma: f64,
    pub large_request_percentile: f64,
    pub page_size: usize,

    /// Logging level string (read before tracing is initialised).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(constants::DEFAULT_LOG_DIR),
            output_dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
            top_n: constants::DEFAULT_TOP_N,
            high_frequency_sigma: constants::DEFAULT_HIGH_FREQUENCY_SIGMA,
            large_request_percentile: constants::DEFAULT_LARGE_REQUEST_PERCENTILE,
            page_size: constants::DEFAULT_PAGE_SIZE,
            log_level: None,
        }
    }
}

/// Load and validate a config file.
///
/// A missing file yields defaults with no warnings. An unreadable or
/// unparseable file is an error; the caller decides whether to fall back.
/// Returns the validated config plus non-fatal validation warnings.
pub fn load_config(path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config.toml found; using defaults");
        return Ok((AppConfig::default(), Vec::new()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let raw: RawConfig = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %path.display(), "Loaded config.toml");
    Ok(validate(raw))
}

/// Validate each field of a parsed config, accumulating all warnings.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings: Vec<String> = Vec::new();

    // -- Paths --
    if let Some(dir) = raw.paths.log_dir.filter(|d| !d.trim().is_empty()) {
        config.log_dir = PathBuf::from(dir);
    }
    if let Some(dir) = raw.paths.output_dir.filter(|d| !d.trim().is_empty()) {
        config.output_dir = PathBuf::from(dir);
    }

    // -- Analysis: top_n --
    if let Some(n) = raw.analysis.top_n {
        if (1..=constants::MAX_TOP_N).contains(&n) {
            config.top_n = n;
        } else {
            warnings.push(format!(
                "[analysis] top_n = {n} is out of range (1-{}). Using default ({}).",
                constants::MAX_TOP_N,
                constants::DEFAULT_TOP_N,
            ));
        }
    }

    // -- Analysis: high_frequency_sigma --
    if let Some(sigma) = raw.analysis.high_frequency_sigma {
        if sigma > 0.0 && sigma <= constants::MAX_HIGH_FREQUENCY_SIGMA {
            config.high_frequency_sigma = sigma;
        } else {
            warnings.push(format!(
                "[analysis] high_frequency_sigma = {sigma} is out of range (0-{}]. Using default ({}).",
                constants::MAX_HIGH_FREQUENCY_SIGMA,
                constants::DEFAULT_HIGH_FREQUENCY_SIGMA,
            ));
        }
    }

    // -- Analysis: large_request_percentile --
    if let Some(p) = raw.analysis.large_request_percentile {
        if p > 0.0 && p < 1.0 {
            config.large_request_percentile = p;
        } else {
            warnings.push(format!(
                "[analysis] large_request_percentile = {p} must be strictly between 0 and 1. \
                 Using default ({}).",
                constants::DEFAULT_LARGE_REQUEST_PERCENTILE,
            ));
        }
    }

    // -- Listing: page_size --
    if let Some(size) = raw.listing.page_size {
        if (1..=constants::MAX_PAGE_SIZE).contains(&size) {
            config.page_size = size;
        } else {
            warnings.push(format!(
                "[listing] page_size = {size} is out of range (1-{}). Using default ({}).",
                constants::MAX_PAGE_SIZE,
                constants::DEFAULT_PAGE_SIZE,
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    (config, warnings)
}
