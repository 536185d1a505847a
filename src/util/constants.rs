// LogSift - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogSift";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogSift";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Paths
// =============================================================================

/// Default directory holding the access/error logs to analyse.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default directory for the JSON snapshot and chart artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// File name of the snapshot written by a full analysis run.
pub const SNAPSHOT_FILE_NAME: &str = "analysis_results.json";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

// =============================================================================
// Log file recognition
// =============================================================================

/// Glob patterns (file name only) for files the log store will load.
pub const LOG_FILE_PATTERNS: &[&str] = &["*.log", "*.err", "*.error"];

/// Glob patterns that classify a recognised file as an error log.
/// Anything else that matches `LOG_FILE_PATTERNS` is an access log.
pub const ERROR_LOG_PATTERNS: &[&str] = &["*.error.log", "*.err", "*.error", "error.log"];

// =============================================================================
// Analysis defaults and bounds
// =============================================================================

/// Length of the top source address / top URL lists.
pub const DEFAULT_TOP_N: usize = 10;

/// Hard upper bound on the configurable top-N length.
pub const MAX_TOP_N: usize = 100;

/// Number of standard deviations above the mean a source address must
/// exceed to be reported as high frequency.
pub const DEFAULT_HIGH_FREQUENCY_SIGMA: f64 = 2.0;

/// Largest configurable sigma multiplier.
pub const MAX_HIGH_FREQUENCY_SIGMA: f64 = 10.0;

/// Percentile (0.0-1.0 exclusive) above which a response is "large".
pub const DEFAULT_LARGE_REQUEST_PERCENTILE: f64 = 0.95;

/// Reason attached to every high-frequency address finding.
pub const HIGH_FREQUENCY_REASON: &str = "High request frequency";

// =============================================================================
// Listing
// =============================================================================

/// Default number of records per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Hard upper bound on the configurable page size.
pub const MAX_PAGE_SIZE: usize = 1_000;

// =============================================================================
// Chart artifacts
// =============================================================================

/// Data file for the interval traffic trend.
pub const TRAFFIC_TREND_FILE_NAME: &str = "traffic_trend.csv";

/// Data file for the top source addresses chart.
pub const TOP_IPS_FILE_NAME: &str = "top_ips.csv";

/// Data file for the top URLs chart.
pub const TOP_URLS_FILE_NAME: &str = "top_urls.csv";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;
