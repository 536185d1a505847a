// LogSift - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Parse misses, unparseable timestamps, missing files and empty result
// sets are NOT errors and never appear here.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogSift operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogSiftError {
    /// Reading log files failed.
    Load(LoadError),

    /// Filter input could not be interpreted.
    Filter(FilterError),

    /// A query was issued with invalid arguments.
    Query(QueryError),

    /// Snapshot, CSV, or chart artifact output failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for LogSiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(e) => write!(f, "Load error: {e}"),
            Self::Filter(e) => write!(f, "Filter error: {e}"),
            Self::Query(e) => write!(f, "Query error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for LogSiftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Load(e) => Some(e),
            Self::Filter(e) => Some(e),
            Self::Query(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Load errors
// ---------------------------------------------------------------------------

/// Errors raised while reading a log directory or a log file that exists.
#[derive(Debug)]
pub enum LoadError {
    /// I/O error while opening or reading a log file.
    Io { path: PathBuf, source: io::Error },

    /// Directory listing failed part-way through.
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "'{}': I/O error: {source}", path.display())
            }
            Self::Traversal { path, source } => {
                write!(f, "Error listing '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Traversal { source, .. } => Some(source),
        }
    }
}

impl From<LoadError> for LogSiftError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

// ---------------------------------------------------------------------------
// Filter errors
// ---------------------------------------------------------------------------

/// Errors related to filter input.
#[derive(Debug)]
pub enum FilterError {
    /// A start/end bound is not a recognisable date or date-time.
    InvalidTimeBound { input: String },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimeBound { input } => write!(
                f,
                "Cannot interpret '{input}' as a time bound. \
                 Expected RFC 3339, 'YYYY-MM-DDTHH:MM[:SS]' or 'YYYY-MM-DD'"
            ),
        }
    }
}

impl std::error::Error for FilterError {}

impl From<FilterError> for LogSiftError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// Errors related to query arguments.
#[derive(Debug)]
pub enum QueryError {
    /// Listing requested with a page size of zero.
    InvalidPageSize { size: usize },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPageSize { size } => {
                write!(f, "Page size must be at least 1 (got {size})")
            }
        }
    }
}

impl std::error::Error for QueryError {}

impl From<QueryError> for LogSiftError {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to snapshot, CSV, and chart artifact output.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing or reading an output file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error, or a corrupt snapshot on read-back.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for LogSiftError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for LogSiftError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for LogSift results.
pub type Result<T> = std::result::Result<T, LogSiftError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_load_error_keeps_io_source() {
        let err: LogSiftError = LoadError::Io {
            path: PathBuf::from("logs/access.log"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();

        let text = err.to_string();
        assert!(text.starts_with("Load error:"), "got {text}");
        assert!(text.contains("access.log"));
        let inner = err.source().expect("top-level error must expose its cause");
        assert!(inner.source().is_some(), "io::Error must stay in the chain");
    }

    #[test]
    fn test_invalid_page_size_message() {
        let err: LogSiftError = QueryError::InvalidPageSize { size: 0 }.into();
        assert_eq!(
            err.to_string(),
            "Query error: Page size must be at least 1 (got 0)"
        );
    }
}
