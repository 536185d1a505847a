// LogSift - app/store.rs
//
// Log store: resolves file names under the configured log directory and
// loads them into parsed records.
//
// Every call re-reads from disk; nothing is cached between calls.
// Missing directories and missing files yield zero records, not errors.

use crate::core::discovery;
use crate::core::model::{LogFileInfo, LogRecord};
use crate::core::parser;
use crate::platform::fs::read_lines_tolerant;
use crate::util::constants::DEBUG_MAX_LINE_PREVIEW;
use crate::util::error::LoadError;
use std::io;
use std::path::{Path, PathBuf};

/// Read-only view over a directory of access and error logs.
#[derive(Debug, Clone)]
pub struct LogStore {
    log_dir: PathBuf,
}

impl LogStore {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Recognised log files, sorted by file name.
    pub fn list_log_files(&self) -> Result<Vec<LogFileInfo>, LoadError> {
        Ok(discovery::list_log_files(&self.log_dir)?
            .into_iter()
            .map(|f| f.info)
            .collect())
    }

    /// Load records from one file, or from every recognised file when
    /// `filename` is `None`.
    ///
    /// With every file, records are concatenated in file-name order and
    /// each file's records keep their line order.
    pub fn load(&self, filename: Option<&str>) -> Result<Vec<LogRecord>, LoadError> {
        match filename {
            Some(name) => match self.resolve(name) {
                Some(path) => self.load_file(&path),
                None => Ok(Vec::new()),
            },
            None => {
                let mut records = Vec::new();
                for file in discovery::list_log_files(&self.log_dir)? {
                    records.extend(self.load_file(&file.path)?);
                }
                tracing::debug!(
                    dir = %self.log_dir.display(),
                    records = records.len(),
                    "Loaded all log files"
                );
                Ok(records)
            }
        }
    }

    /// Map a caller-supplied file name to a path inside the log directory.
    ///
    /// Names with path separators or `.`/`..` never leave the directory;
    /// they resolve to nothing, as does a name with no regular file behind it.
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        if !discovery::is_plain_file_name(filename) {
            tracing::warn!(file = filename, "Rejected file name outside the log directory");
            return None;
        }
        let path = self.log_dir.join(filename);
        if path.is_file() {
            Some(path)
        } else {
            tracing::debug!(path = %path.display(), "Requested log file not found");
            None
        }
    }

    fn load_file(&self, path: &Path) -> Result<Vec<LogRecord>, LoadError> {
        let mut records = Vec::new();
        let mut misses = 0usize;

        let result = read_lines_tolerant(path, |line| match parser::parse_line(line) {
            Some(record) => records.push(record),
            None => {
                misses += 1;
                tracing::trace!(file = %path.display(), line = %preview(line), "Unrecognised line");
            }
        });

        let counts = match result {
            Ok(counts) => counts,
            // Removed between listing and opening.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Log file vanished before read");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(LoadError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        tracing::debug!(
            file = %path.display(),
            lines = counts.delivered,
            undecodable = counts.undecodable,
            records = records.len(),
            unrecognised = misses,
            "Log file loaded"
        );
        Ok(records)
    }
}

/// Truncate a line for diagnostics.
fn preview(line: &str) -> &str {
    match line.char_indices().nth(DEBUG_MAX_LINE_PREVIEW) {
        Some((i, _)) => &line[..i],
        None => line,
    }
}
