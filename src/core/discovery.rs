// LogSift - core/discovery.rs
//
// Log directory listing and file classification.
//
// Uses `walkdir` for the directory listing as an OS abstraction and reads
// only file metadata (size, mtime), never contents. Loading is owned by
// the app layer (app::store).
//
// Listing is flat: subdirectories are not descended into. Entries are
// returned sorted by file name so results are identical across platforms.

use crate::core::model::{LogFileInfo, LogFileKind};
use crate::util::constants::{ERROR_LOG_PATTERNS, LOG_FILE_PATTERNS};
use crate::util::error::LoadError;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// =============================================================================
// Classification
// =============================================================================

struct FilePatterns {
    recognised: Vec<glob::Pattern>,
    error: Vec<glob::Pattern>,
}

fn patterns() -> &'static FilePatterns {
    static PATTERNS: OnceLock<FilePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| FilePatterns {
        recognised: compile_patterns(LOG_FILE_PATTERNS, "recognised"),
        error: compile_patterns(ERROR_LOG_PATTERNS, "error"),
    })
}

/// Classify a file name, or `None` if the store does not load it.
///
/// Matching is case-sensitive, as the suffixes are on disk.
pub fn classify_file_name(file_name: &str) -> Option<LogFileKind> {
    let pats = patterns();
    if !pats.recognised.iter().any(|p| p.matches(file_name)) {
        return None;
    }
    if pats.error.iter().any(|p| p.matches(file_name)) {
        Some(LogFileKind::Error)
    } else {
        Some(LogFileKind::Access)
    }
}

/// True if `name` names a file directly inside a directory: non-empty,
/// no path separators, and not a `.`/`..` component.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}

// =============================================================================
// Listing
// =============================================================================

/// A recognised file found in the log directory.
#[derive(Debug, Clone)]
pub struct ListedFile {
    pub path: PathBuf,
    pub info: LogFileInfo,
}

/// List recognised log files directly inside `dir`, sorted by file name.
///
/// A missing directory yields an empty list. Entries whose metadata cannot
/// be read are skipped with a warning. A failure to read the directory
/// itself is returned as [`LoadError::Traversal`].
pub fn list_log_files(dir: &Path) -> Result<Vec<ListedFile>, LoadError> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "Log directory not found, nothing to list");
        return Ok(Vec::new());
    }

    let walker = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            // Depth 0 means the directory itself could not be read.
            Err(e) if e.depth() == 0 => {
                return Err(LoadError::Traversal {
                    path: dir.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                tracing::warn!(path = %path_str, error = %e, "Cannot access log directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            tracing::debug!(path = %entry.path().display(), "Skipping non-UTF-8 file name");
            continue;
        };

        let Some(kind) = classify_file_name(file_name) else {
            tracing::trace!(file = file_name, "Not a recognised log file");
            continue;
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(file = file_name, error = %e, "Cannot read log file metadata");
                continue;
            }
        };

        files.push(ListedFile {
            path: entry.path().to_path_buf(),
            info: LogFileInfo {
                filename: file_name.to_string(),
                size_bytes: metadata.len(),
                kind,
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            },
        });
    }

    tracing::debug!(dir = %dir.display(), files = files.len(), "Log directory listed");
    Ok(files)
}

/// Compile glob patterns, logging and skipping any that fail.
fn compile_patterns(patterns: &[&str], kind: &str) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = p, kind, error = %e, "Invalid glob pattern, skipping");
                None
            }
        })
        .collect()
}
