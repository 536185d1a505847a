// LogSift - app/snapshot.rs
//
// Snapshot persistence: the result of the last full analysis run, kept in
// the output directory so a presentation layer can show it on startup
// without recomputing.
//
// - Saved atomically (write temp, rename) so a concurrent reader never
//   sees a partial document and a crash never corrupts the previous one.
// - A missing snapshot is not an error; a corrupt one is.

use crate::core::export::{read_snapshot_json, write_snapshot_json, Snapshot};
use crate::platform::fs::write_atomic;
use crate::util::constants::SNAPSHOT_FILE_NAME;
use crate::util::error::ExportError;
use std::path::{Path, PathBuf};

/// Location of the snapshot inside an output directory.
pub fn snapshot_path(output_dir: &Path) -> PathBuf {
    output_dir.join(SNAPSHOT_FILE_NAME)
}

/// Save `snapshot` to `path` atomically, creating parent directories.
pub fn save(snapshot: &Snapshot, path: &Path) -> Result<(), ExportError> {
    let mut json = Vec::new();
    write_snapshot_json(snapshot, &mut json, path)?;

    write_atomic(path, &json).map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %path.display(), bytes = json.len(), "Snapshot saved");
    Ok(())
}

/// Load a snapshot. `Ok(None)` if none has been written yet.
pub fn load(path: &Path) -> Result<Option<Snapshot>, ExportError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No snapshot found");
            return Ok(None);
        }
        Err(e) => {
            return Err(ExportError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let snapshot = read_snapshot_json(&bytes, path)?;
    tracing::debug!(
        path = %path.display(),
        generated_at = %snapshot.generated_at,
        "Snapshot loaded"
    );
    Ok(Some(snapshot))
}
