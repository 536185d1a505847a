// LogSift - platform/fs.rs
//
// Filesystem helpers: tolerant line reading and atomic file replacement.

use std::io::{self, BufRead};
use std::path::Path;

/// Line counts from a tolerant read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    /// Lines passed to the callback.
    pub delivered: usize,
    /// Lines skipped because they were not valid UTF-8.
    pub undecodable: usize,
}

/// Stream the lines of a file to `on_line`.
///
/// Lines are split on `\n` and a trailing `\r` is stripped. A line that is
/// not valid UTF-8 is skipped and logged at debug level; it does not abort
/// the read. Only genuine I/O errors are returned.
pub fn read_lines_tolerant<F>(path: &Path, mut on_line: F) -> io::Result<LineCounts>
where
    F: FnMut(&str),
{
    let file = std::fs::File::open(path)?;
    let mut reader = io::BufReader::new(file);
    let mut buf: Vec<u8> = Vec::new();
    let mut counts = LineCounts::default();
    let mut line_number = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;

        let mut bytes = buf.as_slice();
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest;
        }
        if let Some(rest) = bytes.strip_suffix(b"\r") {
            bytes = rest;
        }

        match std::str::from_utf8(bytes) {
            Ok(line) => {
                counts.delivered += 1;
                on_line(line);
            }
            Err(e) => {
                counts.undecodable += 1;
                tracing::debug!(
                    path = %path.display(),
                    line = line_number,
                    error = %e,
                    "Skipping line with encoding error"
                );
            }
        }
    }

    Ok(counts)
}

/// Replace `path` with `bytes` atomically (write temp, rename).
///
/// The parent directory is created if needed. A crash between write and
/// rename leaves the previous file intact. A concurrent reader sees either
/// the old or the new content, never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
