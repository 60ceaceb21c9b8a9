//! Atomic file output: write to a sibling temp path, then rename.
//!
//! A process killed mid-write leaves at most a stray `*.tmp` file behind,
//! never a truncated intermediate JSON or spreadsheet under the real name.

use crate::error::PdcaasError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Sibling temp path: `result.xlsx` → `result.xlsx.tmp`.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Create the parent directory of `path` if it does not exist yet.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), PdcaasError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| PdcaasError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        _ => Ok(()),
    }
}

/// Run `write` against a temp path and move the result over `path`.
///
/// The temp file is removed if `write` fails.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> Result<(), PdcaasError>
where
    F: FnOnce(&Path) -> Result<(), PdcaasError>,
{
    ensure_parent(path)?;
    let tmp = temp_path(path);

    if let Err(e) = write(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    std::fs::rename(&tmp, path).map_err(|e| PdcaasError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Atomically write a byte buffer.
pub(crate) fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), PdcaasError> {
    write_atomic(path, |tmp| {
        std::fs::write(tmp, bytes).map_err(|e| PdcaasError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_keeps_extension() {
        assert_eq!(
            temp_path(Path::new("out/final_result.xlsx")),
            PathBuf::from("out/final_result.xlsx.tmp")
        );
    }

    #[test]
    fn write_bytes_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/deeper/a.json");
        write_bytes_atomic(&target, b"{}").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"{}");
        assert!(!temp_path(&target).exists());
    }

    #[test]
    fn failed_write_removes_temp_and_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("keep.csv");
        std::fs::write(&target, "old").unwrap();

        let result = write_atomic(&target, |tmp| {
            std::fs::write(tmp, "partial").unwrap();
            Err(PdcaasError::Internal("boom".into()))
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "old");
        assert!(!temp_path(&target).exists());
    }
}
