//! Input discovery: list the source PDFs and intermediate JSON files.
//!
//! Directory enumeration order is platform-defined, so every listing here is
//! sorted by file name. That fixes the left-to-right order of tables in the
//! aggregated spreadsheet across runs and machines.

use crate::error::PdcaasError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// List files in `dir` whose extension matches `ext` (case-insensitive),
/// sorted by file name. Subdirectories are ignored.
pub fn list_files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, PdcaasError> {
    let unreadable = |e: std::io::Error| PdcaasError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if matches {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} *.{} files in {}", files.len(), ext, dir.display());
    Ok(files)
}

/// List the PDFs to analyse.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, PdcaasError> {
    list_files_with_extension(dir, "pdf")
}

/// List the intermediate analysis files to extract tables from.
pub fn list_analysis_files(dir: &Path) -> Result<Vec<PathBuf>, PdcaasError> {
    list_files_with_extension(dir, "json")
}

/// Validate that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_pdf(path: &Path) -> Result<(), PdcaasError> {
    if !path.exists() {
        return Err(PdcaasError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(PdcaasError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PdcaasError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(PdcaasError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    Ok(())
}
