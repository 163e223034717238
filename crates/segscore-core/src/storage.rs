//! Result artifact storage
//!
//! The production deployment uploads CSV artifacts to a results
//! repository; the pipeline only needs `store(file) -> identifier`.
//! `LocalDirStore` is the filesystem implementation used by the CLI and in
//! tests.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ScoreError, ScoreResult};

/// Destination for scored-submission artifacts. Failures are not retried;
/// they propagate as fatal run errors.
pub trait ResultStore {
    /// Store the file, returning an opaque identifier for it.
    fn store(&self, file: &Path) -> ScoreResult<String>;
}

/// Stores artifacts by copying them into a directory; the identifier is
/// the destination path.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResultStore for LocalDirStore {
    fn store(&self, file: &Path) -> ScoreResult<String> {
        let name = file.file_name().ok_or_else(|| ScoreError::Storage {
            path: file.display().to_string(),
            message: "not a file path".to_owned(),
        })?;
        fs::create_dir_all(&self.root)?;
        let destination = self.root.join(name);
        fs::copy(file, &destination).map_err(|err| ScoreError::Storage {
            path: file.display().to_string(),
            message: err.to_string(),
        })?;
        log::info!("stored {} as {}", file.display(), destination.display());
        Ok(destination.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_store_copies_and_returns_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("all_scores.csv");
        fs::write(&source, "scan_id,et_dice\n").unwrap();

        let store = LocalDirStore::new(dir.path().join("uploads"));
        let id = store.store(&source).unwrap();
        assert!(id.ends_with("all_scores.csv"));
        assert_eq!(fs::read_to_string(id).unwrap(), "scan_id,et_dice\n");
    }

    #[test]
    fn storing_a_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path().join("uploads"));
        let err = store.store(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, ScoreError::Storage { .. }));
        assert!(!err.is_submission_fault());
    }
}
