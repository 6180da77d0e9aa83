/// Persisted record of an organization run, used by undo.
///
/// The log is stored as pretty-printed JSON in the organized folder itself.
/// The organizer never picks that file up as something to sort. Paths inside
/// the folder are written relative to it and resolved against it on load.
use crate::organizer::{Mode, OrganizeError, OrganizeResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the history file written into the organized folder.
pub const HISTORY_FILE_NAME: &str = ".extsort_history.json";

/// A single file that was moved or copied into a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub bucket: String,
}

/// Everything one run did, in the order it happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog {
    /// RFC 3339 timestamp of the run.
    pub timestamp: String,
    pub base_path: PathBuf,
    pub mode: Mode,
    /// Bucket directories that did not exist before the run.
    #[serde(default)]
    pub created_dirs: Vec<PathBuf>,
    pub operations: Vec<Operation>,
}

impl OperationLog {
    pub fn new(base_path: PathBuf, mode: Mode) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            base_path,
            mode,
            created_dirs: Vec::new(),
            operations: Vec::new(),
        }
    }

    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn add_created_dir(&mut self, dir: PathBuf) {
        self.created_dirs.push(dir);
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns the path of the history file for `base_path`.
    pub fn history_file_path(base_path: &Path) -> PathBuf {
        base_path.join(HISTORY_FILE_NAME)
    }

    /// Copy of this log with every recorded path passed through `f`.
    fn rebased(&self, f: impl Fn(&Path) -> PathBuf) -> Self {
        Self {
            timestamp: self.timestamp.clone(),
            base_path: self.base_path.clone(),
            mode: self.mode,
            created_dirs: self.created_dirs.iter().map(|dir| f(dir)).collect(),
            operations: self
                .operations
                .iter()
                .map(|op| Operation {
                    original_path: f(&op.original_path),
                    new_path: f(&op.new_path),
                    bucket: op.bucket.clone(),
                })
                .collect(),
        }
    }

    /// Writes this log to `base_path`, replacing any earlier one.
    ///
    /// Paths under the log's own base path are stored relative to it.
    pub fn save(&self, base_path: &Path) -> OrganizeResult<()> {
        let stored = self.rebased(|path| {
            path.strip_prefix(&self.base_path)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf())
        });
        let json = serde_json::to_string_pretty(&stored).map_err(|e| {
            OrganizeError::HistoryWriteFailed {
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("JSON serialization failed: {}", e),
                ),
            }
        })?;

        fs::write(Self::history_file_path(base_path), json)
            .map_err(|e| OrganizeError::HistoryWriteFailed { source: e })
    }

    /// Loads the log for `base_path`, or `None` if there is none.
    ///
    /// Relative paths are resolved against `base_path`, not the working
    /// directory.
    pub fn load(base_path: &Path) -> OrganizeResult<Option<Self>> {
        let history_path = Self::history_file_path(base_path);
        if !history_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&history_path)
            .map_err(|e| OrganizeError::HistoryReadFailed { source: e })?;

        let stored: Self =
            serde_json::from_str(&json).map_err(|e| OrganizeError::InvalidHistoryFormat {
                reason: format!("JSON parse error: {}", e),
            })?;

        Ok(Some(stored.rebased(|path| base_path.join(path))))
    }

    /// Deletes the history file for `base_path` if present.
    pub fn delete(base_path: &Path) -> OrganizeResult<()> {
        let history_path = Self::history_file_path(base_path);
        if history_path.exists() {
            fs::remove_file(&history_path)
                .map_err(|e| OrganizeError::HistoryWriteFailed { source: e })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_log(base: &Path) -> OperationLog {
        let mut log = OperationLog::new(base.to_path_buf(), Mode::Copy);
        log.add_created_dir(base.join("txt"));
        log.add_operation(Operation {
            original_path: base.join("a.txt"),
            new_path: base.join("txt").join("a.txt"),
            bucket: "txt".to_string(),
        });
        log
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        sample_log(base).save(base).expect("Failed to save history");
        let loaded = OperationLog::load(base)
            .expect("Failed to load history")
            .expect("History should exist");

        assert_eq!(loaded.mode, Mode::Copy);
        assert_eq!(loaded.base_path, base);
        assert_eq!(loaded.created_dirs, vec![base.join("txt")]);
        assert_eq!(loaded.operations.len(), 1);
        assert_eq!(loaded.operations[0].bucket, "txt");
    }

    #[test]
    fn test_mode_is_stored_lowercase() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        sample_log(base).save(base).expect("Failed to save history");
        let raw = fs::read_to_string(OperationLog::history_file_path(base)).unwrap();

        assert!(raw.contains("\"mode\": \"copy\""));
    }

    #[test]
    fn test_paths_are_stored_relative_to_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        sample_log(base).save(base).expect("Failed to save history");
        let raw = fs::read_to_string(OperationLog::history_file_path(base)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["operations"][0]["original_path"], "a.txt");
        assert_eq!(value["created_dirs"][0], "txt");
    }

    #[test]
    fn test_relative_log_resolves_against_folder() {
        // A log recorded with a relative folder such as "dl" must load
        // against wherever the folder is now, not the working directory
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dl = temp_dir.path().join("dl");
        fs::create_dir(&dl).unwrap();

        let mut log = OperationLog::new(PathBuf::from("dl"), Mode::Move);
        log.add_created_dir(PathBuf::from("dl/txt"));
        log.add_operation(Operation {
            original_path: PathBuf::from("dl/a.txt"),
            new_path: PathBuf::from("dl/txt/a.txt"),
            bucket: "txt".to_string(),
        });
        log.save(&dl).expect("Failed to save history");

        let loaded = OperationLog::load(&dl).unwrap().expect("History should exist");

        assert_eq!(loaded.operations[0].original_path, dl.join("a.txt"));
        assert_eq!(loaded.operations[0].new_path, dl.join("txt").join("a.txt"));
        assert_eq!(loaded.created_dirs, vec![dl.join("txt")]);
    }

    #[test]
    fn test_history_follows_the_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let old = temp_dir.path().join("old");
        let new = temp_dir.path().join("new");
        fs::create_dir(&old).unwrap();

        sample_log(&old).save(&old).expect("Failed to save history");
        fs::rename(&old, &new).unwrap();
        let loaded = OperationLog::load(&new).unwrap().expect("History should exist");

        assert_eq!(loaded.operations[0].new_path, new.join("txt").join("a.txt"));
    }

    #[test]
    fn test_load_missing_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert!(OperationLog::load(temp_dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(OperationLog::history_file_path(base), "{ not json").unwrap();

        let result = OperationLog::load(base);
        assert!(matches!(
            result,
            Err(OrganizeError::InvalidHistoryFormat { .. })
        ));
    }

    #[test]
    fn test_delete_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        sample_log(base).save(base).unwrap();

        OperationLog::delete(base).unwrap();
        assert!(!OperationLog::history_file_path(base).exists());
        // deleting twice is fine
        OperationLog::delete(base).unwrap();
    }
}
