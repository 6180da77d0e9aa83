/// Reverting the most recent organization run.
///
/// Moves are undone by moving files back to where they came from. Copies are
/// undone by deleting the copy, but only while the original still exists.
/// Bucket directories the run created are removed once they are empty again.
use crate::history::{Operation, OperationLog};
use crate::organizer::{Mode, OrganizeError, OrganizeResult, validate_folder};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of an undo.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Number of operations successfully reverted.
    pub restored_files: usize,
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Entries left alone, e.g. because the organized file is gone.
    pub skipped_files: Vec<(PathBuf, String)>,
}

impl UndoReport {
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

/// Outcome of reverting one operation, other than success.
enum RestoreIssue {
    Skipped(PathBuf, String),
    Failed(PathBuf, String),
}

pub struct UndoManager;

impl UndoManager {
    /// Undoes the last recorded run in `base_path`.
    ///
    /// Operations are reverted newest first. The history file is deleted only
    /// when every operation was reverted. Otherwise it is rewritten to hold
    /// just the skipped and failed entries, so the undo can be retried after
    /// fixing the reported problems.
    ///
    /// # Edge Cases Handled
    ///
    /// * **Organized file missing**: skipped
    /// * **Original path occupied (move)**: the occupant is renamed to
    ///   `<name>.bak.<timestamp>` first
    /// * **Original missing (copy)**: the copy is kept and the entry skipped
    /// * **No history**: returns `OrganizeError::NoHistory`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use extsort::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// match UndoManager::undo(Path::new("/path/to/directory")) {
    ///     Ok(report) => println!("Restored {} files", report.restored_files),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(base_path: &Path) -> OrganizeResult<UndoReport> {
        validate_folder(base_path)?;

        let log = OperationLog::load(base_path)?.ok_or_else(|| OrganizeError::NoHistory {
            path: base_path.to_path_buf(),
        })?;

        let mut report = UndoReport::default();
        let mut outstanding = Vec::new();
        for operation in log.operations.iter().rev() {
            let outcome = match log.mode {
                Mode::Move => Self::restore_moved(operation),
                Mode::Copy => Self::remove_copy(operation),
            };
            match outcome {
                Ok(()) => report.restored_files += 1,
                Err(RestoreIssue::Skipped(path, reason)) => {
                    report.skipped_files.push((path, reason));
                    outstanding.push(operation.clone());
                }
                Err(RestoreIssue::Failed(path, reason)) => {
                    report.failed_restores.push((path, reason));
                    outstanding.push(operation.clone());
                }
            }
        }

        for dir in log.created_dirs.iter().rev() {
            // Only succeeds on empty directories
            let _ = fs::remove_dir(dir);
        }

        if report.is_complete_success() {
            OperationLog::delete(base_path)?;
        } else {
            // A retry only has to deal with what is still outstanding
            outstanding.reverse();
            let remaining = OperationLog {
                base_path: base_path.to_path_buf(),
                created_dirs: log
                    .created_dirs
                    .iter()
                    .filter(|dir| dir.is_dir())
                    .cloned()
                    .collect(),
                operations: outstanding,
                ..log
            };
            remaining.save(base_path)?;
        }

        Ok(report)
    }

    fn restore_moved(operation: &Operation) -> Result<(), RestoreIssue> {
        if fs::symlink_metadata(&operation.new_path).is_err() {
            return Err(RestoreIssue::Skipped(
                operation.new_path.clone(),
                "File not found at expected location".to_string(),
            ));
        }

        if fs::symlink_metadata(&operation.original_path).is_ok() {
            let backup_path = Self::generate_backup_path(&operation.original_path);
            fs::rename(&operation.original_path, &backup_path).map_err(|e| {
                RestoreIssue::Failed(
                    operation.original_path.clone(),
                    format!("Could not backup conflicting file: {}", e),
                )
            })?;
        }

        fs::rename(&operation.new_path, &operation.original_path).map_err(|e| {
            RestoreIssue::Failed(
                operation.new_path.clone(),
                format!("Failed to restore file: {}", e),
            )
        })
    }

    fn remove_copy(operation: &Operation) -> Result<(), RestoreIssue> {
        if fs::symlink_metadata(&operation.new_path).is_err() {
            return Err(RestoreIssue::Skipped(
                operation.new_path.clone(),
                "Copy not found at expected location".to_string(),
            ));
        }

        if !operation.original_path.exists() {
            return Err(RestoreIssue::Skipped(
                operation.new_path.clone(),
                "Original is missing, keeping the copy".to_string(),
            ));
        }

        fs::remove_file(&operation.new_path).map_err(|e| {
            RestoreIssue::Failed(
                operation.new_path.clone(),
                format!("Failed to remove copy: {}", e),
            )
        })
    }

    /// `file.txt` becomes `file.txt.bak.20251109-143052`, or
    /// `file.txt.bak.20251109-143052.1` and so on if that name is taken.
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        let parent = original_path.parent().unwrap_or_else(|| Path::new(""));

        let base_name = format!("{}.bak.{}", filename, timestamp);
        let mut candidate = parent.join(&base_name);
        let mut counter = 1;
        while fs::symlink_metadata(&candidate).is_ok() {
            candidate = parent.join(format!("{}.{}", base_name, counter));
            counter += 1;
        }
        candidate
    }
}
