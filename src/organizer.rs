/// Sorting files into per-extension bucket directories.
///
/// This module scans the immediate entries of a folder, derives each file's
/// extension bucket and moves or copies the file into `<folder>/<bucket>/`.
/// The scan never descends into subdirectories. Any filesystem error stops
/// the run; files handled before the failure stay where they were put.
use crate::config::CompiledFilters;
use crate::extension::bucket_for_name;
use crate::history::{HISTORY_FILE_NAME, Operation, OperationLog};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether files are relocated or duplicated into their bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Move,
    /// Duplicate, keeping permissions and access/modification times.
    Copy,
}

impl Mode {
    /// Past-tense verb for status lines ("Moved", "Copied").
    pub fn past_tense(&self) -> &'static str {
        match self {
            Mode::Move => "Moved",
            Mode::Copy => "Copied",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Move => write!(f, "move"),
            Mode::Copy => write!(f, "copy"),
        }
    }
}

/// Errors that can occur during organization, history handling and undo.
#[derive(Debug)]
pub enum OrganizeError {
    /// No folder was given. Raised before any filesystem access.
    EmptyFolderPath,
    /// The folder does not exist or is not a directory.
    InvalidBasePath {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Listing the folder failed.
    ReadDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to create a bucket directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Something already sits at the destination; it is never overwritten.
    DestinationExists { path: PathBuf },
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
    FileCopyFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
    /// There is no recorded run to undo.
    NoHistory { path: PathBuf },
    HistoryWriteFailed { source: std::io::Error },
    HistoryReadFailed { source: std::io::Error },
    InvalidHistoryFormat { reason: String },
}

impl OrganizeError {
    /// True for input validation errors, false for filesystem failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyFolderPath)
    }
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFolderPath => write!(f, "Please select a folder."),
            Self::InvalidBasePath { path, source } => {
                write!(f, "Invalid folder {}: {}", path.display(), source)
            }
            Self::ReadDirFailed { path, source } => {
                write!(f, "Failed to read directory {}: {}", path.display(), source)
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::DestinationExists { path } => {
                write!(f, "Destination already exists: {}", path.display())
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::FileCopyFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to copy {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::NoHistory { path } => {
                write!(
                    f,
                    "No previous organization found to undo in {}",
                    path.display()
                )
            }
            Self::HistoryWriteFailed { source } => {
                write!(f, "Failed to write history file: {}", source)
            }
            Self::HistoryReadFailed { source } => {
                write!(f, "Failed to read history file: {}", source)
            }
            Self::InvalidHistoryFormat { reason } => {
                write!(f, "Invalid history file format: {}", reason)
            }
        }
    }
}

impl std::error::Error for OrganizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidBasePath { source, .. }
            | Self::ReadDirFailed { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::HistoryWriteFailed { source }
            | Self::HistoryReadFailed { source } => Some(source),
            Self::FileMoveFailure { source_error, .. }
            | Self::FileCopyFailure { source_error, .. } => Some(source_error),
            _ => None,
        }
    }
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// A file the organizer will process, with the bucket it goes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub source: PathBuf,
    pub file_name: OsString,
    pub bucket: String,
}

/// Checks that `folder` is a non-empty path naming an existing directory.
///
/// The empty check happens first and touches nothing on disk.
pub fn validate_folder(folder: &Path) -> OrganizeResult<()> {
    if folder.as_os_str().is_empty() {
        return Err(OrganizeError::EmptyFolderPath);
    }

    let metadata = fs::metadata(folder).map_err(|e| OrganizeError::InvalidBasePath {
        path: folder.to_path_buf(),
        source: e,
    })?;

    if !metadata.is_dir() {
        return Err(OrganizeError::InvalidBasePath {
            path: folder.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        });
    }

    Ok(())
}

/// Organizes `folder` with no filters and returns how many files were
/// moved or copied.
///
/// # Examples
///
/// ```no_run
/// use extsort::organizer::{Mode, organize};
///
/// match organize("/path/to/downloads", Mode::Move) {
///     Ok(count) => println!("Done. {} files organized.", count),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn organize(folder: impl AsRef<Path>, mode: Mode) -> OrganizeResult<usize> {
    let folder = folder.as_ref();
    let mut log = OperationLog::new(folder.to_path_buf(), mode);
    FileOrganizer::new(mode).run(folder, &mut log)
}

/// Moves or copies files into extension buckets.
pub struct FileOrganizer {
    mode: Mode,
    filters: CompiledFilters,
}

impl FileOrganizer {
    /// Creates an organizer that accepts every file with an extension.
    pub fn new(mode: Mode) -> Self {
        Self::with_filters(mode, CompiledFilters::default())
    }

    pub fn with_filters(mode: Mode, filters: CompiledFilters) -> Self {
        Self { mode, filters }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Lists the files a run would process, sorted by file name, without
    /// touching anything.
    ///
    /// Directories, entries that do not resolve to a regular file, files with
    /// no extension, filtered files and the history file are left out.
    pub fn plan(&self, folder: &Path) -> OrganizeResult<Vec<PlannedEntry>> {
        validate_folder(folder)?;

        let read_dir_error = |e| OrganizeError::ReadDirFailed {
            path: folder.to_path_buf(),
            source: e,
        };

        let mut planned = Vec::new();
        for entry in fs::read_dir(folder).map_err(read_dir_error)? {
            let entry = entry.map_err(read_dir_error)?;
            let file_name = entry.file_name();
            if file_name == HISTORY_FILE_NAME {
                continue;
            }

            let source = entry.path();
            // Follows symlinks; broken links are not files
            if !source.is_file() {
                continue;
            }

            let name = file_name.to_string_lossy();
            let Some(bucket) = bucket_for_name(&name) else {
                continue;
            };
            if !self.filters.should_include(&name) {
                continue;
            }

            planned.push(PlannedEntry {
                source,
                file_name,
                bucket,
            });
        }

        planned.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(planned)
    }

    /// Processes `plan` in order, recording each operation and every bucket
    /// it creates in `log`.
    ///
    /// `on_done` is called after each file. The first error stops the run;
    /// `log` still holds everything done up to that point.
    pub fn execute(
        &self,
        folder: &Path,
        plan: &[PlannedEntry],
        log: &mut OperationLog,
        mut on_done: impl FnMut(&Operation),
    ) -> OrganizeResult<usize> {
        let mut count = 0;
        for entry in plan {
            let (bucket_path, created) = ensure_bucket(folder, &entry.bucket)?;
            if created {
                log.add_created_dir(bucket_path.clone());
            }

            let destination = bucket_path.join(&entry.file_name);
            match self.mode {
                Mode::Move => move_file(&entry.source, &destination)?,
                Mode::Copy => copy_file(&entry.source, &destination)?,
            }

            let operation = Operation {
                original_path: entry.source.clone(),
                new_path: destination,
                bucket: entry.bucket.clone(),
            };
            on_done(&operation);
            log.add_operation(operation);
            count += 1;
        }
        Ok(count)
    }

    /// Plans and executes in one go.
    pub fn run(&self, folder: &Path, log: &mut OperationLog) -> OrganizeResult<usize> {
        let plan = self.plan(folder)?;
        self.execute(folder, &plan, log, |_| {})
    }
}

/// Makes sure `<folder>/<bucket>` is a directory. Returns its path and
/// whether it had to be created.
fn ensure_bucket(folder: &Path, bucket: &str) -> OrganizeResult<(PathBuf, bool)> {
    let bucket_path = folder.join(bucket);
    if bucket_path.is_dir() {
        return Ok((bucket_path, false));
    }

    fs::create_dir(&bucket_path).map_err(|e| OrganizeError::DirectoryCreationFailed {
        path: bucket_path.clone(),
        source: e,
    })?;
    Ok((bucket_path, true))
}

fn ensure_vacant(destination: &Path) -> OrganizeResult<()> {
    if fs::symlink_metadata(destination).is_ok() {
        return Err(OrganizeError::DestinationExists {
            path: destination.to_path_buf(),
        });
    }
    Ok(())
}

fn move_file(source: &Path, destination: &Path) -> OrganizeResult<()> {
    ensure_vacant(destination)?;
    fs::rename(source, destination).map_err(|e| OrganizeError::FileMoveFailure {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        source_error: e,
    })
}

fn copy_file(source: &Path, destination: &Path) -> OrganizeResult<()> {
    ensure_vacant(destination)?;
    let copy_error = |e| OrganizeError::FileCopyFailure {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        source_error: e,
    };

    // fs::copy carries permissions over but not timestamps
    let metadata = fs::metadata(source).map_err(copy_error)?;
    fs::copy(source, destination).map_err(copy_error)?;
    filetime::set_file_times(
        destination,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
    .map_err(copy_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(base: &Path, name: &str, content: &str) -> PathBuf {
        let path = base.join(name);
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    #[test]
    fn test_validate_empty_folder_path() {
        let result = validate_folder(Path::new(""));
        assert!(matches!(result, Err(OrganizeError::EmptyFolderPath)));
        assert!(result.unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_missing_folder() {
        let result = validate_folder(Path::new("/non/existent/path"));
        match result {
            Err(e @ OrganizeError::InvalidBasePath { .. }) => assert!(!e.is_validation()),
            other => panic!("expected InvalidBasePath, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_file_is_not_a_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = write(temp_dir.path(), "plain.txt", "x");

        let result = validate_folder(&file);
        assert!(matches!(result, Err(OrganizeError::InvalidBasePath { .. })));
    }

    #[test]
    fn test_plan_skips_dirs_and_extensionless_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        write(base, "b.TXT", "b");
        write(base, "a.txt", "a");
        write(base, "c", "c");
        write(base, ".gitignore", "target");
        fs::create_dir(base.join("sub.dir")).expect("Failed to create subdirectory");
        write(&base.join("sub.dir"), "nested.txt", "n");

        let plan = FileOrganizer::new(Mode::Move).plan(base).unwrap();

        let names: Vec<_> = plan
            .iter()
            .map(|p| p.file_name.to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.TXT"]);
        assert!(plan.iter().all(|p| p.bucket == "txt"));
        assert!(base.join("a.txt").exists(), "planning must not move files");
    }

    #[test]
    fn test_plan_skips_history_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        write(base, HISTORY_FILE_NAME, "{}");

        let plan = FileOrganizer::new(Mode::Move).plan(base).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_respects_filters() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        write(base, "keep.txt", "k");
        write(base, "movie.part", "p");

        let filters = crate::config::FilterConfig::from_toml_str(
            "[filters.exclude]\nextensions = [\"part\"]",
        )
        .unwrap()
        .compile()
        .unwrap();
        let plan = FileOrganizer::with_filters(Mode::Move, filters)
            .plan(base)
            .unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].bucket, "txt");
    }

    #[test]
    fn test_organize_move_example() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        write(base, "a.txt", "a");
        write(base, "b.TXT", "b");
        write(base, "c", "c");

        let count = organize(base, Mode::Move).unwrap();

        assert_eq!(count, 2);
        assert!(base.join("txt").join("a.txt").is_file());
        assert!(base.join("txt").join("b.TXT").is_file());
        assert!(!base.join("a.txt").exists());
        assert!(!base.join("b.TXT").exists());
        assert!(base.join("c").is_file());
    }

    #[test]
    fn test_organize_copy_keeps_original_and_mtime() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let source = write(base, "photo.JPG", "pixels");
        let old = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&source, old).expect("Failed to set mtime");

        let count = organize(base, Mode::Copy).unwrap();

        assert_eq!(count, 1);
        let copy = base.join("jpg").join("photo.JPG");
        assert_eq!(fs::read_to_string(&source).unwrap(), "pixels");
        assert_eq!(fs::read_to_string(&copy).unwrap(), "pixels");
        let copied_mtime = FileTime::from_last_modification_time(&fs::metadata(&copy).unwrap());
        assert_eq!(copied_mtime, old);
    }

    #[test]
    fn test_organize_empty_folder_returns_zero() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let count = organize(temp_dir.path(), Mode::Move).unwrap();

        assert_eq!(count, 0);
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_organize_empty_path_fails_validation() {
        let result = organize("", Mode::Copy);
        assert!(matches!(result, Err(OrganizeError::EmptyFolderPath)));
    }

    #[test]
    fn test_existing_bucket_is_reused() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir(base.join("pdf")).expect("Failed to create bucket");
        write(&base.join("pdf"), "old.pdf", "old");
        write(base, "new.pdf", "new");

        let mut log = OperationLog::new(base.to_path_buf(), Mode::Move);
        let count = FileOrganizer::new(Mode::Move).run(base, &mut log).unwrap();

        assert_eq!(count, 1);
        assert!(log.created_dirs.is_empty());
        assert!(base.join("pdf").join("old.pdf").exists());
        assert!(base.join("pdf").join("new.pdf").exists());
    }

    #[test]
    fn test_collision_aborts_without_overwriting() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir(base.join("txt")).expect("Failed to create bucket");
        write(&base.join("txt"), "b.txt", "already organized");
        write(base, "a.txt", "a");
        write(base, "b.txt", "b");
        write(base, "c.txt", "c");

        let mut log = OperationLog::new(base.to_path_buf(), Mode::Move);
        let result = FileOrganizer::new(Mode::Move).run(base, &mut log);

        assert!(matches!(
            result,
            Err(OrganizeError::DestinationExists { .. })
        ));
        // a.txt was handled before the collision and stays handled
        assert!(base.join("txt").join("a.txt").exists());
        assert_eq!(log.operations.len(), 1);
        // the collision and everything after it are untouched
        assert_eq!(
            fs::read_to_string(base.join("txt").join("b.txt")).unwrap(),
            "already organized"
        );
        assert!(base.join("b.txt").exists());
        assert!(base.join("c.txt").exists());
    }

    #[test]
    fn test_bucket_name_taken_by_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        // "txt" has no extension, so it is skipped but blocks the bucket
        write(base, "txt", "not a dir");
        write(base, "a.txt", "a");

        let result = organize(base, Mode::Move);

        assert!(matches!(
            result,
            Err(OrganizeError::DirectoryCreationFailed { .. })
        ));
        assert!(base.join("a.txt").exists());
    }

    #[test]
    fn test_execute_reports_each_operation() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        write(base, "one.md", "1");
        write(base, "two.rs", "2");

        let organizer = FileOrganizer::new(Mode::Copy);
        let plan = organizer.plan(base).unwrap();
        let mut log = OperationLog::new(base.to_path_buf(), Mode::Copy);
        let mut seen = Vec::new();
        let count = organizer
            .execute(base, &plan, &mut log, |op| seen.push(op.bucket.clone()))
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(seen, vec!["md", "rs"]);
        assert_eq!(log.created_dirs.len(), 2);
    }

    #[test]
    fn test_rerun_on_organized_folder_is_noop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        write(base, "a.txt", "a");

        assert_eq!(organize(base, Mode::Move).unwrap(), 1);
        assert_eq!(organize(base, Mode::Move).unwrap(), 0);
        assert!(base.join("txt").join("a.txt").exists());
    }
}
