//! Command layer between the binary and the library.
//!
//! Each discrete user action is an [`OrganizeCommand`]. `run_cli` carries it
//! out against a folder and returns either a count for the status line or a
//! human-readable error message. No state survives between calls.

use crate::config::FilterConfig;
use crate::history::OperationLog;
use crate::organizer::{FileOrganizer, Mode, validate_folder};
use crate::output::{OutputFormatter, file_word};
use crate::undo::UndoManager;
use std::collections::HashMap;
use std::path::Path;

/// A CLI command to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Sort files into extension buckets.
    Organize {
        mode: Mode,
        /// Report what would happen without changing anything.
        dry_run: bool,
    },
    /// Revert the previous organization.
    Undo,
}

/// Runs `command` against `folder` with no filter configuration.
///
/// Returns the number of files organized (or restored, for undo).
///
/// # Examples
///
/// ```no_run
/// use extsort::cli::{OrganizeCommand, run_cli};
/// use extsort::organizer::Mode;
///
/// let command = OrganizeCommand::Organize { mode: Mode::Copy, dry_run: false };
/// match run_cli(command, "/path/to/directory") {
///     Ok(count) => println!("{} files organized", count),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(command: OrganizeCommand, folder: &str) -> Result<usize, String> {
    run_cli_with_config(command, folder, None)
}

/// Runs `command` against `folder`, loading filters from `config_path` if
/// given.
///
/// The folder is validated before anything else, so an empty folder string
/// fails without touching the filesystem. It is then made absolute, so the
/// history written here can be undone from any working directory.
pub fn run_cli_with_config(
    command: OrganizeCommand,
    folder: &str,
    config_path: Option<&Path>,
) -> Result<usize, String> {
    validate_folder(Path::new(folder)).map_err(|e| e.to_string())?;
    // History must not depend on the working directory the command ran from
    let base_path = dunce::canonicalize(folder)
        .map_err(|e| format!("Could not resolve folder {}: {}", folder, e))?;
    let base_path = base_path.as_path();

    match command {
        OrganizeCommand::Organize { mode, dry_run } => {
            let organizer = build_organizer(mode, config_path)?;
            if dry_run {
                organize_directory_dry_run(&organizer, base_path)
            } else {
                organize_directory(&organizer, base_path)
            }
        }
        OrganizeCommand::Undo => undo_organization(base_path),
    }
}

fn build_organizer(mode: Mode, config_path: Option<&Path>) -> Result<FileOrganizer, String> {
    let filters = FilterConfig::load(config_path)
        .and_then(FilterConfig::compile)
        .map_err(|e| e.to_string())?;
    Ok(FileOrganizer::with_filters(mode, filters))
}

/// Organizes `base_path` and saves the run's history for undo.
///
/// History is written whenever at least one file was handled, even if the
/// run then failed, so the partial work can still be reverted.
fn organize_directory(organizer: &FileOrganizer, base_path: &Path) -> Result<usize, String> {
    OutputFormatter::info(&format!(
        "Organizing contents of: {} ({})",
        base_path.display(),
        organizer.mode()
    ));
    OutputFormatter::plain("Processing...");

    let plan = organizer.plan(base_path).map_err(|e| e.to_string())?;
    let mut operation_log = OperationLog::new(base_path.to_path_buf(), organizer.mode());

    let pb = OutputFormatter::create_progress_bar(plan.len() as u64);
    let result = organizer.execute(base_path, &plan, &mut operation_log, |op| {
        pb.set_message(format!("{}/", op.bucket));
        pb.inc(1);
    });
    pb.finish_and_clear();

    if !operation_log.is_empty() {
        match operation_log.save(base_path) {
            Ok(()) => OutputFormatter::info(&format!(
                "History saved. Use 'extsort {} --undo' to revert changes.",
                base_path.display()
            )),
            Err(e) => OutputFormatter::warning(&format!("Could not save history: {}", e)),
        }
    }

    match result {
        Ok(count) => {
            if count > 0 {
                let mut bucket_counts: HashMap<String, usize> = HashMap::new();
                for op in &operation_log.operations {
                    *bucket_counts.entry(op.bucket.clone()).or_insert(0) += 1;
                }
                OutputFormatter::summary_table(&bucket_counts, count);
            }
            OutputFormatter::success(&format!("Done. {} files organized.", count));
            Ok(count)
        }
        Err(e) => {
            let done = operation_log.operations.len();
            if done > 0 {
                OutputFormatter::warning(&format!(
                    "{} {} {} before the error; they stay where they are.",
                    organizer.mode().past_tense(),
                    done,
                    file_word(done)
                ));
            }
            Err(e.to_string())
        }
    }
}

/// Shows what organizing `base_path` would do. Nothing on disk changes.
fn organize_directory_dry_run(
    organizer: &FileOrganizer,
    base_path: &Path,
) -> Result<usize, String> {
    OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", base_path.display()));

    let plan = organizer.plan(base_path).map_err(|e| e.to_string())?;
    if plan.is_empty() {
        OutputFormatter::plain("No files found to organize.");
        return Ok(0);
    }

    let mut bucket_counts: HashMap<String, usize> = HashMap::new();
    for entry in &plan {
        OutputFormatter::plain(&format!(
            " - {}  → would {} to {}/",
            entry.file_name.to_string_lossy(),
            organizer.mode(),
            entry.bucket
        ));
        *bucket_counts.entry(entry.bucket.clone()).or_insert(0) += 1;
    }

    OutputFormatter::summary_table(&bucket_counts, plan.len());
    OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
    Ok(plan.len())
}

/// Reverts the previous run and prints the undo report.
fn undo_organization(base_path: &Path) -> Result<usize, String> {
    OutputFormatter::info("Undoing previous organization...");

    let report = UndoManager::undo(base_path).map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!(
        "Undo complete. Restored: {}",
        report.restored_files
    ));

    if !report.skipped_files.is_empty() {
        OutputFormatter::warning(&format!("Skipped: {}", report.skipped_files.len()));
        for (path, reason) in &report.skipped_files {
            OutputFormatter::plain(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if !report.failed_restores.is_empty() {
        OutputFormatter::warning(&format!("Failed: {}", report.failed_restores.len()));
        for (path, reason) in &report.failed_restores {
            OutputFormatter::error(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if !report.is_complete_success() {
        OutputFormatter::warning("History file was kept. Fix the issues above and try again.");
    }

    Ok(report.restored_files)
}
