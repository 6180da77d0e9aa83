//! extsort - sort the files of a folder into per-extension subdirectories
//!
//! This library scans a folder's immediate entries, buckets each file by its
//! lowercased extension and moves or copies it into `<folder>/<extension>/`.
//! Runs can be previewed, filtered through a TOML configuration file and
//! undone from a history file kept in the organized folder.

pub mod cli;
pub mod config;
pub mod extension;
pub mod history;
pub mod organizer;
pub mod output;
pub mod undo;

pub use config::{CompiledFilters, ConfigError, FilterConfig};
pub use extension::{bucket_for_name, bucket_for_path};
pub use history::{Operation, OperationLog};
pub use organizer::{FileOrganizer, Mode, OrganizeError, OrganizeResult, organize};
pub use undo::{UndoManager, UndoReport};

pub use cli::{OrganizeCommand, run_cli, run_cli_with_config};
