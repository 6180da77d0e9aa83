//! Extension classification for bucketing files.
//!
//! A file's bucket is the part of its name after the last `.`, lowercased.
//! Leading dots mark hidden files and are never treated as the separator,
//! so `.gitignore` has no extension while `.env.local` buckets into `local`.
//!
//! # Examples
//!
//! ```
//! use extsort::extension::bucket_for_name;
//!
//! assert_eq!(bucket_for_name("report.PDF"), Some("pdf".to_string()));
//! assert_eq!(bucket_for_name("archive.tar.gz"), Some("gz".to_string()));
//! assert_eq!(bucket_for_name(".gitignore"), None);
//! assert_eq!(bucket_for_name("Makefile"), None);
//! ```

use std::path::Path;

/// Returns the bucket name for a bare file name, or `None` if the name has no
/// usable extension.
///
/// A trailing dot (`notes.`) yields an empty extension, which is treated the
/// same as no extension at all.
pub fn bucket_for_name(file_name: &str) -> Option<String> {
    let stem_and_ext = file_name.trim_start_matches('.');
    let (_, ext) = stem_and_ext.rsplit_once('.')?;

    if ext.is_empty() {
        return None;
    }

    Some(ext.to_lowercase())
}

/// Returns the bucket name for the final component of `path`.
///
/// Non UTF-8 names are classified on their lossy conversion.
pub fn bucket_for_path(path: &Path) -> Option<String> {
    let file_name = path.file_name()?;
    bucket_for_name(&file_name.to_string_lossy())
}
