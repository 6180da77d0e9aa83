//! Output formatting and styling module.
//!
//! All operator-facing text goes through here: colored status lines, the
//! progress bar shown while files are processed, and the per-bucket summary.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;

/// Centralized, consistently styled CLI output.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use extsort::output::OutputFormatter;
    /// OutputFormatter::success("Done. 12 files organized.");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark, on stderr.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message.red());
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for `total` files. Hidden when stderr is not a
    /// terminal.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints a table of file counts per bucket, sorted by bucket name.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use extsort::output::OutputFormatter;
    /// use std::collections::HashMap;
    ///
    /// let mut counts = HashMap::new();
    /// counts.insert("pdf".to_string(), 15);
    /// counts.insert("jpg".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(bucket_counts: &HashMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let mut buckets: Vec<_> = bucket_counts.iter().collect();
        buckets.sort_by_key(|&(name, _)| name);

        let max_bucket_len = buckets
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(6); // "Bucket"

        println!(
            "{:<width$} | {}",
            "Bucket".bold(),
            "Files".bold(),
            width = max_bucket_len
        );
        println!("{}", "-".repeat(max_bucket_len + 10));

        for (bucket, count) in &buckets {
            println!(
                "{:<width$} | {} {}",
                bucket,
                count.to_string().green(),
                file_word(**count),
                width = max_bucket_len
            );
        }

        println!("{}", "-".repeat(max_bucket_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            file_word(total_files),
            width = max_bucket_len
        );
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

/// "file" or "files" depending on `count`.
pub fn file_word(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
