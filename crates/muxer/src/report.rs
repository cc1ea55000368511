use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use chrono::Utc;
use log::info;

/// File name of the problem report written into the output root
pub const REPORT_FILE_NAME: &str = "problematic_files.txt";

/// Write the conversion-failure report: one path per line under an
/// explanatory header. Nothing is written when the set is empty.
pub fn write_problem_report(
    output_dir: &Path,
    problematic: &BTreeSet<PathBuf>,
) -> Result<Option<PathBuf>> {
    if problematic.is_empty() {
        return Ok(None);
    }

    let report_path = output_dir.join(REPORT_FILE_NAME);
    let mut body = format!(
        "Files that could not be converted (run completed {}):\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    for path in problematic {
        body.push_str(&path.to_string_lossy());
        body.push('\n');
    }

    fs::write(&report_path, body)
        .with_context(|| format!("Failed to write problem report: {}", report_path.display()))?;

    info!(
        "Wrote problem report for {} file(s): {}",
        problematic.len(),
        report_path.display()
    );
    Ok(Some(report_path))
}
