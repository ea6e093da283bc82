use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::error::Result;

/// Suffix used for lookup results unless the configuration overrides it.
pub const DEFAULT_SUFFIX: &str = "vlookup_result";

/// Derives a fresh `.xlsx` path next to `input`, stamped with the current
/// local time.
pub fn generate_output_path(input: &Path, suffix: &str) -> Result<PathBuf> {
    generate_output_path_at(input, suffix, Local::now().naive_local())
}

/// Derives `{stem}_{suffix}_{YYYYMMDD_HHMMSS}.xlsx` in the input's directory.
/// When that name is taken a two-digit counter starting at `01` is appended
/// until a free name is found. The returned path does not exist at the time
/// of return.
pub fn generate_output_path_at(
    input: &Path,
    suffix: &str,
    timestamp: NaiveDateTime,
) -> Result<PathBuf> {
    let absolute = std::path::absolute(input)?;
    let directory = absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let base = absolute
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = timestamp.format("%Y%m%d_%H%M%S");

    let mut candidate = directory.join(format!("{base}_{suffix}_{stamp}.xlsx"));
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = directory.join(format!("{base}_{suffix}_{stamp}_{counter:02}.xlsx"));
        counter += 1;
    }

    Ok(candidate)
}
