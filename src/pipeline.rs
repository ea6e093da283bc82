use std::fs;
use std::path::PathBuf;

use chrono::Local;
use tracing::{error, info, instrument};

use crate::config::JoinConfig;
use crate::error::Result;
use crate::io::excel_read;
use crate::io::excel_write;
use crate::io::output_path::generate_output_path;
use crate::join::{self, LookupKeys};

/// Number of unmatched keys echoed to the log.
const UNMATCHED_PREVIEW: usize = 5;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output_path: PathBuf,
    /// Sheet actually read from the search workbook.
    pub search_sheet: String,
    /// Sheet actually read from the master workbook.
    pub master_sheet: String,
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
}

/// Runs the lookup and reports success as a flag. Failures are logged before
/// `false` is returned.
pub fn run(config: &JoinConfig) -> bool {
    match execute(config) {
        Ok(_) => true,
        Err(err) => {
            error!(error = %err, "lookup failed");
            false
        }
    }
}

/// Loads the search sheet then the master sheet, joins them, and writes the
/// result workbook.
#[instrument(
    level = "info",
    skip_all,
    fields(search = %config.excel1_path.display(), master = %config.excel2_path.display())
)]
pub fn execute(config: &JoinConfig) -> Result<RunReport> {
    config.validate()?;
    info!(started_at = %Local::now().format("%Y-%m-%d %H:%M:%S"), "lookup started");

    info!(sheet = %config.excel1_sheet, "loading search data");
    let search = excel_read::read_sheet(
        &config.excel1_path,
        &config.excel1_sheet,
        config.sheet_policy,
    )?;

    info!(sheet = %config.excel2_sheet, "loading master data");
    let master = excel_read::read_sheet(
        &config.excel2_path,
        &config.excel2_sheet,
        config.sheet_policy,
    )?;

    info!(
        search_col = %config.search_col,
        lookup_col = %config.lookup_col,
        return_cols = ?config.return_cols,
        "running lookup"
    );
    let keys = LookupKeys {
        search_key: &config.search_col,
        lookup_key: &config.lookup_col,
        return_columns: &config.return_cols,
    };
    let result = join::vlookup(&search.dataset, &master.dataset, &keys)?;

    info!(
        total = result.total,
        matched = result.matched,
        unmatched = result.unmatched,
        "lookup complete"
    );
    if result.unmatched > 0 {
        let preview: Vec<&str> = result
            .unmatched_keys
            .iter()
            .take(UNMATCHED_PREVIEW)
            .map(String::as_str)
            .collect();
        info!(keys = ?preview, "unmatched search keys");
    }

    // An explicit destination receives the result sheet only.
    let (output_path, source) = match config.explicit_output() {
        Some(path) => (path.to_path_buf(), None),
        None => (
            generate_output_path(&config.excel1_path, &config.output_suffix)?,
            config.include_summary.then_some(&search.dataset),
        ),
    };

    let workbook = excel_write::build_result_workbook(
        &result,
        &output_path,
        source,
        Local::now().naive_local(),
    )?;
    excel_write::write_workbook(&output_path, &workbook)?;

    let size = fs::metadata(&output_path).map(|meta| meta.len()).unwrap_or(0);
    info!(output = %output_path.display(), bytes = size, "result saved");

    Ok(RunReport {
        output_path,
        search_sheet: search.sheet_name,
        master_sheet: master.sheet_name,
        total: result.total,
        matched: result.matched,
        unmatched: result.unmatched,
    })
}
