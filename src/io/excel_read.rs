use std::path::Path;

use calamine::{DataType, Range, Reader, open_workbook_auto};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ToolError};
use crate::model::{CellValue, Dataset, normalize_headers};

/// What to do when the requested sheet is not in the workbook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetPolicy {
    /// Warn and fall back to the first sheet of the workbook.
    #[default]
    Lenient,
    /// Fail with [`ToolError::SheetNotFound`].
    Strict,
}

/// A dataset together with the sheet it was actually read from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSheet {
    pub sheet_name: String,
    /// `true` when the requested sheet was missing and the first sheet was used.
    pub fell_back: bool,
    pub dataset: Dataset,
}

/// Lists the sheet names of a workbook in workbook order.
pub fn list_sheets(path: &Path) -> Result<Vec<String>> {
    ensure_exists(path)?;
    let workbook = open_workbook_auto(path)?;
    Ok(workbook.sheet_names().to_vec())
}

/// Loads one sheet of a workbook as a [`Dataset`]. The first row supplies the
/// column names.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), sheet = requested))]
pub fn read_sheet(path: &Path, requested: &str, policy: SheetPolicy) -> Result<LoadedSheet> {
    ensure_exists(path)?;

    let mut workbook = open_workbook_auto(path)?;
    let available = workbook.sheet_names().to_vec();
    info!(sheets = ?available, "available sheets");

    let (sheet_name, fell_back) = resolve_sheet(path, requested, &available, policy)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{sheet_name}'")))?
        .map_err(ToolError::from)?;
    let dataset = range_to_dataset(&range)?;

    info!(
        path = %path.display(),
        sheet = %sheet_name,
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "sheet loaded"
    );
    debug!(columns = ?dataset.columns(), "column names");

    Ok(LoadedSheet {
        sheet_name,
        fell_back,
        dataset,
    })
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ToolError::FileNotFound(path.to_path_buf()))
    }
}

fn resolve_sheet(
    path: &Path,
    requested: &str,
    available: &[String],
    policy: SheetPolicy,
) -> Result<(String, bool)> {
    if available.iter().any(|name| name == requested) {
        return Ok((requested.to_string(), false));
    }

    let first = available.first().ok_or_else(|| {
        ToolError::InvalidWorkbook(format!("{} contains no sheets", path.display()))
    })?;

    match policy {
        SheetPolicy::Lenient => {
            warn!(
                requested,
                substitute = %first,
                available = ?available,
                "sheet not found, using the first sheet instead"
            );
            Ok((first.clone(), true))
        }
        SheetPolicy::Strict => Err(ToolError::SheetNotFound {
            path: path.to_path_buf(),
            sheet: requested.to_string(),
            available: available.to_vec(),
        }),
    }
}

fn range_to_dataset(range: &Range<DataType>) -> Result<Dataset> {
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| cell_to_value(cell).to_string())
            .collect(),
        None => return Dataset::new(Vec::new(), Vec::new()),
    };
    let columns = normalize_headers(headers);

    let data = rows
        .map(|row| row.iter().map(cell_to_value).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    Dataset::new(columns, data)
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) if value.is_empty() => CellValue::Empty,
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::DateTime(value) => CellValue::DateTime(*value),
        DataType::Empty => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}
