use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Table, Workbook, Worksheet};
use tracing::warn;

use crate::error::Result;
use crate::join::JoinResult;
use crate::model::{CellValue, Dataset};

/// Sheet holding the joined rows.
pub const RESULT_SHEET: &str = "VLOOKUP Result";
/// Sheet holding run statistics.
pub const SUMMARY_SHEET: &str = "Summary";
/// Sheet holding the leading rows of the search data.
pub const SAMPLE_SHEET: &str = "Source Sample";
/// Number of search rows copied into [`SAMPLE_SHEET`].
pub const SAMPLE_ROWS: usize = 10;

const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// A dataset that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub dataset: Dataset,
}

/// Represents all tables required to materialise the Excel workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

impl WorkbookData {
    pub fn push(&mut self, sheet_name: impl Into<String>, dataset: Dataset) {
        self.tables.push(SheetTable {
            sheet_name: sheet_name.into(),
            dataset,
        });
    }
}

/// Assembles the output workbook of a lookup run: the joined rows and, when
/// `source` is given, a summary sheet plus a sample of the search data.
pub fn build_result_workbook(
    result: &JoinResult,
    output: &Path,
    source: Option<&Dataset>,
    processed_at: NaiveDateTime,
) -> Result<WorkbookData> {
    let mut workbook = WorkbookData::default();
    workbook.push(RESULT_SHEET, result.dataset.clone());

    if let Some(source) = source {
        let file_name = output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = output
            .parent()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();

        let summary_rows = vec![
            summary_row(
                "Processed at",
                CellValue::Text(processed_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            ),
            summary_row("Total rows", CellValue::Number(result.total as f64)),
            summary_row("Matched", CellValue::Number(result.matched as f64)),
            summary_row("Unmatched", CellValue::Number(result.unmatched as f64)),
            summary_row("File name", CellValue::Text(file_name)),
            summary_row("Directory", CellValue::Text(directory)),
        ];
        let summary = Dataset::new(vec!["Item".into(), "Value".into()], summary_rows)?;

        workbook.push(SUMMARY_SHEET, summary);
        workbook.push(SAMPLE_SHEET, source.head(SAMPLE_ROWS));
    }

    Ok(workbook)
}

fn summary_row(item: &str, value: CellValue) -> Vec<CellValue> {
    vec![CellValue::Text(item.to_string()), value]
}

/// Writes the provided workbook data to the given path. The workbook is
/// assembled in memory first so a failure never leaves a half-built file
/// behind.
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

    for table in &workbook.tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;
        write_table(worksheet, &table.dataset, &datetime_format)?;
    }

    let buffer = workbook_writer.save_to_buffer()?;
    if let Err(error) = fs::write(path, buffer) {
        if path.exists() {
            if let Err(cleanup) = fs::remove_file(path) {
                warn!(path = %path.display(), %cleanup, "failed to remove partial output");
            }
        }
        return Err(error.into());
    }
    Ok(())
}

fn write_table(
    worksheet: &mut Worksheet,
    dataset: &Dataset,
    datetime_format: &Format,
) -> Result<()> {
    for (col_idx, header) in dataset.columns().iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, header)?;
    }

    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let excel_col = col_idx as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(value) => {
                    worksheet.write_string(excel_row, excel_col, value)?;
                }
                CellValue::Number(value) => {
                    worksheet.write_number(excel_row, excel_col, *value)?;
                }
                CellValue::Bool(value) => {
                    worksheet.write_boolean(excel_row, excel_col, *value)?;
                }
                CellValue::DateTime(value) => {
                    worksheet.write_number_with_format(
                        excel_row,
                        excel_col,
                        *value,
                        datetime_format,
                    )?;
                }
            }
        }
    }

    // Excel tables need a header and at least one data row.
    if dataset.column_count() > 0 && dataset.row_count() > 0 {
        let mut excel_table = Table::new();
        excel_table.set_autofilter(true);
        let col_end = (dataset.column_count() as u16).saturating_sub(1);
        let row_end = dataset.row_count() as u32;
        worksheet.add_table(0, 0, row_end, col_end, &excel_table)?;
    }

    worksheet.autofit();
    Ok(())
}
