use std::collections::HashSet;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Result, ToolError};

/// `NaiveDate::num_days_from_ce` of 1899-12-30, the zero day of the Excel
/// 1900 date system.
const EXCEL_EPOCH_DAYS_FROM_CE: i32 = 693_594;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Represents a single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Blank cell. Doubles as the null produced by an unmatched lookup.
    Empty,
    /// Plain string.
    Text(String),
    /// Any numeric cell, integers included.
    Number(f64),
    /// Boolean cell.
    Bool(bool),
    /// Date or date-time stored as an Excel serial number.
    DateTime(f64),
}

impl CellValue {
    /// Returns `true` for blank cells.
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Builds a date-time cell from a calendar date at midnight.
    pub fn from_date(date: NaiveDate) -> Self {
        CellValue::DateTime(f64::from(date.num_days_from_ce() - EXCEL_EPOCH_DAYS_FROM_CE))
    }

    /// Converts a date-time cell back into a timestamp. Returns `None` for
    /// other variants and for serials outside chrono's range.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        let CellValue::DateTime(serial) = self else {
            return None;
        };
        serial_to_datetime(*serial)
    }

    /// Canonical textual form used when values of different native types must
    /// compare equal, e.g. the number `1001` and the text `"1001"`. Dates at
    /// midnight render as `YYYY-MM-DD`, other dates as `YYYY-MM-DD HH:MM:SS`.
    /// Blank cells have no canonical form.
    pub fn canonical_key(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(value) => Some(value.clone()),
            CellValue::Number(value) => Some(format_number(*value)),
            CellValue::Bool(value) => Some(value.to_string()),
            CellValue::DateTime(serial) => Some(
                self.as_datetime()
                    .map(format_datetime)
                    .unwrap_or_else(|| format_number(*serial)),
            ),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical_key() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

fn format_datetime(value: NaiveDateTime) -> String {
    if value.num_seconds_from_midnight() == 0 {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let total_seconds = (serial * SECONDS_PER_DAY).round() as i64;
    let days = total_seconds.div_euclid(86_400);
    let seconds = total_seconds.rem_euclid(86_400) as u32;
    let days_from_ce = i32::try_from(days).ok()?.checked_add(EXCEL_EPOCH_DAYS_FROM_CE)?;
    let date = NaiveDate::from_num_days_from_ce_opt(days_from_ce)?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
    Some(date.and_time(time))
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// An in-memory sheet: named columns plus rows aligned with them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Creates a dataset, padding short rows with blanks and truncating long
    /// ones so that every row matches the column count. Column names must be
    /// unique ignoring case, as Excel tables require.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.to_lowercase()) {
                return Err(ToolError::InvalidWorkbook(format!(
                    "duplicate column name '{column}'"
                )));
            }
        }

        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Like [`Dataset::column_index`] but reports a missing column as
    /// [`ToolError::ColumnNotFound`] tagged with `dataset`.
    pub fn require_column(&self, dataset: &str, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ToolError::ColumnNotFound {
                dataset: dataset.to_string(),
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }

    /// Value at `row` in the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col_idx = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(col_idx))
    }

    /// Copy of the first `limit` rows.
    pub fn head(&self, limit: usize) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }
}

/// Turns raw header cells into unique, non-empty column names. Blank headers
/// become `Unnamed: {index}` and names repeated ignoring case gain `.1`,
/// `.2`, ... suffixes.
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut columns = Vec::with_capacity(raw.len());

    for (index, header) in raw.into_iter().enumerate() {
        let trimmed = header.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {index}")
        } else {
            trimmed.to_string()
        };

        let mut candidate = base.clone();
        let mut counter = 1;
        while used.contains(&candidate.to_lowercase()) {
            candidate = format!("{base}.{counter}");
            counter += 1;
        }
        used.insert(candidate.to_lowercase());
        columns.push(candidate);
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_share_a_key_with_text() {
        assert_eq!(CellValue::Number(1001.0).canonical_key().as_deref(), Some("1001"));
        assert_eq!(CellValue::Number(2.5).canonical_key().as_deref(), Some("2.5"));
        assert_eq!(CellValue::Empty.canonical_key(), None);
    }

    #[test]
    fn dates_survive_the_serial_conversion() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let cell = CellValue::from_date(date);
        assert_eq!(cell, CellValue::DateTime(45413.0));
        assert_eq!(cell.as_datetime().unwrap().date(), date);
        assert_eq!(cell.canonical_key().as_deref(), Some("2024-05-01"));

        let morning = CellValue::DateTime(45413.0 + 0.375);
        assert_eq!(morning.canonical_key().as_deref(), Some("2024-05-01 09:00:00"));
    }

    #[test]
    fn headers_are_made_unique() {
        let headers = normalize_headers(vec![
            "code".into(),
            "".into(),
            "code".into(),
            " qty ".into(),
            "code".into(),
            "CODE".into(),
        ]);
        assert_eq!(
            headers,
            vec!["code", "Unnamed: 1", "code.1", "qty", "code.2", "CODE.3"]
        );
    }

    #[test]
    fn rows_are_padded_to_the_header_width() {
        let dataset = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Number(1.0)]],
        )
        .unwrap();
        assert_eq!(dataset.value(0, "b"), Some(&CellValue::Empty));
        assert!(Dataset::new(vec!["a".into(), "a".into()], Vec::new()).is_err());
        assert!(Dataset::new(vec!["id".into(), "ID".into()], Vec::new()).is_err());
    }
}
