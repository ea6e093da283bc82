//! VLOOKUP-style left join of a search dataset against a master dataset.
//!
//! Keys from both sides are compared through [`CellValue::canonical_key`] so a
//! code stored as a number in one workbook still matches the same code stored
//! as text in the other. Master rows sharing a key collapse to the first one,
//! which is what spreadsheet VLOOKUP does as well.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Result, ToolError};
use crate::model::{CellValue, Dataset};

/// Label used for the search side in column errors.
pub const SEARCH_DATASET: &str = "search";
/// Label used for the master side in column errors.
pub const MASTER_DATASET: &str = "master";

const CONFLICT_SUFFIX: &str = "_master";

/// Columns driving a lookup.
#[derive(Debug, Clone, Copy)]
pub struct LookupKeys<'a> {
    /// Key column in the search dataset.
    pub search_key: &'a str,
    /// Key column in the master dataset.
    pub lookup_key: &'a str,
    /// Master columns copied onto each search row, in output order.
    pub return_columns: &'a [String],
}

/// Output of [`vlookup`].
#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult {
    /// Search rows followed by the appended master columns.
    pub dataset: Dataset,
    /// Names under which the return columns were appended.
    pub appended_columns: Vec<String>,
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Distinct non-blank search keys without a usable match, in first-seen
    /// order.
    pub unmatched_keys: Vec<String>,
}

/// Performs the lookup. Every search row appears exactly once in the output,
/// in its original order; appended cells stay empty when no master row
/// matches. A row counts as matched when its first appended value is
/// non-empty.
pub fn vlookup(search: &Dataset, master: &Dataset, keys: &LookupKeys<'_>) -> Result<JoinResult> {
    if keys.return_columns.is_empty() {
        return Err(ToolError::InvalidConfig(
            "at least one return column is required".into(),
        ));
    }

    let search_idx = search.require_column(SEARCH_DATASET, keys.search_key)?;
    let lookup_idx = master.require_column(MASTER_DATASET, keys.lookup_key)?;
    let return_idx = keys
        .return_columns
        .iter()
        .map(|column| master.require_column(MASTER_DATASET, column))
        .collect::<Result<Vec<_>>>()?;

    let index = first_match_index(master, lookup_idx);
    debug!(
        master_rows = master.row_count(),
        distinct_keys = index.len(),
        "master deduplicated on lookup key"
    );

    let appended_columns = appended_names(search.columns(), keys.return_columns);
    let mut columns = search.columns().to_vec();
    columns.extend(appended_columns.iter().cloned());

    let mut rows = Vec::with_capacity(search.row_count());
    let mut matched = 0;
    let mut unmatched_keys = Vec::new();
    let mut seen_unmatched = HashSet::new();

    for row in search.rows() {
        let key = row[search_idx].canonical_key();
        let master_row = key
            .as_ref()
            .and_then(|key| index.get(key))
            .map(|&row_idx| &master.rows()[row_idx]);

        let appended: Vec<CellValue> = match master_row {
            Some(master_row) => return_idx.iter().map(|&idx| master_row[idx].clone()).collect(),
            None => vec![CellValue::Empty; return_idx.len()],
        };

        if appended[0].is_empty() {
            if let Some(key) = key {
                if seen_unmatched.insert(key.clone()) {
                    unmatched_keys.push(key);
                }
            }
        } else {
            matched += 1;
        }

        let mut output = Vec::with_capacity(columns.len());
        output.extend(row.iter().cloned());
        output.extend(appended);
        rows.push(output);
    }

    let total = rows.len();
    let dataset = Dataset::new(columns, rows)?;

    Ok(JoinResult {
        dataset,
        appended_columns,
        total,
        matched,
        unmatched: total - matched,
        unmatched_keys,
    })
}

/// Maps each canonical key to the first master row carrying it. Rows with a
/// blank key are never indexed.
fn first_match_index(master: &Dataset, lookup_idx: usize) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(master.row_count());
    for (row_idx, row) in master.rows().iter().enumerate() {
        if let Some(key) = row[lookup_idx].canonical_key() {
            index.entry(key).or_insert(row_idx);
        }
    }
    index
}

fn appended_names(existing: &[String], return_columns: &[String]) -> Vec<String> {
    // Excel table headers must be unique ignoring case.
    let mut used: HashSet<String> = existing.iter().map(|name| name.to_lowercase()).collect();
    let mut names = Vec::with_capacity(return_columns.len());

    for column in return_columns {
        let mut name = column.clone();
        while used.contains(&name.to_lowercase()) {
            name.push_str(CONFLICT_SUFFIX);
        }
        if &name != column {
            warn!(column = %column, renamed = %name, "return column already exists in search data");
        }
        used.insert(name.to_lowercase());
        names.push(name);
    }

    names
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    fn dataset(columns: &[&str], rows: Vec<Vec<CellValue>>) -> Dataset {
        Dataset::new(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
    }

    fn return_cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn matching_row_receives_master_values() {
        let search = dataset(&["code", "qty"], vec![vec![text("A1"), CellValue::Number(3.0)]]);
        let master = dataset(
            &["code", "name", "price"],
            vec![vec![text("A1"), text("Widget"), CellValue::Number(10.0)]],
        );
        let cols = return_cols(&["name", "price"]);
        let keys = LookupKeys {
            search_key: "code",
            lookup_key: "code",
            return_columns: &cols,
        };

        let result = vlookup(&search, &master, &keys).unwrap();

        assert_eq!(result.dataset.columns(), ["code", "qty", "name", "price"]);
        assert_eq!(
            result.dataset.rows()[0],
            vec![text("A1"), CellValue::Number(3.0), text("Widget"), CellValue::Number(10.0)]
        );
        assert_eq!((result.total, result.matched, result.unmatched), (1, 1, 0));
    }

    #[test]
    fn missing_key_leaves_appended_cells_empty() {
        let search = dataset(&["code", "qty"], vec![vec![text("Z9"), CellValue::Number(1.0)]]);
        let master = dataset(
            &["code", "name", "price"],
            vec![vec![text("A1"), text("Widget"), CellValue::Number(10.0)]],
        );
        let cols = return_cols(&["name", "price"]);
        let keys = LookupKeys {
            search_key: "code",
            lookup_key: "code",
            return_columns: &cols,
        };

        let result = vlookup(&search, &master, &keys).unwrap();

        assert_eq!(result.dataset.value(0, "name"), Some(&CellValue::Empty));
        assert_eq!(result.dataset.value(0, "price"), Some(&CellValue::Empty));
        assert_eq!((result.matched, result.unmatched), (0, 1));
        assert_eq!(result.unmatched_keys, vec!["Z9".to_string()]);
    }

    #[test]
    fn duplicate_master_keys_use_the_first_row() {
        let search = dataset(
            &["code"],
            vec![vec![text("A1")], vec![text("B2")], vec![text("A1")]],
        );
        let master = dataset(
            &["code", "name"],
            vec![
                vec![text("A1"), text("first")],
                vec![text("A1"), text("second")],
                vec![text("B2"), text("bee")],
            ],
        );
        let cols = return_cols(&["name"]);
        let keys = LookupKeys {
            search_key: "code",
            lookup_key: "code",
            return_columns: &cols,
        };

        let result = vlookup(&search, &master, &keys).unwrap();

        assert_eq!(result.total, 3);
        let names: Vec<_> = (0..3).map(|row| result.dataset.value(row, "name").cloned()).collect();
        assert_eq!(
            names,
            vec![Some(text("first")), Some(text("bee")), Some(text("first"))]
        );
    }

    #[test]
    fn numeric_and_text_keys_match() {
        let search = dataset(&["id"], vec![vec![CellValue::Number(1001.0)], vec![text("1002")]]);
        let master = dataset(
            &["code", "label"],
            vec![
                vec![text("1001"), text("thousand and one")],
                vec![CellValue::Number(1002.0), text("thousand and two")],
            ],
        );
        let cols = return_cols(&["label"]);
        let keys = LookupKeys {
            search_key: "id",
            lookup_key: "code",
            return_columns: &cols,
        };

        let result = vlookup(&search, &master, &keys).unwrap();
        assert_eq!(result.matched, 2);
    }

    #[test]
    fn date_keys_match_dates_stored_as_text() {
        let may_first = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let search = dataset(&["day"], vec![vec![CellValue::from_date(may_first)]]);
        let master = dataset(&["day", "event"], vec![vec![text("2024-05-01"), text("launch")]]);
        let cols = return_cols(&["event"]);
        let keys = LookupKeys {
            search_key: "day",
            lookup_key: "day",
            return_columns: &cols,
        };

        let result = vlookup(&search, &master, &keys).unwrap();
        assert_eq!(result.matched, 1);
        assert_eq!(result.dataset.value(0, "event"), Some(&text("launch")));
    }

    #[test]
    fn blank_keys_never_match() {
        let search = dataset(&["code"], vec![vec![CellValue::Empty]]);
        let master = dataset(&["code", "name"], vec![vec![CellValue::Empty, text("ghost")]]);
        let cols = return_cols(&["name"]);
        let keys = LookupKeys {
            search_key: "code",
            lookup_key: "code",
            return_columns: &cols,
        };

        let result = vlookup(&search, &master, &keys).unwrap();
        assert_eq!(result.unmatched, 1);
        assert!(result.unmatched_keys.is_empty());
    }

    #[test]
    fn unknown_columns_are_reported() {
        let search = dataset(&["code"], Vec::new());
        let master = dataset(&["code", "name"], Vec::new());
        let cols = return_cols(&["price"]);
        let keys = LookupKeys {
            search_key: "code",
            lookup_key: "code",
            return_columns: &cols,
        };

        match vlookup(&search, &master, &keys) {
            Err(ToolError::ColumnNotFound { dataset, column, .. }) => {
                assert_eq!(dataset, MASTER_DATASET);
                assert_eq!(column, "price");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let keys = LookupKeys {
            search_key: "sku",
            ..keys
        };
        assert!(matches!(
            vlookup(&search, &master, &keys),
            Err(ToolError::ColumnNotFound { ref dataset, .. }) if dataset == SEARCH_DATASET
        ));
    }

    #[test]
    fn conflicting_return_column_is_renamed() {
        let search = dataset(&["code", "name"], vec![vec![text("A1"), text("mine")]]);
        let master = dataset(&["code", "name"], vec![vec![text("A1"), text("theirs")]]);
        let cols = return_cols(&["name"]);
        let keys = LookupKeys {
            search_key: "code",
            lookup_key: "code",
            return_columns: &cols,
        };

        let result = vlookup(&search, &master, &keys).unwrap();
        assert_eq!(result.appended_columns, vec!["name_master".to_string()]);
        assert_eq!(result.dataset.value(0, "name"), Some(&text("mine")));
        assert_eq!(result.dataset.value(0, "name_master"), Some(&text("theirs")));
    }

    #[test]
    fn return_column_differing_only_in_case_is_renamed() {
        let search = dataset(&["code", "Name"], vec![vec![text("A1"), text("mine")]]);
        let master = dataset(&["code", "name"], vec![vec![text("A1"), text("theirs")]]);
        let cols = return_cols(&["name"]);
        let keys = LookupKeys {
            search_key: "code",
            lookup_key: "code",
            return_columns: &cols,
        };

        let result = vlookup(&search, &master, &keys).unwrap();
        assert_eq!(result.appended_columns, vec!["name_master".to_string()]);
    }
}
