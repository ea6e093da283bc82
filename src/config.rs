use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};
use crate::io::excel_read::SheetPolicy;
use crate::io::output_path::DEFAULT_SUFFIX;

/// Everything needed for one lookup run. `excel1` is the search workbook,
/// `excel2` the master workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    pub excel1_path: PathBuf,
    pub excel1_sheet: String,
    pub excel2_path: PathBuf,
    pub excel2_sheet: String,
    /// Key column in the search sheet.
    pub search_col: String,
    /// Key column in the master sheet.
    pub lookup_col: String,
    /// Master columns appended to every search row, in order.
    pub return_cols: Vec<String>,
    /// Write the result next to the search workbook under a generated name.
    #[serde(default = "default_true")]
    pub auto_save_same_dir: bool,
    /// Destination used when `auto_save_same_dir` is off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub sheet_policy: SheetPolicy,
    /// Add the summary and source-sample sheets to a generated output.
    #[serde(default = "default_true")]
    pub include_summary: bool,
    #[serde(default = "default_suffix")]
    pub output_suffix: String,
}

fn default_true() -> bool {
    true
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

impl JoinConfig {
    /// Builds a configuration with default output settings.
    pub fn new(
        excel1_path: impl Into<PathBuf>,
        excel1_sheet: impl Into<String>,
        excel2_path: impl Into<PathBuf>,
        excel2_sheet: impl Into<String>,
        search_col: impl Into<String>,
        lookup_col: impl Into<String>,
        return_cols: Vec<String>,
    ) -> Self {
        Self {
            excel1_path: excel1_path.into(),
            excel1_sheet: excel1_sheet.into(),
            excel2_path: excel2_path.into(),
            excel2_sheet: excel2_sheet.into(),
            search_col: search_col.into(),
            lookup_col: lookup_col.into(),
            return_cols,
            auto_save_same_dir: true,
            output_path: None,
            sheet_policy: SheetPolicy::default(),
            include_summary: true,
            output_suffix: default_suffix(),
        }
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ToolError::FileNotFound(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Presence checks that do not need the workbooks.
    pub fn validate(&self) -> Result<()> {
        if self.return_cols.is_empty() {
            return Err(ToolError::InvalidConfig(
                "return_cols must name at least one column".into(),
            ));
        }

        let named = [
            ("search_col", self.search_col.as_str()),
            ("lookup_col", self.lookup_col.as_str()),
        ];
        for (field, value) in named {
            if value.trim().is_empty() {
                return Err(ToolError::InvalidConfig(format!("{field} is empty")));
            }
        }
        if self.return_cols.iter().any(|col| col.trim().is_empty()) {
            return Err(ToolError::InvalidConfig(
                "return_cols contains an empty column name".into(),
            ));
        }
        if self.output_suffix.trim().is_empty() {
            return Err(ToolError::InvalidConfig("output_suffix is empty".into()));
        }
        Ok(())
    }

    /// The explicit destination, if one applies. `None` means a generated
    /// path next to the search workbook.
    pub fn explicit_output(&self) -> Option<&Path> {
        if self.auto_save_same_dir {
            None
        } else {
            self.output_path.as_deref()
        }
    }
}

/// Example configuration written by `init-config`.
pub fn template() -> JoinConfig {
    JoinConfig::new(
        "path/to/search.xlsx",
        "Sheet1",
        "path/to/master.xlsx",
        "Master",
        "product_code",
        "product_code",
        vec![
            "product_name".to_string(),
            "price".to_string(),
            "category".to_string(),
        ],
    )
}

/// Writes [`template`] to `path`. An existing file is only replaced when
/// `force` is set.
pub fn write_template(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(ToolError::InvalidConfig(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    template().to_json_file(path)
}
