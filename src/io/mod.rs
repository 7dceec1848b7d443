//! Survey input and result export
//!
//! Surveys are read from delimited text or Excel workbooks. Results are
//! exported as Excel sheets (upserted into one workbook) and JSON documents.

pub mod csv;
pub mod excel;
pub mod json;
pub mod table;

use std::path::Path;

use crate::config::InputSettings;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;

// Re-export commonly used functions
pub use self::csv::{parse_decimal, read_survey_csv};
pub use excel::{read_survey_excel, ExcelExporter};
pub use json::write_json;
pub use table::{Cell, Table};

/// Load a survey file, choosing the reader from the extension
pub fn load_survey<P: AsRef<Path>>(path: P, settings: &InputSettings) -> Result<DataFrame> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("csv") | Some("txt") => read_survey_csv(path, settings),
        Some("xlsx") | Some("xlsm") => read_survey_excel(path, settings),
        Some(ext) => Err(Error::Format(format!("Unsupported survey file format: {}", ext))),
        None => Err(Error::Format(format!(
            "Cannot tell the format of {} without an extension",
            path.display()
        ))),
    }
}
