use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use simple_excel_writer::{Row, Workbook};

use crate::config::InputSettings;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::io::csv::infer_column;
use crate::io::table::{Cell, Table};

/// Longest sheet name Excel accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Truncate to the Excel sheet-name limit, dropping characters Excel forbids
pub fn sheet_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME_LEN)
        .collect()
}

fn open(path: &Path) -> Result<Xlsx<BufReader<File>>> {
    open_workbook(path)
        .map_err(|e| Error::Excel(format!("Could not open Excel file {}: {}", path.display(), e)))
}

fn read_range(workbook: &mut Xlsx<BufReader<File>>, sheet: &str) -> Result<Range<Data>> {
    workbook
        .worksheet_range(sheet)
        .map_err(|e| Error::Excel(format!("Could not read sheet '{}': {}", sheet, e)))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Read a survey sheet (the first one unless configured) into a DataFrame
pub fn read_survey_excel<P: AsRef<Path>>(path: P, settings: &InputSettings) -> Result<DataFrame> {
    let mut workbook = open(path.as_ref())?;

    let sheet = match &settings.sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| Error::Excel("Excel file has no sheets".to_string()))?,
    };
    let range = read_range(&mut workbook, &sheet)?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|c| cell_text(c).trim().to_string()).collect(),
        None => return Err(Error::EmptyData(format!("Sheet '{}' is empty", sheet))),
    };

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(row.get(i).map(cell_text).unwrap_or_default());
        }
    }

    let mut df = DataFrame::new();
    for (header, values) in headers.into_iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        // calamine yields numbers with '.', so the decimal separator is fixed
        df.add_column(header, infer_column(&values, '.'))?;
    }
    log::info!(
        "Loaded {} rows and {} columns from sheet '{}'",
        df.row_count(),
        df.column_count(),
        sheet
    );
    Ok(df)
}

/// Read every sheet of a workbook back as tables
pub fn read_tables<P: AsRef<Path>>(path: P) -> Result<Vec<(String, Table)>> {
    let mut workbook = open(path.as_ref())?;
    let names = workbook.sheet_names().to_vec();
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let range = read_range(&mut workbook, &name)?;
        let mut rows = range.rows();
        let mut table = match rows.next() {
            Some(header) => Table::new(header.iter().map(cell_text)),
            None => Table::default(),
        };
        for row in rows {
            table.push_row(
                row.iter()
                    .map(|cell| match cell {
                        Data::Float(f) => Cell::Number(*f),
                        Data::Int(i) => Cell::Number(*i as f64),
                        Data::Empty => Cell::Empty,
                        other => Cell::Text(other.to_string()),
                    })
                    .collect(),
            );
        }
        tables.push((name, table));
    }
    Ok(tables)
}

/// Writes tables into one workbook, one sheet per table name.
///
/// Exporting under an existing sheet name replaces that sheet in place; a
/// new name is appended after the existing sheets.
#[derive(Debug, Clone)]
pub struct ExcelExporter {
    path: PathBuf,
}

impl ExcelExporter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        ExcelExporter { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upsert `table` as sheet `name`
    pub fn export_table(&self, table: &Table, name: &str) -> Result<()> {
        let name = sheet_name(name);
        let mut sheets = if self.path.exists() {
            read_tables(&self.path)?
        } else {
            Vec::new()
        };

        match sheets.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => *existing = table.clone(),
            None => sheets.push((name.clone(), table.clone())),
        }

        write_tables(&self.path, &sheets)?;
        log::debug!("Exported sheet '{}' to {}", name, self.path.display());
        Ok(())
    }
}

fn to_row(cells: &[Cell]) -> Row {
    let mut row = Row::new();
    for cell in cells {
        match cell {
            Cell::Number(v) => row.add_cell(*v),
            Cell::Text(s) => row.add_cell(s.as_str()),
            Cell::Empty => row.add_cell(""),
        }
    }
    row
}

/// Write all sheets, replacing the file
pub fn write_tables(path: &Path, sheets: &[(String, Table)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::Excel("Could not convert file path to string".to_string()))?;

    let mut workbook = Workbook::create(path_str);
    for (name, table) in sheets {
        let mut sheet = workbook.create_sheet(name);
        workbook.write_sheet(&mut sheet, |sheet_writer| {
            sheet_writer.append_row(Row::from_iter(table.headers.iter().map(|h| h.as_str())))?;
            for row in &table.rows {
                sheet_writer.append_row(to_row(row))?;
            }
            Ok(())
        })?;
    }

    workbook
        .close()
        .map_err(|e| Error::Excel(format!("Could not save Excel file: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_name_truncation() {
        let long = "CIUDAD_AGENCIA_vs_SATISFACCION_GENERAL";
        let name = sheet_name(long);
        assert_eq!(name.chars().count(), MAX_SHEET_NAME_LEN);
        assert!(long.starts_with(&name));
        assert_eq!(sheet_name("a/b:c"), "abc");
    }

    #[test]
    fn test_cell_text_integers() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(3.5)), "3.5");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
