use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config::InputSettings;
use crate::core::column::Column;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;

const UTF8_BOM: &str = "\u{feff}";

/// Parse a number written with `decimal` as the decimal separator
pub fn parse_decimal(value: &str, decimal: char) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let normalized = if decimal == '.' {
        value.to_string()
    } else {
        value.replace(decimal, ".")
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Read a survey export from a delimited text file.
///
/// Columns whose every non-empty cell is a number become numeric, the rest
/// stay text. Short rows are padded with missing values.
pub fn read_survey_csv<P: AsRef<Path>>(path: P, settings: &InputSettings) -> Result<DataFrame> {
    let mut contents = String::new();
    File::open(path.as_ref())?.read_to_string(&mut contents)?;
    read_survey_csv_str(&contents, settings)
}

/// Same as [`read_survey_csv`] over in-memory text
pub fn read_survey_csv_str(contents: &str, settings: &InputSettings) -> Result<DataFrame> {
    let contents = contents.strip_prefix(UTF8_BOM).unwrap_or(contents);
    let delimiter = u8::try_from(settings.delimiter).map_err(|_| {
        Error::ConfigurationError(format!("Delimiter '{}' is not ASCII", settings.delimiter))
    })?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if headers.iter().all(String::is_empty) {
        return Err(Error::EmptyData("CSV file has no header row".into()));
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for result in rdr.records() {
        let record = result?;
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or("").to_string());
        }
    }

    let mut df = DataFrame::new();
    for (header, values) in headers.into_iter().zip(cells) {
        df.add_column(header, infer_column(&values, settings.decimal))?;
    }
    log::info!(
        "Loaded {} rows and {} columns",
        df.row_count(),
        df.column_count()
    );
    Ok(df)
}

/// Numeric when every non-empty cell parses, text otherwise
pub(crate) fn infer_column(values: &[String], decimal: char) -> Column {
    let parsed: Vec<Option<f64>> = values.iter().map(|v| parse_decimal(v, decimal)).collect();
    let numeric = values
        .iter()
        .zip(&parsed)
        .all(|(raw, num)| raw.trim().is_empty() || num.is_some());
    let any_value = values.iter().any(|v| !v.trim().is_empty());

    if numeric && any_value {
        Column::Float64(parsed.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else {
        Column::String(
            values
                .iter()
                .map(|v| {
                    let v = v.trim();
                    (!v.is_empty()).then(|| v.to_string())
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::column::ColumnType;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("4,5", ','), Some(4.5));
        assert_eq!(parse_decimal(" 3 ", ','), Some(3.0));
        assert_eq!(parse_decimal("", ','), None);
        assert_eq!(parse_decimal("n/a", ','), None);
        assert_eq!(parse_decimal("2.25", '.'), Some(2.25));
    }

    #[test]
    fn test_read_with_bom_and_decimal_comma() {
        let text = "\u{feff}GENERO;PREGUNTA_1;COMENTARIO\nF;4,5;bien\nM;;\nF;3;todo ok\n";
        let df = read_survey_csv_str(text, &InputSettings::default()).unwrap();
        assert_eq!(df.column_names(), &["GENERO", "PREGUNTA_1", "COMENTARIO"]);
        assert_eq!(df.row_count(), 3);
        assert_eq!(df.column_type("PREGUNTA_1").unwrap(), ColumnType::Float64);
        assert_eq!(df.column_type("GENERO").unwrap(), ColumnType::String);

        let scores = df.numeric_values("PREGUNTA_1").unwrap();
        assert_eq!(scores[0], 4.5);
        assert!(scores[1].is_nan());
        assert_eq!(df.labels("COMENTARIO").unwrap()[1], None);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let text = "A;B\n1;x\n2\n";
        let df = read_survey_csv_str(text, &InputSettings::default()).unwrap();
        assert_eq!(df.labels("B").unwrap(), vec![Some("x".to_string()), None]);
    }
}
