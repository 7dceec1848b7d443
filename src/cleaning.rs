//! Survey cleaning
//!
//! Question scores become numeric and the survey date is split into year and
//! month columns. Values that cannot be parsed become missing; rows are
//! never dropped here.

use chrono::{Datelike, Duration, NaiveDate};

use crate::config::InputSettings;
use crate::core::column::Column;
use crate::core::error::Result;
use crate::dataframe::DataFrame;
use crate::io::csv::parse_decimal;

pub const YEAR_COLUMN: &str = "AÑO_ENCUESTA";
pub const MONTH_COLUMN: &str = "MES_ENCUESTA";

/// Day zero of Excel serial dates
fn excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Parse a survey date with `format`. A trailing time part is ignored.
pub fn parse_survey_date(value: &str, format: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, format).ok().or_else(|| {
        value
            .split_whitespace()
            .next()
            .and_then(|day| NaiveDate::parse_from_str(day, format).ok())
    })
}

fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    excel_epoch()?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Apply the survey cleaning rules, returning the cleaned frame
pub fn clean_survey(mut df: DataFrame, settings: &InputSettings) -> Result<DataFrame> {
    for name in &settings.score_columns {
        if !df.contains_column(name) {
            log::warn!("Score column '{}' not found, skipping", name);
            continue;
        }
        let column = df.column(name)?;
        let cleaned = match column {
            Column::Float64(_) => continue,
            Column::String(values) => {
                let parsed: Vec<f64> = values
                    .iter()
                    .map(|v| {
                        v.as_deref()
                            .map(|s| s.replace(' ', ""))
                            .and_then(|s| parse_decimal(&s, settings.decimal))
                            .unwrap_or(f64::NAN)
                    })
                    .collect();
                let invalid = values
                    .iter()
                    .zip(&parsed)
                    .filter(|(raw, num)| raw.is_some() && num.is_nan())
                    .count();
                if invalid > 0 {
                    log::warn!("{} unparseable values in '{}' set to missing", invalid, name);
                }
                Column::Float64(parsed)
            }
        };
        df.set_column(name.clone(), cleaned)?;
    }

    if df.contains_column(&settings.date_column) {
        let dates: Vec<Option<NaiveDate>> = match df.column(&settings.date_column)? {
            Column::Float64(values) => values.iter().map(|v| serial_to_date(*v)).collect(),
            Column::String(values) => values
                .iter()
                .map(|v| {
                    v.as_deref()
                        .and_then(|s| parse_survey_date(s, &settings.date_format))
                })
                .collect(),
        };
        let missing = dates.iter().filter(|d| d.is_none()).count();
        if missing > 0 {
            log::debug!("{} survey dates missing or unparseable", missing);
        }
        let years = dates
            .iter()
            .map(|d| d.map_or(f64::NAN, |d| d.year() as f64))
            .collect();
        let months = dates
            .iter()
            .map(|d| d.map_or(f64::NAN, |d| d.month() as f64))
            .collect();
        df.set_column(YEAR_COLUMN, Column::Float64(years))?;
        df.set_column(MONTH_COLUMN, Column::Float64(months))?;
    } else {
        log::warn!("Date column '{}' not found, skipping", settings.date_column);
    }

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::column::ColumnType;

    fn raw_frame() -> DataFrame {
        let mut df = DataFrame::new();
        df.add_string_column("PREGUNTA_1", &["4,5", "3", "x", ""]).unwrap();
        df.add_string_column("FECHA_ENCUESTA", &["15/03/2024", "01/12/2023 10:30", "bad", ""])
            .unwrap();
        df
    }

    #[test]
    fn test_scores_become_numeric() {
        let df = clean_survey(raw_frame(), &InputSettings::default()).unwrap();
        assert_eq!(df.column_type("PREGUNTA_1").unwrap(), ColumnType::Float64);
        let scores = df.numeric_values("PREGUNTA_1").unwrap();
        assert_eq!(scores[0], 4.5);
        assert_eq!(scores[1], 3.0);
        assert!(scores[2].is_nan());
        assert!(scores[3].is_nan());
    }

    #[test]
    fn test_year_and_month_derived() {
        let df = clean_survey(raw_frame(), &InputSettings::default()).unwrap();
        let years = df.numeric_values(YEAR_COLUMN).unwrap();
        let months = df.numeric_values(MONTH_COLUMN).unwrap();
        assert_eq!(years[0], 2024.0);
        assert_eq!(months[0], 3.0);
        assert_eq!(years[1], 2023.0);
        assert_eq!(months[1], 12.0);
        assert!(years[2].is_nan());
        assert!(months[3].is_nan());
    }

    #[test]
    fn test_excel_serial_dates() {
        // 45366 is 2024-03-15
        assert_eq!(serial_to_date(45366.0), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_missing_columns_are_skipped() {
        let mut df = DataFrame::new();
        df.add_string_column("GENERO", &["F", "M"]).unwrap();
        let cleaned = clean_survey(df, &InputSettings::default()).unwrap();
        assert_eq!(cleaned.column_count(), 1);
    }
}
