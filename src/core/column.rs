use std::collections::HashMap;

use serde::Serialize;

/// Enum to identify column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Float64,
    String,
}

/// A survey column. Missing numeric values are stored as NaN, missing text as `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float64(Vec<f64>),
    String(Vec<Option<String>>),
}

impl Column {
    /// Returns the length of the column
    pub fn len(&self) -> usize {
        match self {
            Column::Float64(values) => values.len(),
            Column::String(values) => values.len(),
        }
    }

    /// Returns whether the column is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the type of the column
    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Float64(_) => ColumnType::Float64,
            Column::String(_) => ColumnType::String,
        }
    }

    /// Number of missing entries
    pub fn null_count(&self) -> usize {
        match self {
            Column::Float64(values) => values.iter().filter(|v| v.is_nan()).count(),
            Column::String(values) => values.iter().filter(|v| v.is_none()).count(),
        }
    }

    /// Value at `row` rendered as a category label. Numbers without a
    /// fractional part are printed as integers so that e.g. a year column
    /// groups as "2024" rather than "2024.0".
    pub fn label_at(&self, row: usize) -> Option<String> {
        match self {
            Column::Float64(values) => {
                let v = *values.get(row)?;
                if v.is_nan() {
                    None
                } else if v.fract() == 0.0 && v.abs() < 1e15 {
                    Some(format!("{}", v as i64))
                } else {
                    Some(v.to_string())
                }
            }
            Column::String(values) => values.get(row)?.clone(),
        }
    }

    /// Value at `row` as a number, NaN when missing or not numeric
    pub fn number_at(&self, row: usize) -> f64 {
        match self {
            Column::Float64(values) => values.get(row).copied().unwrap_or(f64::NAN),
            Column::String(values) => values
                .get(row)
                .and_then(|v| v.as_deref())
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN),
        }
    }

    /// Counts per category label, ignoring missing values
    pub fn value_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for row in 0..self.len() {
            if let Some(label) = self.label_at(row) {
                *counts.entry(label).or_insert(0) += 1;
            }
        }
        counts
    }
}
