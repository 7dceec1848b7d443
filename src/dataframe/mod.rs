//! Column-oriented survey table
//!
//! A deliberately small DataFrame: every column is either numeric (`f64`,
//! NaN marks a missing value) or text (`Option<String>`). Missing values are
//! kept in place and only dropped per analysis.

use std::collections::HashMap;

use crate::core::column::{Column, ColumnType};
use crate::core::error::{Error, Result};

/// DataFrame struct: Column-oriented 2D data structure
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    columns: HashMap<String, Column>,
    column_order: Vec<String>,
    row_count: usize,
}

impl DataFrame {
    /// Create a new empty DataFrame
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. The first column fixes the row count.
    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(Error::Column(format!("Duplicate column name: {}", name)));
        }
        if !self.column_order.is_empty() && column.len() != self.row_count {
            return Err(Error::InconsistentRowCount {
                expected: self.row_count,
                found: column.len(),
            });
        }
        self.row_count = column.len();
        self.column_order.push(name.clone());
        self.columns.insert(name, column);
        Ok(())
    }

    /// Add a numeric column
    pub fn add_numeric_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        self.add_column(name, Column::Float64(values))
    }

    /// Add a text column from anything string-like; empty strings become missing
    pub fn add_string_column<S: AsRef<str>>(
        &mut self,
        name: impl Into<String>,
        values: &[S],
    ) -> Result<()> {
        let values = values
            .iter()
            .map(|v| {
                let v = v.as_ref().trim();
                if v.is_empty() {
                    None
                } else {
                    Some(v.to_string())
                }
            })
            .collect();
        self.add_column(name, Column::String(values))
    }

    /// Replace an existing column or append a new one
    pub fn set_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            if column.len() != self.row_count {
                return Err(Error::InconsistentRowCount {
                    expected: self.row_count,
                    found: column.len(),
                });
            }
            self.columns.insert(name, column);
            Ok(())
        } else {
            self.add_column(name, column)
        }
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Whether a column exists
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in insertion order
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    /// Type of the named column
    pub fn column_type(&self, name: &str) -> Result<ColumnType> {
        Ok(self.column(name)?.column_type())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_order.len()
    }

    /// Numeric view of a column (text cells are parsed, failures become NaN)
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.column(name)?;
        Ok((0..column.len()).map(|row| column.number_at(row)).collect())
    }

    /// Category labels of a column, `None` where missing
    pub fn labels(&self, name: &str) -> Result<Vec<Option<String>>> {
        let column = self.column(name)?;
        Ok((0..column.len()).map(|row| column.label_at(row)).collect())
    }

    /// Categories of a column ordered by descending frequency.
    /// Ties keep first-encounter order.
    pub fn category_counts(&self, name: &str) -> Result<Vec<(String, usize)>> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for label in self.labels(name)?.into_iter().flatten() {
            let entry = counts.entry(label.clone()).or_insert(0);
            if *entry == 0 {
                order.push(label);
            }
            *entry += 1;
        }
        let mut result: Vec<(String, usize)> = order
            .into_iter()
            .map(|label| {
                let count = counts.get(&label).copied().unwrap_or(0);
                (label, count)
            })
            .collect();
        // stable sort keeps encounter order among ties
        result.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(result)
    }

    /// The `n` most frequent categories of a column
    pub fn top_categories(&self, name: &str, n: usize) -> Result<Vec<String>> {
        Ok(self
            .category_counts(name)?
            .into_iter()
            .take(n)
            .map(|(label, _)| label)
            .collect())
    }

    /// Partition a numeric column by the labels of a grouping column.
    ///
    /// Groups appear in encounter order. Rows with a missing label are
    /// skipped; NaN values are kept so the caller decides how to drop them.
    pub fn group_numeric(&self, group_col: &str, target_col: &str) -> Result<Vec<(String, Vec<f64>)>> {
        let labels = self.labels(group_col)?;
        let values = self.numeric_values(target_col)?;

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
        for (label, value) in labels.into_iter().zip(values) {
            let Some(label) = label else { continue };
            groups
                .entry(label.clone())
                .or_insert_with(|| {
                    order.push(label);
                    Vec::new()
                })
                .push(value);
        }

        Ok(order
            .into_iter()
            .filter_map(|label| groups.remove(&label).map(|v| (label, v)))
            .collect())
    }

    /// Label pairs of two columns for rows where both are present
    pub fn category_pairs(&self, col1: &str, col2: &str) -> Result<Vec<(String, String)>> {
        let a = self.labels(col1)?;
        let b = self.labels(col2)?;
        Ok(a.into_iter()
            .zip(b)
            .filter_map(|(x, y)| Some((x?, y?)))
            .collect())
    }
}
