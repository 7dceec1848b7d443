//! Samples and group comparisons
//!
//! A [`GroupComparison`] is the unit of work for the test selector: one numeric
//! target variable partitioned by a categorical grouping variable. Missing
//! values are removed when a [`Sample`] is built, so every test downstream
//! sees only valid observations.

use crate::core::column::ColumnType;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::stats::descriptive::filter_nan;

/// The valid observations of one group
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub label: String,
    pub values: Vec<f64>,
}

impl Sample {
    /// Build a sample, dropping NaN values
    pub fn new(label: impl Into<String>, data: &[f64]) -> Self {
        Sample {
            label: label.into(),
            values: filter_nan(data),
        }
    }

    /// Number of valid observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A numeric target partitioned by a grouping variable
#[derive(Debug, Clone, PartialEq)]
pub struct GroupComparison {
    pub grouping: String,
    pub target: String,
    pub samples: Vec<Sample>,
}

impl GroupComparison {
    pub fn new(grouping: impl Into<String>, target: impl Into<String>, samples: Vec<Sample>) -> Self {
        GroupComparison {
            grouping: grouping.into(),
            target: target.into(),
            samples,
        }
    }

    /// All groups of `group_col` in encounter order. Groups left with no
    /// valid observation are dropped.
    pub fn from_frame(df: &DataFrame, group_col: &str, target_col: &str) -> Result<Self> {
        check_numeric_target(df, target_col)?;
        let samples = df
            .group_numeric(group_col, target_col)?
            .into_iter()
            .map(|(label, values)| Sample::new(label, &values))
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self::new(group_col, target_col, samples))
    }

    /// Only the listed groups, in the order given. A label absent from the
    /// data is a configuration error.
    pub fn from_frame_groups(
        df: &DataFrame,
        group_col: &str,
        target_col: &str,
        labels: &[&str],
    ) -> Result<Self> {
        check_numeric_target(df, target_col)?;
        let mut groups = df.group_numeric(group_col, target_col)?;
        let mut samples = Vec::with_capacity(labels.len());
        for label in labels {
            let position = groups
                .iter()
                .position(|(name, _)| name == label)
                .ok_or_else(|| {
                    Error::ConfigurationError(format!(
                        "Group '{}' not present in column '{}'",
                        label, group_col
                    ))
                })?;
            let (name, values) = groups.swap_remove(position);
            samples.push(Sample::new(name, &values));
        }
        Ok(Self::new(group_col, target_col, samples))
    }

    /// Total number of valid observations across groups
    pub fn total_n(&self) -> usize {
        self.samples.iter().map(Sample::len).sum()
    }

    pub fn group_count(&self) -> usize {
        self.samples.len()
    }

    /// Group labels in order
    pub fn labels(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.label.as_str()).collect()
    }

    /// Borrowed value slices in group order
    pub fn value_slices(&self) -> Vec<&[f64]> {
        self.samples.iter().map(|s| s.values.as_slice()).collect()
    }
}

fn check_numeric_target(df: &DataFrame, target_col: &str) -> Result<()> {
    if df.column_type(target_col)? == ColumnType::String
        && df.numeric_values(target_col)?.iter().all(|v| v.is_nan())
    {
        return Err(Error::ConfigurationError(format!(
            "Column '{}' is not numeric",
            target_col
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        let mut df = DataFrame::new();
        df.add_string_column("CANAL", &["Web", "App", "Web", "App", "Oficina"])
            .unwrap();
        df.add_numeric_column("PREGUNTA_1", vec![4.0, 3.0, f64::NAN, 5.0, f64::NAN])
            .unwrap();
        df
    }

    #[test]
    fn test_sample_drops_nan() {
        let s = Sample::new("A", &[1.0, f64::NAN, 2.0]);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_from_frame_drops_empty_groups() {
        let gc = GroupComparison::from_frame(&frame(), "CANAL", "PREGUNTA_1").unwrap();
        assert_eq!(gc.labels(), vec!["Web", "App"]);
        assert_eq!(gc.total_n(), 3);
    }

    #[test]
    fn test_unknown_group_label_is_configuration_error() {
        let result =
            GroupComparison::from_frame_groups(&frame(), "CANAL", "PREGUNTA_1", &["Web", "Call Center"]);
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_text_target_rejected() {
        let result = GroupComparison::from_frame(&frame(), "PREGUNTA_1", "CANAL");
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }
}
