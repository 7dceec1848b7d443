//! Two-group inference and the score-column overviews

use serde::Serialize;

use crate::config::PlotDefaults;
use crate::core::column::ColumnType;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::io::json::round_to;
use crate::io::table::{Cell, Table};
use crate::stats::descriptive::{correlation_matrix, filter_nan, mean, median};
use crate::stats::sample::GroupComparison;
use crate::stats::selector::{run_selection, SelectionResult, SelectorOptions};
use crate::vis::{Chart, PlotSettings};

/// Median and mean of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentralTendency {
    pub group: String,
    pub n: usize,
    pub median: f64,
    pub mean: f64,
}

/// Comparison of two named groups on one variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceAnalysis {
    pub grouping: String,
    pub target: String,
    pub groups: Vec<CentralTendency>,
    pub selection: SelectionResult,
    #[serde(skip)]
    samples: Vec<(String, Vec<f64>)>,
}

impl InferenceAnalysis {
    /// `{a}_vs_{b}`
    pub fn pair_name(&self) -> String {
        self.groups
            .iter()
            .map(|g| g.group.as_str())
            .collect::<Vec<_>>()
            .join("_vs_")
    }

    pub fn sheet_name(&self) -> String {
        format!("{}_inferencia", self.pair_name())
    }

    pub fn file_stem(&self) -> String {
        format!("inferencia_{}_{}", self.grouping, self.pair_name())
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new(
            std::iter::once(String::new()).chain(self.groups.iter().map(|g| g.group.clone())),
        );
        let mut medians = vec![Cell::from("Mediana")];
        medians.extend(self.groups.iter().map(|g| Cell::from(round_to(g.median, 2))));
        table.push_row(medians);
        let mut means = vec![Cell::from("Promedio")];
        means.extend(self.groups.iter().map(|g| Cell::from(round_to(g.mean, 2))));
        table.push_row(means);
        table
    }

    /// Density curves of both groups; fails when a group has fewer than two
    /// distinct values
    pub fn chart(&self, plot: &PlotDefaults) -> Result<Chart> {
        Chart::density(
            PlotSettings::new(
                format!("Densidad de {} por grupo", self.target),
                self.target.as_str(),
                "Densidad",
            )
            .sized(plot),
            &self.samples,
        )
    }
}

/// Compare `group_a` and `group_b` of `grouping` on `target`.
///
/// Either label missing from the data is a configuration error.
pub fn two_group_inference(
    df: &DataFrame,
    grouping: &str,
    target: &str,
    group_a: &str,
    group_b: &str,
    options: &SelectorOptions,
) -> Result<InferenceAnalysis> {
    let comparison = GroupComparison::from_frame_groups(df, grouping, target, &[group_a, group_b])?;
    let selection = run_selection(&comparison, options)?;

    let groups = comparison
        .samples
        .iter()
        .map(|s| CentralTendency {
            group: s.label.clone(),
            n: s.len(),
            median: median(&s.values).unwrap_or(f64::NAN),
            mean: mean(&s.values),
        })
        .collect();

    if let Some(outcome) = &selection.outcome {
        log::info!(
            "{} {} vs {}: {} p = {:.4}{}",
            target,
            group_a,
            group_b,
            outcome.test_name(),
            outcome.p_value(),
            if outcome.significant() { " (significant)" } else { "" }
        );
    }

    Ok(InferenceAnalysis {
        grouping: grouping.to_string(),
        target: target.to_string(),
        groups,
        selection,
        samples: comparison
            .samples
            .into_iter()
            .map(|s| (s.label, s.values))
            .collect(),
    })
}

/// Score columns present in the frame with numeric data; absent ones are
/// logged and skipped
fn numeric_columns(df: &DataFrame, columns: &[String]) -> Result<Vec<String>> {
    let present: Vec<String> = columns
        .iter()
        .filter(|c| {
            let ok = df.column_type(c).map(|t| t == ColumnType::Float64).unwrap_or(false);
            if !ok {
                log::warn!("Column '{}' is missing or not numeric, skipped", c);
            }
            ok
        })
        .cloned()
        .collect();
    if present.is_empty() {
        return Err(Error::ColumnNotFound(format!(
            "none of the numeric columns {:?}",
            columns
        )));
    }
    Ok(present)
}

/// Mean score of every question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionMeans {
    pub means: Vec<(String, f64)>,
}

impl QuestionMeans {
    pub fn table(&self) -> Table {
        let mut table = Table::new(["Pregunta", "Promedio"]);
        for (question, value) in &self.means {
            table.push_row(vec![question.clone().into(), round_to(*value, 2).into()]);
        }
        table
    }

    pub fn chart(&self, plot: &PlotDefaults) -> Chart {
        Chart::bar(
            PlotSettings::new(
                "Calificación promedio por pregunta de satisfacción",
                "Pregunta",
                "Promedio",
            )
            .sized(plot),
            self.means.iter().map(|(q, _)| q.clone()).collect(),
            self.means.iter().map(|(_, m)| *m).collect(),
        )
    }
}

pub fn question_means(df: &DataFrame, columns: &[String]) -> Result<QuestionMeans> {
    let means = numeric_columns(df, columns)?
        .into_iter()
        .map(|c| {
            let values = filter_nan(&df.numeric_values(&c)?);
            Ok((c, mean(&values)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(QuestionMeans { means })
}

/// Pearson correlations between score columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationAnalysis {
    pub columns: Vec<String>,
    /// NaN where a pair has too few complete rows or no variance
    pub matrix: Vec<Vec<f64>>,
}

impl CorrelationAnalysis {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.matrix[i][j])
    }

    pub fn table(&self) -> Table {
        let mut table =
            Table::new(std::iter::once(String::new()).chain(self.columns.iter().cloned()));
        for (name, row) in self.columns.iter().zip(&self.matrix) {
            let mut cells = vec![Cell::from(name.as_str())];
            cells.extend(row.iter().map(|v| Cell::from(round_to(*v, 4))));
            table.push_row(cells);
        }
        table
    }
}

/// Pairwise-complete correlation matrix of the numeric `columns`
pub fn correlation(df: &DataFrame, columns: &[String]) -> Result<CorrelationAnalysis> {
    let columns = numeric_columns(df, columns)?;
    let data = columns
        .iter()
        .map(|c| df.numeric_values(c))
        .collect::<Result<Vec<_>>>()?;
    let matrix = correlation_matrix(&data)?;
    Ok(CorrelationAnalysis { columns, matrix })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> DataFrame {
        let mut df = DataFrame::new();
        df.add_string_column(
            "GENERO",
            &["F", "M", "F", "M", "F", "M", "F", "M", "F", "M"],
        )
        .unwrap();
        df.add_numeric_column(
            "PREGUNTA_1",
            vec![5.0, 3.0, 4.0, 2.0, 5.0, 3.0, 4.0, 2.0, 5.0, f64::NAN],
        )
        .unwrap();
        df.add_numeric_column(
            "PREGUNTA_2",
            vec![4.0, 2.0, 3.0, 1.0, 4.0, 2.0, 3.0, 1.0, 4.0, 2.0],
        )
        .unwrap();
        df
    }

    #[test]
    fn test_two_group_inference() {
        let result =
            two_group_inference(&survey(), "GENERO", "PREGUNTA_1", "F", "M", &SelectorOptions::default())
                .unwrap();

        assert_eq!(result.pair_name(), "F_vs_M");
        assert_eq!(result.sheet_name(), "F_vs_M_inferencia");
        assert_eq!(result.file_stem(), "inferencia_GENERO_F_vs_M");
        assert_eq!(result.groups[0].n, 5);
        assert_eq!(result.groups[1].n, 4);
        assert!((result.groups[1].median - 2.5).abs() < 1e-12);
        assert!(result.selection.outcome.is_some());

        let table = result.table();
        assert_eq!(table.get(1, "F"), Some(&Cell::Number(4.6)));
    }

    #[test]
    fn test_unknown_group_is_configuration_error() {
        let err = two_group_inference(&survey(), "GENERO", "PREGUNTA_1", "F", "X", &SelectorOptions::default())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_question_means_skip_missing_columns() {
        let columns = vec![
            "PREGUNTA_1".to_string(),
            "PREGUNTA_9".to_string(),
            "PREGUNTA_2".to_string(),
        ];
        let result = question_means(&survey(), &columns).unwrap();
        assert_eq!(result.means.len(), 2);
        assert!((result.means[0].1 - 33.0 / 9.0).abs() < 1e-12);
        assert!((result.means[1].1 - 2.6).abs() < 1e-12);
    }

    #[test]
    fn test_correlation_uses_complete_pairs() {
        let columns = vec!["PREGUNTA_1".to_string(), "PREGUNTA_2".to_string()];
        let result = correlation(&survey(), &columns).unwrap();
        // PREGUNTA_2 is PREGUNTA_1 minus one wherever both are present
        assert!((result.get("PREGUNTA_1", "PREGUNTA_2").unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(result.get("PREGUNTA_1", "PREGUNTA_1"), Some(1.0));
    }

    #[test]
    fn test_correlation_without_columns_fails() {
        let columns = vec!["GENERO".to_string()];
        assert!(matches!(
            correlation(&survey(), &columns),
            Err(Error::ColumnNotFound(_))
        ));
    }
}
