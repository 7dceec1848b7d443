//! Bivariate analyses over the most frequent categories of a grouping column

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::PlotDefaults;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::io::json::round_to;
use crate::io::table::{Cell, Table};
use crate::stats::categorical::{check_independence, ContingencyResult, ContingencyTable};
use crate::stats::descriptive::{summarize, GroupSummary};
use crate::stats::sample::{GroupComparison, Sample};
use crate::stats::selector::{run_selection, SelectionResult, SelectorOptions};
use crate::vis::{Chart, PlotSettings};

/// Category holding the largest share of one crosstab row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowMode {
    pub row: String,
    pub category: String,
    pub percent: f64,
}

/// Two categorical variables cross-tabulated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalPairAnalysis {
    pub row_variable: String,
    pub column_variable: String,
    pub top_n: usize,
    /// Row categories by descending frequency
    pub rows: Vec<String>,
    /// Column categories, sorted
    pub columns: Vec<String>,
    /// Row-normalised percentages, `percentages[row][column]`
    pub percentages: Vec<Vec<f64>>,
    pub row_modes: Vec<RowMode>,
    /// Independence check over every category, not only the top rows
    pub independence: Option<ContingencyResult>,
    pub warnings: Vec<String>,
}

impl CategoricalPairAnalysis {
    pub fn name(&self) -> String {
        format!("{}_vs_{}", self.row_variable, self.column_variable)
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new(
            std::iter::once(self.row_variable.clone()).chain(self.columns.iter().cloned()),
        );
        for (label, values) in self.rows.iter().zip(&self.percentages) {
            let mut row = vec![Cell::from(label.as_str())];
            row.extend(values.iter().map(|v| Cell::from(*v)));
            table.push_row(row);
        }
        table
    }

    /// `{column: {row: percent}}` rounded to two decimals
    pub fn table_json(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        self.columns
            .iter()
            .enumerate()
            .map(|(j, column)| {
                let values = self
                    .rows
                    .iter()
                    .zip(&self.percentages)
                    .map(|(row, pct)| (row.clone(), round_to(pct[j], 2)))
                    .collect();
                (column.clone(), values)
            })
            .collect()
    }

    /// Grouped bar figure in Plotly's JSON schema
    pub fn plotly(&self) -> Value {
        let data: Vec<Value> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, column)| {
                json!({
                    "x": self.rows,
                    "y": self.percentages.iter().map(|r| r[j]).collect::<Vec<_>>(),
                    "type": "bar",
                    "name": column,
                })
            })
            .collect();
        json!({
            "data": data,
            "layout": {
                "title": format!("Distribución de {} por {}", self.column_variable, self.row_variable),
                "xaxis": {"title": self.row_variable},
                "yaxis": {"title": "Porcentaje (%)"},
                "barmode": "group",
            }
        })
    }

    pub fn chart(&self, plot: &PlotDefaults) -> Chart {
        let series = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, column)| {
                (
                    column.clone(),
                    self.percentages.iter().map(|r| r[j]).collect(),
                )
            })
            .collect();
        Chart::grouped_bar(
            PlotSettings::new(
                format!(
                    "Distribución de {} por {} (Top {})",
                    self.column_variable, self.row_variable, self.top_n
                ),
                self.row_variable.as_str(),
                format!("Porcentaje dentro de {}", self.row_variable),
            )
            .sized(plot),
            self.rows.clone(),
            series,
        )
    }
}

/// Row-normalised crosstab of the `top_n` most frequent categories of
/// `var1` against every category of `var2`
pub fn categorical_pair(
    df: &DataFrame,
    var1: &str,
    var2: &str,
    top_n: usize,
    alpha: f64,
) -> Result<CategoricalPairAnalysis> {
    let pairs = df.category_pairs(var1, var2)?;
    if pairs.is_empty() {
        return Err(Error::EmptyData(format!(
            "No rows with both '{}' and '{}' present",
            var1, var2
        )));
    }

    let top = df.top_categories(var1, top_n)?;
    let present: BTreeSet<&str> = pairs.iter().map(|(r, _)| r.as_str()).collect();
    let rows: Vec<String> = top.into_iter().filter(|r| present.contains(r.as_str())).collect();
    let row_index: HashMap<&str, usize> =
        rows.iter().enumerate().map(|(i, r)| (r.as_str(), i)).collect();

    let columns: Vec<String> = pairs
        .iter()
        .filter(|(r, _)| row_index.contains_key(r.as_str()))
        .map(|(_, c)| c.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let col_index: HashMap<&str, usize> =
        columns.iter().enumerate().map(|(j, c)| (c.as_str(), j)).collect();

    let mut counts = vec![vec![0.0; columns.len()]; rows.len()];
    for (r, c) in &pairs {
        if let (Some(&i), Some(&j)) = (row_index.get(r.as_str()), col_index.get(c.as_str())) {
            counts[i][j] += 1.0;
        }
    }
    let percentages: Vec<Vec<f64>> = counts
        .iter()
        .map(|row| {
            let total: f64 = row.iter().sum();
            row.iter().map(|v| v * 100.0 / total).collect()
        })
        .collect();

    let row_modes = rows
        .iter()
        .zip(&percentages)
        .filter_map(|(row, pct)| {
            // first column wins ties
            let (j, best) = pct
                .iter()
                .enumerate()
                .fold(None, |acc: Option<(usize, f64)>, (j, &v)| match acc {
                    Some((_, m)) if m >= v => acc,
                    _ => Some((j, v)),
                })?;
            Some(RowMode {
                row: row.clone(),
                category: columns[j].clone(),
                percent: best,
            })
        })
        .collect();

    let mut warnings = Vec::new();
    let independence = match ContingencyTable::from_pairs(&pairs)
        .and_then(|table| check_independence(&table, alpha))
    {
        Ok(result) => Some(result),
        Err(e) => {
            log::warn!("Independence check {} vs {} skipped: {}", var1, var2, e);
            warnings.push(format!("Independence check not performed: {}", e));
            None
        }
    };

    Ok(CategoricalPairAnalysis {
        row_variable: var1.to_string(),
        column_variable: var2.to_string(),
        top_n,
        rows,
        columns,
        percentages,
        row_modes,
        independence,
        warnings,
    })
}

/// A numeric variable across the categories of a grouping variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalNumericAnalysis {
    pub categorical: String,
    pub numeric: String,
    pub top_n: usize,
    /// Every category with data, by descending mean
    pub summary: Vec<GroupSummary>,
    /// Valid values of the `top_n` most frequent categories
    pub groups: Vec<(String, Vec<f64>)>,
    pub selection: Option<SelectionResult>,
    pub warnings: Vec<String>,
}

const SUMMARY_HEADERS: [&str; 8] = [
    "cantidad",
    "Minimo",
    "Q1",
    "Mediana",
    "Promedio",
    "Q3",
    "Maximo",
    "Desviacion",
];

fn summary_values(s: &GroupSummary) -> [f64; 8] {
    [
        s.count as f64,
        s.min,
        s.q1,
        s.median,
        s.mean,
        s.q3,
        s.max,
        s.std,
    ]
}

impl CategoricalNumericAnalysis {
    pub fn name(&self) -> String {
        format!("{}_vs_{}", self.categorical, self.numeric)
    }

    pub fn highest_mean(&self) -> Option<&GroupSummary> {
        self.summary.first()
    }

    pub fn lowest_mean(&self) -> Option<&GroupSummary> {
        self.summary.last()
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new(
            std::iter::once(self.categorical.as_str()).chain(SUMMARY_HEADERS.iter().copied()),
        );
        for s in &self.summary {
            let mut row = vec![Cell::from(s.group.as_str())];
            row.extend(summary_values(s).iter().map(|v| Cell::from(*v)));
            table.push_row(row);
        }
        table
    }

    /// `{statistic: {category: value}}` rounded to two decimals
    pub fn table_json(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        SUMMARY_HEADERS
            .iter()
            .enumerate()
            .map(|(k, header)| {
                let values = self
                    .summary
                    .iter()
                    .map(|s| (s.group.clone(), round_to(summary_values(s)[k], 2)))
                    .collect();
                (header.to_string(), values)
            })
            .collect()
    }

    /// Box figure in Plotly's JSON schema
    pub fn plotly(&self) -> Value {
        let data: Vec<Value> = self
            .groups
            .iter()
            .map(|(name, values)| {
                json!({
                    "type": "box",
                    "y": values,
                    "name": name,
                    "boxpoints": "suspectedoutliers",
                })
            })
            .collect();
        json!({
            "data": data,
            "layout": {
                "title": format!("{} por {}", self.numeric, self.categorical),
                "xaxis": {"title": self.categorical},
                "yaxis": {"title": self.numeric},
                "boxmode": "group",
            }
        })
    }

    pub fn chart(&self, plot: &PlotDefaults) -> Chart {
        Chart::boxes(
            PlotSettings::new(
                format!("{} por {} (Top {})", self.numeric, self.categorical, self.top_n),
                self.categorical.as_str(),
                self.numeric.as_str(),
            )
            .sized(plot),
            self.groups.clone(),
        )
    }
}

/// Summaries of `var_num` per category of `var_cat`, and the test selector
/// run over the `top_n` most frequent categories
pub fn categorical_numeric(
    df: &DataFrame,
    var_cat: &str,
    var_num: &str,
    top_n: usize,
    options: &SelectorOptions,
) -> Result<CategoricalNumericAnalysis> {
    let grouped = df.group_numeric(var_cat, var_num)?;

    let mut summary: Vec<GroupSummary> = grouped
        .iter()
        .filter_map(|(label, values)| summarize(label, values).ok())
        .collect();
    if summary.is_empty() {
        return Err(Error::EmptyData(format!(
            "'{}' has no values in any category of '{}'",
            var_num, var_cat
        )));
    }
    summary.sort_by(|a, b| b.mean.total_cmp(&a.mean));

    let top = df.top_categories(var_cat, top_n)?;
    let groups: Vec<(String, Vec<f64>)> = grouped
        .into_iter()
        .filter(|(label, _)| top.contains(label))
        .map(|(label, values)| (label, values.into_iter().filter(|v| !v.is_nan()).collect::<Vec<_>>()))
        .filter(|(_, values)| !values.is_empty())
        .collect();

    let comparison = GroupComparison::new(
        var_cat,
        var_num,
        groups.iter().map(|(label, values)| Sample::new(label.as_str(), values)).collect(),
    );
    let mut warnings = Vec::new();
    let selection = match run_selection(&comparison, options) {
        Ok(result) => Some(result),
        Err(e) => {
            log::warn!("Group comparison {} by {} skipped: {}", var_num, var_cat, e);
            warnings.push(format!("Group comparison not performed: {}", e));
            None
        }
    };

    if let (Some(high), Some(low)) = (summary.first(), summary.last()) {
        log::info!(
            "{} by {}: highest mean {} ({:.2}), lowest mean {} ({:.2})",
            var_num,
            var_cat,
            high.group,
            high.mean,
            low.group,
            low.mean
        );
    }

    Ok(CategoricalNumericAnalysis {
        categorical: var_cat.to_string(),
        numeric: var_num.to_string(),
        top_n,
        summary,
        groups,
        selection,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> DataFrame {
        let mut df = DataFrame::new();
        df.add_string_column(
            "CIUDAD",
            &["Cali", "Cali", "Cali", "Bogota", "Bogota", "Pasto", "Cali", "Bogota"],
        )
        .unwrap();
        df.add_string_column(
            "SEGMENTO",
            &["A", "B", "A", "B", "B", "A", "A", ""],
        )
        .unwrap();
        df.add_numeric_column(
            "PREGUNTA_1",
            vec![5.0, 4.0, f64::NAN, 3.0, 2.0, 4.0, 5.0, 3.0],
        )
        .unwrap();
        df
    }

    #[test]
    fn test_crosstab_rows_are_normalised() {
        let result = categorical_pair(&survey(), "CIUDAD", "SEGMENTO", 2, 0.05).unwrap();

        assert_eq!(result.rows, vec!["Cali", "Bogota"]);
        assert_eq!(result.columns, vec!["A", "B"]);
        assert!((result.percentages[0][0] - 75.0).abs() < 1e-12);
        assert!((result.percentages[1][1] - 100.0).abs() < 1e-12);
        for row in &result.percentages {
            assert!((row.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        }
        assert_eq!(result.row_modes[0].category, "A");
        assert_eq!(result.row_modes[1].category, "B");
        assert_eq!(result.name(), "CIUDAD_vs_SEGMENTO");

        // the independence check sees every city, Pasto included
        let independence = result.independence.as_ref().unwrap();
        assert_eq!(independence.n, 7.0);
    }

    #[test]
    fn test_crosstab_json_shapes() {
        let result = categorical_pair(&survey(), "CIUDAD", "SEGMENTO", 2, 0.05).unwrap();

        let table = result.table_json();
        assert_eq!(table["A"]["Cali"], 75.0);
        assert_eq!(table["B"]["Bogota"], 100.0);

        let plotly = result.plotly();
        assert_eq!(plotly["data"].as_array().unwrap().len(), 2);
        assert_eq!(plotly["data"][0]["type"], "bar");
        assert_eq!(plotly["data"][0]["name"], "A");
        assert_eq!(plotly["layout"]["barmode"], "group");
        assert_eq!(plotly["layout"]["yaxis"]["title"], "Porcentaje (%)");
    }

    #[test]
    fn test_categorical_numeric_summary_sorted_by_mean() {
        let result = categorical_numeric(
            &survey(),
            "CIUDAD",
            "PREGUNTA_1",
            2,
            &SelectorOptions::default(),
        )
        .unwrap();

        let order: Vec<&str> = result.summary.iter().map(|s| s.group.as_str()).collect();
        assert_eq!(order, vec!["Cali", "Pasto", "Bogota"]);
        assert_eq!(result.summary[0].count, 3);
        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.highest_mean().unwrap().group, "Cali");
        assert_eq!(result.lowest_mean().unwrap().group, "Bogota");

        let plotly = result.plotly();
        assert_eq!(plotly["data"][0]["boxpoints"], "suspectedoutliers");
        assert_eq!(plotly["layout"]["boxmode"], "group");

        let table = result.table();
        assert_eq!(table.headers.len(), 9);
        assert_eq!(table.get(0, "cantidad"), Some(&Cell::Number(3.0)));
    }

    #[test]
    fn test_categorical_numeric_runs_selector() {
        let result = categorical_numeric(
            &survey(),
            "CIUDAD",
            "PREGUNTA_1",
            2,
            &SelectorOptions::default(),
        )
        .unwrap();
        let selection = result.selection.unwrap();
        assert_eq!(selection.group_sizes.len(), 2);
    }
}
