//! Report generation
//!
//! A [`ReportRunner`] executes a list of [`WorkItem`]s against one cleaned
//! survey. Each item writes its table to the shared workbook, its chart to
//! a PNG file and the run's PDF, and its results to JSON. A failing item is
//! logged and recorded; the remaining items still run.

pub mod bivariate;
pub mod frequency;
pub mod inference;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::core::error::Result;
use crate::dataframe::DataFrame;
use crate::io::excel::ExcelExporter;
use crate::io::json::write_json;
use crate::stats::selector::SelectorOptions;
use crate::vis::{Chart, FigureCollector};

pub use bivariate::{categorical_numeric, categorical_pair, CategoricalNumericAnalysis, CategoricalPairAnalysis};
pub use frequency::{univariate, word_frequencies, UnivariateAnalysis, WordFrequencies};
pub use inference::{
    correlation, question_means, two_group_inference, CorrelationAnalysis, InferenceAnalysis,
    QuestionMeans,
};

/// One unit of report work
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkItem {
    Univariate {
        variable: String,
    },
    CategoricalPair {
        row: String,
        column: String,
    },
    GroupComparison {
        grouping: String,
        target: String,
    },
    TwoGroupInference {
        grouping: String,
        target: String,
        group_a: String,
        group_b: String,
    },
    QuestionMeans,
    Correlation,
    WordFrequencies,
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::Univariate { variable } => write!(f, "univariate {}", variable),
            WorkItem::CategoricalPair { row, column } => write!(f, "{} vs {}", row, column),
            WorkItem::GroupComparison { grouping, target } => {
                write!(f, "{} by {}", target, grouping)
            }
            WorkItem::TwoGroupInference {
                grouping,
                target,
                group_a,
                group_b,
            } => write!(f, "{} {}: {} vs {}", target, grouping, group_a, group_b),
            WorkItem::QuestionMeans => write!(f, "question means"),
            WorkItem::Correlation => write!(f, "correlation matrix"),
            WorkItem::WordFrequencies => write!(f, "comment word frequencies"),
        }
    }
}

/// Outcome of a report run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: Vec<(WorkItem, String)>,
    /// Pages written to the figures PDF
    pub pdf_pages: usize,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} analyses completed, {} failed, {} figures in PDF",
            self.completed,
            self.failed.len(),
            self.pdf_pages
        )?;
        for (item, message) in &self.failed {
            writeln!(f, "  {}: {}", item, message)?;
        }
        Ok(())
    }
}

/// Work plan derived from the configuration
pub fn default_plan(config: &AnalysisConfig) -> Vec<WorkItem> {
    let analysis = &config.analysis;
    let mut items: Vec<WorkItem> = analysis
        .grouping_columns
        .iter()
        .map(|variable| WorkItem::Univariate {
            variable: variable.clone(),
        })
        .collect();

    if analysis.categorical_pairs.is_empty() {
        for (i, row) in analysis.grouping_columns.iter().enumerate() {
            for column in &analysis.grouping_columns[i + 1..] {
                items.push(WorkItem::CategoricalPair {
                    row: row.clone(),
                    column: column.clone(),
                });
            }
        }
    } else {
        items.extend(
            analysis
                .categorical_pairs
                .iter()
                .map(|(row, column)| WorkItem::CategoricalPair {
                    row: row.clone(),
                    column: column.clone(),
                }),
        );
    }

    for grouping in &analysis.grouping_columns {
        for target in &analysis.target_columns {
            items.push(WorkItem::GroupComparison {
                grouping: grouping.clone(),
                target: target.clone(),
            });
        }
    }

    items.extend(analysis.inference.iter().map(|i| WorkItem::TwoGroupInference {
        grouping: i.grouping.clone(),
        target: i.target.clone(),
        group_a: i.group_a.clone(),
        group_b: i.group_b.clone(),
    }));

    items.push(WorkItem::QuestionMeans);
    items.push(WorkItem::Correlation);
    items.push(WorkItem::WordFrequencies);
    items
}

/// Runs work items and owns the run's exporters
pub struct ReportRunner {
    config: AnalysisConfig,
    options: SelectorOptions,
    excel: ExcelExporter,
    figures: FigureCollector,
}

impl ReportRunner {
    pub fn new(config: AnalysisConfig) -> Self {
        let options = SelectorOptions {
            alpha: config.analysis.alpha,
            exact_threshold: config.analysis.exact_threshold,
            target_power: config.analysis.target_power,
        };
        let excel = ExcelExporter::new(config.output.excel_path());
        ReportRunner {
            config,
            options,
            excel,
            figures: FigureCollector::new(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn figures(&self) -> &FigureCollector {
        &self.figures
    }

    pub fn default_plan(&self) -> Vec<WorkItem> {
        default_plan(&self.config)
    }

    /// Run every item, then write the collected figures to the PDF
    pub fn run(&mut self, df: &DataFrame, items: &[WorkItem]) -> RunSummary {
        let mut summary = RunSummary::default();
        for item in items {
            match self.run_item(df, item) {
                Ok(()) => summary.completed += 1,
                Err(e) => {
                    log::warn!("Analysis '{}' failed: {}", item, e);
                    summary.failed.push((item.clone(), e.to_string()));
                }
            }
        }

        let pdf_path = self.config.output.pdf_path();
        match self.figures.flush_pdf(&pdf_path) {
            Ok(pages) => summary.pdf_pages = pages,
            Err(e) => log::warn!("Could not write {}: {}", pdf_path.display(), e),
        }
        summary
    }

    /// Run a single item
    pub fn run_item(&mut self, df: &DataFrame, item: &WorkItem) -> Result<()> {
        log::debug!("Running {}", item);
        let top_n = self.config.analysis.top_n;
        let plot = self.config.plot.clone();

        match item {
            WorkItem::Univariate { variable } => {
                let result = univariate(df, variable)?;
                self.excel.export_table(&result.table(), variable)?;
                self.publish(result.chart(&plot), &format!("univariado_{}.png", variable));
            }
            WorkItem::CategoricalPair { row, column } => {
                let result = categorical_pair(df, row, column, top_n, self.options.alpha)?;
                let name = result.name();
                self.excel.export_table(&result.table(), &name)?;
                self.publish(result.chart(&plot), &format!("bivariado_{}.png", name));
                write_json(&result.table_json(), self.json_path(&format!("tabla_{}.json", name)))?;
                write_json(&result.plotly(), self.json_path(&format!("plotly_bivariado_{}.json", name)))?;
                write_json(&result, self.json_path(&format!("independencia_{}.json", name)))?;
            }
            WorkItem::GroupComparison { grouping, target } => {
                let result = categorical_numeric(df, grouping, target, top_n, &self.options)?;
                let name = result.name();
                self.excel.export_table(&result.table(), &name)?;
                self.publish(result.chart(&plot), &format!("bivariado_{}.png", name));
                write_json(&result.table_json(), self.json_path(&format!("tabla_{}.json", name)))?;
                write_json(&result.plotly(), self.json_path(&format!("plotly_bivariado_{}.json", name)))?;
                write_json(&result.selection, self.json_path(&format!("prueba_{}.json", name)))?;
            }
            WorkItem::TwoGroupInference {
                grouping,
                target,
                group_a,
                group_b,
            } => {
                let result =
                    two_group_inference(df, grouping, target, group_a, group_b, &self.options)?;
                self.excel.export_table(&result.table(), &result.sheet_name())?;
                match result.chart(&plot) {
                    Ok(chart) => self.publish(chart, &format!("{}.png", result.file_stem())),
                    Err(e) => log::warn!("No density chart for {}: {}", item, e),
                }
                write_json(&result, self.json_path(&format!("{}.json", result.file_stem())))?;
            }
            WorkItem::QuestionMeans => {
                let result = question_means(df, &self.config.input.score_columns)?;
                self.excel.export_table(&result.table(), "promedio_preguntas")?;
                self.publish(result.chart(&plot), "calificacion_promedio_pregunta.png");
            }
            WorkItem::Correlation => {
                let result = correlation(df, &self.config.input.score_columns)?;
                self.excel.export_table(&result.table(), "matriz_correlacion")?;
                write_json(&result, self.json_path("matriz_correlacion.json"))?;
            }
            WorkItem::WordFrequencies => {
                let column = self.config.analysis.text_column.clone();
                let result = word_frequencies(df, &column, self.config.analysis.top_words)?;
                self.excel.export_table(&result.table(), &result.sheet_name())?;
                write_json(
                    &result,
                    self.json_path(&format!("frecuencias_palabras_{}.json", column)),
                )?;
                if !result.words.is_empty() {
                    self.publish(
                        result.chart(&plot),
                        &format!("frecuencias_palabras_{}.png", column),
                    );
                }
            }
        }
        Ok(())
    }

    fn json_path(&self, file: &str) -> PathBuf {
        self.config.output.json_dir().join(file)
    }

    /// Save the chart as PNG and queue it for the PDF. A chart that cannot
    /// be rendered is reported and left out of both.
    fn publish(&mut self, chart: Chart, file: &str) {
        let path = self.config.output.png_dir().join(file);
        match self.figures.save_png(&chart, &path) {
            Ok(()) => self.figures.add(chart),
            Err(e) => log::warn!("Chart '{}' not rendered: {}", chart.title(), e),
        }
    }

    /// Excel workbook written by this runner
    pub fn excel_path(&self) -> &Path {
        self.excel.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceSettings;

    #[test]
    fn test_default_plan_pairs_grouping_columns() {
        let mut config = AnalysisConfig::default();
        config.analysis.grouping_columns = vec!["A".into(), "B".into(), "C".into()];
        config.analysis.target_columns = vec!["P1".into()];
        config.analysis.inference = vec![InferenceSettings {
            grouping: "A".into(),
            target: "P1".into(),
            group_a: "x".into(),
            group_b: "y".into(),
        }];

        let plan = default_plan(&config);
        let pairs: Vec<String> = plan
            .iter()
            .filter(|i| matches!(i, WorkItem::CategoricalPair { .. }))
            .map(ToString::to_string)
            .collect();
        assert_eq!(pairs, vec!["A vs B", "A vs C", "B vs C"]);

        // 3 univariate, 3 pairs, 3 comparisons, 1 inference, 3 overviews
        assert_eq!(plan.len(), 13);
        assert_eq!(plan.last(), Some(&WorkItem::WordFrequencies));
    }

    #[test]
    fn test_configured_pairs_replace_generated_ones() {
        let mut config = AnalysisConfig::default();
        config.analysis.categorical_pairs = vec![("CIUDAD_AGENCIA".into(), "SEGMENTO".into())];
        let plan = default_plan(&config);
        let pairs: Vec<&WorkItem> = plan
            .iter()
            .filter(|i| matches!(i, WorkItem::CategoricalPair { .. }))
            .collect();
        assert_eq!(
            pairs,
            vec![&WorkItem::CategoricalPair {
                row: "CIUDAD_AGENCIA".into(),
                column: "SEGMENTO".into()
            }]
        );
    }

    #[test]
    fn test_summary_display_lists_failures() {
        let summary = RunSummary {
            completed: 2,
            failed: vec![(WorkItem::Correlation, "Column not found: X".to_string())],
            pdf_pages: 1,
        };
        let text = summary.to_string();
        assert!(text.starts_with("2 analyses completed, 1 failed"));
        assert!(text.contains("correlation matrix: Column not found: X"));
        assert!(!summary.is_success());
    }
}
