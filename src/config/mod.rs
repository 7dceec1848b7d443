//! Configuration for survey analysis runs
//!
//! Settings come from defaults, an optional YAML or TOML file, and
//! `SURVEY_*` environment variables, in that order of precedence. Every
//! section is `#[serde(default)]` so partial files are accepted.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod loader;
pub mod validation;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub analysis: AnalysisSettings,
    pub input: InputSettings,
    pub output: OutputSettings,
    pub plot: PlotDefaults,
    pub logging: LoggingSettings,
}

/// Statistical parameters and the variables to analyse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Significance level for every test
    pub alpha: f64,
    /// Categories kept in bivariate charts and tables
    pub top_n: usize,
    /// Mann-Whitney switches to the normal approximation at this group size
    pub exact_threshold: usize,
    pub target_power: f64,
    /// Categorical columns used for univariate and group analyses
    pub grouping_columns: Vec<String>,
    /// Numeric columns compared across groups
    pub target_columns: Vec<String>,
    /// Categorical pairs cross-tabulated and tested for independence
    pub categorical_pairs: Vec<(String, String)>,
    /// Two-group comparisons with their own density chart
    pub inference: Vec<InferenceSettings>,
    /// Free-text comment column
    pub text_column: String,
    /// Words kept in the comment frequency table
    pub top_words: usize,
}

/// A named pair of groups compared on one variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceSettings {
    pub grouping: String,
    pub target: String,
    pub group_a: String,
    pub group_b: String,
}

/// How the survey file is read and cleaned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub delimiter: char,
    /// Decimal separator used in numeric cells
    pub decimal: char,
    /// chrono format of the survey date
    pub date_format: String,
    pub date_column: String,
    pub score_columns: Vec<String>,
    /// Excel sheet to read, first sheet when absent
    pub sheet: Option<String>,
}

/// Destination of every exported artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub excel_file: String,
    pub pdf_file: String,
    pub png_dir: String,
    pub json_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotDefaults {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

fn score_columns() -> Vec<String> {
    (1..=4).map(|i| format!("PREGUNTA_{}", i)).collect()
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            top_n: 5,
            exact_threshold: 20,
            target_power: 0.80,
            grouping_columns: vec![
                "ESTRATO".to_string(),
                "GENERO".to_string(),
                "CIUDAD_AGENCIA".to_string(),
            ],
            target_columns: score_columns(),
            categorical_pairs: Vec::new(),
            inference: Vec::new(),
            text_column: "PREGUNTA_5".to_string(),
            top_words: 20,
        }
    }
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            delimiter: ';',
            decimal: ',',
            date_format: "%d/%m/%Y".to_string(),
            date_column: "FECHA_ENCUESTA".to_string(),
            score_columns: score_columns(),
            sheet: None,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            excel_file: "resultados_analisis.xlsx".to_string(),
            pdf_file: "graficos_analisis.pdf".to_string(),
            png_dir: "graficos".to_string(),
            json_dir: "json".to_string(),
        }
    }
}

impl Default for PlotDefaults {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl OutputSettings {
    pub fn excel_path(&self) -> PathBuf {
        self.dir.join(&self.excel_file)
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.dir.join(&self.pdf_file)
    }

    pub fn png_dir(&self) -> PathBuf {
        self.dir.join(&self.png_dir)
    }

    pub fn json_dir(&self) -> PathBuf {
        self.dir.join(&self.json_dir)
    }
}

impl AnalysisConfig {
    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        loader::load_from_env()
    }

    /// Load configuration from a file (YAML or TOML)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        loader::load_from_file(path.as_ref())
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        loader::load_from_yaml(yaml)
    }

    pub fn from_toml(toml: &str) -> Result<Self> {
        loader::load_from_toml(toml)
    }

    /// Load configuration with precedence: defaults -> file -> env
    pub fn load_with_precedence<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        loader::load_with_precedence(config_file)
    }

    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            Error::ConfigurationError(format!("Failed to serialize config to YAML: {}", e))
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| {
            Error::ConfigurationError(format!("Failed to serialize config to TOML: {}", e))
        })
    }

    /// Merge another configuration into this one. Only values of `other`
    /// that differ from the defaults are taken.
    pub fn merge(&mut self, other: &Self) {
        let defaults = AnalysisConfig::default();

        macro_rules! take_changed {
            ($($section:ident . $field:ident),* $(,)?) => {
                $(
                    if other.$section.$field != defaults.$section.$field {
                        self.$section.$field = other.$section.$field.clone();
                    }
                )*
            };
        }

        take_changed!(
            analysis.alpha,
            analysis.top_n,
            analysis.exact_threshold,
            analysis.target_power,
            analysis.grouping_columns,
            analysis.target_columns,
            analysis.categorical_pairs,
            analysis.inference,
            analysis.text_column,
            analysis.top_words,
            input.delimiter,
            input.decimal,
            input.date_format,
            input.date_column,
            input.score_columns,
            input.sheet,
            output.dir,
            output.excel_file,
            output.pdf_file,
            output.png_dir,
            output.json_dir,
            plot.width,
            plot.height,
            logging.level,
        );
    }
}
