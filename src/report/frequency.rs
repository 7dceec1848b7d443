//! Frequency analyses: category distributions and comment words

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use serde::Serialize;

use crate::config::PlotDefaults;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::io::json::round_to;
use crate::io::table::{Cell, Table};
use crate::vis::{Chart, PlotSettings};

lazy_static! {
    /// Words ignored when counting comment vocabulary
    static ref STOPWORDS: HashSet<&'static str> = [
        // Spanish function words
        "que", "los", "las", "del", "por", "para", "con", "una", "uno", "unos", "unas",
        "como", "pero", "más", "mas", "muy", "sus", "les", "nos", "este", "esta", "esto",
        "estos", "estas", "ese", "esa", "eso", "esos", "esas", "ser", "son", "fue", "era",
        "hay", "han", "has", "sin", "sobre", "también", "tambien", "entre", "cuando",
        "donde", "porque", "hasta", "desde", "está", "están", "estan", "estoy", "tiene",
        "tienen", "tengo", "hacer", "siempre", "solo", "sólo", "cual", "quien", "ellos",
        "ellas", "usted", "ustedes", "nuestro", "nuestra", "mucho", "muchas", "muchos",
        "poco", "otra", "otro", "otros", "tan", "todos", "todas", "ese", "algo", "nada",
        "ver", "vez", "cada", "mismo", "misma", "aqui", "aquí", "ahi", "ahí",
        // answers that carry no content
        "ninguna", "ninguno", "ningunas", "buena", "no", "todo", "bien", "gracias", "ok",
        "bueno", "excelente",
    ]
    .into_iter()
    .collect();
}

/// Words shorter than this are not counted
const MIN_WORD_LEN: usize = 3;

/// One category of a frequency table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRow {
    pub category: String,
    pub count: usize,
    pub percent: f64,
}

/// Distribution of one categorical variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnivariateAnalysis {
    pub variable: String,
    pub total: usize,
    /// Categories by descending count
    pub rows: Vec<FrequencyRow>,
    pub most_frequent: FrequencyRow,
    pub least_frequent: FrequencyRow,
}

impl UnivariateAnalysis {
    pub fn category_count(&self) -> usize {
        self.rows.len()
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new([
            self.variable.as_str(),
            "Frec. Absoluta",
            "Frec. Relativa (%)",
        ]);
        for row in &self.rows {
            table.push_row(vec![
                row.category.clone().into(),
                row.count.into(),
                round_to(row.percent, 2).into(),
            ]);
        }
        table
    }

    pub fn chart(&self, plot: &PlotDefaults) -> Chart {
        Chart::bar(
            PlotSettings::new(
                format!("Distribución Relativa de {}", self.variable),
                self.variable.as_str(),
                "Frecuencia Relativa (%)",
            )
            .sized(plot),
            self.rows.iter().map(|r| r.category.clone()).collect(),
            self.rows.iter().map(|r| r.percent).collect(),
        )
    }
}

/// Absolute and relative frequencies of a categorical column
pub fn univariate(df: &DataFrame, variable: &str) -> Result<UnivariateAnalysis> {
    let counts = df.category_counts(variable)?;
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    if total == 0 {
        return Err(Error::EmptyData(format!(
            "Column '{}' has no values",
            variable
        )));
    }

    let rows: Vec<FrequencyRow> = counts
        .into_iter()
        .map(|(category, count)| FrequencyRow {
            percent: count as f64 * 100.0 / total as f64,
            category,
            count,
        })
        .collect();

    // rows are sorted by descending count: first is the mode, and the first
    // row holding the minimum count is the least frequent
    let most_frequent = rows[0].clone();
    let least_frequent = rows
        .iter()
        .min_by_key(|r| r.count)
        .cloned()
        .unwrap_or_else(|| most_frequent.clone());

    log::info!(
        "{}: {} categories, most frequent {} ({:.2}%), least frequent {} ({:.2}%)",
        variable,
        rows.len(),
        most_frequent.category,
        most_frequent.percent,
        least_frequent.category,
        least_frequent.percent
    );

    Ok(UnivariateAnalysis {
        variable: variable.to_string(),
        total,
        rows,
        most_frequent,
        least_frequent,
    })
}

/// Most common words of a free-text column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordFrequencies {
    pub column: String,
    pub comments: usize,
    pub words: Vec<(String, usize)>,
}

impl WordFrequencies {
    pub fn sheet_name(&self) -> String {
        format!("WordFreq_{}", self.column)
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new(["Palabra", "Frecuencia"]);
        for (word, count) in &self.words {
            table.push_row(vec![word.clone().into(), Cell::from(*count)]);
        }
        table
    }

    pub fn chart(&self, plot: &PlotDefaults) -> Chart {
        Chart::bar(
            PlotSettings::new(
                "Palabras más frecuentes en comentarios abiertos",
                "Palabra",
                "Frecuencia",
            )
            .sized(plot),
            self.words.iter().map(|(w, _)| w.clone()).collect(),
            self.words.iter().map(|(_, c)| *c as f64).collect(),
        )
    }
}

/// Lower-cased words of `text`, split on anything that is not alphanumeric
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Count content words of a text column, keeping the `top` most common.
/// Ties keep the order in which words first appear.
pub fn word_frequencies(df: &DataFrame, column: &str, top: usize) -> Result<WordFrequencies> {
    let comments: Vec<String> = df.labels(column)?.into_iter().flatten().collect();

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in comments.iter().flat_map(|c| tokenize(c)) {
        if word.chars().count() < MIN_WORD_LEN || is_stopword(&word) {
            continue;
        }
        let entry = counts.entry(word.clone()).or_insert(0);
        if *entry == 0 {
            order.push(word);
        }
        *entry += 1;
    }

    let mut words: Vec<(String, usize)> = order
        .into_iter()
        .map(|w| {
            let count = counts.get(&w).copied().unwrap_or(0);
            (w, count)
        })
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1));
    words.truncate(top);

    if words.is_empty() {
        log::warn!("No words to count in column '{}'", column);
    }

    Ok(WordFrequencies {
        column: column.to_string(),
        comments: comments.len(),
        words,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(column: &str, values: &[&str]) -> DataFrame {
        let mut df = DataFrame::new();
        df.add_string_column(column, values).unwrap();
        df
    }

    #[test]
    fn test_univariate_frequencies() {
        let df = frame("ESTRATO", &["1", "2", "2", "3", "2", "1"]);
        let result = univariate(&df, "ESTRATO").unwrap();

        assert_eq!(result.total, 6);
        assert_eq!(result.category_count(), 3);
        assert_eq!(result.rows[0].category, "2");
        assert!((result.rows[0].percent - 50.0).abs() < 1e-12);
        assert_eq!(result.most_frequent.category, "2");
        assert_eq!(result.least_frequent.category, "3");

        let table = result.table();
        assert_eq!(table.headers[0], "ESTRATO");
        assert_eq!(table.get(0, "Frec. Absoluta"), Some(&Cell::Number(3.0)));
        assert_eq!(table.get(2, "Frec. Relativa (%)"), Some(&Cell::Number(16.67)));
    }

    #[test]
    fn test_univariate_missing_column() {
        let df = frame("ESTRATO", &["1"]);
        assert!(matches!(univariate(&df, "GENERO"), Err(Error::ColumnNotFound(_))));
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        let words: Vec<String> = tokenize("Muy buena atención, ¡Rápida!").collect();
        assert_eq!(words, vec!["muy", "buena", "atención", "rápida"]);
    }

    #[test]
    fn test_word_frequencies_filters_stopwords() {
        let df = frame(
            "PREGUNTA_5",
            &[
                "Ninguna",
                "Mejorar la atención en la agencia",
                "La atención es lenta, gracias",
                "",
                "Mejorar los tiempos de atención",
            ],
        );
        let result = word_frequencies(&df, "PREGUNTA_5", 2).unwrap();

        assert_eq!(result.comments, 4);
        assert_eq!(
            result.words,
            vec![("atención".to_string(), 3), ("mejorar".to_string(), 2)]
        );
        assert_eq!(result.sheet_name(), "WordFreq_PREGUNTA_5");
    }
}
