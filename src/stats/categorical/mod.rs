//! Statistics module for categorical data
//!
//! Contingency tables and the categorical independence check: Pearson's
//! chi-square when every expected frequency is at least 5, Fisher's exact test
//! for 2x2 tables that miss that requirement, and chi-square with a caution
//! flag for larger tables that miss it.

use std::collections::{BTreeSet, HashMap};

use log::debug;
use serde::Serialize;
use statrs::function::factorial::ln_binomial;

use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::stats::distributions::{ChiSquared, Distribution};
use crate::stats::effect_size::{cramers_v, EffectMagnitude, EffectSize};

/// Minimum expected cell frequency for the chi-square approximation
pub const MIN_EXPECTED_FREQUENCY: f64 = 5.0;

/// ContingencyTable represents a cross-tabulation of categorical data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyTable {
    /// The observed frequencies in the table
    pub observed: Vec<Vec<f64>>,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub row_totals: Vec<f64>,
    pub col_totals: Vec<f64>,
    /// Grand total
    pub total: f64,
}

impl ContingencyTable {
    /// Create a new contingency table from observed frequencies
    pub fn new(observed: Vec<Vec<f64>>, row_labels: Vec<String>, col_labels: Vec<String>) -> Result<Self> {
        if observed.is_empty() || observed[0].is_empty() {
            return Err(Error::InsufficientData(
                "Observed frequencies cannot be empty".into(),
            ));
        }

        let rows = observed.len();
        let cols = observed[0].len();
        if observed.iter().any(|row| row.len() != cols) {
            return Err(Error::InvalidValue(
                "All rows must have the same number of columns".into(),
            ));
        }
        if row_labels.len() != rows || col_labels.len() != cols {
            return Err(Error::InvalidValue(format!(
                "Expected {} row and {} column labels, got {} and {}",
                rows,
                cols,
                row_labels.len(),
                col_labels.len()
            )));
        }
        if observed.iter().flatten().any(|v| *v < 0.0 || !v.is_finite()) {
            return Err(Error::InvalidValue(
                "Frequencies must be finite and non-negative".into(),
            ));
        }

        let row_totals: Vec<f64> = observed.iter().map(|row| row.iter().sum()).collect();
        let col_totals: Vec<f64> = (0..cols)
            .map(|j| observed.iter().map(|row| row[j]).sum())
            .collect();
        let total = row_totals.iter().sum();

        Ok(ContingencyTable {
            observed,
            row_labels,
            col_labels,
            row_totals,
            col_totals,
            total,
        })
    }

    /// Cross-tabulate label pairs. Row and column labels are sorted.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self> {
        let rows: BTreeSet<&str> = pairs.iter().map(|(r, _)| r.as_str()).collect();
        let cols: BTreeSet<&str> = pairs.iter().map(|(_, c)| c.as_str()).collect();
        let row_index: HashMap<&str, usize> = rows.iter().enumerate().map(|(i, r)| (*r, i)).collect();
        let col_index: HashMap<&str, usize> = cols.iter().enumerate().map(|(i, c)| (*c, i)).collect();

        let mut observed = vec![vec![0.0; cols.len()]; rows.len()];
        for (r, c) in pairs {
            observed[row_index[r.as_str()]][col_index[c.as_str()]] += 1.0;
        }

        Self::new(
            observed,
            rows.into_iter().map(str::to_string).collect(),
            cols.into_iter().map(str::to_string).collect(),
        )
    }

    /// Cross-tabulate two columns of a DataFrame, skipping rows with a missing value
    pub fn from_frame(df: &DataFrame, var1: &str, var2: &str) -> Result<Self> {
        Self::from_pairs(&df.category_pairs(var1, var2)?)
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.observed.len(), self.col_labels.len())
    }

    /// Calculate expected frequencies under independence assumption
    pub fn expected_frequencies(&self) -> Vec<Vec<f64>> {
        self.row_totals
            .iter()
            .map(|rt| self.col_totals.iter().map(|ct| rt * ct / self.total).collect())
            .collect()
    }

    /// Smallest expected cell frequency
    pub fn min_expected(&self) -> f64 {
        self.expected_frequencies()
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    /// Each row as percentages of its total
    pub fn row_percentages(&self) -> Vec<Vec<f64>> {
        self.observed
            .iter()
            .zip(&self.row_totals)
            .map(|(row, total)| {
                row.iter()
                    .map(|v| if *total > 0.0 { v / total * 100.0 } else { 0.0 })
                    .collect()
            })
            .collect()
    }

    /// Pearson chi-square statistic, degrees of freedom and p-value.
    /// Tables with one degree of freedom get Yates' continuity correction.
    pub fn chi_square(&self) -> Result<(f64, f64, f64)> {
        let (rows, cols) = self.shape();
        if rows < 2 || cols < 2 {
            return Err(Error::InsufficientData(format!(
                "Chi-square needs at least a 2x2 table, got {}x{}",
                rows, cols
            )));
        }
        let expected = self.expected_frequencies();
        if expected.iter().flatten().any(|e| !(*e > 0.0)) {
            return Err(Error::Computation(
                "Contingency table has an empty row or column".into(),
            ));
        }

        let df = ((rows - 1) * (cols - 1)) as f64;
        let yates = df == 1.0;
        let mut chi2 = 0.0;
        for (obs_row, exp_row) in self.observed.iter().zip(&expected) {
            for (o, e) in obs_row.iter().zip(exp_row) {
                let diff = if yates {
                    ((o - e).abs() - 0.5).max(0.0)
                } else {
                    (o - e).abs()
                };
                chi2 += diff * diff / e;
            }
        }

        let p_value = ChiSquared::new(df)?.sf(chi2);
        Ok((chi2, df, p_value))
    }
}

/// Fisher's exact test for a 2x2 table `[[a, b], [c, d]]`.
/// Returns the sample odds ratio `ad / bc` and the two-sided p-value.
pub fn fisher_exact(table: [[u64; 2]; 2]) -> Result<(f64, f64)> {
    let [[a, b], [c, d]] = table;
    let n = a + b + c + d;
    let row1 = a + b;
    let col1 = a + c;
    if row1 == 0 || col1 == 0 || row1 == n || col1 == n {
        return Err(Error::InsufficientData(
            "Fisher's exact test needs non-empty margins".into(),
        ));
    }

    let odds_ratio = if b > 0 && c > 0 {
        (a * d) as f64 / (b * c) as f64
    } else {
        f64::INFINITY
    };

    let log_denominator = ln_binomial(n, row1);
    let pmf = |x: u64| -> f64 {
        (ln_binomial(col1, x) + ln_binomial(n - col1, row1 - x) - log_denominator).exp()
    };

    let lo = (row1 + col1).saturating_sub(n);
    let hi = row1.min(col1);
    let p_observed = pmf(a);
    let threshold = p_observed * (1.0 + 1e-7);
    let p_value: f64 = (lo..=hi).map(pmf).filter(|p| *p <= threshold).sum();

    Ok((odds_ratio, p_value.min(1.0)))
}

/// Which independence test was run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndependenceTest {
    ChiSquare,
    FisherExact,
}

/// Result of the categorical independence check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyResult {
    pub test_name: IndependenceTest,
    /// Chi-square statistic (chi-square path only)
    pub chi_square: Option<f64>,
    /// Sample odds ratio (Fisher path only)
    pub odds_ratio: Option<f64>,
    pub p_value: f64,
    pub degrees_of_freedom: f64,
    pub n: f64,
    pub min_expected: f64,
    pub expected_requirement_met: bool,
    /// Fisher's test replaced chi-square because of low expected counts
    pub fisher_due_to_low_expected: bool,
    /// Chi-square was used although expected counts are low
    pub low_expected_caution: bool,
    pub cramers_v: f64,
    pub effect_magnitude: EffectMagnitude,
    pub effect_interpretation: String,
    pub independent: bool,
}

/// Test independence of the two classifications of a contingency table
pub fn check_independence(table: &ContingencyTable, alpha: f64) -> Result<ContingencyResult> {
    let (rows, cols) = table.shape();
    if rows < 2 || cols < 2 {
        return Err(Error::InsufficientData(format!(
            "Independence test needs at least two categories per variable, got {}x{}",
            rows, cols
        )));
    }

    let min_expected = table.min_expected();
    let requirement_met = min_expected >= MIN_EXPECTED_FREQUENCY;
    let df = ((rows - 1) * (cols - 1)) as f64;

    let (test_name, chi_square, odds_ratio, p_value, v) = if !requirement_met && rows == 2 && cols == 2 {
        let cell = |i: usize, j: usize| table.observed[i][j].round() as u64;
        let (odds_ratio, p_value) = fisher_exact([[cell(0, 0), cell(0, 1)], [cell(1, 0), cell(1, 1)]])?;
        // chi-square equivalent of the exact p-value
        let chi2_equivalent = ChiSquared::new(df)?.inverse_cdf(1.0 - p_value);
        let v = cramers_v(chi2_equivalent, table.total, rows, cols).min(1.0);
        debug!(
            "Fisher's exact test used (min expected {:.2}), p = {:.4}",
            min_expected, p_value
        );
        (IndependenceTest::FisherExact, None, Some(odds_ratio), p_value, v)
    } else {
        let (chi2, _, p_value) = table.chi_square()?;
        let v = cramers_v(chi2, table.total, rows, cols);
        (IndependenceTest::ChiSquare, Some(chi2), None, p_value, v)
    };

    let effect = EffectSize::CramersV(v);
    Ok(ContingencyResult {
        test_name,
        chi_square,
        odds_ratio,
        p_value,
        degrees_of_freedom: df,
        n: table.total,
        min_expected,
        expected_requirement_met: requirement_met,
        fisher_due_to_low_expected: test_name == IndependenceTest::FisherExact,
        low_expected_caution: !requirement_met && test_name == IndependenceTest::ChiSquare,
        cramers_v: v,
        effect_magnitude: effect.magnitude(),
        effect_interpretation: effect.interpretation(),
        independent: p_value > alpha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_expected_frequencies() {
        let table = ContingencyTable::new(
            vec![vec![10.0, 20.0], vec![30.0, 40.0]],
            labels("r", 2),
            labels("c", 2),
        )
        .unwrap();
        let expected = table.expected_frequencies();
        assert!((expected[0][0] - 12.0).abs() < 1e-12);
        assert!((expected[1][1] - 42.0).abs() < 1e-12);
    }

    #[test]
    fn test_chi_square_yates() {
        let table = ContingencyTable::new(
            vec![vec![10.0, 20.0], vec![30.0, 40.0]],
            labels("r", 2),
            labels("c", 2),
        )
        .unwrap();
        let (chi2, df, p) = table.chi_square().unwrap();
        assert_eq!(df, 1.0);
        assert!((chi2 - 0.4464285714285714).abs() < 1e-9);
        assert!((p - 0.5040358664525046).abs() < 1e-6);
    }

    #[test]
    fn test_fisher_exact_reference() {
        // scipy.stats.fisher_exact([[8, 2], [1, 5]])
        let (odds, p) = fisher_exact([[8, 2], [1, 5]]).unwrap();
        assert!((odds - 20.0).abs() < 1e-12);
        assert!((p - 0.03496503496503495).abs() < 1e-9);
    }

    #[test]
    fn test_small_2x2_uses_fisher() {
        let pairs: Vec<(String, String)> = [
            ("A", "X"), ("A", "X"), ("A", "X"), ("A", "X"),
            ("A", "Y"), ("B", "X"), ("B", "X"), ("B", "Y"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
        let table = ContingencyTable::from_pairs(&pairs).unwrap();
        let result = check_independence(&table, 0.05).unwrap();
        assert_eq!(result.test_name, IndependenceTest::FisherExact);
        assert!(result.fisher_due_to_low_expected);
        assert!(result.odds_ratio.is_some());
        assert!(result.chi_square.is_none());
        assert!(result.independent);
    }

    #[test]
    fn test_sparse_3x3_uses_chi_square_with_caution() {
        let table = ContingencyTable::new(
            vec![vec![3.0, 1.0, 2.0], vec![1.0, 4.0, 0.0], vec![2.0, 1.0, 3.0]],
            labels("r", 3),
            labels("c", 3),
        )
        .unwrap();
        let result = check_independence(&table, 0.05).unwrap();
        assert_eq!(result.test_name, IndependenceTest::ChiSquare);
        assert!(!result.expected_requirement_met);
        assert!(result.low_expected_caution);
        assert_eq!(result.degrees_of_freedom, 4.0);
    }

    #[test]
    fn test_single_column_rejected() {
        let table = ContingencyTable::new(vec![vec![3.0], vec![4.0]], labels("r", 2), labels("c", 1)).unwrap();
        assert!(check_independence(&table, 0.05).is_err());
    }
}
