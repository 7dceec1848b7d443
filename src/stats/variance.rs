//! Homogeneity of variance with Levene's test
//!
//! Deviations are taken from each group's median (the Brown-Forsythe variant),
//! which is robust to the skewed score distributions typical of satisfaction
//! surveys.

use log::warn;
use serde::Serialize;

use crate::core::error::{Error, Result};
use crate::stats::descriptive::{mean, median};
use crate::stats::distributions::{Distribution, FDistribution};
use crate::stats::sample::GroupComparison;

/// Outcome of the variance homogeneity check across all groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceHomogeneityResult {
    pub test_performed: bool,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    /// False whenever the test was not performed
    pub variances_homogeneous: bool,
    pub conclusion: String,
    /// Message of an internal failure, if any
    pub error: Option<String>,
}

impl VarianceHomogeneityResult {
    fn not_performed(conclusion: String, error: Option<String>) -> Self {
        VarianceHomogeneityResult {
            test_performed: false,
            statistic: None,
            p_value: None,
            variances_homogeneous: false,
            conclusion,
            error,
        }
    }
}

/// Levene's W statistic and p-value for two or more samples
pub fn levene(samples: &[&[f64]]) -> Result<(f64, f64)> {
    let k = samples.len();
    if k < 2 {
        return Err(Error::InsufficientData(
            "Levene's test needs at least two groups".into(),
        ));
    }
    if let Some(small) = samples.iter().find(|s| s.len() < 2) {
        return Err(Error::InsufficientData(format!(
            "Levene's test needs at least 2 observations per group, got {}",
            small.len()
        )));
    }

    let deviations: Vec<Vec<f64>> = samples
        .iter()
        .map(|s| {
            let center = median(s)?;
            Ok(s.iter().map(|v| (v - center).abs()).collect())
        })
        .collect::<Result<_>>()?;

    let total_n: usize = deviations.iter().map(Vec::len).sum();
    let group_means: Vec<f64> = deviations.iter().map(|z| mean(z)).collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / total_n as f64;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, zm)| z.len() as f64 * (zm - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, zm)| z.iter().map(|v| (v - zm).powi(2)).sum::<f64>())
        .sum();

    if within <= 0.0 {
        return Err(Error::Computation(
            "Levene's test is undefined when every group is constant around its median".into(),
        ));
    }

    let df1 = (k - 1) as f64;
    let df2 = (total_n - k) as f64;
    let w = (df2 / df1) * between / within;
    let p = FDistribution::new(df1, df2)?.sf(w);
    Ok((w, p))
}

/// Run Levene's test over every group of a comparison, never failing
pub fn check_variance_homogeneity(
    comparison: &GroupComparison,
    alpha: f64,
) -> VarianceHomogeneityResult {
    if comparison.group_count() < 2 {
        return VarianceHomogeneityResult::not_performed(
            format!(
                "At least two groups are required, found {}",
                comparison.group_count()
            ),
            None,
        );
    }
    if let Some(small) = comparison.samples.iter().find(|s| s.len() < 2) {
        return VarianceHomogeneityResult::not_performed(
            format!(
                "Group '{}' has {} observation(s); at least 2 per group are required",
                small.label,
                small.len()
            ),
            None,
        );
    }

    match levene(&comparison.value_slices()) {
        Ok((statistic, p_value)) => {
            let homogeneous = p_value > alpha;
            let conclusion = if homogeneous {
                format!("Variances are homogeneous (p = {:.4} > {})", p_value, alpha)
            } else {
                format!("Variances differ between groups (p = {:.4} <= {})", p_value, alpha)
            };
            VarianceHomogeneityResult {
                test_performed: true,
                statistic: Some(statistic),
                p_value: Some(p_value),
                variances_homogeneous: homogeneous,
                conclusion,
                error: None,
            }
        }
        Err(e) => {
            warn!(
                "Levene's test failed for {} by {}: {}",
                comparison.target, comparison.grouping, e
            );
            VarianceHomogeneityResult::not_performed(
                "Levene's test could not be computed".to_string(),
                Some(e.to_string()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::sample::Sample;

    #[test]
    fn test_levene_reference_values() {
        let a = [8.88, 9.12, 9.04, 8.98, 9.00, 9.08, 9.01, 8.85, 9.06, 8.99];
        let b = [8.88, 8.95, 9.29, 9.44, 9.15, 9.58, 8.36, 9.18, 8.67, 9.05];
        let c = [8.95, 9.12, 8.95, 8.85, 9.03, 8.84, 9.07, 8.98, 8.86, 8.98];
        let (w, p) = levene(&[&a, &b, &c]).unwrap();
        assert!((w - 7.584952754501659).abs() < 1e-9);
        assert!((p - 0.002431505967249681).abs() < 1e-6);
    }

    #[test]
    fn test_equal_spread_is_homogeneous() {
        let gc = GroupComparison::new(
            "g",
            "y",
            vec![
                Sample::new("A", &[1.0, 2.0, 3.0, 4.0, 5.0]),
                Sample::new("B", &[11.0, 12.0, 13.0, 14.0, 15.0]),
            ],
        );
        let result = check_variance_homogeneity(&gc, 0.05);
        assert!(result.test_performed);
        assert!(result.variances_homogeneous);
        assert!(result.statistic.unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_small_group_not_performed() {
        let gc = GroupComparison::new(
            "g",
            "y",
            vec![Sample::new("A", &[1.0, 2.0, 3.0]), Sample::new("B", &[4.0])],
        );
        let result = check_variance_homogeneity(&gc, 0.05);
        assert!(!result.test_performed);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_single_group_not_performed() {
        let gc = GroupComparison::new("g", "y", vec![Sample::new("A", &[1.0, 2.0, 3.0])]);
        assert!(!check_variance_homogeneity(&gc, 0.05).test_performed);
    }

    #[test]
    fn test_constant_groups_capture_error() {
        let gc = GroupComparison::new(
            "g",
            "y",
            vec![Sample::new("A", &[2.0, 2.0, 2.0]), Sample::new("B", &[5.0, 5.0])],
        );
        let result = check_variance_homogeneity(&gc, 0.05);
        assert!(!result.test_performed);
        assert!(result.error.is_some());
    }
}
