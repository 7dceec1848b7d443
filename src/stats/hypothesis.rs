//! Parametric hypothesis tests
//!
//! Independent-samples t-tests (Student and Welch) and one-way ANOVA. Every
//! test returns a [`TestResult`]; numerical degeneracies (zero variance, too
//! few observations) are reported as errors so the caller can fall back.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::error::{Error, Result};
use crate::stats::descriptive::{mean, variance};
use crate::stats::distributions::{Distribution, FDistribution, TDistribution};
use crate::stats::effect_size::{cohens_d_average, cohens_d_pooled, EffectSize};

/// Statistical hypothesis test result
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    /// Test statistic value
    pub statistic: f64,
    /// P-value of the test
    pub p_value: f64,
    /// Degrees of freedom (if applicable)
    pub degrees_of_freedom: Option<f64>,
    /// Effect size (if applicable)
    pub effect_size: Option<EffectSize>,
    /// Confidence interval for the effect
    pub confidence_interval: Option<(f64, f64)>,
    /// Test description
    pub test_name: String,
    /// Alternative hypothesis
    pub alternative: AlternativeHypothesis,
    /// Additional test-specific information
    pub additional_info: HashMap<String, f64>,
}

impl TestResult {
    /// Look up an entry of `additional_info`
    pub fn info(&self, key: &str) -> Option<f64> {
        self.additional_info.get(key).copied()
    }
}

/// Alternative hypothesis specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeHypothesis {
    /// Two-sided test (≠)
    TwoSided,
    /// Greater than test (>)
    Greater,
    /// Less than test (<)
    Less,
}

/// Independent samples t-test.
///
/// With `equal_variances` the pooled (Student) form is used and Cohen's d takes
/// the pooled standard deviation; otherwise Welch's form with
/// Welch-Satterthwaite degrees of freedom and the average-variance d.
pub fn independent_ttest(
    group1: &[f64],
    group2: &[f64],
    alternative: AlternativeHypothesis,
    equal_variances: bool,
) -> Result<TestResult> {
    if group1.len() < 2 || group2.len() < 2 {
        return Err(Error::InsufficientData(
            "Both groups need at least 2 observations for a t-test".into(),
        ));
    }

    let n1 = group1.len() as f64;
    let n2 = group2.len() as f64;
    let mean1 = mean(group1);
    let mean2 = mean(group2);
    let var1 = variance(group1, 1);
    let var2 = variance(group2, 1);

    let (t_statistic, df, standard_error) = if equal_variances {
        let pooled_var = ((n1 - 1.0) * var1 + (n2 - 1.0) * var2) / (n1 + n2 - 2.0);
        let se = (pooled_var * (1.0 / n1 + 1.0 / n2)).sqrt();
        ((mean1 - mean2) / se, n1 + n2 - 2.0, se)
    } else {
        let se = (var1 / n1 + var2 / n2).sqrt();
        // Welch-Satterthwaite equation for degrees of freedom
        let numerator = (var1 / n1 + var2 / n2).powi(2);
        let denominator = (var1 / n1).powi(2) / (n1 - 1.0) + (var2 / n2).powi(2) / (n2 - 1.0);
        ((mean1 - mean2) / se, numerator / denominator, se)
    };

    if !(standard_error > 0.0) || !t_statistic.is_finite() || !df.is_finite() {
        return Err(Error::Computation(
            "t-test is undefined when both groups have zero variance".into(),
        ));
    }

    let t_dist = TDistribution::new(df)?;
    let p_value = match alternative {
        AlternativeHypothesis::TwoSided => (2.0 * t_dist.sf(t_statistic.abs())).min(1.0),
        AlternativeHypothesis::Greater => t_dist.sf(t_statistic),
        AlternativeHypothesis::Less => t_dist.cdf(t_statistic),
    };

    let critical_value = t_dist.inverse_cdf(0.975);
    let margin_of_error = critical_value * standard_error;
    let ci = (
        (mean1 - mean2) - margin_of_error,
        (mean1 - mean2) + margin_of_error,
    );

    let effect_size = if equal_variances {
        EffectSize::CohensD(cohens_d_pooled(group1, group2))
    } else {
        EffectSize::CohensD(cohens_d_average(group1, group2))
    };

    let mut additional_info = HashMap::new();
    additional_info.insert("mean1".to_string(), mean1);
    additional_info.insert("mean2".to_string(), mean2);
    additional_info.insert("var1".to_string(), var1);
    additional_info.insert("var2".to_string(), var2);
    additional_info.insert("n1".to_string(), n1);
    additional_info.insert("n2".to_string(), n2);

    let test_name = if equal_variances {
        "Student's t-test (equal variances)".to_string()
    } else {
        "Welch's t-test (unequal variances)".to_string()
    };

    Ok(TestResult {
        statistic: t_statistic,
        p_value,
        degrees_of_freedom: Some(df),
        effect_size: Some(effect_size),
        confidence_interval: Some(ci),
        test_name,
        alternative,
        additional_info,
    })
}

/// One-way ANOVA with eta-squared = SS_between / SS_total
pub fn one_way_anova(groups: &[&[f64]]) -> Result<TestResult> {
    if groups.len() < 2 {
        return Err(Error::InsufficientData(
            "At least two groups are required for ANOVA".into(),
        ));
    }
    for (i, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(Error::InsufficientData(format!("Group {} is empty", i)));
        }
    }

    let k = groups.len() as f64;
    let n_total: usize = groups.iter().map(|g| g.len()).sum();
    if n_total as f64 <= k {
        return Err(Error::InsufficientData(
            "ANOVA needs more observations than groups".into(),
        ));
    }

    let overall_mean = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n_total as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let group_mean = mean(group);
        ss_between += group.len() as f64 * (group_mean - overall_mean).powi(2);
        ss_within += group.iter().map(|v| (v - group_mean).powi(2)).sum::<f64>();
    }
    let ss_total = ss_between + ss_within;

    let df_between = k - 1.0;
    let df_within = n_total as f64 - k;
    let ms_between = ss_between / df_between;
    let ms_within = ss_within / df_within;

    if !(ms_within > 0.0) {
        return Err(Error::Computation(
            "ANOVA is undefined when every group has zero variance".into(),
        ));
    }

    let f_statistic = ms_between / ms_within;
    let p_value = FDistribution::new(df_between, df_within)?.sf(f_statistic);
    let eta_squared = if ss_total > 0.0 { ss_between / ss_total } else { 0.0 };

    let mut additional_info = HashMap::new();
    additional_info.insert("ss_between".to_string(), ss_between);
    additional_info.insert("ss_within".to_string(), ss_within);
    additional_info.insert("ss_total".to_string(), ss_total);
    additional_info.insert("ms_within".to_string(), ms_within);
    additional_info.insert("df_between".to_string(), df_between);
    additional_info.insert("df_within".to_string(), df_within);
    additional_info.insert("n_total".to_string(), n_total as f64);

    Ok(TestResult {
        statistic: f_statistic,
        p_value,
        degrees_of_freedom: Some(df_between),
        effect_size: Some(EffectSize::EtaSquared(eta_squared)),
        confidence_interval: None,
        test_name: "One-way ANOVA".to_string(),
        alternative: AlternativeHypothesis::Greater,
        additional_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: [f64; 8] = [5.1, 4.9, 5.6, 5.8, 6.0, 5.2, 4.8, 5.5];
    const B: [f64; 8] = [6.2, 6.8, 5.9, 7.1, 6.5, 6.9, 6.1, 7.0];

    #[test]
    fn test_student_ttest() {
        let result = independent_ttest(&A, &B, AlternativeHypothesis::TwoSided, true).unwrap();
        assert_eq!(result.degrees_of_freedom, Some(14.0));
        assert!(result.statistic < 0.0);
        assert!(result.p_value < 0.001);
        let ci = result.confidence_interval.unwrap();
        assert!(ci.0 < ci.1 && ci.1 < 0.0);
    }

    #[test]
    fn test_welch_df_below_pooled() {
        let wide = [1.0, 9.0, 2.0, 8.0, 3.0, 7.0];
        let result =
            independent_ttest(&A, &wide, AlternativeHypothesis::TwoSided, false).unwrap();
        let df = result.degrees_of_freedom.unwrap();
        assert!(df < 12.0 && df > 4.0);
        assert!(result.test_name.starts_with("Welch"));
    }

    #[test]
    fn test_one_sided_halves_p() {
        let two = independent_ttest(&A, &B, AlternativeHypothesis::TwoSided, true).unwrap();
        let less = independent_ttest(&A, &B, AlternativeHypothesis::Less, true).unwrap();
        assert!((less.p_value * 2.0 - two.p_value).abs() < 1e-12);
    }

    #[test]
    fn test_ttest_zero_variance_is_error() {
        let result =
            independent_ttest(&[3.0, 3.0, 3.0], &[3.0, 3.0], AlternativeHypothesis::TwoSided, false);
        assert!(matches!(result, Err(Error::Computation(_))));
    }

    #[test]
    fn test_one_way_anova() {
        let c = [7.5, 7.9, 8.1, 7.2, 7.7, 8.0, 7.4, 7.8];
        let result = one_way_anova(&[&A, &B, &c]).unwrap();
        assert!(result.p_value < 0.001);
        let eta = result.effect_size.unwrap().value();
        let expected = result.info("ss_between").unwrap() / result.info("ss_total").unwrap();
        assert!((eta - expected).abs() < 1e-12);
    }

    #[test]
    fn test_anova_identical_groups() {
        let result = one_way_anova(&[&A, &A]).unwrap();
        assert!(result.statistic.abs() < 1e-12);
        assert!((result.p_value - 1.0).abs() < 1e-9);
    }
}
