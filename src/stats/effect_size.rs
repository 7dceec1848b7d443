//! Effect size measures and their magnitude buckets

use std::fmt;

use serde::Serialize;

use crate::stats::descriptive::{mean, variance};
use crate::stats::distributions::{Distribution, StandardNormal};

/// Conventional magnitude bucket of an effect size
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMagnitude {
    Negligible,
    Small,
    Moderate,
    Large,
}

impl fmt::Display for EffectMagnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EffectMagnitude::Negligible => "negligible",
            EffectMagnitude::Small => "small",
            EffectMagnitude::Moderate => "moderate",
            EffectMagnitude::Large => "large",
        };
        f.write_str(s)
    }
}

/// Effect size measures
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "measure", content = "value", rename_all = "snake_case")]
pub enum EffectSize {
    /// Cohen's d for t-tests
    CohensD(f64),
    /// Rank-biserial r from the normal approximation of a rank test
    RankBiserialR(f64),
    /// Eta squared for ANOVA and Kruskal-Wallis
    EtaSquared(f64),
    /// Cramer's V for contingency tables
    CramersV(f64),
}

impl EffectSize {
    /// Get the numeric value of the effect size
    pub fn value(&self) -> f64 {
        match self {
            EffectSize::CohensD(v)
            | EffectSize::RankBiserialR(v)
            | EffectSize::EtaSquared(v)
            | EffectSize::CramersV(v) => *v,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EffectSize::CohensD(_) => "Cohen's d",
            EffectSize::RankBiserialR(_) => "rank-biserial r",
            EffectSize::EtaSquared(_) => "eta-squared",
            EffectSize::CramersV(_) => "Cramer's V",
        }
    }

    /// Magnitude bucket using the thresholds conventional for each measure
    pub fn magnitude(&self) -> EffectMagnitude {
        let val = self.value().abs();
        let (small, moderate, large) = match self {
            EffectSize::CohensD(_) => (0.2, 0.5, 0.8),
            EffectSize::RankBiserialR(_) | EffectSize::CramersV(_) => (0.1, 0.3, 0.5),
            EffectSize::EtaSquared(_) => (0.01, 0.06, 0.14),
        };
        if val.is_nan() || val < small {
            EffectMagnitude::Negligible
        } else if val < moderate {
            EffectMagnitude::Small
        } else if val < large {
            EffectMagnitude::Moderate
        } else {
            EffectMagnitude::Large
        }
    }

    /// Get interpretation of effect size magnitude
    pub fn interpretation(&self) -> String {
        format!("{} effect ({} = {:.3})", self.magnitude(), self.name(), self.value())
    }
}

/// Cohen's d with the pooled standard deviation
pub fn cohens_d_pooled(group1: &[f64], group2: &[f64]) -> f64 {
    let n1 = group1.len() as f64;
    let n2 = group2.len() as f64;
    let pooled_var =
        ((n1 - 1.0) * variance(group1, 1) + (n2 - 1.0) * variance(group2, 1)) / (n1 + n2 - 2.0);
    (mean(group1) - mean(group2)) / pooled_var.sqrt()
}

/// Cohen's d with the root of the average variance, used alongside Welch's test
pub fn cohens_d_average(group1: &[f64], group2: &[f64]) -> f64 {
    let sd = ((variance(group1, 1) + variance(group2, 1)) / 2.0).sqrt();
    (mean(group1) - mean(group2)) / sd
}

/// Effect size r = z / sqrt(N), with z recovered from a two-sided p-value
pub fn rank_biserial_from_p(p_value: f64, total_n: usize) -> f64 {
    if total_n == 0 {
        return f64::NAN;
    }
    let z = StandardNormal.inverse_cdf(1.0 - p_value.clamp(0.0, 1.0) / 2.0);
    (z / (total_n as f64).sqrt()).clamp(0.0, 1.0)
}

/// Eta-squared approximation for Kruskal-Wallis, floored at zero.
/// This is a rough effect size, not an exact variance ratio.
pub fn kruskal_eta_squared(h: f64, groups: usize, total_n: usize) -> f64 {
    if total_n <= groups {
        return 0.0;
    }
    ((h - groups as f64 + 1.0) / (total_n - groups) as f64).max(0.0)
}

/// Cramer's V = sqrt(chi2 / (N * min(r - 1, c - 1)))
pub fn cramers_v(chi2: f64, total: f64, rows: usize, cols: usize) -> f64 {
    let min_dim = rows.min(cols).saturating_sub(1);
    if total <= 0.0 || min_dim == 0 {
        return 0.0;
    }
    (chi2 / (total * min_dim as f64)).sqrt()
}
