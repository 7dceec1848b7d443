//! Statistical power and required sample size
//!
//! Two-group comparisons use the noncentral t distribution of the
//! independent-samples t statistic; one-way designs use the noncentral F
//! distribution with Cohen's f (f² = η² / (1 - η²)).

use std::fmt;

use serde::Serialize;
use statrs::function::beta::beta_reg;
use statrs::function::gamma::ln_gamma;

use crate::core::error::{Error, Result};
use crate::stats::distributions::{Distribution, FDistribution, StandardNormal, TDistribution};

/// Conventional target power
pub const DEFAULT_TARGET_POWER: f64 = 0.80;

/// Upper bound of the per-group sample size search
const MAX_SEARCH_N: usize = 1_000_000;

/// Three-tier power interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerTier {
    VeryLow,
    Insufficient,
    Adequate,
}

impl PowerTier {
    pub fn from_power(power: f64) -> Self {
        if power < 0.5 {
            PowerTier::VeryLow
        } else if power < DEFAULT_TARGET_POWER {
            PowerTier::Insufficient
        } else {
            PowerTier::Adequate
        }
    }
}

impl fmt::Display for PowerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PowerTier::VeryLow => "very low power",
            PowerTier::Insufficient => "insufficient power",
            PowerTier::Adequate => "adequate power",
        })
    }
}

/// Achieved power and the sample size needed for the target power
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerAnalysisResult {
    pub power: f64,
    pub tier: PowerTier,
    pub interpretation: String,
    pub recommendation: String,
    /// Per-group size reaching the target power at the same effect size.
    /// Absent when the effect is zero or the search bound is exceeded.
    pub required_sample_size_per_group: Option<usize>,
    /// Effect size the power refers to (Cohen's d or Cohen's f)
    pub effect_size: f64,
    pub alpha: f64,
    pub target_power: f64,
}

impl PowerAnalysisResult {
    fn new(power: f64, required: Option<usize>, effect_size: f64, alpha: f64, target_power: f64) -> Self {
        let tier = PowerTier::from_power(power);
        let recommendation = match (tier, required) {
            (PowerTier::Adequate, _) => {
                "Sample size is sufficient to detect an effect of this magnitude".to_string()
            }
            (_, Some(n)) => format!(
                "Collect at least {} observations per group to reach {:.0}% power",
                n,
                target_power * 100.0
            ),
            (_, None) => {
                "The observed effect is too small for a practical sample size; interpret the result with caution"
                    .to_string()
            }
        };
        PowerAnalysisResult {
            power,
            tier,
            interpretation: tier.to_string(),
            recommendation,
            required_sample_size_per_group: required,
            effect_size,
            alpha,
            target_power,
        }
    }
}

fn check_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidValue(format!("alpha must be in (0, 1), got {}", alpha)))
    }
}

/// Power of the two-sided independent-samples t-test for Cohen's `d`.
///
/// Integrates the normal tail probabilities over the distribution of the
/// pooled standard deviation (a scaled chi variable) with Simpson's rule.
pub fn two_sample_t_power(d: f64, n1: usize, n2: usize, alpha: f64) -> Result<f64> {
    check_alpha(alpha)?;
    if n1 < 2 || n2 < 2 {
        return Err(Error::InsufficientData(
            "Power needs at least 2 observations per group".into(),
        ));
    }
    if !d.is_finite() {
        return Err(Error::InvalidValue("Effect size must be finite".into()));
    }

    let df = (n1 + n2 - 2) as f64;
    let delta = d.abs() * ((n1 * n2) as f64 / (n1 + n2) as f64).sqrt();
    let critical = TDistribution::new(df)?.inverse_cdf(1.0 - alpha / 2.0);

    // S = sqrt(V / df), V ~ chi-square(df)
    let log_norm = (df / 2.0) * (df / 2.0).ln() - ln_gamma(df / 2.0) + std::f64::consts::LN_2;
    let spread = 1.0 / (2.0 * df).sqrt();
    let lo = (1.0 - 12.0 * spread).max(0.0);
    let hi = 1.0 + 12.0 * spread + if df < 10.0 { 6.0 } else { 0.0 };

    let normal = StandardNormal;
    let steps = 2000;
    let h = (hi - lo) / steps as f64;
    let mut total = 0.0;
    for i in 0..=steps {
        let s = lo + i as f64 * h;
        let density = if s <= 0.0 {
            0.0
        } else {
            (log_norm + (df - 1.0) * s.ln() - df * s * s / 2.0).exp()
        };
        let rejection = normal.sf(critical * s - delta) + normal.cdf(-critical * s - delta);
        let weight = if i == 0 || i == steps {
            1.0
        } else if i % 2 == 1 {
            4.0
        } else {
            2.0
        };
        total += weight * density * rejection;
    }

    Ok((total * h / 3.0).clamp(0.0, 1.0))
}

/// Smallest per-group size with power >= `target` for equal group sizes
pub fn required_n_two_sample(d: f64, alpha: f64, target: f64) -> Result<Option<usize>> {
    if !(d.abs() > 0.0) || !d.is_finite() {
        return Ok(None);
    }
    search_min_n(2, |n| two_sample_t_power(d, n, n, alpha), target)
}

/// CDF of the noncentral F distribution as a Poisson mixture of beta integrals
fn noncentral_f_cdf(x: f64, df1: f64, df2: f64, lambda: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let y = df1 * x / (df1 * x + df2);
    let half = lambda / 2.0;
    if half <= 0.0 {
        return beta_reg(df1 / 2.0, df2 / 2.0, y);
    }
    let terms = (half + 10.0 * half.sqrt() + 50.0) as usize;
    (0..=terms)
        .map(|j| {
            let j = j as f64;
            let weight = (-half + j * half.ln() - ln_gamma(j + 1.0)).exp();
            weight * beta_reg(df1 / 2.0 + j, df2 / 2.0, y)
        })
        .sum::<f64>()
        .min(1.0)
}

/// Convert eta-squared to Cohen's f
pub fn eta_squared_to_f(eta_squared: f64) -> f64 {
    if eta_squared >= 1.0 {
        return f64::INFINITY;
    }
    (eta_squared.max(0.0) / (1.0 - eta_squared)).sqrt()
}

/// Power of the one-way ANOVA F-test for Cohen's `f`, `groups` groups and
/// `total_n` observations (noncentrality λ = f² N)
pub fn anova_power(f: f64, groups: usize, total_n: usize, alpha: f64) -> Result<f64> {
    check_alpha(alpha)?;
    if groups < 2 || total_n <= groups {
        return Err(Error::InsufficientData(
            "ANOVA power needs at least two groups and more observations than groups".into(),
        ));
    }
    if !f.is_finite() {
        return Err(Error::InvalidValue("Effect size must be finite".into()));
    }
    let df1 = (groups - 1) as f64;
    let df2 = (total_n - groups) as f64;
    let critical = FDistribution::new(df1, df2)?.inverse_cdf(1.0 - alpha);
    let lambda = f * f * total_n as f64;
    Ok((1.0 - noncentral_f_cdf(critical, df1, df2, lambda)).clamp(0.0, 1.0))
}

/// Smallest per-group size with ANOVA power >= `target`
pub fn required_n_anova(f: f64, groups: usize, alpha: f64, target: f64) -> Result<Option<usize>> {
    if !(f > 0.0) || !f.is_finite() {
        return Ok(None);
    }
    search_min_n(2, |n| anova_power(f, groups, n * groups, alpha), target)
}

/// Doubling then bisection over a power function increasing in n
fn search_min_n<F>(start: usize, power: F, target: f64) -> Result<Option<usize>>
where
    F: Fn(usize) -> Result<f64>,
{
    if power(start)? >= target {
        return Ok(Some(start));
    }
    let mut lo = start;
    let mut hi = start * 2;
    while power(hi)? < target {
        lo = hi;
        hi *= 2;
        if hi > MAX_SEARCH_N {
            return Ok(None);
        }
    }
    // invariant: power(lo) < target <= power(hi)
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if power(mid)? >= target {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(Some(hi))
}

/// Power analysis for a two-group comparison with Cohen's d
pub fn analyze_two_sample(
    d: f64,
    n1: usize,
    n2: usize,
    alpha: f64,
    target_power: f64,
) -> Result<PowerAnalysisResult> {
    let power = two_sample_t_power(d, n1, n2, alpha)?;
    let required = required_n_two_sample(d, alpha, target_power)?;
    Ok(PowerAnalysisResult::new(power, required, d.abs(), alpha, target_power))
}

/// Power analysis for a one-way design from its eta-squared
pub fn analyze_anova(
    eta_squared: f64,
    group_sizes: &[usize],
    alpha: f64,
    target_power: f64,
) -> Result<PowerAnalysisResult> {
    let f = eta_squared_to_f(eta_squared);
    let groups = group_sizes.len();
    let total_n: usize = group_sizes.iter().sum();
    let power = anova_power(f, groups, total_n, alpha)?;
    let required = required_n_anova(f, groups, alpha, target_power)?;
    Ok(PowerAnalysisResult::new(power, required, f, alpha, target_power))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_power_values() {
        let p = two_sample_t_power(0.8, 30, 30, 0.05).unwrap();
        assert!((p - 0.8614).abs() < 1e-3);
        let p = two_sample_t_power(0.5, 64, 64, 0.05).unwrap();
        assert!((p - 0.8015).abs() < 1e-3);
    }

    #[test]
    fn test_zero_effect_gives_alpha() {
        let p = two_sample_t_power(0.0, 25, 25, 0.05).unwrap();
        assert!((p - 0.05).abs() < 1e-4);
        assert_eq!(required_n_two_sample(0.0, 0.05, 0.8).unwrap(), None);
    }

    #[test]
    fn test_required_n_classic_table() {
        // d = 0.5 needs 64 per group for 80% power
        assert_eq!(required_n_two_sample(0.5, 0.05, 0.8).unwrap(), Some(64));
    }

    #[test]
    fn test_anova_power_reference() {
        let p = anova_power(0.25, 3, 159, 0.05).unwrap();
        assert!((p - 0.8049).abs() < 1e-3);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(PowerTier::from_power(0.3), PowerTier::VeryLow);
        assert_eq!(PowerTier::from_power(0.6), PowerTier::Insufficient);
        assert_eq!(PowerTier::from_power(0.85), PowerTier::Adequate);
        assert_eq!(PowerTier::VeryLow.to_string(), "very low power");
    }

    #[test]
    fn test_analysis_recommendation() {
        let result = analyze_two_sample(0.3, 10, 10, 0.05, 0.8).unwrap();
        assert_eq!(result.tier, PowerTier::VeryLow);
        let n = result.required_sample_size_per_group.unwrap();
        assert!(n > 150 && n < 200);
        assert!(result.recommendation.contains(&n.to_string()));
    }

    #[test]
    fn test_eta_to_f() {
        assert!((eta_squared_to_f(0.2) - 0.5).abs() < 1e-12);
        assert_eq!(eta_squared_to_f(0.0), 0.0);
    }
}
