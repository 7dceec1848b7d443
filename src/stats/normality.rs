//! Normality checking with the Shapiro-Wilk test
//!
//! The W statistic and its p-value follow Royston's AS R94 algorithm
//! (polynomial approximations of the coefficients and a normalising
//! transformation of W), which is valid for 3 <= n <= 5000.

use log::debug;
use serde::Serialize;

use crate::core::error::{Error, Result};
use crate::stats::descriptive::{filter_nan, sorted};
use crate::stats::distributions::{Distribution, StandardNormal};
use crate::stats::sample::GroupComparison;

/// Minimum number of valid observations for the Shapiro-Wilk test
pub const MIN_NORMALITY_N: usize = 3;

/// Outcome of a normality check on one sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityResult {
    /// Valid observations used
    pub n: usize,
    /// Shapiro-Wilk W, absent when the test could not run
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub is_normal: bool,
    pub interpretation: String,
}

/// Per-group normality with the routing aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupNormality {
    pub groups: Vec<(String, NormalityResult)>,
    pub all_normal: bool,
    pub recommendation: String,
}

/// Shapiro-Wilk W statistic and p-value. `data` must be free of NaN.
pub fn shapiro_wilk(data: &[f64]) -> Result<(f64, f64)> {
    let n = data.len();
    if n < MIN_NORMALITY_N {
        return Err(Error::InsufficientData(format!(
            "Shapiro-Wilk needs at least {} observations, got {}",
            MIN_NORMALITY_N, n
        )));
    }

    let x = sorted(data);
    let range = x[n - 1] - x[0];
    if range < 1e-19 {
        return Err(Error::Computation("Data has zero range".into()));
    }

    let a = shapiro_coefficients(n);
    let mean = x.iter().sum::<f64>() / n as f64;
    let ssq: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();
    let w = (numerator * numerator / ssq).min(1.0);

    Ok((w, shapiro_p_value(w, n)))
}

/// Coefficients a_1..a_{n/2} for the sorted-sample contrasts
fn shapiro_coefficients(n: usize) -> Vec<f64> {
    const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
    const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];

    let half = n / 2;
    if n == 3 {
        return vec![std::f64::consts::FRAC_1_SQRT_2];
    }

    let an = n as f64;
    let normal = StandardNormal;
    let m: Vec<f64> = (1..=half)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (an + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let mut a = vec![0.0; half];
    a[0] = poly(&C1, rsn) - m[0] / ssumm2;

    let (first, fac) = if n > 5 {
        a[1] = -m[1] / ssumm2 + poly(&C2, rsn);
        let fac = ((summ2 - 2.0 * m[0].powi(2) - 2.0 * m[1].powi(2))
            / (1.0 - 2.0 * a[0].powi(2) - 2.0 * a[1].powi(2)))
        .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0].powi(2)) / (1.0 - 2.0 * a[0].powi(2))).sqrt();
        (1, fac)
    };

    for i in first..half {
        a[i] = -m[i] / fac;
    }
    a
}

fn shapiro_p_value(w: f64, n: usize) -> f64 {
    const G: [f64; 2] = [-2.273, 0.459];
    const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
    const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
    const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
    const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];

    if n == 3 {
        let p = 6.0 / std::f64::consts::PI * (w.sqrt().asin() - 0.75f64.sqrt().asin());
        return p.clamp(0.0, 1.0);
    }

    let an = n as f64;
    let w1 = (1.0 - w).ln();
    let (y, m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if w1 >= gamma {
            return 1e-99;
        }
        (-(gamma - w1).ln(), poly(&C3, an), poly(&C4, an).exp())
    } else {
        let xx = an.ln();
        (w1, poly(&C5, xx), poly(&C6, xx).exp())
    };

    StandardNormal.sf((y - m) / s).clamp(0.0, 1.0)
}

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Run the Shapiro-Wilk test on a sample, never failing.
///
/// NaN values are dropped first. Fewer than three valid values, or a
/// numerical failure, produce `is_normal = false` with an explanation.
pub fn check_normality(data: &[f64], alpha: f64) -> NormalityResult {
    let values = filter_nan(data);
    let n = values.len();

    if n < MIN_NORMALITY_N {
        return NormalityResult {
            n,
            statistic: None,
            p_value: None,
            is_normal: false,
            interpretation: format!(
                "Insufficient observations for normality test (n = {}, minimum {}); use non-parametric tests",
                n, MIN_NORMALITY_N
            ),
        };
    }

    match shapiro_wilk(&values) {
        Ok((w, p)) => {
            let is_normal = p > alpha;
            let interpretation = if is_normal {
                format!("Data consistent with a normal distribution (p = {:.4} > {})", p, alpha)
            } else {
                format!("Data deviate from a normal distribution (p = {:.4} <= {})", p, alpha)
            };
            NormalityResult {
                n,
                statistic: Some(w),
                p_value: Some(p),
                is_normal,
                interpretation,
            }
        }
        Err(e) => {
            debug!("Shapiro-Wilk could not run: {}", e);
            NormalityResult {
                n,
                statistic: None,
                p_value: None,
                is_normal: false,
                interpretation: format!("Normality test not performed: {}; use non-parametric tests", e),
            }
        }
    }
}

/// Check every group of a comparison independently
pub fn check_normality_by_group(comparison: &GroupComparison, alpha: f64) -> GroupNormality {
    let groups: Vec<(String, NormalityResult)> = comparison
        .samples
        .iter()
        .map(|s| (s.label.clone(), check_normality(&s.values, alpha)))
        .collect();
    let all_normal = !groups.is_empty() && groups.iter().all(|(_, r)| r.is_normal);
    let recommendation = if all_normal {
        "All groups are normal: use parametric tests".to_string()
    } else {
        "At least one group is not normal: use non-parametric tests".to_string()
    };
    GroupNormality {
        groups,
        all_normal,
        recommendation,
    }
}
