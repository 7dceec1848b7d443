//! Non-parametric statistical tests
//!
//! Rank-based tests that don't assume normality: the Mann-Whitney U test for
//! two groups and the Kruskal-Wallis H test for several. Ties receive average
//! ranks and the large-sample approximations include the tie correction.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::error::{Error, Result};
use crate::stats::distributions::{ChiSquared, Distribution, StandardNormal};
use crate::stats::effect_size::{kruskal_eta_squared, rank_biserial_from_p, EffectSize};
use crate::stats::hypothesis::{AlternativeHypothesis, TestResult};

/// Below this group size the exact Mann-Whitney distribution is used
pub const DEFAULT_EXACT_THRESHOLD: usize = 20;

/// How the Mann-Whitney p-value is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MannWhitneyMethod {
    /// Exact when either group has fewer than `exact_threshold` observations
    Auto { exact_threshold: usize },
    Exact,
    Asymptotic,
}

impl Default for MannWhitneyMethod {
    fn default() -> Self {
        MannWhitneyMethod::Auto {
            exact_threshold: DEFAULT_EXACT_THRESHOLD,
        }
    }
}

/// Average ranks (1-based) of `data`, ties sharing the mean of their positions.
/// Also returns the size of every tie group.
pub fn assign_ranks(data: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let n = data.len();
    let mut indexed_data: Vec<(usize, f64)> =
        data.iter().enumerate().map(|(i, &val)| (i, val)).collect();
    indexed_data.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ranks = vec![0.0; n];
    let mut ties = Vec::new();
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && indexed_data[j].1 == indexed_data[i].1 {
            j += 1;
        }
        // Average rank for tied values (1-based ranking)
        let avg_rank = (i + j - 1) as f64 / 2.0 + 1.0;
        for item in &indexed_data[i..j] {
            ranks[item.0] = avg_rank;
        }
        if j - i > 1 {
            ties.push(j - i);
        }
        i = j;
    }

    (ranks, ties)
}

fn tie_sum(ties: &[usize]) -> f64 {
    ties.iter().map(|&t| (t as f64).powi(3) - t as f64).sum()
}

/// Two-sided Mann-Whitney U test.
///
/// The reported statistic is U for `group1`. A sample where every observation
/// is tied has no rank information and yields `Error::Computation`.
pub fn mann_whitney_u(group1: &[f64], group2: &[f64], method: MannWhitneyMethod) -> Result<TestResult> {
    if group1.is_empty() || group2.is_empty() {
        return Err(Error::InsufficientData(
            "Both groups must contain data".into(),
        ));
    }

    let n1 = group1.len();
    let n2 = group2.len();
    let n_total = n1 + n2;

    let combined: Vec<f64> = group1.iter().chain(group2.iter()).copied().collect();
    let (ranks, ties) = assign_ranks(&combined);
    if ties.first() == Some(&n_total) {
        return Err(Error::Computation(
            "Mann-Whitney U is degenerate: all observations are tied".into(),
        ));
    }

    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u_max = u1.max(u2);

    let exact = match method {
        MannWhitneyMethod::Exact => true,
        MannWhitneyMethod::Asymptotic => false,
        MannWhitneyMethod::Auto { exact_threshold } => n1 < exact_threshold || n2 < exact_threshold,
    };

    let p_value = if exact {
        let distribution = u_distribution(n1, n2);
        let total: f64 = distribution.iter().sum();
        // ties give half-integer U; the tail starts at the next attainable value
        let k = u_max.ceil() as usize;
        let upper: f64 = distribution.iter().skip(k).sum();
        (2.0 * upper / total).min(1.0)
    } else {
        let mean_u = (n1 * n2) as f64 / 2.0;
        let n = n_total as f64;
        let sigma = ((n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_sum(&ties) / (n * (n - 1.0)))).sqrt();
        if !(sigma > 0.0) {
            return Err(Error::Computation(
                "Mann-Whitney U variance is zero".into(),
            ));
        }
        // continuity correction
        let z = (u_max - mean_u - 0.5) / sigma;
        (2.0 * StandardNormal.sf(z)).min(1.0)
    };

    let effect_size = EffectSize::RankBiserialR(rank_biserial_from_p(p_value, n_total));

    let mut additional_info = HashMap::new();
    additional_info.insert("u1".to_string(), u1);
    additional_info.insert("u2".to_string(), u2);
    additional_info.insert("n1".to_string(), n1 as f64);
    additional_info.insert("n2".to_string(), n2 as f64);
    additional_info.insert("rank_sum_group1".to_string(), r1);
    additional_info.insert("mean_rank1".to_string(), r1 / n1 as f64);
    additional_info.insert(
        "mean_rank2".to_string(),
        ranks[n1..].iter().sum::<f64>() / n2 as f64,
    );
    additional_info.insert("exact".to_string(), if exact { 1.0 } else { 0.0 });

    Ok(TestResult {
        statistic: u1,
        p_value,
        degrees_of_freedom: None,
        effect_size: Some(effect_size),
        confidence_interval: None,
        test_name: "Mann-Whitney U test".to_string(),
        alternative: AlternativeHypothesis::TwoSided,
        additional_info,
    })
}

/// Frequencies of U = 0..=m*n under the null hypothesis without ties.
///
/// They are the coefficients of the Gaussian binomial coefficient
/// [m+n choose m]_q = prod_{i=1..m} (1 - q^(n+i)) / (1 - q^i).
fn u_distribution(m: usize, n: usize) -> Vec<f64> {
    let (m, n) = if m <= n { (m, n) } else { (n, m) };
    let degree = m * n;
    let mut coefficients = vec![0.0; degree + 1];
    coefficients[0] = 1.0;

    for i in 1..=m {
        // multiply by (1 - q^(n+i))
        let shift = n + i;
        for k in (shift..=degree).rev() {
            coefficients[k] -= coefficients[k - shift];
        }
        // divide by (1 - q^i)
        for k in i..=degree {
            coefficients[k] += coefficients[k - i];
        }
    }
    coefficients
}

/// Kruskal-Wallis H test with tie correction.
///
/// The eta-squared reported is the approximation (H - k + 1) / (N - k)
/// floored at zero.
pub fn kruskal_wallis(groups: &[&[f64]]) -> Result<TestResult> {
    if groups.len() < 2 {
        return Err(Error::InsufficientData(
            "At least two groups are required".into(),
        ));
    }
    for (i, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(Error::InsufficientData(format!("Group {} is empty", i)));
        }
    }

    let k = groups.len();
    let n_total: usize = groups.iter().map(|g| g.len()).sum();
    let combined: Vec<f64> = groups.iter().flat_map(|g| g.iter()).copied().collect();
    let (ranks, ties) = assign_ranks(&combined);

    let n = n_total as f64;
    let correction = 1.0 - tie_sum(&ties) / (n.powi(3) - n);
    if !(correction > 0.0) {
        return Err(Error::Computation(
            "Kruskal-Wallis is degenerate: all observations are tied".into(),
        ));
    }

    let mut offset = 0;
    let mut h_statistic = 0.0;
    let mut additional_info = HashMap::new();
    for (i, group) in groups.iter().enumerate() {
        let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
        h_statistic += rank_sum * rank_sum / group.len() as f64;
        additional_info.insert(format!("mean_rank_group_{}", i), rank_sum / group.len() as f64);
        offset += group.len();
    }
    h_statistic = (12.0 / (n * (n + 1.0)) * h_statistic - 3.0 * (n + 1.0)) / correction;

    let df = (k - 1) as f64;
    let p_value = ChiSquared::new(df)?.sf(h_statistic);
    let eta_squared = kruskal_eta_squared(h_statistic, k, n_total);

    additional_info.insert("k_groups".to_string(), k as f64);
    additional_info.insert("n_total".to_string(), n);
    additional_info.insert("tie_correction".to_string(), correction);

    Ok(TestResult {
        statistic: h_statistic,
        p_value,
        degrees_of_freedom: Some(df),
        effect_size: Some(EffectSize::EtaSquared(eta_squared)),
        confidence_interval: None,
        test_name: "Kruskal-Wallis H test".to_string(),
        alternative: AlternativeHypothesis::Greater,
        additional_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_ranks_with_ties() {
        let (ranks, ties) = assign_ranks(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
        assert_eq!(ties, vec![2]);
    }

    #[test]
    fn test_u_distribution_counts() {
        // m = n = 2: U takes 0,1,2,2,3,4 over the 6 arrangements
        assert_eq!(u_distribution(2, 2), vec![1.0, 1.0, 2.0, 1.0, 1.0]);
        let total: f64 = u_distribution(5, 7).iter().sum();
        assert_eq!(total, 792.0);
    }

    #[test]
    fn test_exact_complete_separation() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [6.0, 7.0, 8.0, 9.0, 10.0];
        let result = mann_whitney_u(&a, &b, MannWhitneyMethod::default()).unwrap();
        assert_eq!(result.statistic, 0.0);
        // 2 / C(10, 5)
        assert!((result.p_value - 2.0 / 252.0).abs() < 1e-12);
        assert_eq!(result.info("exact"), Some(1.0));
    }

    #[test]
    fn test_exact_with_ties_uses_upper_tail() {
        let a = [1.0, 2.0, 2.0, 3.0, 3.0, 3.0];
        let b = [3.0, 4.0, 4.0, 5.0, 5.0, 6.0];
        let result = mann_whitney_u(&a, &b, MannWhitneyMethod::Exact).unwrap();
        assert_eq!(result.info("u1"), Some(1.5));
        assert_eq!(result.info("u2"), Some(34.5));
        // 2 * P(U >= 35) with U in 0..=36 over C(12, 6) = 924 arrangements
        assert!((result.p_value - 4.0 / 924.0).abs() < 1e-12);
    }

    #[test]
    fn test_asymptotic_with_ties() {
        let a = [1.0, 2.0, 2.0, 3.0, 4.0, 5.0, 5.0, 6.0];
        let b = [4.0, 5.0, 6.0, 6.0, 7.0, 8.0, 8.0, 9.0];
        let result = mann_whitney_u(&a, &b, MannWhitneyMethod::Asymptotic).unwrap();
        assert!(result.p_value > 0.0 && result.p_value < 0.05);
        assert_eq!(result.info("exact"), Some(0.0));
        let r = result.effect_size.unwrap().value();
        assert!(r > 0.0 && r <= 1.0);
    }

    #[test]
    fn test_all_tied_is_degenerate() {
        let result = mann_whitney_u(&[2.0, 2.0, 2.0], &[2.0, 2.0], MannWhitneyMethod::default());
        assert!(matches!(result, Err(Error::Computation(_))));
    }

    #[test]
    fn test_kruskal_wallis() {
        let a = [2.9, 3.0, 2.5, 2.6, 3.2];
        let b = [3.8, 2.7, 4.0, 2.4];
        let c = [2.8, 3.4, 3.7, 2.2, 2.0];
        let result = kruskal_wallis(&[&a, &b, &c]).unwrap();
        assert!((result.statistic - 0.7714285714285722).abs() < 1e-9);
        assert!((result.p_value - 0.6799647735788936).abs() < 1e-6);
        // H - k + 1 < 0, floored
        assert_eq!(result.effect_size.unwrap().value(), 0.0);
    }
}
