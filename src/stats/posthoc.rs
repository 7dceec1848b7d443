//! Post-hoc pairwise comparisons after a significant omnibus test
//!
//! The parametric path is Tukey's HSD (the studentized range handles the
//! multiplicity, so each pair is compared against the unadjusted alpha). The
//! non-parametric path runs pairwise Mann-Whitney U tests and compares each
//! raw p-value against a Bonferroni-adjusted alpha.

use serde::Serialize;

use crate::core::error::{Error, Result};
use crate::stats::descriptive::{mean, variance};
use crate::stats::distributions::StudentizedRange;
use crate::stats::effect_size::{cohens_d_pooled, rank_biserial_from_p, EffectSize};
use crate::stats::nonparametric::{mann_whitney_u, MannWhitneyMethod};
use crate::stats::sample::Sample;

/// Which multiple-comparison procedure produced a set of comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostHocMethod {
    TukeyHsd,
    PairwiseMannWhitney,
}

/// One unordered pair of groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostHocComparison {
    pub group_a: String,
    pub group_b: String,
    /// Mean difference (Tukey) or mean rank difference (Mann-Whitney), a - b
    pub difference: f64,
    pub statistic: f64,
    /// Tukey-adjusted p-value, or the raw pairwise Mann-Whitney p-value
    pub p_value: f64,
    pub confidence_interval: Option<(f64, f64)>,
    pub significant: bool,
    pub effect_size: EffectSize,
    pub interpretation: String,
}

/// All pairwise comparisons for one group comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostHocResult {
    pub method: PostHocMethod,
    pub alpha: f64,
    /// Threshold each pair's p-value is compared against
    pub adjusted_alpha: f64,
    pub comparisons: Vec<PostHocComparison>,
}

impl PostHocResult {
    /// Pairs whose difference is significant
    pub fn significant_pairs(&self) -> impl Iterator<Item = &PostHocComparison> {
        self.comparisons.iter().filter(|c| c.significant)
    }
}

/// All unordered index pairs in encounter order
fn pairs(k: usize) -> Vec<(usize, usize)> {
    (0..k)
        .flat_map(|i| ((i + 1)..k).map(move |j| (i, j)))
        .collect()
}

fn interpret(a: &str, b: &str, significant: bool, effect: &EffectSize) -> String {
    if significant {
        format!("{} and {} differ significantly ({})", a, b, effect.interpretation())
    } else {
        format!("No significant difference between {} and {}", a, b)
    }
}

/// Upper quantile of the studentized range, by bisection on its CDF
fn studentized_range_quantile(dist: &StudentizedRange, p: f64) -> f64 {
    let mut lo = 0.0;
    let mut hi = 1.0;
    while dist.cdf(hi) < p && hi < 1e3 {
        lo = hi;
        hi *= 2.0;
    }
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        if dist.cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Tukey's honestly significant difference test (Tukey-Kramer for unequal sizes)
pub fn tukey_hsd(samples: &[Sample], alpha: f64) -> Result<PostHocResult> {
    let k = samples.len();
    if k < 2 {
        return Err(Error::InsufficientData(
            "Tukey HSD needs at least two groups".into(),
        ));
    }
    if samples.iter().any(|s| s.len() < 2) {
        return Err(Error::InsufficientData(
            "Tukey HSD needs at least 2 observations per group".into(),
        ));
    }

    let n_total: usize = samples.iter().map(Sample::len).sum();
    let df_within = (n_total - k) as f64;
    let ss_within: f64 = samples
        .iter()
        .map(|s| variance(&s.values, 1) * (s.len() - 1) as f64)
        .sum();
    let ms_within = ss_within / df_within;
    if !(ms_within > 0.0) {
        return Err(Error::Computation(
            "Tukey HSD is undefined with zero within-group variance".into(),
        ));
    }

    let dist = StudentizedRange::new(k, df_within)?;
    let q_critical = studentized_range_quantile(&dist, 1.0 - alpha);
    let means: Vec<f64> = samples.iter().map(|s| mean(&s.values)).collect();

    let comparisons = pairs(k)
        .into_iter()
        .map(|(i, j)| {
            let (a, b) = (&samples[i], &samples[j]);
            let difference = means[i] - means[j];
            let se = (ms_within / 2.0 * (1.0 / a.len() as f64 + 1.0 / b.len() as f64)).sqrt();
            let q = difference.abs() / se;
            let p_value = dist.sf(q);
            let margin = q_critical * se;
            let significant = p_value < alpha;
            let effect_size = EffectSize::CohensD(cohens_d_pooled(&a.values, &b.values));
            PostHocComparison {
                group_a: a.label.clone(),
                group_b: b.label.clone(),
                difference,
                statistic: q,
                p_value,
                confidence_interval: Some((difference - margin, difference + margin)),
                significant,
                interpretation: interpret(&a.label, &b.label, significant, &effect_size),
                effect_size,
            }
        })
        .collect();

    Ok(PostHocResult {
        method: PostHocMethod::TukeyHsd,
        alpha,
        adjusted_alpha: alpha,
        comparisons,
    })
}

/// Pairwise Mann-Whitney U tests with a Bonferroni-adjusted alpha.
///
/// A pair whose test cannot be computed (all values tied) is reported with
/// p = 1 and r = 0.
pub fn pairwise_mann_whitney(
    samples: &[Sample],
    alpha: f64,
    method: MannWhitneyMethod,
) -> Result<PostHocResult> {
    let k = samples.len();
    if k < 2 {
        return Err(Error::InsufficientData(
            "Pairwise comparisons need at least two groups".into(),
        ));
    }
    let index_pairs = pairs(k);
    let adjusted_alpha = alpha / index_pairs.len() as f64;

    let mut comparisons = Vec::with_capacity(index_pairs.len());
    for (i, j) in index_pairs {
        let (a, b) = (&samples[i], &samples[j]);
        let (difference, statistic, p_value) = match mann_whitney_u(&a.values, &b.values, method) {
            Ok(result) => {
                let rank_a = result.info("mean_rank1").unwrap_or(f64::NAN);
                let rank_b = result.info("mean_rank2").unwrap_or(f64::NAN);
                (rank_a - rank_b, result.statistic, result.p_value)
            }
            Err(Error::Computation(msg)) => {
                log::debug!("Pair {} vs {} not testable: {}", a.label, b.label, msg);
                (0.0, f64::NAN, 1.0)
            }
            Err(e) => return Err(e),
        };
        let significant = p_value < adjusted_alpha;
        let effect_size = EffectSize::RankBiserialR(rank_biserial_from_p(p_value, a.len() + b.len()));
        comparisons.push(PostHocComparison {
            group_a: a.label.clone(),
            group_b: b.label.clone(),
            difference,
            statistic,
            p_value,
            confidence_interval: None,
            significant,
            interpretation: interpret(&a.label, &b.label, significant, &effect_size),
            effect_size,
        });
    }

    Ok(PostHocResult {
        method: PostHocMethod::PairwiseMannWhitney,
        alpha,
        adjusted_alpha,
        comparisons,
    })
}
