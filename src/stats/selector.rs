//! Statistical test selection
//!
//! Given a [`GroupComparison`], checks normality of every group and
//! homogeneity of variances, chooses the comparison test, runs it with an
//! ordered list of fallback strategies, then adds effect size, power and
//! (for a significant omnibus test over more than two groups) post-hoc
//! comparisons.
//!
//! | groups | all normal | homogeneous | strategies tried, in order |
//! |--------|------------|-------------|----------------------------|
//! | 2      | yes        | yes         | Student's t                |
//! | 2      | yes        | no          | Welch's t                  |
//! | 2      | no         | -           | Mann-Whitney U, Welch's t  |
//! | > 2    | yes        | yes         | ANOVA, Kruskal-Wallis      |
//! | > 2    | otherwise  |             | Kruskal-Wallis, ANOVA      |

use std::fmt;

use serde::Serialize;

use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::stats::descriptive::{summarize, GroupSummary};
use crate::stats::effect_size::EffectSize;
use crate::stats::hypothesis::{independent_ttest, one_way_anova, AlternativeHypothesis, TestResult};
use crate::stats::nonparametric::{
    kruskal_wallis, mann_whitney_u, MannWhitneyMethod, DEFAULT_EXACT_THRESHOLD,
};
use crate::stats::normality::{check_normality_by_group, GroupNormality};
use crate::stats::posthoc::{pairwise_mann_whitney, tukey_hsd, PostHocResult};
use crate::stats::power::{analyze_anova, analyze_two_sample, PowerAnalysisResult, DEFAULT_TARGET_POWER};
use crate::stats::sample::GroupComparison;
use crate::stats::variance::{check_variance_homogeneity, VarianceHomogeneityResult};

/// Largest rank-biserial r used when converting to Cohen's d for power
const MAX_R_FOR_POWER: f64 = 0.999;

/// Parameters of a selection run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectorOptions {
    pub alpha: f64,
    /// Mann-Whitney uses the exact distribution when either group is smaller
    pub exact_threshold: usize,
    pub target_power: f64,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        SelectorOptions {
            alpha: 0.05,
            exact_threshold: DEFAULT_EXACT_THRESHOLD,
            target_power: DEFAULT_TARGET_POWER,
        }
    }
}

impl SelectorOptions {
    pub fn with_alpha(alpha: f64) -> Self {
        SelectorOptions {
            alpha,
            ..Default::default()
        }
    }

    fn mann_whitney_method(&self) -> MannWhitneyMethod {
        MannWhitneyMethod::Auto {
            exact_threshold: self.exact_threshold,
        }
    }
}

/// Fields shared by every test outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeBase {
    pub test_name: String,
    pub statistic: f64,
    pub p_value: f64,
    pub effect_size: EffectSize,
    pub effect_interpretation: String,
    pub significant: bool,
}

impl OutcomeBase {
    fn from_result(result: &TestResult, effect_size: EffectSize, alpha: f64) -> Self {
        OutcomeBase {
            test_name: result.test_name.clone(),
            statistic: result.statistic,
            p_value: result.p_value,
            effect_interpretation: effect_size.interpretation(),
            effect_size,
            significant: result.p_value < alpha,
        }
    }
}

/// Student's or Welch's t-test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TTestOutcome {
    #[serde(flatten)]
    pub base: OutcomeBase,
    pub degrees_of_freedom: f64,
    pub mean_difference: f64,
    pub confidence_interval: Option<(f64, f64)>,
    pub power_analysis: Option<PowerAnalysisResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MannWhitneyOutcome {
    #[serde(flatten)]
    pub base: OutcomeBase,
    pub u1: f64,
    pub u2: f64,
    pub exact: bool,
    pub power_analysis: Option<PowerAnalysisResult>,
}

/// ANOVA or Kruskal-Wallis over more than one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmnibusOutcome {
    #[serde(flatten)]
    pub base: OutcomeBase,
    pub degrees_of_freedom: f64,
    /// Within-group degrees of freedom of the F-test
    pub degrees_of_freedom_within: Option<f64>,
    /// The Kruskal-Wallis eta-squared is a floored approximation
    pub effect_is_approximate: bool,
    pub power_analysis: Option<PowerAnalysisResult>,
    pub posthoc: Option<PostHocResult>,
}

/// The test that was run and everything it produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum TestOutcome {
    StudentT(TTestOutcome),
    WelchT(TTestOutcome),
    MannWhitney(MannWhitneyOutcome),
    Anova(OmnibusOutcome),
    KruskalWallis(OmnibusOutcome),
}

impl TestOutcome {
    pub fn base(&self) -> &OutcomeBase {
        match self {
            TestOutcome::StudentT(o) | TestOutcome::WelchT(o) => &o.base,
            TestOutcome::MannWhitney(o) => &o.base,
            TestOutcome::Anova(o) | TestOutcome::KruskalWallis(o) => &o.base,
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            TestOutcome::StudentT(_) => Strategy::StudentT,
            TestOutcome::WelchT(_) => Strategy::WelchT,
            TestOutcome::MannWhitney(_) => Strategy::MannWhitney,
            TestOutcome::Anova(_) => Strategy::Anova,
            TestOutcome::KruskalWallis(_) => Strategy::KruskalWallis,
        }
    }

    pub fn test_name(&self) -> &str {
        &self.base().test_name
    }

    pub fn statistic(&self) -> f64 {
        self.base().statistic
    }

    pub fn p_value(&self) -> f64 {
        self.base().p_value
    }

    pub fn significant(&self) -> bool {
        self.base().significant
    }

    pub fn effect_size(&self) -> &EffectSize {
        &self.base().effect_size
    }

    pub fn power_analysis(&self) -> Option<&PowerAnalysisResult> {
        match self {
            TestOutcome::StudentT(o) | TestOutcome::WelchT(o) => o.power_analysis.as_ref(),
            TestOutcome::MannWhitney(o) => o.power_analysis.as_ref(),
            TestOutcome::Anova(o) | TestOutcome::KruskalWallis(o) => o.power_analysis.as_ref(),
        }
    }

    /// Post-hoc comparisons, present only for a significant omnibus test
    pub fn posthoc(&self) -> Option<&PostHocResult> {
        match self {
            TestOutcome::Anova(o) | TestOutcome::KruskalWallis(o) => o.posthoc.as_ref(),
            _ => None,
        }
    }

    fn set_power(&mut self, power: Option<PowerAnalysisResult>) {
        match self {
            TestOutcome::StudentT(o) | TestOutcome::WelchT(o) => o.power_analysis = power,
            TestOutcome::MannWhitney(o) => o.power_analysis = power,
            TestOutcome::Anova(o) | TestOutcome::KruskalWallis(o) => o.power_analysis = power,
        }
    }
}

/// A comparison test the selector can attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    StudentT,
    WelchT,
    MannWhitney,
    Anova,
    KruskalWallis,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::StudentT => "Student's t-test",
            Strategy::WelchT => "Welch's t-test",
            Strategy::MannWhitney => "Mann-Whitney U test",
            Strategy::Anova => "one-way ANOVA",
            Strategy::KruskalWallis => "Kruskal-Wallis H test",
        })
    }
}

impl Strategy {
    /// Ordered strategies for a comparison given the assumption checks
    pub fn plan(groups: usize, all_normal: bool, homogeneous: bool) -> Vec<Strategy> {
        match (groups, all_normal, homogeneous) {
            (2, true, true) => vec![Strategy::StudentT],
            (2, true, false) => vec![Strategy::WelchT],
            (2, false, _) => vec![Strategy::MannWhitney, Strategy::WelchT],
            (_, true, true) => vec![Strategy::Anova, Strategy::KruskalWallis],
            _ => vec![Strategy::KruskalWallis, Strategy::Anova],
        }
    }

    /// Run the bare test. Effect size and significance are filled in, power
    /// and post-hoc are not.
    pub fn run(&self, comparison: &GroupComparison, options: &SelectorOptions) -> Result<TestOutcome> {
        let alpha = options.alpha;
        match self {
            Strategy::StudentT | Strategy::WelchT => {
                let (g1, g2) = two_groups(comparison)?;
                let equal_variances = *self == Strategy::StudentT;
                let result = independent_ttest(g1, g2, AlternativeHypothesis::TwoSided, equal_variances)?;
                let effect = result
                    .effect_size
                    .ok_or_else(|| Error::Computation("t-test returned no effect size".into()))?;
                let outcome = TTestOutcome {
                    base: OutcomeBase::from_result(&result, effect, alpha),
                    degrees_of_freedom: result.degrees_of_freedom.unwrap_or(f64::NAN),
                    mean_difference: result.info("mean1").unwrap_or(f64::NAN)
                        - result.info("mean2").unwrap_or(f64::NAN),
                    confidence_interval: result.confidence_interval,
                    power_analysis: None,
                };
                Ok(if equal_variances {
                    TestOutcome::StudentT(outcome)
                } else {
                    TestOutcome::WelchT(outcome)
                })
            }
            Strategy::MannWhitney => {
                let (g1, g2) = two_groups(comparison)?;
                let result = mann_whitney_u(g1, g2, options.mann_whitney_method())?;
                let effect = result
                    .effect_size
                    .ok_or_else(|| Error::Computation("Mann-Whitney returned no effect size".into()))?;
                Ok(TestOutcome::MannWhitney(MannWhitneyOutcome {
                    base: OutcomeBase::from_result(&result, effect, alpha),
                    u1: result.info("u1").unwrap_or(f64::NAN),
                    u2: result.info("u2").unwrap_or(f64::NAN),
                    exact: result.info("exact") == Some(1.0),
                    power_analysis: None,
                }))
            }
            Strategy::Anova | Strategy::KruskalWallis => {
                let slices = comparison.value_slices();
                let result = if *self == Strategy::Anova {
                    one_way_anova(&slices)?
                } else {
                    kruskal_wallis(&slices)?
                };
                let effect = result
                    .effect_size
                    .ok_or_else(|| Error::Computation("omnibus test returned no effect size".into()))?;
                let outcome = OmnibusOutcome {
                    base: OutcomeBase::from_result(&result, effect, alpha),
                    degrees_of_freedom: result.degrees_of_freedom.unwrap_or(f64::NAN),
                    degrees_of_freedom_within: result.info("df_within"),
                    effect_is_approximate: *self == Strategy::KruskalWallis,
                    power_analysis: None,
                    posthoc: None,
                };
                Ok(if *self == Strategy::Anova {
                    TestOutcome::Anova(outcome)
                } else {
                    TestOutcome::KruskalWallis(outcome)
                })
            }
        }
    }
}

fn two_groups(comparison: &GroupComparison) -> Result<(&[f64], &[f64])> {
    match comparison.samples.as_slice() {
        [a, b] => Ok((&a.values, &b.values)),
        other => Err(Error::InsufficientData(format!(
            "A two-group test needs exactly 2 groups, found {}",
            other.len()
        ))),
    }
}

/// One attempted strategy and why it failed, if it did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: Strategy,
    pub succeeded: bool,
    pub failure: Option<String>,
}

/// Full output of the selector for one grouping/target pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    pub grouping: String,
    pub target: String,
    pub alpha: f64,
    pub group_sizes: Vec<(String, usize)>,
    pub descriptives: Vec<GroupSummary>,
    pub normality: GroupNormality,
    pub variance_homogeneity: VarianceHomogeneityResult,
    /// Absent when every strategy failed
    pub outcome: Option<TestOutcome>,
    pub attempts: Vec<StrategyAttempt>,
    pub warnings: Vec<String>,
}

impl SelectionResult {
    pub fn significant(&self) -> bool {
        self.outcome.as_ref().map_or(false, TestOutcome::significant)
    }

    /// Strategy that produced the outcome
    pub fn chosen(&self) -> Option<Strategy> {
        self.outcome.as_ref().map(TestOutcome::strategy)
    }
}

/// Select and run the comparison test for every group of `group_col`
pub fn select_test(
    df: &DataFrame,
    group_col: &str,
    target_col: &str,
    options: &SelectorOptions,
) -> Result<SelectionResult> {
    let comparison = GroupComparison::from_frame(df, group_col, target_col)?;
    run_selection(&comparison, options)
}

/// Select and run the comparison test restricted to the listed groups
pub fn select_test_for_groups(
    df: &DataFrame,
    group_col: &str,
    target_col: &str,
    groups: &[&str],
    options: &SelectorOptions,
) -> Result<SelectionResult> {
    let comparison = GroupComparison::from_frame_groups(df, group_col, target_col, groups)?;
    run_selection(&comparison, options)
}

/// Run the selector on a prepared comparison.
///
/// Only an empty comparison is an error. Any numerical failure is absorbed
/// by the fallback strategies and reported through `warnings`.
pub fn run_selection(comparison: &GroupComparison, options: &SelectorOptions) -> Result<SelectionResult> {
    if comparison.total_n() == 0 {
        return Err(Error::EmptyData(format!(
            "No valid observations of '{}' grouped by '{}'",
            comparison.target, comparison.grouping
        )));
    }

    let alpha = options.alpha;
    let normality = check_normality_by_group(comparison, alpha);
    let variance_homogeneity = check_variance_homogeneity(comparison, alpha);
    let descriptives = comparison
        .samples
        .iter()
        .filter_map(|s| summarize(&s.label, &s.values).ok())
        .collect();

    let mut result = SelectionResult {
        grouping: comparison.grouping.clone(),
        target: comparison.target.clone(),
        alpha,
        group_sizes: comparison
            .samples
            .iter()
            .map(|s| (s.label.clone(), s.len()))
            .collect(),
        descriptives,
        normality,
        variance_homogeneity,
        outcome: None,
        attempts: Vec::new(),
        warnings: Vec::new(),
    };

    let groups = comparison.group_count();
    if groups < 2 {
        let warning = format!(
            "At least two groups with valid observations are required, found {}",
            groups
        );
        log::warn!("{} by {}: {}", comparison.target, comparison.grouping, warning);
        result.warnings.push(warning);
        return Ok(result);
    }

    let plan = Strategy::plan(
        groups,
        result.normality.all_normal,
        result.variance_homogeneity.variances_homogeneous,
    );
    log::info!(
        "{} by {} ({} groups): trying {}",
        comparison.target,
        comparison.grouping,
        groups,
        plan.iter().map(Strategy::to_string).collect::<Vec<_>>().join(", then ")
    );

    let (outcome, attempts) = attempt_plan(&plan, comparison, options);
    result.attempts = attempts;

    let outcome = match outcome {
        Some(outcome) => outcome,
        None => {
            result.warnings.push(format!(
                "No test could be computed ({}); only descriptive statistics are reported",
                plan.iter().map(Strategy::to_string).collect::<Vec<_>>().join(", ")
            ));
            return Ok(result);
        }
    };

    if let Some(warning) = substitution_warning(&plan, &outcome) {
        log::warn!("{} by {}: {}", comparison.target, comparison.grouping, warning);
        result.warnings.push(warning);
    }

    let outcome = complete_outcome(outcome, comparison, options, &mut result.warnings);
    log::info!(
        "{} by {}: {} p = {:.4} ({})",
        comparison.target,
        comparison.grouping,
        outcome.test_name(),
        outcome.p_value(),
        if outcome.significant() { "significant" } else { "not significant" }
    );
    result.outcome = Some(outcome);
    Ok(result)
}

/// Try each strategy in order, stopping at the first that succeeds
fn attempt_plan(
    plan: &[Strategy],
    comparison: &GroupComparison,
    options: &SelectorOptions,
) -> (Option<TestOutcome>, Vec<StrategyAttempt>) {
    let mut attempts = Vec::with_capacity(plan.len());
    for strategy in plan {
        match strategy.run(comparison, options) {
            Ok(outcome) => {
                attempts.push(StrategyAttempt {
                    strategy: *strategy,
                    succeeded: true,
                    failure: None,
                });
                return (Some(outcome), attempts);
            }
            Err(e) => {
                log::warn!("{} failed for {}: {}", strategy, comparison.target, e);
                attempts.push(StrategyAttempt {
                    strategy: *strategy,
                    succeeded: false,
                    failure: Some(e.to_string()),
                });
            }
        }
    }
    (None, attempts)
}

/// Warning recorded when the outcome came from a fallback strategy
fn substitution_warning(plan: &[Strategy], outcome: &TestOutcome) -> Option<String> {
    let first = plan.first()?;
    (*first != outcome.strategy()).then(|| {
        format!(
            "{} could not be computed; {} was used instead",
            first,
            outcome.strategy()
        )
    })
}

/// Attach power analysis and post-hoc comparisons
fn complete_outcome(
    mut outcome: TestOutcome,
    comparison: &GroupComparison,
    options: &SelectorOptions,
    warnings: &mut Vec<String>,
) -> TestOutcome {
    let sizes: Vec<usize> = comparison.samples.iter().map(|s| s.len()).collect();

    let power = match &outcome {
        TestOutcome::StudentT(o) | TestOutcome::WelchT(o) => analyze_two_sample(
            o.base.effect_size.value(),
            sizes[0],
            sizes[1],
            options.alpha,
            options.target_power,
        ),
        TestOutcome::MannWhitney(o) => analyze_two_sample(
            r_to_d(o.base.effect_size.value()),
            sizes[0],
            sizes[1],
            options.alpha,
            options.target_power,
        ),
        TestOutcome::Anova(o) | TestOutcome::KruskalWallis(o) => {
            analyze_anova(o.base.effect_size.value(), &sizes, options.alpha, options.target_power)
        }
    };
    match power {
        Ok(power) => outcome.set_power(Some(power)),
        Err(e) => warnings.push(format!("Power analysis not available: {}", e)),
    }

    if comparison.group_count() > 2 && outcome.significant() {
        let posthoc = match &outcome {
            TestOutcome::Anova(_) => Some(tukey_hsd(&comparison.samples, options.alpha)),
            TestOutcome::KruskalWallis(_) => Some(pairwise_mann_whitney(
                &comparison.samples,
                options.alpha,
                options.mann_whitney_method(),
            )),
            _ => None,
        };
        match posthoc {
            Some(Ok(posthoc)) => {
                if let TestOutcome::Anova(o) | TestOutcome::KruskalWallis(o) = &mut outcome {
                    o.posthoc = Some(posthoc);
                }
            }
            Some(Err(e)) => warnings.push(format!("Post-hoc comparisons not available: {}", e)),
            None => {}
        }
    }

    outcome
}

/// Cohen's d equivalent of a correlation-type effect size r
fn r_to_d(r: f64) -> f64 {
    let r = r.abs().min(MAX_R_FOR_POWER);
    2.0 * r / (1.0 - r * r).sqrt()
}
