//! Statistics for survey group comparisons
//!
//! Leaf checkers (normality, variance homogeneity, categorical independence),
//! the parametric and rank-based tests, effect sizes, power and post-hoc
//! comparisons, and the [`selector`] that orchestrates them.

pub mod categorical;
pub mod descriptive;
pub mod distributions;
pub mod effect_size;
pub mod hypothesis;
pub mod nonparametric;
pub mod normality;
pub mod posthoc;
pub mod power;
pub mod sample;
pub mod selector;
pub mod variance;

pub use categorical::{check_independence, ContingencyResult, ContingencyTable, IndependenceTest};
pub use effect_size::{EffectMagnitude, EffectSize};
pub use normality::{check_normality, check_normality_by_group, GroupNormality, NormalityResult};
pub use posthoc::{PostHocComparison, PostHocMethod, PostHocResult};
pub use power::{PowerAnalysisResult, PowerTier};
pub use sample::{GroupComparison, Sample};
pub use selector::{
    run_selection, select_test, select_test_for_groups, SelectionResult, SelectorOptions,
    Strategy, TestOutcome,
};
pub use variance::{check_variance_homogeneity, VarianceHomogeneityResult};
