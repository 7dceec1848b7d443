use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use survey_stats::stats::distributions::{Distribution as _, StandardNormal};
use survey_stats::stats::effect_size::{EffectMagnitude, EffectSize};
use survey_stats::stats::normality::check_normality;
use survey_stats::stats::posthoc::PostHocMethod;
use survey_stats::stats::selector::Strategy;
use survey_stats::{select_test, DataFrame, Error, SelectorOptions, TestOutcome};

fn two_group_frame(a: &[f64], b: &[f64]) -> DataFrame {
    let labels: Vec<&str> = std::iter::repeat("A")
        .take(a.len())
        .chain(std::iter::repeat("B").take(b.len()))
        .collect();
    let values: Vec<f64> = a.iter().chain(b.iter()).copied().collect();

    let mut df = DataFrame::new();
    df.add_string_column("GRUPO", &labels).unwrap();
    df.add_numeric_column("PUNTAJE", values).unwrap();
    df
}

fn groups_frame(groups: &[(&str, &[f64])]) -> DataFrame {
    let mut labels = Vec::new();
    let mut values = Vec::new();
    for (label, data) in groups {
        for v in *data {
            labels.push(*label);
            values.push(*v);
        }
    }
    let mut df = DataFrame::new();
    df.add_string_column("GRUPO", &labels).unwrap();
    df.add_numeric_column("PUNTAJE", values).unwrap();
    df
}

fn draw(rng: &mut StdRng, dist: &Normal<f64>, n: usize) -> Vec<f64> {
    (0..n).map(|_| dist.sample(rng)).collect()
}

/// Blom normal scores: an ideally normal sample of size `n`
fn normal_scores(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| StandardNormal.inverse_cdf((i as f64 + 0.625) / (n as f64 + 0.25)))
        .collect()
}

/// Right-skewed (log-normal) sample shifted by `shift`
fn skewed(n: usize, shift: f64) -> Vec<f64> {
    normal_scores(n).into_iter().map(|z| z.exp() + shift).collect()
}

#[test]
fn test_same_distribution_false_positive_rate() {
    let mut rng = StdRng::seed_from_u64(20250519);
    let dist = Normal::new(3.5, 1.0).unwrap();
    let options = SelectorOptions::default();
    let trials = 400;

    let mut not_rejected = 0;
    for _ in 0..trials {
        let a = draw(&mut rng, &dist, 30);
        let b = draw(&mut rng, &dist, 30);
        let result = select_test(&two_group_frame(&a, &b), "GRUPO", "PUNTAJE", &options).unwrap();

        // normal groups always take a t-test route
        if result.normality.all_normal {
            assert!(matches!(
                result.chosen(),
                Some(Strategy::StudentT) | Some(Strategy::WelchT)
            ));
        }
        let outcome = result.outcome.as_ref().unwrap();
        if outcome.p_value() > options.alpha {
            not_rejected += 1;
        }
    }

    // nominal 95%, with three standard errors of slack for 400 trials
    let rate = not_rejected as f64 / trials as f64;
    assert!(rate >= 0.92, "only {:.3} of trials kept the null", rate);
}

#[test]
fn test_large_shift_is_significant_and_large() {
    let mut rng = StdRng::seed_from_u64(7);
    let a = draw(&mut rng, &Normal::new(0.0, 1.0).unwrap(), 30);
    let b = draw(&mut rng, &Normal::new(2.0, 1.0).unwrap(), 30);

    let result = select_test(
        &two_group_frame(&a, &b),
        "GRUPO",
        "PUNTAJE",
        &SelectorOptions::default(),
    )
    .unwrap();
    let outcome = result.outcome.as_ref().unwrap();

    assert!(outcome.significant());
    assert_eq!(outcome.effect_size().magnitude(), EffectMagnitude::Large);
    let power = outcome.power_analysis().unwrap();
    assert!(power.power > 0.8);
}

#[test]
fn test_posthoc_only_after_significant_omnibus() {
    let same = groups_frame(&[
        ("A", &[1.0, 2.0, 3.0, 4.0, 5.0]),
        ("B", &[2.0, 3.0, 4.0, 5.0, 1.0]),
        ("C", &[3.0, 1.0, 2.0, 5.0, 4.0]),
    ]);
    let result = select_test(&same, "GRUPO", "PUNTAJE", &SelectorOptions::default()).unwrap();
    let outcome = result.outcome.as_ref().unwrap();
    assert!(!outcome.significant());
    assert!(outcome.posthoc().is_none());

    let shifted = groups_frame(&[
        ("A", &[24.5, 23.5, 26.4, 27.1, 29.9]),
        ("B", &[28.4, 34.2, 29.5, 32.2, 30.1]),
        ("C", &[26.1, 28.3, 24.3, 26.2, 27.8]),
    ]);
    let result = select_test(&shifted, "GRUPO", "PUNTAJE", &SelectorOptions::default()).unwrap();
    let outcome = result.outcome.as_ref().unwrap();
    assert!(outcome.significant());
    let posthoc = outcome.posthoc().unwrap();
    let pairs: Vec<(&str, &str)> = posthoc
        .comparisons
        .iter()
        .map(|c| (c.group_a.as_str(), c.group_b.as_str()))
        .collect();
    assert_eq!(pairs, vec![("A", "B"), ("A", "C"), ("B", "C")]);
}

#[test]
fn test_two_groups_never_get_posthoc() {
    let mut rng = StdRng::seed_from_u64(11);
    let a = draw(&mut rng, &Normal::new(0.0, 1.0).unwrap(), 25);
    let b = draw(&mut rng, &Normal::new(3.0, 1.0).unwrap(), 25);
    let result = select_test(
        &two_group_frame(&a, &b),
        "GRUPO",
        "PUNTAJE",
        &SelectorOptions::default(),
    )
    .unwrap();
    let outcome = result.outcome.as_ref().unwrap();
    assert!(outcome.significant());
    assert!(outcome.posthoc().is_none());
}

#[test]
fn test_missing_values_are_excluded() {
    let mut a = vec![3.1, 4.2, 2.8, 3.9, 4.4, 3.3, 2.9, 4.0, 3.6, 3.8];
    a.extend([f64::NAN, f64::NAN, f64::NAN]);
    let b = [2.5, 3.0, 2.2, 3.1, 2.8, 2.6, 3.3, 2.9, 2.4, 3.0, 2.7, 2.8];

    let result = select_test(
        &two_group_frame(&a, &b),
        "GRUPO",
        "PUNTAJE",
        &SelectorOptions::default(),
    )
    .unwrap();

    assert_eq!(result.group_sizes[0], ("A".to_string(), 10));
    assert_eq!(result.normality.groups[0].1.n, 10);
    assert_eq!(result.descriptives[0].count, 10);
    assert!(result.outcome.as_ref().unwrap().p_value().is_finite());
}

#[test]
fn test_selection_is_repeatable() {
    let mut rng = StdRng::seed_from_u64(3);
    let a = draw(&mut rng, &Normal::new(3.0, 1.0).unwrap(), 15);
    let b: Vec<f64> = draw(&mut rng, &Normal::new(3.5, 1.0).unwrap(), 15)
        .into_iter()
        .map(|v: f64| v.exp())
        .collect();
    let c = [1.0, 2.0, 2.0, 3.0, 9.0, 4.0];
    let df = groups_frame(&[("A", a.as_slice()), ("B", b.as_slice()), ("C", c.as_slice())]);

    let options = SelectorOptions::default();
    let first = select_test(&df, "GRUPO", "PUNTAJE", &options).unwrap();
    let second = select_test(&df, "GRUPO", "PUNTAJE", &options).unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_two_observations_do_not_break_normality() {
    let result = check_normality(&[4.0, 5.0], 0.05);
    assert!(!result.is_normal);
    assert!(result.interpretation.contains("Insufficient observations"));
    assert!(result.p_value.is_none());
}

#[test]
fn test_degenerate_groups_report_instead_of_failing() {
    let df = two_group_frame(&[4.0, 4.0, 4.0, 4.0], &[4.0, 4.0, 4.0]);
    let result = select_test(&df, "GRUPO", "PUNTAJE", &SelectorOptions::default()).unwrap();
    assert!(result.outcome.is_none());
    assert!(!result.warnings.is_empty());
    assert_eq!(result.descriptives.len(), 2);
}

#[test]
fn test_unknown_column_is_surfaced() {
    let df = two_group_frame(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0]);
    let err = select_test(&df, "SEGMENTO", "PUNTAJE", &SelectorOptions::default()).unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound(_)));
}

#[test]
fn test_normal_groups_with_unequal_spread_use_welch() {
    let a: Vec<f64> = normal_scores(30).iter().map(|z| 3.5 + 0.3 * z).collect();
    let b: Vec<f64> = normal_scores(30).iter().map(|z| 3.0 + 2.0 * z).collect();

    let result = select_test(
        &two_group_frame(&a, &b),
        "GRUPO",
        "PUNTAJE",
        &SelectorOptions::default(),
    )
    .unwrap();

    assert!(result.normality.all_normal);
    assert!(!result.variance_homogeneity.variances_homogeneous);
    assert_eq!(result.chosen(), Some(Strategy::WelchT));
    let outcome = result.outcome.as_ref().unwrap();
    assert!(matches!(outcome.effect_size(), EffectSize::CohensD(_)));
    assert!(outcome.power_analysis().is_some());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_skewed_groups_use_mann_whitney() {
    let a = skewed(30, 0.0);
    let b = skewed(30, 1.0);

    let result = select_test(
        &two_group_frame(&a, &b),
        "GRUPO",
        "PUNTAJE",
        &SelectorOptions::default(),
    )
    .unwrap();

    assert!(!result.normality.all_normal);
    assert_eq!(result.chosen(), Some(Strategy::MannWhitney));
    let outcome = result.outcome.as_ref().unwrap();
    assert!(matches!(outcome.effect_size(), EffectSize::RankBiserialR(_)));
    let power = outcome.power_analysis().unwrap();
    assert!(power.power > 0.0 && power.power <= 1.0);
    match outcome {
        TestOutcome::MannWhitney(o) => assert!(!o.exact),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_skewed_shifted_groups_use_kruskal_wallis_with_pairwise_posthoc() {
    let df = groups_frame(&[
        ("A", skewed(30, 0.0).as_slice()),
        ("B", skewed(30, 1.5).as_slice()),
        ("C", skewed(30, 3.0).as_slice()),
    ]);
    let options = SelectorOptions::default();
    let result = select_test(&df, "GRUPO", "PUNTAJE", &options).unwrap();

    assert_eq!(result.chosen(), Some(Strategy::KruskalWallis));
    let outcome = result.outcome.as_ref().unwrap();
    assert!(outcome.significant());
    assert!(matches!(outcome.effect_size(), EffectSize::EtaSquared(_)));
    match outcome {
        TestOutcome::KruskalWallis(o) => assert!(o.effect_is_approximate),
        other => panic!("unexpected outcome {:?}", other),
    }

    let posthoc = outcome.posthoc().unwrap();
    assert_eq!(posthoc.method, PostHocMethod::PairwiseMannWhitney);
    assert!((posthoc.adjusted_alpha - options.alpha / 3.0).abs() < 1e-15);
    assert_eq!(posthoc.comparisons.len(), 3);
    for pair in &posthoc.comparisons {
        assert_eq!(pair.significant, pair.p_value < posthoc.adjusted_alpha);
        assert!(matches!(pair.effect_size, EffectSize::RankBiserialR(_)));
    }
    let extreme = posthoc
        .comparisons
        .iter()
        .find(|c| c.group_a == "A" && c.group_b == "C")
        .unwrap();
    assert!(extreme.significant);
}
