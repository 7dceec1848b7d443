use survey_stats::stats::categorical::{fisher_exact, IndependenceTest};
use survey_stats::stats::effect_size::EffectMagnitude;
use survey_stats::{check_independence, ContingencyTable, DataFrame};

/// Frame whose crosstab of ZONA x SEGMENTO is `counts`
fn frame_from_counts(counts: &[(&str, &str, usize)]) -> DataFrame {
    let mut zona = Vec::new();
    let mut segmento = Vec::new();
    for (row, col, n) in counts {
        for _ in 0..*n {
            zona.push(*row);
            segmento.push(*col);
        }
    }
    let mut df = DataFrame::new();
    df.add_string_column("ZONA", &zona).unwrap();
    df.add_string_column("SEGMENTO", &segmento).unwrap();
    df
}

#[test]
fn test_small_2x2_switches_to_fisher() {
    let df = frame_from_counts(&[("N", "A", 2), ("N", "B", 1), ("S", "A", 1), ("S", "B", 3)]);
    let table = ContingencyTable::from_frame(&df, "ZONA", "SEGMENTO").unwrap();
    let result = check_independence(&table, 0.05).unwrap();

    assert_eq!(result.test_name, IndependenceTest::FisherExact);
    assert!(!result.expected_requirement_met);
    assert!(result.fisher_due_to_low_expected);
    assert!(!result.low_expected_caution);
    assert_eq!(result.odds_ratio, Some(6.0));
    assert!((result.p_value - 0.4857142857142857).abs() < 1e-9);
    assert!(result.independent);

    // V from the chi-square value matching the exact p-value
    assert!((result.cramers_v - 0.2635).abs() < 1e-3);
}

#[test]
fn test_sparse_3x3_keeps_chi_square_with_caution() {
    let df = frame_from_counts(&[
        ("N", "A", 3),
        ("N", "B", 1),
        ("N", "C", 1),
        ("S", "A", 1),
        ("S", "B", 3),
        ("S", "C", 1),
        ("E", "A", 1),
        ("E", "B", 1),
        ("E", "C", 3),
    ]);
    let table = ContingencyTable::from_frame(&df, "ZONA", "SEGMENTO").unwrap();
    let result = check_independence(&table, 0.05).unwrap();

    assert_eq!(result.test_name, IndependenceTest::ChiSquare);
    assert!(result.low_expected_caution);
    assert!(!result.fisher_due_to_low_expected);
    assert!(result.chi_square.is_some());
    assert!(result.odds_ratio.is_none());
    assert_eq!(result.degrees_of_freedom, 4.0);
}

#[test]
fn test_adequate_table_runs_plain_chi_square() {
    let df = frame_from_counts(&[("N", "A", 30), ("N", "B", 10), ("S", "A", 10), ("S", "B", 30)]);
    let table = ContingencyTable::from_frame(&df, "ZONA", "SEGMENTO").unwrap();
    let result = check_independence(&table, 0.05).unwrap();

    assert_eq!(result.test_name, IndependenceTest::ChiSquare);
    assert!(result.expected_requirement_met);
    assert!(!result.low_expected_caution);
    // Yates-corrected: 4 * 9.5^2 / 20
    assert!((result.chi_square.unwrap() - 18.05).abs() < 1e-9);
    assert!(!result.independent);
    assert!((result.cramers_v - (18.05f64 / 80.0).sqrt()).abs() < 1e-12);
    assert_eq!(result.effect_magnitude, EffectMagnitude::Moderate);
}

#[test]
fn test_row_percentages() {
    let df = frame_from_counts(&[("N", "A", 3), ("N", "B", 1), ("S", "B", 2)]);
    let table = ContingencyTable::from_frame(&df, "ZONA", "SEGMENTO").unwrap();
    let pct = table.row_percentages();
    assert_eq!(table.row_labels, vec!["N", "S"]);
    assert_eq!(pct[0], vec![75.0, 25.0]);
    assert_eq!(pct[1], vec![0.0, 100.0]);
}

#[test]
fn test_fisher_one_sided_table() {
    let (odds, p) = fisher_exact([[5, 0], [0, 5]]).unwrap();
    assert!(odds.is_infinite());
    // 2 / C(10, 5)
    assert!((p - 2.0 / 252.0).abs() < 1e-12);
}

#[test]
fn test_missing_column_is_an_error() {
    let df = frame_from_counts(&[("N", "A", 1)]);
    assert!(ContingencyTable::from_frame(&df, "ZONA", "CIUDAD").is_err());
}
