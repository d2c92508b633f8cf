// End-to-end association scenarios on small statement excerpts.

use std::str::FromStr;

use anchorval_core::association::patterns::ISIN_PATTERN_STR;
use anchorval_core::{
    associate, shard_by_lines, AnchorScanner, AssociationOptions, ConfigError, ContextTag,
    DuplicateAnchor, LocaleNumericProfile, MapFallback, Resolution, ValueAssociator,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn run(text: &str) -> anchorval_core::AssociationReport {
    associate(
        text,
        ISIN_PATTERN_STR,
        &LocaleNumericProfile::swiss(),
        &AssociationOptions::default(),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Documented scenarios
// ---------------------------------------------------------------------------

#[test]
fn single_currency_tagged_candidate_is_selected() {
    let report = run("ISIN: CH1234567890  Alpha Fund  1'234'567.50 CHF");

    assert_eq!(report.results.len(), 1);
    let result = &report.results[0];
    assert_eq!(result.anchor.identifier, "CH1234567890");
    assert_eq!(result.selected_value, Some(dec("1234567.50")));
    assert_eq!(result.resolution, Resolution::Resolved);
    assert!(result.confidence > 0.8, "confidence {}", result.confidence);
    assert!(result.selected().unwrap().candidate.has_currency());
}

#[test]
fn no_plausible_candidate_leaves_anchor_unresolved() {
    let report = run("Ref 99 ISIN: XS0000000001 page 12 of 48 value pending");

    assert_eq!(report.results.len(), 1);
    let result = &report.results[0];
    assert_eq!(result.selected_value, None);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.resolution, Resolution::Unresolved);
    assert!(result.candidates_considered.is_empty());
    assert_eq!(report.diagnostics.unresolved, 1);
}

#[test]
fn duplicate_anchors_are_reported_and_kept() {
    let padding = "-".repeat(400);
    let text = format!(
        "ISIN XS0000000001 Countervalue 12'500.00 CHF\n{}\nISIN XS0000000001 Countervalue 8'250.00 CHF",
        padding
    );
    let report = run(&text);

    assert_eq!(report.results.len(), 2);
    let second = text.rfind("XS0000000001").unwrap();
    assert_eq!(
        report.duplicate_anchors,
        vec![DuplicateAnchor {
            identifier: "XS0000000001".to_string(),
            positions: vec![5, second],
        }]
    );
    assert_eq!(report.results[0].selected_value, Some(dec("12500.00")));
    assert_eq!(report.results[1].selected_value, Some(dec("8250.00")));
    assert_eq!(report.diagnostics.duplicate_identifiers, 1);
}

#[test]
fn keyword_and_currency_candidate_beats_bare_small_number() {
    let report = run("ISIN: CH0012032048 500 CHF ... Total Assets ... 1'800'000.00 CHF");
    assert_eq!(report.results[0].selected_value, Some(dec("1800000.00")));

    // With the lower bound relaxed the bare 500 competes, and still loses.
    let profile = LocaleNumericProfile::swiss().with_bounds(Decimal::ONE, dec("50000000"));
    let text = format!(
        "ISIN: CH0012032048 500 {}Total Assets 1'800'000.00 CHF",
        " ".repeat(70)
    );
    let report = associate(&text, ISIN_PATTERN_STR, &profile, &AssociationOptions::default())
        .unwrap();
    let result = &report.results[0];

    assert_eq!(result.candidates_considered.len(), 2);
    assert_eq!(result.candidates_considered[0].candidate.raw_text, "500");
    assert!(result.candidates_considered[0].candidate.context_tags.is_empty());
    assert_eq!(result.selected_value, Some(dec("1800000.00")));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn lone_strong_candidate_has_full_confidence() {
    let base = "ISIN: CH0012032048 Total 12'345.67 CHF";
    let report = run(base);
    assert_eq!(report.results[0].confidence, 1.0);

    let candidate = report.results[0].selected().unwrap();
    assert!(candidate
        .candidate
        .context_tags
        .contains(&ContextTag::NearKeyword("Total".to_string())));

    // A distant, round, keyword-less competitor does not lower it.
    let extended = format!("{}{}5'000'000", base, " ".repeat(200));
    let report = run(&extended);
    assert_eq!(report.results[0].candidates_considered.len(), 2);
    assert_eq!(report.results[0].selected_value, Some(dec("12345.67")));
    assert_eq!(report.results[0].confidence, 1.0);

    // Distance inside the window does not weaken a corroborated candidate.
    let near_edge = format!("ISIN: CH0012032048{}Total 12'345.67 CHF", " ".repeat(200));
    let report = run(&near_edge);
    assert_eq!(report.results[0].candidates_considered.len(), 1);
    assert_eq!(report.results[0].selected_value, Some(dec("12345.67")));
    assert_eq!(report.results[0].confidence, 1.0);
}

#[test]
fn plausibility_lower_bound_is_inclusive() {
    let below = run("ISIN: CH0012032048 value 999");
    assert_eq!(below.results[0].selected_value, None);

    let at = run("ISIN: CH0012032048 value 1'000");
    assert_eq!(at.results[0].selected_value, Some(Decimal::from(1_000)));
}

#[test]
fn association_is_deterministic() {
    let text = "Bonds\nUSD 200'000 NOTES XS2993414619 Countervalue 199'080.00 USD\n\
                USD 1'000'000 NOTES XS2530201644 Countervalue 1'004'990.00 USD\n";
    assert_eq!(run(text), run(text));
}

#[test]
fn sharded_scan_matches_single_pass() {
    let mut text = String::new();
    for i in 0..40 {
        text.push_str(&format!(
            "Position {} ISIN: XS2993414619 Market Value {}'{:03}.{:02} CHF\n",
            i,
            10 + i,
            i * 7,
            i
        ));
    }

    let associator = ValueAssociator::new(
        AnchorScanner::isin(),
        &LocaleNumericProfile::swiss(),
        &AssociationOptions::default(),
    )
    .unwrap();

    let whole = associator.associate(&text);
    let sharded = associator.associate_sharded(&text, &shard_by_lines(&text, 256));

    assert_eq!(whole.results.len(), 40);
    assert_eq!(sharded, whole);
}

#[test]
fn checksum_validation_filters_anchors() {
    let text = "XS0000000001 1'500.00 CHF\nUS0378331005 2'500.00 USD";
    let associator = ValueAssociator::new(
        AnchorScanner::isin().with_isin_validation(true),
        &LocaleNumericProfile::swiss(),
        &AssociationOptions::default(),
    )
    .unwrap();

    let report = associator.associate(text);
    let ids: Vec<&str> = report
        .results
        .iter()
        .map(|r| r.anchor.identifier.as_str())
        .collect();
    assert_eq!(ids, vec!["US0378331005"]);
}

#[test]
fn fallback_values_are_marked() {
    let associator = ValueAssociator::new(
        AnchorScanner::isin(),
        &LocaleNumericProfile::swiss(),
        &AssociationOptions::default(),
    )
    .unwrap()
    .with_fallback(MapFallback::new().with_value("XS0000000001", dec("42000"), 0.5));

    let report = associator.associate("Ref 99 ISIN: XS0000000001 page 12 of 48 value pending");
    let result = &report.results[0];

    assert_eq!(result.resolution, Resolution::Fallback);
    assert_eq!(result.selected_value, Some(dec("42000")));
    assert_eq!(result.confidence, 0.5);
    assert!(result.selected().is_none());
    assert_eq!(report.diagnostics.fallback, 1);
    assert_eq!(report.diagnostics.resolved, 0);
}

#[test]
fn other_locales() {
    let text = "DE0007164600 Kurswert 1.234.567,89 EUR";
    let report = associate(
        text,
        ISIN_PATTERN_STR,
        &LocaleNumericProfile::continental(),
        &AssociationOptions::default(),
    )
    .unwrap();
    assert_eq!(report.results[0].selected_value, Some(dec("1234567.89")));

    let text = "US0378331005 Market Value $2,345,678.90";
    let report = associate(
        text,
        ISIN_PATTERN_STR,
        &LocaleNumericProfile::us(),
        &AssociationOptions::default(),
    )
    .unwrap();
    assert_eq!(report.results[0].selected_value, Some(dec("2345678.90")));
}

#[test]
fn value_right_after_identifier() {
    let report = associate(
        "ISIN: FR0000120271 1 234 567,50 EUR",
        ISIN_PATTERN_STR,
        &LocaleNumericProfile::spaced(),
        &AssociationOptions::default(),
    )
    .unwrap();
    assert_eq!(report.results[0].candidates_considered.len(), 1);
    assert_eq!(report.results[0].selected_value, Some(dec("1234567.50")));

    // Flattened table cells.
    let report = associate(
        "XS2993414619,1,234,567.50,USD",
        ISIN_PATTERN_STR,
        &LocaleNumericProfile::us(),
        &AssociationOptions::default(),
    )
    .unwrap();
    assert_eq!(report.results[0].selected_value, Some(dec("1234567.50")));
    assert_eq!(report.results[0].resolution, Resolution::Resolved);
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[test]
fn malformed_configuration_fails_fast() {
    let same = LocaleNumericProfile {
        thousands_separator: Some(','),
        decimal_separator: ',',
        ..LocaleNumericProfile::us()
    };
    assert_eq!(
        associate("", ISIN_PATTERN_STR, &same, &AssociationOptions::default()),
        Err(ConfigError::SameSeparators(','))
    );

    assert!(matches!(
        associate(
            "",
            "[A-Z]*",
            &LocaleNumericProfile::swiss(),
            &AssociationOptions::default()
        ),
        Err(ConfigError::EmptyMatchingPattern(_))
    ));

    assert!(matches!(
        associate(
            "",
            "([A-Z",
            &LocaleNumericProfile::swiss(),
            &AssociationOptions::default()
        ),
        Err(ConfigError::InvalidPattern(_))
    ));

    assert!(matches!(
        associate(
            "",
            ISIN_PATTERN_STR,
            &LocaleNumericProfile::swiss(),
            &AssociationOptions::default().with_window_radius(0)
        ),
        Err(ConfigError::InvalidWindow { .. })
    ));

    assert!(matches!(
        associate(
            "",
            ISIN_PATTERN_STR,
            &LocaleNumericProfile::swiss(),
            &AssociationOptions::default().with_keywords(["Total", " "])
        ),
        Err(ConfigError::BlankEntry(_))
    ));
}
