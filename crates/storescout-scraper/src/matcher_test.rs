use std::future::ready;

use storescout_core::{find_region, ProductIdentifier};

use super::*;

fn product(region: &str, name: &str, price_eur: f64, id: Option<&str>) -> ProductRecord {
    ProductRecord {
        index: 0,
        name: name.to_owned(),
        price_text: format!("{price_eur}"),
        raw_price: price_eur,
        price_in_reference_currency: price_eur,
        currency_symbol: "€".to_owned(),
        currency_code: "EUR".to_owned(),
        exchange_rate_used: 1.0,
        url: Some(format!("https://store.example.com/{region}/product/x")),
        image_url: None,
        region: region.to_owned(),
        product_id: id.map(|raw| ProductIdentifier::new(raw, region)),
        relevance_score: 0,
        enriched: false,
    }
}

fn regions(codes: &[&str]) -> Vec<&'static Region> {
    codes
        .iter()
        .map(|c| find_region(c).expect("configured region"))
        .collect()
}

const DOOM_BE: &str = "EP1003-CUSA02092_00-DOOMTHEGAME00000";
const DOOM_US: &str = "UP1003-CUSA02094_00-DOOMTHEGAME00000";

// -----------------------------------------------------------------------
// string similarity
// -----------------------------------------------------------------------

#[test]
fn levenshtein_known_distances() {
    assert_eq!(levenshtein("kitten", "sitting"), 3);
    assert_eq!(levenshtein("", "abc"), 3);
    assert_eq!(levenshtein("abc", ""), 3);
    assert_eq!(levenshtein("", ""), 0);
    assert_eq!(levenshtein("flaw", "lawn"), 2);
}

#[test]
fn similarity_is_symmetric_and_reflexive() {
    let pairs = [
        ("DOOM", "DOOM Eternal"),
        ("Gran Turismo 7", "Gran Turismo Sport"),
        ("", "x"),
        ("Wiedźmin 3", "Witcher 3"),
    ];
    for (a, b) in pairs {
        assert!((similarity(a, b) - similarity(b, a)).abs() < f64::EPSILON);
        assert!((similarity(a, a) - 1.0).abs() < f64::EPSILON);
    }
    assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
}

#[test]
fn similarity_ignores_case() {
    assert!((similarity("DOOM", "doom") - 1.0).abs() < f64::EPSILON);
    // 4 shared of 12 characters
    assert!((similarity("doom", "DOOM Eternal") - 4.0 / 12.0).abs() < 1e-12);
}

#[test]
fn identifier_similarity_is_exact_or_fuzzy() {
    assert!((identifier_similarity(DOOM_BE, DOOM_BE) - 1.0).abs() < f64::EPSILON);
    // two substituted characters out of 36
    let fuzzy = identifier_similarity(DOOM_BE, DOOM_US);
    assert!((fuzzy - 34.0 / 36.0).abs() < 1e-12);
}

// -----------------------------------------------------------------------
// price similarity
// -----------------------------------------------------------------------

#[test]
fn price_similarity_scales_with_relative_gap() {
    assert_eq!(price_similarity(20.0, 20.0), Some(1.0));
    assert!((price_similarity(10.0, 9.0).unwrap() - 0.8).abs() < 1e-12);
    assert_eq!(price_similarity(10.0, 5.0), Some(0.0));
    assert_eq!(price_similarity(10.0, 1.0), Some(0.0));
}

#[test]
fn price_similarity_handles_free_and_invalid_prices() {
    assert_eq!(price_similarity(0.0, 0.0), Some(1.0));
    assert_eq!(price_similarity(0.0, 10.0), Some(0.0));
    assert_eq!(price_similarity(f64::NAN, 10.0), None);
    assert_eq!(price_similarity(10.0, f64::INFINITY), None);
    assert_eq!(price_similarity(-1.0, 10.0), None);
}

// -----------------------------------------------------------------------
// composite
// -----------------------------------------------------------------------

#[test]
fn identical_payloads_score_one_and_bucket_exact() {
    let a = product("BE", "DOOM", 19.99, Some(DOOM_BE));
    let composite = composite_score(&a, &a.clone());
    assert!((composite.score - 1.0).abs() < f64::EPSILON);
    assert_eq!(ConfidenceBucket::from_score(composite.score), ConfidenceBucket::Exact);
}

#[test]
fn missing_identifier_is_excluded_not_penalized() {
    let a = product("BE", "DOOM", 19.99, None);
    let b = product("US", "DOOM", 19.99, Some(DOOM_US));
    let composite = composite_score(&a, &b);
    assert!(composite.identifier.is_none());
    assert!((composite.score - 1.0).abs() < f64::EPSILON);
}

#[test]
fn composite_weights_title_price_and_identifier() {
    let a = product("BE", "DOOM", 20.0, Some(DOOM_BE));
    let b = product("US", "DOOM", 18.0, Some(DOOM_US));
    let composite = composite_score(&a, &b);
    let expected = 0.4 * 1.0 + 0.3 * 0.8 + 0.3 * (34.0 / 36.0);
    assert!((composite.score - expected).abs() < 1e-9);
    assert_eq!(composite.price.map(|p| (p * 10.0).round()), Some(8.0));
}

// -----------------------------------------------------------------------
// CrossRegionMatcher
// -----------------------------------------------------------------------

#[tokio::test]
async fn buckets_candidates_and_records_failures() {
    let reference = product("BE", "DOOM", 19.99, Some(DOOM_BE));
    let matcher = CrossRegionMatcher::default();

    let report = matcher
        .match_product(&reference, &regions(&["BE", "US", "GB"]), |region| {
            ready(match region.code {
                "US" => Ok(vec![
                    product("US", "DOOM", 19.99, Some(DOOM_US)),
                    product("US", "DOOM Eternal", 39.99, None),
                ]),
                "GB" => Err(ScraperError::Timeout {
                    url: "https://store.example.com/en-gb/search/DOOM".to_owned(),
                }),
                other => panic!("unexpected region {other}"),
            })
        })
        .await;

    assert_eq!(report.status, MatchStatus::Matched);
    assert_eq!(report.exact.len(), 1);
    assert_eq!(report.exact[0].region, "US");
    assert!(report.likely.is_empty());
    assert!(report.potential.is_empty());
    assert_eq!(report.regions_checked, vec!["US".to_owned()]);
    assert_eq!(report.regions_failed.len(), 1);
    assert_eq!(report.regions_failed[0].region, "GB");
    assert_eq!(report.regions_failed[0].code, "timeout");
}

#[tokio::test]
async fn only_top_candidates_are_considered() {
    let reference = product("BE", "DOOM", 19.99, None);
    let matcher = CrossRegionMatcher::new(1);

    let report = matcher
        .match_product(&reference, &regions(&["US"]), |_| {
            ready(Ok(vec![
                product("US", "Completely Different", 99.0, None),
                product("US", "DOOM", 19.99, None),
            ]))
        })
        .await;

    assert_eq!(report.status, MatchStatus::NoMatch);
    assert_eq!(report.match_count(), 0);
    assert_eq!(report.regions_checked, vec!["US".to_owned()]);
}

#[tokio::test]
async fn no_match_when_every_region_fails() {
    let reference = product("BE", "DOOM", 19.99, None);
    let report = CrossRegionMatcher::default()
        .match_product(&reference, &regions(&["US", "JP"]), |region| {
            ready(Err::<Vec<ProductRecord>, _>(ScraperError::RegionUnavailable {
                region: region.code.to_owned(),
                reason: "connection refused".to_owned(),
            }))
        })
        .await;

    assert_eq!(report.status, MatchStatus::NoMatch);
    assert!(report.regions_checked.is_empty());
    assert_eq!(report.regions_failed.len(), 2);
    assert!(report
        .regions_failed
        .iter()
        .all(|f| f.code == "region_unavailable"));
}

#[test]
fn match_status_serializes_snake_case() {
    let json = serde_json::to_string(&MatchStatus::NoMatch).expect("serialize");
    assert_eq!(json, "\"no_match\"");
}
