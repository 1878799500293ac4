//! Fuzzy cross-region product matching.
//!
//! A candidate from another region is compared to the resolved product on
//! three criteria: title similarity (weight 0.40), price similarity in the
//! reference currency (0.30) and identifier similarity (0.30). Criteria with
//! missing inputs are left out of both the weighted sum and the weight total,
//! so two identical payloads always score exactly `1.0`.

use std::future::Future;

use serde::Serialize;
use storescout_core::{ConfidenceBucket, MatchResult, ProductRecord, Region};

use crate::error::ScraperError;

const TITLE_WEIGHT: f64 = 0.40;
const PRICE_WEIGHT: f64 = 0.30;
const IDENTIFIER_WEIGHT: f64 = 0.30;

/// Default number of ranked candidates compared per region.
pub const DEFAULT_CANDIDATES_PER_REGION: usize = 5;

/// Classic Levenshtein edit distance over Unicode scalar values.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // (len(b) + 1) x (len(a) + 1) table.
    let mut table = vec![vec![0usize; a.len() + 1]; b.len() + 1];
    for (j, cell) in table[0].iter_mut().enumerate() {
        *cell = j;
    }
    for (i, row) in table.iter_mut().enumerate() {
        row[0] = i;
    }

    for i in 1..=b.len() {
        for j in 1..=a.len() {
            let substitution = usize::from(a[j - 1] != b[i - 1]);
            table[i][j] = (table[i - 1][j] + 1)
                .min(table[i][j - 1] + 1)
                .min(table[i - 1][j - 1] + substitution);
        }
    }
    table[b.len()][a.len()]
}

/// Case-insensitive `(max_len - distance) / max_len`; two empty strings are `1.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)] // title lengths are far below 2^52
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(&a, &b);
    (max_len - distance) as f64 / max_len as f64
}

/// `max(0, 1 - 2 * |p1 - p2| / max(p1, p2))`.
///
/// `None` unless both prices are finite and non-negative. Two zero prices
/// (both free) are a perfect match.
#[must_use]
pub fn price_similarity(p1: f64, p2: f64) -> Option<f64> {
    let usable = |p: f64| p.is_finite() && p >= 0.0;
    if !usable(p1) || !usable(p2) {
        return None;
    }
    let max = p1.max(p2);
    if max == 0.0 {
        return Some(1.0);
    }
    Some((1.0 - 2.0 * (p1 - p2).abs() / max).max(0.0))
}

/// `1.0` on exact equality, otherwise the Levenshtein similarity.
#[must_use]
pub fn identifier_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        1.0
    } else {
        similarity(a, b)
    }
}

/// Per-criterion breakdown and the normalized composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompositeScore {
    pub score: f64,
    pub title: f64,
    pub price: Option<f64>,
    pub identifier: Option<f64>,
}

/// Scores `candidate` against `reference`.
#[must_use]
pub fn composite_score(reference: &ProductRecord, candidate: &ProductRecord) -> CompositeScore {
    let title = similarity(&reference.name, &candidate.name);
    let price = price_similarity(
        reference.price_in_reference_currency,
        candidate.price_in_reference_currency,
    );
    let identifier = match (&reference.product_id, &candidate.product_id) {
        (Some(a), Some(b)) => Some(identifier_similarity(&a.raw, &b.raw)),
        _ => None,
    };

    let mut weighted = TITLE_WEIGHT * title;
    let mut weights = TITLE_WEIGHT;
    if let Some(p) = price {
        weighted += PRICE_WEIGHT * p;
        weights += PRICE_WEIGHT;
    }
    if let Some(id) = identifier {
        weighted += IDENTIFIER_WEIGHT * id;
        weights += IDENTIFIER_WEIGHT;
    }

    CompositeScore {
        score: (weighted / weights).clamp(0.0, 1.0),
        title,
        price,
        identifier,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    NoMatch,
}

/// A region whose candidates could not be fetched.
#[derive(Debug, Clone, Serialize)]
pub struct RegionFailure {
    pub region: String,
    pub code: &'static str,
    pub message: String,
}

/// Matches for one resolved product, bucketed by confidence.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub status: MatchStatus,
    pub product: ProductRecord,
    pub exact: Vec<MatchResult>,
    pub likely: Vec<MatchResult>,
    pub potential: Vec<MatchResult>,
    pub regions_checked: Vec<String>,
    pub regions_failed: Vec<RegionFailure>,
}

impl MatchReport {
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.exact.len() + self.likely.len() + self.potential.len()
    }
}

#[derive(Debug, Clone)]
pub struct CrossRegionMatcher {
    candidates_per_region: usize,
}

impl Default for CrossRegionMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CANDIDATES_PER_REGION)
    }
}

impl CrossRegionMatcher {
    #[must_use]
    pub fn new(candidates_per_region: usize) -> Self {
        Self {
            candidates_per_region: candidates_per_region.max(1),
        }
    }

    /// Compares `reference` with the top ranked candidates of each target region.
    ///
    /// `fetch_candidates` returns a region's ranked candidates; regions are
    /// queried one at a time. The reference's own region is skipped. A failing
    /// region is recorded in `regions_failed` and the others still run.
    pub async fn match_product<F, Fut>(
        &self,
        reference: &ProductRecord,
        targets: &[&'static Region],
        mut fetch_candidates: F,
    ) -> MatchReport
    where
        F: FnMut(&'static Region) -> Fut,
        Fut: Future<Output = Result<Vec<ProductRecord>, ScraperError>>,
    {
        let mut report = MatchReport {
            status: MatchStatus::NoMatch,
            product: reference.clone(),
            exact: Vec::new(),
            likely: Vec::new(),
            potential: Vec::new(),
            regions_checked: Vec::new(),
            regions_failed: Vec::new(),
        };

        for &region in targets {
            if region.code.eq_ignore_ascii_case(&reference.region) {
                continue;
            }

            let candidates = match fetch_candidates(region).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!(region = region.code, error = %e, "region failed during matching");
                    report.regions_failed.push(RegionFailure {
                        region: region.code.to_owned(),
                        code: e.kind().as_code(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            report.regions_checked.push(region.code.to_owned());

            for candidate in candidates.into_iter().take(self.candidates_per_region) {
                let composite = composite_score(reference, &candidate);
                let bucket = ConfidenceBucket::from_score(composite.score);
                tracing::debug!(
                    region = region.code,
                    candidate = %candidate.name,
                    score = composite.score,
                    %bucket,
                    "scored match candidate"
                );

                let result = MatchResult {
                    bucket,
                    region: region.code.to_owned(),
                    product: candidate,
                    score: composite.score,
                    title_similarity: composite.title,
                    price_similarity: composite.price,
                    identifier_similarity: composite.identifier,
                };
                match bucket {
                    ConfidenceBucket::Exact => report.exact.push(result),
                    ConfidenceBucket::Likely => report.likely.push(result),
                    ConfidenceBucket::Potential => report.potential.push(result),
                    ConfidenceBucket::None => {}
                }
            }
        }

        for bucket in [&mut report.exact, &mut report.likely, &mut report.potential] {
            bucket.sort_by(|a, b| b.score.total_cmp(&a.score));
        }
        if report.match_count() > 0 {
            report.status = MatchStatus::Matched;
        }
        report
    }
}

#[cfg(test)]
#[path = "matcher_test.rs"]
mod tests;
