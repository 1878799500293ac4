//! Heuristic relevance scoring and base-product / add-on classification.
//!
//! The score is an unbounded signed integer built from query match quality
//! plus lexical penalties and bonuses. It is a best-effort signal: a listing
//! below the threshold is *probably* an add-on, not certainly one.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use storescout_core::{ProductRecord, ScoringLexicon};

/// Score at or above which a listing is classified as a base product.
pub const BASE_PRODUCT_THRESHOLD: i32 = 20;

const EXACT_MATCH_SCORE: i32 = 100;
const SUBSTRING_MATCH_SCORE: i32 = 50;
const WORD_MATCH_MAX_SCORE: usize = 30;
const ADDON_PENALTY: i32 = 40;
const EDITION_PENALTY: i32 = 20;
const GAME_WORD_BONUS: i32 = 15;
const SHORT_NAME_BONUS: i32 = 10;
const SHORT_NAME_MAX_CHARS: usize = 30;
const PREFIX_BONUS: i32 = 25;
const YEAR_BONUS: i32 = 15;

static GAME_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bgames?\b").expect("valid game word regex"));
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(?\b20\d{2}\b\)?").expect("valid year regex"));

#[derive(Debug, Clone, Serialize)]
pub struct RankedProducts {
    pub all: Vec<ProductRecord>,
    pub base_products: Vec<ProductRecord>,
    pub add_ons: Vec<ProductRecord>,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    lexicon: ScoringLexicon,
    threshold: i32,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(ScoringLexicon::default(), BASE_PRODUCT_THRESHOLD)
    }
}

impl Scorer {
    #[must_use]
    pub fn new(lexicon: ScoringLexicon, threshold: i32) -> Self {
        Self {
            lexicon: lexicon.normalized(),
            threshold,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Scores `name` against `query`. Pure and deterministic.
    #[must_use]
    pub fn score(&self, name: &str, query: &str) -> i32 {
        let name_lower = name.to_lowercase();
        let query_lower = query.trim().to_lowercase();

        let mut score = match_score(&name_lower, &query_lower);

        if self
            .lexicon
            .addon_markers
            .iter()
            .any(|m| name_lower.contains(m.as_str()))
        {
            score -= ADDON_PENALTY;
        }
        if self
            .lexicon
            .edition_markers
            .iter()
            .any(|m| name_lower.contains(m.as_str()))
        {
            score -= EDITION_PENALTY;
        }

        if GAME_WORD_RE.is_match(name) {
            score += GAME_WORD_BONUS;
        }
        if name.chars().count() < SHORT_NAME_MAX_CHARS {
            score += SHORT_NAME_BONUS;
        }
        if !query_lower.is_empty() && name_lower.starts_with(&query_lower) {
            score += PREFIX_BONUS;
        }
        if YEAR_RE.is_match(name) {
            score += YEAR_BONUS;
        }

        score
    }

    #[must_use]
    pub fn is_base_product(&self, score: i32) -> bool {
        score >= self.threshold
    }

    /// Scores every product, optionally sorts descending by score, and
    /// partitions into base products and add-ons.
    ///
    /// Sorting is stable, so equal scores keep their page order.
    #[must_use]
    pub fn rank(
        &self,
        mut products: Vec<ProductRecord>,
        query: &str,
        sort_by_relevance: bool,
    ) -> RankedProducts {
        for product in &mut products {
            product.relevance_score = self.score(&product.name, query);
            tracing::debug!(
                name = %product.name,
                score = product.relevance_score,
                base_product = self.is_base_product(product.relevance_score),
                "classified listing"
            );
        }

        if sort_by_relevance {
            products.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
        }

        let (base_products, add_ons): (Vec<_>, Vec<_>) = products
            .iter()
            .cloned()
            .partition(|p| self.is_base_product(p.relevance_score));

        RankedProducts {
            all: products,
            base_products,
            add_ons,
        }
    }
}

/// Query match component: exact, substring, or per-word partial credit.
fn match_score(name_lower: &str, query_lower: &str) -> i32 {
    if query_lower.is_empty() {
        return 0;
    }
    if name_lower == query_lower {
        return EXACT_MATCH_SCORE;
    }
    if name_lower.contains(query_lower) {
        return SUBSTRING_MATCH_SCORE;
    }

    let words: Vec<&str> = query_lower.split_whitespace().collect();
    let found = words.iter().filter(|w| name_lower.contains(**w)).count();
    // Integer division floors the fractional credit.
    i32::try_from(found * WORD_MATCH_MAX_SCORE / words.len()).unwrap_or(0)
}

#[cfg(test)]
#[path = "scoring_test.rs"]
mod tests;
