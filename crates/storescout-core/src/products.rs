use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

static PRODUCT_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/product/([^/?#]+)/?$").expect("valid product path regex"));

/// Storefront product ids look like `EP1003-CUSA02092_00-DOOMTHEGAME00000`.
static PRODUCT_ID_FORMAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{2}\d{4}-[A-Z]{4}\d{5}_\d{2}-[A-Z0-9]{16}$")
        .expect("valid product id format regex")
});

/// Best-effort field tuple scraped from one listing element.
///
/// Every field is optional; the extractor decides whether the listing is
/// usable (name and price are required).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    pub name: Option<String>,
    pub price_text: Option<String>,
    pub image_url: Option<String>,
    pub detail_url: Option<String>,
}

/// Identifier derived from a product's detail URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductIdentifier {
    pub raw: String,
    /// Region-qualified form, e.g. `"BE:EP1003-CUSA02092_00-DOOMTHEGAME00000"`.
    pub enriched: String,
    /// `true` when `raw` has the storefront product-id shape.
    pub is_valid: bool,
    /// Sum of the character codes of `raw`, lowercase hex.
    pub checksum: String,
}

impl ProductIdentifier {
    #[must_use]
    pub fn new(raw: &str, region_code: &str) -> Self {
        let raw = raw.trim().to_string();
        let checksum_value: u64 = raw.chars().map(|c| u64::from(u32::from(c))).sum();
        Self {
            enriched: format!("{}:{raw}", region_code.to_uppercase()),
            is_valid: PRODUCT_ID_FORMAT_RE.is_match(&raw),
            checksum: format!("{checksum_value:x}"),
            raw,
        }
    }

    /// Extracts the identifier from a detail URL ending in `/product/<id>`.
    ///
    /// Query strings and fragments are ignored. Returns `None` when the path
    /// does not end with the product segment, which is a normal outcome for
    /// concept or bundle pages.
    #[must_use]
    pub fn from_detail_url(url: &str, region_code: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        PRODUCT_PATH_RE
            .captures(path)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|id| !id.is_empty())
            .map(|id| Self::new(id, region_code))
    }
}

/// A normalized storefront product returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Position of the listing on the results page (extraction order).
    pub index: usize,
    pub name: String,
    pub price_text: String,
    /// Always finite and non-negative; unparseable prices are `0.0`.
    pub raw_price: f64,
    /// `raw_price * exchange_rate_used`.
    pub price_in_reference_currency: f64,
    pub currency_symbol: String,
    pub currency_code: String,
    pub exchange_rate_used: f64,
    /// Canonical detail page; `None` when the listing carried no usable link.
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub region: String,
    pub product_id: Option<ProductIdentifier>,
    pub relevance_score: i32,
    /// `true` when fields were filled from product metadata.
    pub enriched: bool,
}

/// Product metadata fetched from a detail page, cached per locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataCacheEntry {
    pub product_id: String,
    pub display_name: String,
    pub base_price: f64,
    pub discounted_price: Option<f64>,
    pub currency_code: String,
    pub image_url: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl MetadataCacheEntry {
    /// The price a buyer pays right now: the discount when present, else the base price.
    #[must_use]
    pub fn effective_price(&self) -> f64 {
        self.discounted_price.unwrap_or(self.base_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBucket {
    Exact,
    Likely,
    Potential,
    None,
}

impl ConfidenceBucket {
    pub const EXACT_THRESHOLD: f64 = 0.95;
    pub const LIKELY_THRESHOLD: f64 = 0.80;
    pub const POTENTIAL_THRESHOLD: f64 = 0.60;

    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= Self::EXACT_THRESHOLD {
            Self::Exact
        } else if score >= Self::LIKELY_THRESHOLD {
            Self::Likely
        } else if score >= Self::POTENTIAL_THRESHOLD {
            Self::Potential
        } else {
            Self::None
        }
    }
}

impl std::fmt::Display for ConfidenceBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceBucket::Exact => write!(f, "exact"),
            ConfidenceBucket::Likely => write!(f, "likely"),
            ConfidenceBucket::Potential => write!(f, "potential"),
            ConfidenceBucket::None => write!(f, "none"),
        }
    }
}

/// One scored cross-region candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub bucket: ConfidenceBucket,
    pub region: String,
    pub product: ProductRecord,
    /// Composite similarity in `[0, 1]`.
    pub score: f64,
    pub title_similarity: f64,
    pub price_similarity: Option<f64>,
    pub identifier_similarity: Option<f64>,
}
