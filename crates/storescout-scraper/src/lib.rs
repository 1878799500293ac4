pub mod client;
pub mod detail;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod metadata_cache;
pub mod price;
pub(crate) mod retry;
pub mod rates;
pub mod scoring;
pub mod search;

pub use client::StorefrontClient;
pub use detail::parse_product_metadata;
pub use error::{ErrorKind, ScraperError};
pub use extract::{extract_listing, extract_listings, ExtractionOutcome, ListingSelectors};
pub use matcher::{
    levenshtein, similarity, CrossRegionMatcher, MatchReport, MatchStatus, RegionFailure,
};
pub use metadata_cache::{CacheStats, MetadataCache, DEFAULT_METADATA_TTL};
pub use price::{parse_price, upscale_image_url};
pub use rates::{ExchangeRateCache, RateProvenance, RateSnapshot};
pub use scoring::{RankedProducts, Scorer, BASE_PRODUCT_THRESHOLD};
pub use search::{
    CacheInfo, LookupResponse, LookupSource, SearchOptions, SearchResponse, SearchService,
};
