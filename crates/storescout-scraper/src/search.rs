//! Query resolution: fetch a results page, extract listings, normalize
//! prices, optionally enrich from product metadata, then rank.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Url;
use serde::Serialize;
use storescout_core::{
    find_region, AppConfig, MetadataCacheEntry, ProductIdentifier, ProductRecord, RawListing,
    Region, ScoringLexicon, REGIONS,
};

use crate::client::StorefrontClient;
use crate::detail::parse_product_metadata;
use crate::error::ScraperError;
use crate::extract::{absolute_url, canonical_url, extract_listings, ListingSelectors};
use crate::matcher::{CrossRegionMatcher, MatchReport};
use crate::metadata_cache::MetadataCache;
use crate::price::{parse_price, upscale_image_url};
use crate::rates::{ExchangeRateCache, RateProvenance, RateSnapshot};
use crate::scoring::Scorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Return only base products (the default) instead of every listing.
    pub filter_dlc: bool,
    pub sort_by_relevance: bool,
    /// Fill listing gaps from product metadata (cache first, then detail page).
    pub enrich: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            filter_dlc: true,
            sort_by_relevance: true,
            enrich: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub entries: usize,
    /// `entries / (products_processed + 1)`; a per-request approximation.
    pub hit_rate: f64,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub region: &'static str,
    /// Base products when filtering, otherwise every ranked listing.
    pub search_results: Vec<ProductRecord>,
    pub base_products: Vec<ProductRecord>,
    pub add_ons: Vec<ProductRecord>,
    pub total_results: usize,
    pub filtered_count: usize,
    /// Listing elements dropped for a missing name, price or link.
    pub skipped_listings: usize,
    pub exchange_rates: RateProvenance,
    pub cache_info: CacheInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupSource {
    Cache,
    Storefront,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub product: ProductRecord,
    pub source: LookupSource,
    pub price_in_reference_currency: f64,
}

/// Entry point for searches, lookups and cross-region matching.
///
/// Construct once and share; the caches are `Arc`s so other components (the
/// rate warm-up job, the cache endpoints) can hold them too.
pub struct SearchService {
    client: StorefrontClient,
    rates: Arc<ExchangeRateCache>,
    metadata: Arc<MetadataCache>,
    scorer: Scorer,
    matcher: CrossRegionMatcher,
}

impl SearchService {
    #[must_use]
    pub fn new(
        client: StorefrontClient,
        rates: Arc<ExchangeRateCache>,
        metadata: Arc<MetadataCache>,
        scorer: Scorer,
        matcher: CrossRegionMatcher,
    ) -> Self {
        Self {
            client,
            rates,
            metadata,
            scorer,
            matcher,
        }
    }

    /// Wires the client, caches, scorer and matcher from application config.
    ///
    /// The rate cache reuses the storefront client's HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the storefront client cannot be built.
    pub fn from_config(config: &AppConfig, lexicon: ScoringLexicon) -> Result<Self, ScraperError> {
        let client = StorefrontClient::new(
            &config.storefront_base_url,
            config.request_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_secs,
        )?;
        let rates = Arc::new(ExchangeRateCache::new(
            client.http().clone(),
            config.exchange_rate_url.clone(),
            Duration::from_secs(config.rate_max_age_secs),
        ));
        let metadata = Arc::new(MetadataCache::new(Duration::from_secs(
            config.metadata_ttl_secs,
        )));
        Ok(Self::new(
            client,
            rates,
            metadata,
            Scorer::new(lexicon, config.base_product_threshold),
            CrossRegionMatcher::new(config.match_candidates_per_region),
        ))
    }

    #[must_use]
    pub fn rates(&self) -> &Arc<ExchangeRateCache> {
        &self.rates
    }

    #[must_use]
    pub fn metadata(&self) -> &Arc<MetadataCache> {
        &self.metadata
    }

    #[must_use]
    pub fn cache_info(&self, products_processed: usize) -> CacheInfo {
        let stats = self.metadata.stats();
        CacheInfo {
            entries: stats.entries,
            hit_rate: self.metadata.hit_rate(products_processed),
            ttl_secs: stats.ttl_secs,
        }
    }

    /// Drops every cached metadata entry and the cached rate table.
    pub fn clear_caches(&self) {
        self.metadata.clear();
        self.rates.clear();
        tracing::info!("metadata and exchange-rate caches cleared");
    }

    /// Resolves a free-text query in one region into ranked product records.
    ///
    /// Listings are normalized (and enriched when requested) concurrently;
    /// a listing that fails is logged and dropped without failing the search.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidInput`] for an empty query.
    /// - [`ScraperError::UnknownRegion`] for an unconfigured region code.
    /// - Any fetch error from [`StorefrontClient::fetch_search_page`].
    pub async fn search_products(
        &self,
        query: &str,
        region_code: &str,
        options: SearchOptions,
    ) -> Result<SearchResponse, ScraperError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScraperError::InvalidInput(
                "query must not be empty".to_owned(),
            ));
        }
        let region = resolve_region(region_code)?;

        let html = self.client.fetch_search_page(region, query).await?;
        let outcome = extract_listings(&html, &ListingSelectors::for_region(region));
        let rates = self.rates.get_rates().await;

        let extracted = outcome.listings.len();
        let records: Vec<ProductRecord> = join_all(
            outcome
                .listings
                .into_iter()
                .enumerate()
                .map(|(index, listing)| {
                    self.process_listing(index, listing, region, &rates, options.enrich)
                }),
        )
        .await
        .into_iter()
        .flatten()
        .collect();
        let skipped_listings = outcome.skipped + (extracted - records.len());

        let ranked = self.scorer.rank(records, query, options.sort_by_relevance);
        let search_results = if options.filter_dlc {
            ranked.base_products.clone()
        } else {
            ranked.all.clone()
        };
        let total_results = ranked.all.len();

        tracing::info!(
            query,
            region = region.code,
            total_results,
            base_products = ranked.base_products.len(),
            add_ons = ranked.add_ons.len(),
            skipped_listings,
            rates = ?rates.provenance,
            "search resolved"
        );

        Ok(SearchResponse {
            query: query.to_owned(),
            region: region.code,
            filtered_count: search_results.len(),
            search_results,
            base_products: ranked.base_products,
            add_ons: ranked.add_ons,
            total_results,
            skipped_listings,
            exchange_rates: rates.provenance,
            cache_info: self.cache_info(total_results),
        })
    }

    /// Resolves a known product id, consulting the metadata cache first.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidInput`] for an empty or path-like id.
    /// - [`ScraperError::UnknownRegion`] for an unconfigured region code.
    /// - [`ScraperError::NotFound`] when the storefront has no such product.
    /// - [`ScraperError::Metadata`] when the detail page lacks a name or price.
    pub async fn lookup_product_by_id(
        &self,
        product_id: &str,
        region_code: &str,
    ) -> Result<LookupResponse, ScraperError> {
        let product_id = validate_product_id(product_id)?;
        let region = resolve_region(region_code)?;

        let (entry, source) = self.product_metadata(product_id, region).await?;
        let rates = self.rates.get_rates().await;
        let url = self.client.product_url(region, product_id)?;
        let product = record_from_metadata(&entry, region, &rates, url.as_str());

        tracing::info!(
            product_id,
            region = region.code,
            source = ?source,
            "product resolved"
        );

        Ok(LookupResponse {
            price_in_reference_currency: product.price_in_reference_currency,
            product,
            source,
        })
    }

    /// Resolves `product_id` in `region_code`, then looks for the same product
    /// in each target region by searching for its name.
    ///
    /// An empty `targets` list means every other configured region.
    ///
    /// # Errors
    ///
    /// Fails only when the reference product cannot be resolved or a target
    /// code is unknown; per-region failures are reported in the
    /// [`MatchReport`].
    pub async fn match_across_regions(
        &self,
        product_id: &str,
        region_code: &str,
        targets: &[String],
    ) -> Result<MatchReport, ScraperError> {
        let lookup = self.lookup_product_by_id(product_id, region_code).await?;
        let targets = resolve_targets(targets, &lookup.product.region)?;
        let name = lookup.product.name.clone();
        let options = SearchOptions::default();

        let report = self
            .matcher
            .match_product(&lookup.product, &targets, |region| {
                let name = name.clone();
                async move {
                    self.search_products(&name, region.code, options)
                        .await
                        .map(|response| response.search_results)
                }
            })
            .await;

        tracing::info!(
            product_id,
            region = region_code,
            status = ?report.status,
            matches = report.match_count(),
            regions_failed = report.regions_failed.len(),
            "cross-region match complete"
        );
        Ok(report)
    }

    async fn process_listing(
        &self,
        index: usize,
        listing: RawListing,
        region: &Region,
        rates: &RateSnapshot,
        enrich: bool,
    ) -> Option<ProductRecord> {
        let mut record = match normalize_listing(index, listing, region, rates, self.client.base_url())
        {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(index, error = %e, "dropping listing");
                return None;
            }
        };

        if enrich {
            if let Some(product_id) = record.product_id.as_ref().map(|id| id.raw.clone()) {
                match self.product_metadata(&product_id, region).await {
                    Ok((entry, _)) => apply_metadata(&mut record, &entry, region, rates),
                    Err(e) => {
                        tracing::warn!(
                            product_id,
                            region = region.code,
                            error = %e,
                            "enrichment failed; keeping listing as scraped"
                        );
                    }
                }
            }
        }
        Some(record)
    }

    async fn product_metadata(
        &self,
        product_id: &str,
        region: &Region,
    ) -> Result<(MetadataCacheEntry, LookupSource), ScraperError> {
        if let Some(entry) = self.metadata.get(product_id, region.locale) {
            return Ok((entry, LookupSource::Cache));
        }

        let html = self.client.fetch_product_page(region, product_id).await?;
        let entry = parse_product_metadata(&html, product_id, region)?;
        self.metadata.set(product_id, region.locale, entry.clone());
        Ok((entry, LookupSource::Storefront))
    }
}

fn resolve_region(code: &str) -> Result<&'static Region, ScraperError> {
    find_region(code).ok_or_else(|| ScraperError::UnknownRegion {
        region: code.trim().to_owned(),
    })
}

fn validate_product_id(product_id: &str) -> Result<&str, ScraperError> {
    let product_id = product_id.trim();
    if product_id.is_empty() || product_id.contains(['/', '?', '#']) {
        return Err(ScraperError::InvalidInput(format!(
            "invalid product id \"{product_id}\""
        )));
    }
    Ok(product_id)
}

/// Target regions for matching, deduplicated in request order. Empty means
/// every configured region except `own`.
fn resolve_targets(targets: &[String], own: &str) -> Result<Vec<&'static Region>, ScraperError> {
    if targets.iter().all(|t| t.trim().is_empty()) {
        return Ok(REGIONS
            .iter()
            .filter(|r| !r.code.eq_ignore_ascii_case(own))
            .collect());
    }

    let mut resolved: Vec<&'static Region> = Vec::new();
    for code in targets.iter().filter(|t| !t.trim().is_empty()) {
        let region = resolve_region(code)?;
        if !resolved.iter().any(|r| r.code == region.code) {
            resolved.push(region);
        }
    }
    Ok(resolved)
}

/// Turns one raw listing into a priced record.
///
/// A listing without a name is rejected. A listing without a resolvable detail
/// link is kept with no url and no identifier; an unparseable price is kept as
/// `0.0`.
fn normalize_listing(
    index: usize,
    listing: RawListing,
    region: &Region,
    rates: &RateSnapshot,
    origin: &Url,
) -> Result<ProductRecord, ScraperError> {
    let name = listing
        .name
        .ok_or_else(|| ScraperError::InvalidInput("listing has no name".to_owned()))?;
    let url = listing
        .detail_url
        .as_deref()
        .and_then(|href| canonical_url(origin, href));
    if url.is_none() {
        tracing::debug!(index, name, "listing has no usable detail link");
    }

    let price_text = listing.price_text.unwrap_or_default();
    let raw_price = parse_price(&price_text);
    let rate = rates.rate_for(region.currency_code);
    let image_url = listing
        .image_url
        .as_deref()
        .and_then(|src| absolute_url(origin, src))
        .map(|src| upscale_image_url(&src));

    Ok(ProductRecord {
        index,
        product_id: url
            .as_deref()
            .and_then(|url| ProductIdentifier::from_detail_url(url, region.code)),
        name,
        price_text,
        raw_price,
        price_in_reference_currency: raw_price * rate,
        currency_symbol: region.currency_symbol.to_owned(),
        currency_code: region.currency_code.to_owned(),
        exchange_rate_used: rate,
        url,
        image_url,
        region: region.code.to_owned(),
        relevance_score: 0,
        enriched: false,
    })
}

/// Fills gaps left by the listing markup: a missing image, or a price that
/// parsed to zero while the detail page shows a real one.
fn apply_metadata(
    record: &mut ProductRecord,
    entry: &MetadataCacheEntry,
    region: &Region,
    rates: &RateSnapshot,
) {
    if record.image_url.is_none() {
        record.image_url = entry.image_url.as_deref().map(upscale_image_url);
    }

    let metadata_price = entry.effective_price();
    if record.raw_price == 0.0 && metadata_price.is_finite() && metadata_price > 0.0 {
        let rate = rates.rate_for(&entry.currency_code);
        let currency_symbol = display_symbol(&entry.currency_code, region);
        record.price_text = format!("{currency_symbol}{metadata_price:.2}");
        record.currency_symbol = currency_symbol;
        record.raw_price = metadata_price;
        record.currency_code.clone_from(&entry.currency_code);
        record.exchange_rate_used = rate;
        record.price_in_reference_currency = metadata_price * rate;
    }
    record.enriched = true;
}

/// The region's symbol when the currency is the region's own, otherwise the
/// ISO code.
fn display_symbol(currency_code: &str, region: &Region) -> String {
    if currency_code.eq_ignore_ascii_case(region.currency_code) {
        region.currency_symbol.to_owned()
    } else {
        currency_code.to_owned()
    }
}

fn record_from_metadata(
    entry: &MetadataCacheEntry,
    region: &Region,
    rates: &RateSnapshot,
    url: &str,
) -> ProductRecord {
    let raw_price = Some(entry.effective_price())
        .filter(|p| p.is_finite() && *p >= 0.0)
        .unwrap_or(0.0);
    let rate = rates.rate_for(&entry.currency_code);
    let currency_symbol = display_symbol(&entry.currency_code, region);

    ProductRecord {
        index: 0,
        name: entry.display_name.clone(),
        price_text: format!("{currency_symbol}{raw_price:.2}"),
        raw_price,
        price_in_reference_currency: raw_price * rate,
        currency_symbol,
        currency_code: entry.currency_code.clone(),
        exchange_rate_used: rate,
        url: Some(url.to_owned()),
        image_url: entry.image_url.as_deref().map(upscale_image_url),
        region: region.code.to_owned(),
        product_id: Some(ProductIdentifier::new(&entry.product_id, region.code)),
        relevance_score: 0,
        enriched: true,
    }
}
