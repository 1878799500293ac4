//! Command handlers for the CLI.
//!
//! Each handler prints a single JSON document to stdout; logs go to stderr.

use serde::Serialize;
use storescout_core::{AppConfig, REGIONS};
use storescout_scraper::{SearchOptions, SearchService};

/// Builds the search service from configuration and the configured lexicon.
///
/// # Errors
///
/// Returns an error if the lexicon file cannot be loaded or the storefront
/// client cannot be built.
pub(crate) fn build_service(config: &AppConfig) -> anyhow::Result<SearchService> {
    let lexicon = storescout_core::load_configured_lexicon(config)?;
    Ok(SearchService::from_config(config, lexicon)?)
}

pub(crate) fn search_options(all: bool, no_sort: bool, enrich: bool) -> SearchOptions {
    SearchOptions {
        filter_dlc: !all,
        sort_by_relevance: !no_sort,
        enrich,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Search one region and print the full search response.
///
/// # Errors
///
/// Returns an error if the search fails or the response cannot be serialized.
pub(crate) async fn run_search(
    service: &SearchService,
    query: &str,
    region: &str,
    options: SearchOptions,
) -> anyhow::Result<()> {
    let response = service.search_products(query, region, options).await?;
    if response.search_results.is_empty() {
        tracing::warn!(query, region, "no products matched");
    }
    print_json(&response)
}

/// Resolve a product id and print the lookup response.
///
/// # Errors
///
/// Returns an error if the product cannot be resolved.
pub(crate) async fn run_lookup(
    service: &SearchService,
    product_id: &str,
    region: &str,
) -> anyhow::Result<()> {
    let response = service.lookup_product_by_id(product_id, region).await?;
    print_json(&response)
}

/// Match a product across regions and print the match report.
///
/// # Errors
///
/// Returns an error if the reference product cannot be resolved or a target
/// region is unknown.
pub(crate) async fn run_match(
    service: &SearchService,
    product_id: &str,
    region: &str,
    targets: &[String],
) -> anyhow::Result<()> {
    let report = service
        .match_across_regions(product_id, region, targets)
        .await?;
    print_json(&report)
}

/// Print the exchange-rate table, optionally forcing a refresh first.
///
/// A failed forced refresh is logged and the fallback table is printed.
///
/// # Errors
///
/// Returns an error only if the table cannot be serialized.
pub(crate) async fn run_rates(service: &SearchService, refresh: bool) -> anyhow::Result<()> {
    if refresh {
        if let Err(e) = service.rates().refresh().await {
            tracing::warn!(error = %e, "exchange-rate refresh failed");
        }
    }
    let snapshot = service.rates().get_rates().await;
    print_json(&snapshot)
}

/// Print the supported regions.
///
/// # Errors
///
/// Returns an error only if the table cannot be serialized.
pub(crate) fn run_regions() -> anyhow::Result<()> {
    print_json(&REGIONS)
}
