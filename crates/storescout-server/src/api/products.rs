use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use storescout_scraper::{LookupResponse, MatchReport};

use crate::middleware::RequestId;

use super::{map_scraper_error, ApiError, ApiResponse, AppState, ResponseMeta, DEFAULT_REGION};

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MatchQuery {
    pub region: Option<String>,
    /// Comma-separated region codes; absent or empty means every other region.
    pub targets: Option<String>,
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<String>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<LookupResponse>>, ApiError> {
    let region = query.region.as_deref().unwrap_or(DEFAULT_REGION);
    let data = state
        .service
        .lookup_product_by_id(&product_id, region)
        .await
        .map_err(|e| map_scraper_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_matches(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<String>,
    Query(query): Query<MatchQuery>,
) -> Result<Json<ApiResponse<MatchReport>>, ApiError> {
    let region = query.region.as_deref().unwrap_or(DEFAULT_REGION);
    let targets = split_targets(query.targets.as_deref());
    let data = state
        .service
        .match_across_regions(&product_id, region, &targets)
        .await
        .map_err(|e| map_scraper_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn split_targets(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::split_targets;

    #[test]
    fn split_targets_trims_and_skips_blanks() {
        assert_eq!(split_targets(Some("US, GB,,")), vec!["US", "GB"]);
        assert!(split_targets(Some("")).is_empty());
        assert!(split_targets(None).is_empty());
    }
}
