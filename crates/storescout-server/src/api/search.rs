use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use storescout_scraper::{SearchOptions, SearchResponse};

use crate::middleware::RequestId;

use super::{map_scraper_error, ApiError, ApiResponse, AppState, ResponseMeta, DEFAULT_REGION};

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    pub q: Option<String>,
    pub region: Option<String>,
    pub filter_dlc: Option<bool>,
    pub sort: Option<bool>,
    pub enrich: Option<bool>,
}

impl SearchQuery {
    fn options(&self) -> SearchOptions {
        let defaults = SearchOptions::default();
        SearchOptions {
            filter_dlc: self.filter_dlc.unwrap_or(defaults.filter_dlc),
            sort_by_relevance: self.sort.unwrap_or(defaults.sort_by_relevance),
            enrich: self.enrich.unwrap_or(defaults.enrich),
        }
    }
}

pub(super) async fn search_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) else {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "query parameter `q` is required",
        ));
    };
    let region = query.region.as_deref().unwrap_or(DEFAULT_REGION);

    let data = state
        .service
        .search_products(q, region, query.options())
        .await
        .map_err(|e| map_scraper_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
