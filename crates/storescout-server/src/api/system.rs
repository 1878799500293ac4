use axum::{extract::State, Extension, Json};
use serde::Serialize;
use storescout_core::{Region, REGIONS};
use storescout_scraper::{CacheStats, RateSnapshot};

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ClearedCaches {
    metadata_entries_cleared: usize,
}

pub(super) async fn list_regions(
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<&'static [Region]>> {
    Json(ApiResponse {
        data: REGIONS,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn get_rates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<RateSnapshot>> {
    let data = state.service.rates().get_rates().await;
    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn cache_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<CacheStats>> {
    Json(ApiResponse {
        data: state.service.metadata().stats(),
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn clear_cache(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ClearedCaches>> {
    let metadata_entries_cleared = state.service.metadata().len();
    state.service.clear_caches();
    Json(ApiResponse {
        data: ClearedCaches {
            metadata_entries_cleared,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}
