use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use std::time::Duration;
use storescout_scraper::{
    CrossRegionMatcher, ExchangeRateCache, MetadataCache, Scorer, StorefrontClient,
};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOOM_BE: &str = "EP1003-CUSA02092_00-DOOMTHEGAME00000";

fn tile(position: usize, name: &str, price: &str, href: &str) -> String {
    format!(
        r#"<div data-qa="search#productTile{position}">
             <a href="{href}">
               <span data-qa="search#productTile{position}#product-name">{name}</span>
               <span data-qa="search#productTile{position}#price#display-price">{price}</span>
             </a>
           </div>"#
    )
}

fn doom_page() -> String {
    format!(
        "<html><body>{}{}</body></html>",
        tile(
            0,
            "DOOM Eternal Deluxe Edition DLC Pack",
            "€14,99",
            "/en-be/product/EP1003-PPSA01234_00-DOOMETERNALDLC01",
        ),
        tile(1, "DOOM (2016)", "€59,99", &format!("/en-be/product/{DOOM_BE}")),
    )
}

fn detail_page() -> String {
    r#"<html><head><meta property="og:title" content="DOOM (2016)"></head>
       <body><span data-qa="mfeCtaMain#offer0#finalPrice">€59,99</span></body></html>"#
        .to_string()
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn test_app(storefront: &MockServer, max_requests: usize) -> Router {
    let client = StorefrontClient::new(&storefront.uri(), 5, "storescout-test/0.1", 0, 0)
        .expect("test client");
    let rates = Arc::new(ExchangeRateCache::new(
        client.http().clone(),
        None,
        Duration::from_secs(3600),
    ));
    let service = SearchService::new(
        client,
        rates,
        Arc::new(MetadataCache::default()),
        Scorer::default(),
        CrossRegionMatcher::default(),
    );
    build_app(
        AppState {
            service: Arc::new(service),
        },
        RateLimitState::new(max_requests, Duration::from_secs(60)),
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).expect("json parse");
    (status, json)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("bad_request", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("timeout", StatusCode::GATEWAY_TIMEOUT),
        ("region_unavailable", StatusCode::SERVICE_UNAVAILABLE),
        ("upstream_error", StatusCode::BAD_GATEWAY),
        ("something_else", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, expected) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), expected, "code {code}");
    }
}

#[test]
fn map_scraper_error_uses_error_kind_code() {
    let err = ScraperError::UnknownRegion {
        region: "XX".to_string(),
    };
    let api_error = map_scraper_error("req-1".to_string(), &err);
    assert_eq!(api_error.error.code, "bad_request");
    assert_eq!(api_error.meta.request_id, "req-1");
}

#[tokio::test]
async fn health_returns_envelope_with_request_id() {
    let server = MockServer::start().await;
    let app = test_app(&server, 10);

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("x-request-id", "health-1")
        .body(Body::empty())
        .expect("request");
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["cached_products"], 0);
    assert_eq!(json["meta"]["request_id"], "health-1");
}

#[tokio::test]
async fn regions_lists_configured_regions() {
    let server = MockServer::start().await;
    let (status, json) = send(&test_app(&server, 10), get_request("/api/v1/regions")).await;

    assert_eq!(status, StatusCode::OK);
    let regions = json["data"].as_array().expect("data array");
    assert!(regions.len() >= 15);
    let be = regions
        .iter()
        .find(|r| r["code"] == "BE")
        .expect("BE region");
    assert_eq!(be["currency_code"], "EUR");
}

#[tokio::test]
async fn rates_fall_back_to_defaults_without_source() {
    let server = MockServer::start().await;
    let (status, json) = send(&test_app(&server, 10), get_request("/api/v1/rates")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["provenance"], "default");
    assert_eq!(json["data"]["reference_currency"], "EUR");
    assert_eq!(json["data"]["rates"]["EUR"], 1.0);
}

#[tokio::test]
async fn search_ranks_and_filters_listings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en-be/search/Doom"))
        .respond_with(html(doom_page()))
        .mount(&server)
        .await;

    let (status, json) = send(
        &test_app(&server, 10),
        get_request("/api/v1/search?q=Doom&region=BE"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["total_results"], 2);
    assert_eq!(data["filtered_count"], 1);
    assert_eq!(data["search_results"][0]["name"], "DOOM (2016)");
    assert_eq!(data["search_results"][0]["raw_price"], 59.99);
    assert_eq!(
        data["add_ons"][0]["name"],
        "DOOM Eternal Deluxe Edition DLC Pack"
    );
    assert_eq!(data["exchange_rates"], "default");
}

#[tokio::test]
async fn search_without_filter_returns_every_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en-be/search/Doom"))
        .respond_with(html(doom_page()))
        .mount(&server)
        .await;

    let (status, json) = send(
        &test_app(&server, 10),
        get_request("/api/v1/search?q=Doom&region=BE&filter_dlc=false"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["filtered_count"], 2);
    assert_eq!(json["data"]["search_results"][0]["name"], "DOOM (2016)");
}

#[tokio::test]
async fn search_requires_query() {
    let server = MockServer::start().await;
    let (status, json) = send(
        &test_app(&server, 10),
        get_request("/api/v1/search?region=BE"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn search_rejects_unknown_region() {
    let server = MockServer::start().await;
    let (status, json) = send(
        &test_app(&server, 10),
        get_request("/api/v1/search?q=Doom&region=XX"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn search_maps_storefront_failure_to_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en-be/search/Doom"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (status, json) = send(
        &test_app(&server, 10),
        get_request("/api/v1/search?q=Doom&region=BE"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "upstream_error");
}

#[tokio::test]
async fn product_lookup_populates_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/en-be/product/{DOOM_BE}")))
        .respond_with(html(detail_page()))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(&server, 10);
    let uri = format!("/api/v1/products/{DOOM_BE}?region=BE");

    let (status, first) = send(&app, get_request(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["source"], "storefront");
    assert_eq!(first["data"]["product"]["name"], "DOOM (2016)");

    let (_, second) = send(&app, get_request(&uri)).await;
    assert_eq!(second["data"]["source"], "cache");

    let (_, stats) = send(&app, get_request("/api/v1/cache")).await;
    assert_eq!(stats["data"]["entries"], 1);
    assert_eq!(stats["data"]["ttl_secs"], 86_400);
}

#[tokio::test]
async fn product_lookup_maps_missing_product_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en-be/product/EP0000-NOPE00000_00-MISSING000000000"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (status, json) = send(
        &test_app(&server, 10),
        get_request("/api/v1/products/EP0000-NOPE00000_00-MISSING000000000?region=BE"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn delete_cache_clears_metadata_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/en-be/product/{DOOM_BE}")))
        .respond_with(html(detail_page()))
        .mount(&server)
        .await;
    let app = test_app(&server, 10);
    send(&app, get_request(&format!("/api/v1/products/{DOOM_BE}?region=BE"))).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/v1/cache")
        .body(Body::empty())
        .expect("request");
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["metadata_entries_cleared"], 1);

    let (_, stats) = send(&app, get_request("/api/v1/cache")).await;
    assert_eq!(stats["data"]["entries"], 0);
}

#[tokio::test]
async fn rate_limit_applies_to_api_routes_but_not_health() {
    let server = MockServer::start().await;
    let app = test_app(&server, 1);

    let (first, _) = send(&app, get_request("/api/v1/regions")).await;
    assert_eq!(first, StatusCode::OK);
    let (second, json) = send(&app, get_request("/api/v1/regions")).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "rate_limited");

    let (health, _) = send(&app, get_request("/api/v1/health")).await;
    assert_eq!(health, StatusCode::OK);
}
