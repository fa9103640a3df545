// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with stub
// adapters standing in for the upstream sources.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use food_search_aggregator::aggregator::Aggregator;
use food_search_aggregator::api::{create_router, AppState};
use food_search_aggregator::history::SearchHistory;
use food_search_aggregator::item::{NormalizedItem, NutrientScore, Nutrients};
use food_search_aggregator::ratelimit::GuestLimiter;
use food_search_aggregator::sources::open_food_facts::OpenFoodFactsAdapter;
use food_search_aggregator::sources::SourceAdapter;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

struct StubAdapter {
    name: &'static str,
    items: Vec<NormalizedItem>,
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    async fn search(&self, _query: &str) -> Vec<NormalizedItem> {
        self.items.clone()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

fn sample_item() -> NormalizedItem {
    NormalizedItem {
        id: "catalog-organic-milk-0".to_string(),
        name: "Organic Milk".to_string(),
        source: "catalog".to_string(),
        brand: Some("Fresh Farms".to_string()),
        serving: Some("100g".to_string()),
        calories: 62.0,
        nutrients: Nutrients {
            protein: 3.2,
            carbs: 4.8,
            fat: 3.5,
            fiber: 0.0,
            sugar: 4.8,
            sodium: 44.0,
        },
        score: NutrientScore::Neutral,
        image_url: "https://img.example/milk.jpg".to_string(),
        ingredients: vec!["Milk".to_string()],
        allergens: vec!["Milk".to_string()],
        additives: vec![],
    }
}

/// Build the same Router the binary uses, with stubbed sources.
fn test_router(adapters: Vec<Arc<dyn SourceAdapter>>) -> Router {
    let state = AppState {
        aggregator: Arc::new(Aggregator::new(adapters, Duration::from_secs(60))),
        limiter: Arc::new(GuestLimiter::default()),
        history: Arc::new(SearchHistory::with_capacity(20)),
        barcode: Arc::new(OpenFoodFactsAdapter::new()),
    };
    create_router(state)
}

fn router_with_results() -> Router {
    test_router(vec![Arc::new(StubAdapter {
        name: "catalog",
        items: vec![sample_item()],
    })])
}

fn router_all_empty() -> Router {
    test_router(vec![Arc::new(StubAdapter {
        name: "catalog",
        items: Vec::new(),
    })])
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

#[tokio::test]
async fn health_returns_200_and_ok_body() {
    let app = router_with_results();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn search_returns_items_with_source_and_synthetic_flag() {
    let app = router_with_results();
    let (status, v) = get_json(&app, "/search?q=milk").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["query"], "milk");
    assert_eq!(v["source"], "catalog");
    assert_eq!(v["synthetic"], false);
    let items = v["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Organic Milk");
    assert_eq!(items[0]["score"], "neutral");
    assert!(items[0]["nutrients"]["protein"].is_number());
}

#[tokio::test]
async fn search_with_all_sources_empty_reports_synthetic() {
    let app = router_all_empty();
    let (status, v) = get_json(&app, "/search?q=dragonfruit").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["synthetic"], true, "the synthetic tag must survive");
    assert_eq!(v["source"], "synthetic");
    assert!(!v["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_query_yields_an_empty_result_without_spending_a_use() {
    let app = router_with_results();
    let (status, v) = get_json(&app, "/search?q=").await;
    assert_eq!(status, StatusCode::OK);
    assert!(v["items"].as_array().unwrap().is_empty());

    let (_, limits) = get_json(&app, "/limits?feature=search").await;
    assert_eq!(limits["remaining"], 2);
}

#[tokio::test]
async fn search_is_guest_limited_after_two_uses() {
    let app = router_with_results();

    for _ in 0..2 {
        let (status, _) = get_json(&app, "/search?q=milk").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, v) = get_json(&app, "/search?q=milk").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(v["error"], "guest limit reached");
    assert!(v["retry_after_secs"].as_u64().unwrap() > 0);
    assert!(v["retry_after"].is_string());
}

#[tokio::test]
async fn limits_reports_allowance_shape() {
    let app = router_with_results();
    let (status, v) = get_json(&app, "/limits?feature=search").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["feature"], "search");
    assert_eq!(v["allowed"], true);
    assert_eq!(v["remaining"], 2);
    assert_eq!(v["reset_secs"], 0);
    assert_eq!(v["reset_in"], "now");
}

#[tokio::test]
async fn successful_searches_land_in_history() {
    let app = router_with_results();
    get_json(&app, "/search?q=milk").await;
    get_json(&app, "/search?q=bread").await;

    let (status, v) = get_json(&app, "/history").await;
    assert_eq!(status, StatusCode::OK);
    let rows = v.as_array().expect("history array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["query"], "bread", "newest first");
    assert_eq!(rows[1]["query"], "milk");
    assert_eq!(rows[0]["favorite"], false);
}

#[tokio::test]
async fn synthetic_searches_stay_out_of_history() {
    let app = router_all_empty();
    get_json(&app, "/search?q=dragonfruit").await;

    let (_, v) = get_json(&app, "/history").await;
    assert!(v.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn history_favorite_toggle_and_remove() {
    let app = router_with_results();
    get_json(&app, "/search?q=milk").await;
    let (_, v) = get_json(&app, "/history").await;
    let id = v[0]["id"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("POST")
        .uri(format!("/history/{id}/favorite"))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (_, v) = get_json(&app, "/history").await;
    assert_eq!(v[0]["favorite"], true);

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/history/{id}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (_, v) = get_json(&app, "/history").await;
    assert!(v.as_array().unwrap().is_empty());

    // Unknown ids are a 404, both routes.
    let req = Request::builder()
        .method("POST")
        .uri("/history/nope/favorite")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_lists_every_adapter_with_health() {
    let app = router_with_results();
    let (status, v) = get_json(&app, "/status").await;

    assert_eq!(status, StatusCode::OK);
    let sources = v["sources"].as_array().expect("sources array");
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["source"], "catalog");
    assert_eq!(sources[0]["working"], true);
    assert_eq!(sources[0]["error_count"], 0);
    assert!(sources[0]["last_checked"].is_null(), "not yet attempted");
    assert_eq!(v["cached_searches"], 0);
}
