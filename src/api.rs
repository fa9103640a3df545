use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregator::Aggregator;
use crate::config::AppConfig;
use crate::history::{SearchHistory, SearchRecord};
use crate::item::{NormalizedItem, SOURCE_SYNTHETIC};
use crate::ratelimit::{format_time_until_reset, GuestLimiter};
use crate::sources::{
    calorie_ninjas::CalorieNinjasAdapter, catalog::CatalogAdapter, edamam::EdamamAdapter,
    open_food_facts::OpenFoodFactsAdapter, scrape::ScrapeAdapter, SourceAdapter,
};

/// Feature names the guest limiter tracks.
const FEATURE_SEARCH: &str = "search";
const FEATURE_BARCODE: &str = "barcode";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub limiter: Arc<GuestLimiter>,
    pub history: Arc<SearchHistory>,
    /// Kept separately for the barcode route; also registered as an adapter.
    pub barcode: Arc<OpenFoodFactsAdapter>,
}

impl AppState {
    /// Wire the full adapter stack from configuration. Default attempt order:
    /// catalog, edamam, calorie-ninjas, open-food-facts, scrape.
    pub fn from_config(config: &AppConfig) -> Self {
        let barcode = Arc::new(OpenFoodFactsAdapter::new());
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(CatalogAdapter::new(config.catalog_bases.clone())),
            Arc::new(EdamamAdapter::new(config.edamam_credentials.clone())),
            Arc::new(CalorieNinjasAdapter::new(config.calorie_ninjas_key.clone())),
            barcode.clone(),
            Arc::new(ScrapeAdapter::new(config.scrape_bases.clone())),
        ];
        let history = match &config.history_path {
            Some(path) => SearchHistory::load_from_file(path, config.history_cap),
            None => SearchHistory::with_capacity(config.history_cap),
        };
        Self {
            aggregator: Arc::new(Aggregator::new(adapters, config.cache_ttl())),
            limiter: Arc::new(GuestLimiter::new(
                config.guest_max_uses,
                config.guest_window(),
            )),
            history: Arc::new(history),
            barcode,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search))
        .route("/barcode/{code}", get(barcode))
        .route("/history", get(history_list))
        .route("/history/{id}/favorite", post(history_favorite))
        .route("/history/{id}", delete(history_remove))
        .route("/limits", get(limits))
        .route("/status", get(status))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    prefer: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    /// Winning adapter, or "synthetic" when every source came back empty.
    source: String,
    /// Explicit placeholder marker; clients must not drop it.
    synthetic: bool,
    items: Vec<NormalizedItem>,
}

#[derive(Serialize)]
struct LimitExceeded {
    error: &'static str,
    feature: &'static str,
    retry_after_secs: u64,
    retry_after: String,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return (
            StatusCode::OK,
            Json(SearchResponse {
                query,
                source: String::new(),
                synthetic: false,
                items: Vec::new(),
            }),
        )
            .into_response();
    }

    if !state.limiter.can_use(FEATURE_SEARCH) {
        return limit_exceeded(&state, FEATURE_SEARCH).into_response();
    }
    state.limiter.record_use(FEATURE_SEARCH);

    let items = state
        .aggregator
        .aggregate(&query, params.prefer.as_deref())
        .await;
    let source = items
        .first()
        .map(|i| i.source.clone())
        .unwrap_or_default();
    let synthetic = source == SOURCE_SYNTHETIC;
    if !synthetic {
        state.history.record(&query);
    }

    (
        StatusCode::OK,
        Json(SearchResponse {
            query,
            source,
            synthetic,
            items,
        }),
    )
        .into_response()
}

async fn barcode(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    if !state.limiter.can_use(FEATURE_BARCODE) {
        return limit_exceeded(&state, FEATURE_BARCODE).into_response();
    }
    state.limiter.record_use(FEATURE_BARCODE);

    match state.barcode.lookup_barcode(&code).await {
        Some(item) => Json(Some(item)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(None::<NormalizedItem>)).into_response(),
    }
}

fn limit_exceeded(state: &AppState, feature: &'static str) -> (StatusCode, Json<LimitExceeded>) {
    let wait = state.limiter.time_until_reset(feature);
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(LimitExceeded {
            error: "guest limit reached",
            feature,
            retry_after_secs: wait.as_secs(),
            retry_after: format_time_until_reset(wait),
        }),
    )
}

async fn history_list(State(state): State<AppState>) -> Json<Vec<SearchRecord>> {
    Json(state.history.snapshot())
}

async fn history_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.history.toggle_favorite(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn history_remove(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.history.remove(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Deserialize)]
struct LimitsParams {
    #[serde(default = "default_feature")]
    feature: String,
}

fn default_feature() -> String {
    FEATURE_SEARCH.to_string()
}

#[derive(Serialize)]
struct LimitsResponse {
    feature: String,
    allowed: bool,
    remaining: u32,
    reset_secs: u64,
    reset_in: String,
}

async fn limits(
    State(state): State<AppState>,
    Query(params): Query<LimitsParams>,
) -> Json<LimitsResponse> {
    let wait = state.limiter.time_until_reset(&params.feature);
    Json(LimitsResponse {
        allowed: state.limiter.can_use(&params.feature),
        remaining: state.limiter.remaining_uses(&params.feature),
        reset_secs: wait.as_secs(),
        reset_in: format_time_until_reset(wait),
        feature: params.feature,
    })
}

#[derive(Serialize)]
struct StatusRow {
    source: String,
    working: bool,
    error_count: u32,
    last_checked: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Serialize)]
struct StatusResponse {
    sources: Vec<StatusRow>,
    cached_searches: usize,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let sources = state
        .aggregator
        .health_snapshot()
        .into_iter()
        .map(|(source, h)| StatusRow {
            source,
            working: h.working,
            error_count: h.error_count,
            last_checked: h.last_checked,
        })
        .collect();
    Json(StatusResponse {
        sources,
        cached_searches: state.aggregator.cache_len(),
    })
}
