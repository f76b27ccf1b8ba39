//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{CacheStore, EntryInfo};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, HealthResponse, InvalidatePatternRequest, InvalidatePatternResponse,
    InvalidateResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// `CacheStore` is itself a shared handle, so cloning the state never
/// copies cached data.
#[derive(Clone)]
pub struct AppState {
    pub cache: CacheStore,
}

impl AppState {
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(CacheStore::from_config(config))
    }
}

/// Handler for `PUT /entries`
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    req.validate()?;
    state.cache.set(&req.key, &req.value, req.effective_ttl())?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for `GET /entries/:key`
pub async fn inspect_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EntryInfo>> {
    state
        .cache
        .inspect(&key)?
        .map(Json)
        .ok_or(CacheError::NotFound(key))
}

/// Handler for `DELETE /entries/:key`
///
/// Idempotent: deleting an absent key succeeds with `removed: false`.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let removed = state.cache.invalidate(&key)?;
    Ok(Json(InvalidateResponse::new(key, removed)))
}

/// Handler for `POST /invalidate`
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidatePatternRequest>,
) -> Result<Json<InvalidatePatternResponse>> {
    let removed = state.cache.invalidate_pattern(&req.pattern)?;
    Ok(Json(InvalidatePatternResponse::new(req.pattern, removed)))
}

/// Handler for `DELETE /entries`
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear();
    Json(ClearResponse::cleared())
}

/// Handler for `GET /stats`
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
