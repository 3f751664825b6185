use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header::HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use market_data::data::parse_timestamp;
use market_data::request::HistoricalRequest;
use market_data::{FetchSource, ServiceStats};
use serde_json::{json, Value};
use shared::{BarRow, OhlcvQuery};
use std::sync::Arc;
use tracing::info;

const FETCH_SOURCE_HEADER: &str = "x-fetch-source";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version))
        .route("/api/companies/:company_code/ohlcv", get(get_ohlcv))
        .route(
            "/api/market-data/cache",
            get(cache_stats).delete(clear_cache),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": option_env!("GIT_HASH").unwrap_or("unknown"),
        "git_branch": option_env!("GIT_BRANCH").unwrap_or("unknown"),
        "git_tag": option_env!("GIT_TAG").unwrap_or("unknown"),
        "build_time": option_env!("BUILD_TIME").unwrap_or("unknown"),
    }))
}

async fn get_ohlcv(
    State(state): State<Arc<AppState>>,
    Path(company_code): Path<String>,
    Query(query): Query<OhlcvQuery>,
) -> Result<Response, ApiError> {
    let tz = state.service.config().producer.timezone;
    let request = HistoricalRequest {
        symbol: company_code,
        exchange: query.exchange.clone(),
        interval: query.interval.clone(),
        start: client_datetime("startDate", query.start_date.as_deref(), tz)?,
        end: client_datetime("endDate", query.end_date.as_deref(), tz)?,
        fetch_all: query.fetch_all_data.unwrap_or(false),
        first_n_minutes: query.first_fifteen_minutes.unwrap_or(false),
        indicators: query.indicator_list(),
    };

    let fetched = state.service.fetch(&request).await?;
    info!(
        "Serving {} bars for {} from {:?}",
        fetched.bars.len(),
        request.symbol,
        fetched.source
    );

    let rows: Vec<BarRow> = fetched
        .bars
        .iter()
        .map(|r| BarRow {
            interval_start: r.timestamp,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
        })
        .collect();

    let source = HeaderValue::from_static(source_label(fetched.source));
    Ok((
        [(HeaderName::from_static(FETCH_SOURCE_HEADER), source)],
        Json(rows),
    )
        .into_response())
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<ServiceStats> {
    Json(state.service.stats())
}

async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    let before = state.service.stats();
    state.service.clear();
    Json(json!({
        "cleared": before.cache.size,
        "abandoned_in_flight": before.in_flight,
    }))
}

/// Blank values count as absent; anything else must parse.
fn client_datetime(
    field: &str,
    raw: Option<&str>,
    tz: Tz,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => parse_timestamp(text, tz).map(Some).ok_or_else(|| {
            ApiError::BadRequest(format!("{} '{}' is not a valid date or datetime", field, text))
        }),
    }
}

fn source_label(source: FetchSource) -> &'static str {
    match source {
        FetchSource::Cache => "cache",
        FetchSource::Producer => "producer",
        FetchSource::Coalesced => "coalesced",
    }
}
