//! HTTP status endpoint over the latest-results store.
//!
//! Routes:
//! - `GET /trend?interval=1h&format=text|json` (alias `/api/trend/btc`)
//! - `GET /api/trend?interval=1h`: wrapped form keyed by lower-case base asset
//! - `GET /trends`: every latest result
//! - `GET /health`
//!
//! The single-pair routes report on the configured default symbol. Its base
//! asset (`BTC` for `BTCUSDT`) is what clients see.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use trendwatch_core::domain::{base_asset, Interval, PairKey, ParseIntervalError, TrendResult};

use crate::store::LatestResults;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct StatusState {
    pub store: LatestResults,
    pub default_symbol: String,
    pub default_interval: Interval,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub interval: Option<String>,
    pub format: Option<String>,
}

/// JSON body for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendView {
    pub symbol: String,
    pub interval: String,
    pub trend: String,
    pub current_price: f64,
    pub ema_short: f64,
    pub ema_long: f64,
    pub time: String,
}

impl TrendView {
    fn from_result(r: &TrendResult) -> Self {
        Self {
            symbol: base_asset(&r.symbol).to_string(),
            interval: r.interval.to_string(),
            trend: r.label.to_string(),
            current_price: r.indicators.price,
            ema_short: r.indicators.ema_short,
            ema_long: r.indicators.ema_long,
            time: r.evaluated_at.format(TIME_FORMAT).to_string(),
        }
    }
}

pub fn router(state: StatusState) -> Router {
    Router::new()
        .route("/trend", get(trend))
        .route("/api/trend/btc", get(trend))
        .route("/api/trend", get(trend_wrapped))
        .route("/trends", get(all_trends))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` flips to true or its sender is dropped.
pub async fn serve(
    listener: TcpListener,
    state: StatusState,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "status endpoint listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
}

fn resolve_interval(state: &StatusState, q: &TrendQuery) -> Result<Interval, Response> {
    match q.interval.as_deref().filter(|s| !s.is_empty()) {
        None => Ok(state.default_interval),
        Some(raw) => raw.parse().map_err(|e: ParseIntervalError| {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
        }),
    }
}

async fn trend(State(state): State<StatusState>, Query(q): Query<TrendQuery>) -> Response {
    let interval = match resolve_interval(&state, &q) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    let base = base_asset(&state.default_symbol).to_string();
    let latest = state
        .store
        .get(&PairKey::new(state.default_symbol.clone(), interval));
    let text = q.format.as_deref() == Some("text");

    match (latest, text) {
        (Some(r), true) => plain(StatusCode::OK, format!("{base} Trend: {}", r.label)),
        (None, true) => plain(StatusCode::OK, format!("{base} Trend: unknown")),
        (Some(r), false) => Json(TrendView::from_result(&r)).into_response(),
        (None, false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("{base} Trend: unknown") })),
        )
            .into_response(),
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WrappedView {
    Found(TrendView),
    Missing { error: &'static str },
}

async fn trend_wrapped(State(state): State<StatusState>, Query(q): Query<TrendQuery>) -> Response {
    let interval = match resolve_interval(&state, &q) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    let view = match state
        .store
        .get(&PairKey::new(state.default_symbol.clone(), interval))
    {
        Some(r) => WrappedView::Found(TrendView::from_result(&r)),
        None => WrappedView::Missing { error: "unknown" },
    };
    let key = base_asset(&state.default_symbol).to_lowercase();
    Json(BTreeMap::from([(key, view)])).into_response()
}

async fn all_trends(State(state): State<StatusState>) -> Json<Vec<TrendView>> {
    Json(
        state
            .store
            .snapshot()
            .iter()
            .map(TrendView::from_result)
            .collect(),
    )
}

async fn health(State(state): State<StatusState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "pairs": state.store.len(),
        "batches": state.store.batches(),
        "last_cycle": state.store.published_at().map(|t| t.format(TIME_FORMAT).to_string()),
    }))
}

fn plain(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
