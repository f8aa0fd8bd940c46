use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// 告警列表默认条数
pub const DEFAULT_ALERT_LIMIT: usize = 5;
const MAX_ALERT_LIMIT: usize = 1000;

/// 历史查询默认窗口（分钟）
pub const DEFAULT_HISTORY_MINUTES: i64 = 60;
/// chrono 可表示的最大分钟数
const MAX_HISTORY_MINUTES: i64 = i64::MAX / 60_000;

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub minutes: Option<i64>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/alerts", get(list_alerts))
        .route("/api/v1/history/:metric", get(metric_history))
        .route("/api/v1/snapshot", get(latest_snapshot))
        .route("/api/v1/alert-states", get(alert_states))
        .route("/metrics", get(export_metrics))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;

    Json(serde_json::json!({
        "status": "ok",
        "last_cycle": snapshot.as_ref().map(|s| s.timestamp),
        "worst_status": snapshot.as_ref().map(|s| s.worst_status()),
        "subscribers": state.event_bus.subscriber_count(),
    }))
}

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertsQuery>,
) -> impl IntoResponse {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ALERT_LIMIT)
        .min(MAX_ALERT_LIMIT);

    match state.store.recent(limit).await {
        Ok(alerts) => (StatusCode::OK, Json(serde_json::json!(alerts))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

async fn metric_history(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let minutes = query.minutes.unwrap_or(DEFAULT_HISTORY_MINUTES);
    if minutes <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "minutes must be positive" })),
        );
    }
    let minutes = minutes.min(MAX_HISTORY_MINUTES);

    let entries = state.history.query(&metric, minutes).await;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "metric": metric,
            "minutes": minutes,
            "entries": entries,
        })),
    )
}

async fn latest_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.snapshot.read().await.as_ref() {
        Some(snapshot) => (StatusCode::OK, Json(serde_json::json!(snapshot))),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no cycle has completed yet" })),
        ),
    }
}

async fn alert_states(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!(state.tracker.states().await))
}

async fn export_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.export() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            e.to_string(),
        ),
    }
}
