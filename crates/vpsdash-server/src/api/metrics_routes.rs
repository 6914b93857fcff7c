//! Маршруты метрик: приём от агента и просмотр в дашборде.

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{AdminUser, AgentServer};
use crate::api::AppState;
use crate::error::AppError;
use crate::services::metrics_service::{self, DEFAULT_HISTORY_HOURS};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::BTreeMap;
use vpsdash_domain::models::{
    AgentTokenResponse, CurrentMetrics, MetricsHistoryResponse, MetricsSubmit, SubmitResponse,
};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/metrics/submit", post(submit))
        .route("/metrics/current/all", get(current_all))
        .route("/metrics/{server_id}", get(history))
        .route(
            "/metrics/{server_id}/token",
            post(generate_token).get(get_token).delete(revoke_token),
        )
}

/// POST /api/metrics/submit — снимок от агента (заголовок X-Agent-Token).
async fn submit(
    State(state): State<AppState>,
    AgentServer(server): AgentServer,
    ApiJson(data): ApiJson<MetricsSubmit>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let response =
        metrics_service::submit(&state.db, server, data, state.metrics_retention_hours).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn current_all(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<BTreeMap<String, CurrentMetrics>>, AppError> {
    Ok(Json(metrics_service::current_all(&state.db).await?))
}

async fn history(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(server_id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<MetricsHistoryResponse>, AppError> {
    let hours = query.hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    Ok(Json(
        metrics_service::history(&state.db, server_id, hours).await?,
    ))
}

async fn generate_token(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(server_id): ApiPath<i32>,
) -> Result<Json<AgentTokenResponse>, AppError> {
    Ok(Json(
        metrics_service::generate_agent_token(&state.db, server_id).await?,
    ))
}

async fn get_token(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(server_id): ApiPath<i32>,
) -> Result<Json<AgentTokenResponse>, AppError> {
    Ok(Json(
        metrics_service::get_agent_token(&state.db, server_id).await?,
    ))
}

async fn revoke_token(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(server_id): ApiPath<i32>,
) -> Result<StatusCode, AppError> {
    metrics_service::revoke_agent_token(&state.db, server_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
