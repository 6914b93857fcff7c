//! Маршруты резервного копирования.

use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::middleware::AdminUser;
use crate::api::AppState;
use crate::error::AppError;
use crate::services::backup_service;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vpsdash_domain::models::{BackupData, ImportResult};

fn default_replace() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    #[serde(default = "default_replace")]
    pub replace: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/backup/export", get(export))
        .route("/backup/import", post(import))
}

async fn export(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<BackupData>, AppError> {
    Ok(Json(backup_service::export(&state.db).await?))
}

/// POST /api/backup/import?replace=true — по умолчанию заменяет все данные.
async fn import(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<ImportQuery>,
    ApiJson(data): ApiJson<BackupData>,
) -> Result<Json<ImportResult>, AppError> {
    Ok(Json(
        backup_service::import(&state.db, data, query.replace).await?,
    ))
}
