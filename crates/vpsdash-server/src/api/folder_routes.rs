//! Маршруты папок.

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::AdminUser;
use crate::api::AppState;
use crate::error::AppError;
use crate::services::folder_service;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vpsdash_domain::models::{
    CreateFolderRequest, FolderResponse, StatusResponse, UpdateFolderRequest,
};
use vpsdash_domain::SortBy;

#[derive(Debug, Deserialize)]
pub struct ListFoldersQuery {
    #[serde(default)]
    pub sort_by: SortBy,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/folders", get(list_folders).post(create_folder))
        .route("/folders/reorder", post(reorder_folders))
        .route(
            "/folders/{id}",
            get(get_folder).put(update_folder).delete(delete_folder),
        )
}

/// GET /api/folders — папки с серверами.
async fn list_folders(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<ListFoldersQuery>,
) -> Result<Json<Vec<FolderResponse>>, AppError> {
    let today = chrono::Utc::now().date_naive();
    let folders = folder_service::list_folders(&state.db, query.sort_by, today).await?;
    Ok(Json(folders))
}

async fn create_folder(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<FolderResponse>), AppError> {
    let folder = folder_service::create_folder(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

async fn get_folder(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<FolderResponse>, AppError> {
    Ok(Json(folder_service::get_folder(&state.db, id).await?))
}

async fn update_folder(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdateFolderRequest>,
) -> Result<Json<FolderResponse>, AppError> {
    Ok(Json(folder_service::update_folder(&state.db, id, req).await?))
}

/// DELETE /api/folders/{id} — вместе с серверами папки.
async fn delete_folder(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, AppError> {
    folder_service::delete_folder(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/folders/reorder — тело: массив id в новом порядке.
async fn reorder_folders(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(ids): ApiJson<Vec<i32>>,
) -> Result<Json<StatusResponse>, AppError> {
    folder_service::reorder_folders(&state.db, ids).await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}
