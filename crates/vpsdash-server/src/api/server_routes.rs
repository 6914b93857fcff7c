//! Маршруты серверов.

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::AdminUser;
use crate::api::AppState;
use crate::error::AppError;
use crate::services::server_service;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use vpsdash_domain::models::{CreateServerRequest, ServerResponse, UpdateServerRequest};

#[derive(Debug, Deserialize)]
pub struct ListServersQuery {
    pub folder_id: Option<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/servers", get(list_servers).post(create_server))
        .route(
            "/servers/{id}",
            get(get_server).put(update_server).delete(delete_server),
        )
}

async fn list_servers(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<ListServersQuery>,
) -> Result<Json<Vec<ServerResponse>>, AppError> {
    Ok(Json(
        server_service::list_servers(&state.db, query.folder_id).await?,
    ))
}

/// POST /api/servers — папка должна существовать.
async fn create_server(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<CreateServerRequest>,
) -> Result<(StatusCode, Json<ServerResponse>), AppError> {
    let server = server_service::create_server(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(server)))
}

async fn get_server(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ServerResponse>, AppError> {
    Ok(Json(server_service::get_server(&state.db, id).await?))
}

async fn update_server(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdateServerRequest>,
) -> Result<Json<ServerResponse>, AppError> {
    Ok(Json(server_service::update_server(&state.db, id, req).await?))
}

async fn delete_server(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, AppError> {
    server_service::delete_server(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
