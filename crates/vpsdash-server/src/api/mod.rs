//! HTTP API: маршрутизация и состояние приложения.

pub mod auth_routes;
pub mod backup_routes;
pub mod exchange_routes;
pub mod extract;
pub mod folder_routes;
pub mod metrics_routes;
pub mod middleware;
pub mod payment_routes;
pub mod rate_limit;
pub mod server_routes;

use crate::services::exchange_service::ExchangeService;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rate_limit::RateLimiter;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Общее состояние приложения.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt_secret: String,
    pub admin_password_hash: String,
    pub token_ttl_minutes: i64,
    pub metrics_retention_hours: i64,
    pub exchange: ExchangeService,
    pub login_limiter: RateLimiter,
}

/// Построить маршрутизатор Axum. Все маршруты API лежат под `/api`.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .merge(auth_routes::routes(state.login_limiter.clone()))
        .merge(folder_routes::routes())
        .merge(server_routes::routes())
        .merge(payment_routes::routes())
        .merge(exchange_routes::routes())
        .merge(metrics_routes::routes())
        .merge(backup_routes::routes());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health — проверка работоспособности сервера.
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_ok = state.db.execute_unprepared("SELECT 1").await.is_ok();
    Json(serde_json::json!({
        "status": if db_ok { "healthy" } else { "error" },
        "database": db_ok,
        "service": "vpsdash-server"
    }))
}
