//! Маршруты аутентификации: вход администратора по паролю.

use crate::api::extract::ApiJson;
use crate::api::middleware::{self, AdminUser};
use crate::api::rate_limit::{self, RateLimiter};
use crate::api::AppState;
use crate::config::verify_password;
use crate::error::AppError;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use vpsdash_domain::models::{AuthCheckResponse, LoginRequest, TokenResponse};

pub fn routes(limiter: RateLimiter) -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route_layer(axum::middleware::from_fn(move |req, next| {
            rate_limit::limit_by_ip(limiter.clone(), req, next)
        }))
        .route("/auth/check", get(check))
}

/// POST /api/auth/login — выдать токен доступа.
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if !verify_password(&req.password, &state.admin_password_hash) {
        tracing::warn!("Неудачная попытка входа");
        return Err(AppError::Unauthorized("Неверный пароль".into()));
    }

    let access_token = middleware::create_access_token(&state.jwt_secret, state.token_ttl_minutes)?;
    tracing::info!("Администратор вошёл в систему");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// GET /api/auth/check — токен действителен.
async fn check(_admin: AdminUser) -> Json<AuthCheckResponse> {
    Json(AuthCheckResponse {
        auth_required: true,
    })
}
