//! Маршруты курсов валют.

use crate::api::middleware::AdminUser;
use crate::api::AppState;
use crate::error::AppError;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use vpsdash_domain::models::ExchangeRatesResponse;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/exchange/rates", get(get_rates))
        .route("/exchange/rates/refresh", post(refresh_rates))
}

async fn get_rates(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ExchangeRatesResponse>, AppError> {
    Ok(Json(state.exchange.get_rates(&state.db).await?))
}

/// POST /api/exchange/rates/refresh — 502, если источник недоступен.
async fn refresh_rates(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ExchangeRatesResponse>, AppError> {
    Ok(Json(state.exchange.refresh_rates(&state.db).await?))
}
