//! Маршруты оплат.

use crate::api::extract::{ApiPath, ApiQuery};
use crate::api::middleware::AdminUser;
use crate::api::AppState;
use crate::error::AppError;
use crate::services::payment_service::{self, PaymentFilter};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vpsdash_domain::models::{PaymentResponse, PaymentSummary};
use vpsdash_domain::Month;

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub month: Option<Month>,
    pub server_id: Option<i32>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub month: Option<Month>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments))
        .route("/payments/summary", get(summary))
        // POST принимает id сервера, DELETE принимает id оплаты
        .route("/payments/{id}", post(record_payment).delete(delete_payment))
}

/// POST /api/payments/{server_id} — отметить оплату за текущий месяц.
async fn record_payment(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(server_id): ApiPath<i32>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    let payment = payment_service::record_payment(&state.db, &state.exchange, server_id).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn list_payments(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<ListPaymentsQuery>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let filter = PaymentFilter {
        month: query.month,
        server_id: query.server_id,
        limit: query.limit,
    };
    Ok(Json(payment_service::list_payments(&state.db, filter).await?))
}

/// GET /api/payments/summary — по умолчанию текущий месяц.
async fn summary(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<Json<PaymentSummary>, AppError> {
    let month = query.month.unwrap_or_else(Month::current);
    Ok(Json(payment_service::summary(&state.db, month).await?))
}

async fn delete_payment(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, AppError> {
    payment_service::delete_payment(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
