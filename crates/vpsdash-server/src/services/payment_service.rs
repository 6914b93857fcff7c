//! Сервис оплат: отметка «оплачено», журнал, сводка за месяц.

use crate::error::AppError;
use crate::services::exchange_service::ExchangeService;
use crate::services::server_service;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use vpsdash_domain::billing::{self, normalize_currency};
use vpsdash_domain::models::{PaymentResponse, PaymentSummary};
use vpsdash_domain::{BillingError, Month, RateTable, BASE_CURRENCY};
use vpsdash_entities::{payments, servers};

pub const DEFAULT_PAYMENTS_LIMIT: u64 = 50;
pub const MAX_PAYMENTS_LIMIT: u64 = 1000;

/// Фильтр журнала оплат.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub month: Option<Month>,
    pub server_id: Option<i32>,
    pub limit: Option<u64>,
}

/// Отметить сервер оплаченным за текущий месяц.
///
/// Платёж и признак `last_paid_month` сохраняются в одной транзакции:
/// либо оба, либо ничего.
pub async fn record_payment(
    db: &DatabaseConnection,
    exchange: &ExchangeService,
    server_id: i32,
) -> Result<PaymentResponse, AppError> {
    record_payment_for_month(db, exchange, server_id, Month::current()).await
}

pub async fn record_payment_for_month(
    db: &DatabaseConnection,
    exchange: &ExchangeService,
    server_id: i32,
    month: Month,
) -> Result<PaymentResponse, AppError> {
    let server = server_service::find_server(db, server_id).await?;
    if !billing::is_payable(&server) {
        return Err(BillingError::FreeServer.into());
    }

    let rates = if normalize_currency(&server.currency) == BASE_CURRENCY {
        RateTable::new()
    } else {
        exchange.get_rates(db).await?.rates
    };
    let quote = billing::quote_payment(&server, &rates, month)?;

    let txn = db.begin().await?;

    let payment = payments::ActiveModel {
        server_id: Set(server.id),
        amount: Set(quote.amount),
        currency: Set(quote.currency.clone()),
        amount_rub: Set(quote.amount_rub),
        exchange_rate: Set(quote.exchange_rate),
        paid_at: Set(Utc::now()),
        payment_month: Set(quote.payment_month.to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let server_name = server.name.clone();
    let mut model: servers::ActiveModel = server.into();
    model.last_paid_month = Set(Some(quote.payment_month.to_string()));
    model.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        server_id,
        month = %quote.payment_month,
        "Оплата записана: {} {} = {} RUB",
        quote.amount,
        quote.currency,
        quote.amount_rub
    );
    Ok(payment.into_response(server_name))
}

/// Журнал оплат, новые сверху.
pub async fn list_payments(
    db: &DatabaseConnection,
    filter: PaymentFilter,
) -> Result<Vec<PaymentResponse>, AppError> {
    let limit = filter.limit.unwrap_or(DEFAULT_PAYMENTS_LIMIT);
    if limit == 0 || limit > MAX_PAYMENTS_LIMIT {
        return Err(AppError::Validation(format!(
            "limit должен быть от 1 до {MAX_PAYMENTS_LIMIT}"
        )));
    }

    let mut query = payments::Entity::find()
        .find_also_related(servers::Entity)
        .order_by_desc(payments::Column::PaidAt)
        .order_by_desc(payments::Column::Id);
    if let Some(month) = filter.month {
        query = query.filter(payments::Column::PaymentMonth.eq(month.to_string()));
    }
    if let Some(server_id) = filter.server_id {
        query = query.filter(payments::Column::ServerId.eq(server_id));
    }

    let rows = query.limit(limit).all(db).await?;
    Ok(rows
        .into_iter()
        .map(|(payment, server)| {
            let name = server
                .map(|s| s.name)
                .unwrap_or_else(|| format!("Сервер #{}", payment.server_id));
            payment.into_response(name)
        })
        .collect())
}

/// Сводка оплат за месяц.
pub async fn summary(db: &DatabaseConnection, month: Month) -> Result<PaymentSummary, AppError> {
    let rows = payments::Entity::find()
        .filter(payments::Column::PaymentMonth.eq(month.to_string()))
        .all(db)
        .await?;
    Ok(billing::summarize(&rows, month))
}

/// Удалить запись журнала. Признак `last_paid_month` сервера не меняется.
pub async fn delete_payment(db: &DatabaseConnection, id: i32) -> Result<(), AppError> {
    let result = payments::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Оплата не найдена: {id}")));
    }
    tracing::info!("Удалена оплата {id}");
    Ok(())
}
