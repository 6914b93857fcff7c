//! Метрики агентов: приём снимков, история, средние, токены агентов.

use crate::config::{hash_password, random_hex_secret};
use crate::error::AppError;
use crate::services::server_service;
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use std::collections::BTreeMap;
use vpsdash_domain::metrics::{rolling_averages, AVERAGE_WINDOW_HOURS};
use vpsdash_domain::models::{
    AgentTokenResponse, CurrentMetrics, MetricsHistoryResponse, MetricsSnapshot, MetricsSubmit,
    ServerStatus, SubmitResponse,
};
use vpsdash_entities::{server_metrics, servers};

pub const DEFAULT_HISTORY_HOURS: i64 = 12;
pub const MAX_HISTORY_HOURS: i64 = 168;

fn validate_submit(data: &MetricsSubmit) -> Result<(), AppError> {
    let percents = [
        ("cpu_percent", data.cpu_percent),
        ("memory_percent", data.memory_percent),
        ("disk_percent", data.disk_percent),
    ];
    for (field, value) in percents {
        if !(0.0..=100.0).contains(&value) {
            return Err(AppError::Validation(format!(
                "{field}: значение {value} вне диапазона 0..100"
            )));
        }
    }
    if data.memory_used_mb < 0 || data.memory_total_mb < 0 || data.uptime_seconds < 0 {
        return Err(AppError::Validation(
            "Объём памяти и аптайм не могут быть отрицательными".into(),
        ));
    }
    if data.disk_used_gb < 0.0 || data.disk_total_gb < 0.0 {
        return Err(AppError::Validation(
            "Объём диска не может быть отрицательным".into(),
        ));
    }
    Ok(())
}

/// Принять снимок от агента. Сервер помечается online, старые снимки
/// сверх окна хранения удаляются.
pub async fn submit(
    db: &DatabaseConnection,
    server: servers::Model,
    data: MetricsSubmit,
    retention_hours: i64,
) -> Result<SubmitResponse, AppError> {
    validate_submit(&data)?;

    let now = Utc::now();
    let server_id = server.id;
    let txn = db.begin().await?;

    server_metrics::ActiveModel {
        server_id: Set(server_id),
        cpu_percent: Set(data.cpu_percent),
        memory_percent: Set(data.memory_percent),
        memory_used_mb: Set(data.memory_used_mb),
        memory_total_mb: Set(data.memory_total_mb),
        disk_percent: Set(data.disk_percent),
        disk_used_gb: Set(data.disk_used_gb),
        disk_total_gb: Set(data.disk_total_gb),
        uptime_seconds: Set(data.uptime_seconds),
        load_avg_1: Set(data.load_avg_1),
        load_avg_5: Set(data.load_avg_5),
        load_avg_15: Set(data.load_avg_15),
        collected_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut model: servers::ActiveModel = server.into();
    model.status = Set(ServerStatus::Online.to_string());
    model.last_check = Set(Some(now));
    model.update(&txn).await?;

    txn.commit().await?;

    let cutoff = now - Duration::hours(retention_hours.max(1));
    let pruned = server_metrics::Entity::delete_many()
        .filter(server_metrics::Column::ServerId.eq(server_id))
        .filter(server_metrics::Column::CollectedAt.lt(cutoff))
        .exec(db)
        .await?;
    if pruned.rows_affected > 0 {
        tracing::debug!(
            server_id,
            pruned = pruned.rows_affected,
            "Удалены устаревшие снимки метрик"
        );
    }

    Ok(SubmitResponse {
        status: "ok".to_string(),
        server_id,
    })
}

/// История за `hours` часов (новые сверху) и средние за последние 12 часов.
pub async fn history(
    db: &DatabaseConnection,
    server_id: i32,
    hours: i64,
) -> Result<MetricsHistoryResponse, AppError> {
    if !(1..=MAX_HISTORY_HOURS).contains(&hours) {
        return Err(AppError::Validation(format!(
            "hours должен быть от 1 до {MAX_HISTORY_HOURS}"
        )));
    }

    let server = server_service::find_server(db, server_id).await?;
    let now = Utc::now();
    let window = Duration::hours(hours);
    let average_window = Duration::hours(AVERAGE_WINDOW_HOURS);

    let rows = server_metrics::Entity::find()
        .filter(server_metrics::Column::ServerId.eq(server_id))
        .filter(server_metrics::Column::CollectedAt.gte(now - window.max(average_window)))
        .order_by_desc(server_metrics::Column::CollectedAt)
        .order_by_desc(server_metrics::Column::Id)
        .all(db)
        .await?;

    let averages = rolling_averages(&rows, now, average_window);
    let history: Vec<MetricsSnapshot> = rows
        .into_iter()
        .filter(|r| r.collected_at >= now - window)
        .map(Into::into)
        .collect();

    Ok(MetricsHistoryResponse {
        server_id,
        server_name: server.name,
        current: history.first().cloned(),
        history,
        avg_cpu_12h: averages.cpu,
        avg_memory_12h: averages.memory,
    })
}

/// Последний снимок каждого сервера, ключ: id сервера строкой.
pub async fn current_all(
    db: &DatabaseConnection,
) -> Result<BTreeMap<String, CurrentMetrics>, AppError> {
    let rows = server_metrics::Entity::find()
        .order_by_desc(server_metrics::Column::CollectedAt)
        .order_by_desc(server_metrics::Column::Id)
        .all(db)
        .await?;

    let mut current = BTreeMap::new();
    for row in &rows {
        current
            .entry(row.server_id.to_string())
            .or_insert_with(|| CurrentMetrics::from(row));
    }
    Ok(current)
}

/// Выпустить новый токен агента. Прежний токен перестаёт действовать.
pub async fn generate_agent_token(
    db: &DatabaseConnection,
    server_id: i32,
) -> Result<AgentTokenResponse, AppError> {
    let server = server_service::find_server(db, server_id).await?;
    let token = random_hex_secret()
        .map_err(|e| AppError::Internal(format!("Ошибка генерации токена: {e}")))?;

    let server_name = server.name.clone();
    let mut model: servers::ActiveModel = server.into();
    model.agent_token_hash = Set(Some(hash_password(&token)));
    model.agent_token = Set(Some(token.clone()));
    model.update(db).await?;

    tracing::info!(server_id, "Выпущен токен агента");
    Ok(AgentTokenResponse {
        agent_token: token,
        server_id,
        server_name,
    })
}

pub async fn get_agent_token(
    db: &DatabaseConnection,
    server_id: i32,
) -> Result<AgentTokenResponse, AppError> {
    let server = server_service::find_server(db, server_id).await?;
    let token = server
        .agent_token
        .ok_or_else(|| AppError::NotFound("Токен агента не выпущен".into()))?;
    Ok(AgentTokenResponse {
        agent_token: token,
        server_id,
        server_name: server.name,
    })
}

pub async fn revoke_agent_token(db: &DatabaseConnection, server_id: i32) -> Result<(), AppError> {
    let server = server_service::find_server(db, server_id).await?;
    let mut model: servers::ActiveModel = server.into();
    model.agent_token = Set(None);
    model.agent_token_hash = Set(None);
    model.update(db).await?;
    tracing::info!(server_id, "Отозван токен агента");
    Ok(())
}
