//! Фоновая проверка доступности серверов по TCP.

use crate::config::ProbeConfig;
use crate::error::AppError;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use vpsdash_domain::models::ServerStatus;
use vpsdash_entities::servers;

/// Итог одного прохода.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    pub total: usize,
    pub online: usize,
}

/// Цикл проверок. Завершается при получении сигнала остановки.
pub async fn run_probe_loop(
    db: DatabaseConnection,
    config: ProbeConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                tracing::info!("Проверка доступности остановлена");
                return;
            }
        }

        match probe_all(&db, &config).await {
            Ok(summary) => tracing::info!(
                "Проверка доступности: {} из {} серверов online",
                summary.online,
                summary.total
            ),
            Err(e) => tracing::error!("Ошибка проверки доступности: {e}"),
        }
    }
}

/// Проверить все серверы параллельно и сохранить статусы.
pub async fn probe_all(
    db: &DatabaseConnection,
    config: &ProbeConfig,
) -> Result<ProbeSummary, AppError> {
    let targets = servers::Entity::find().all(db).await?;
    let ports: Arc<[u16]> = config.ports.clone().into();

    let mut tasks = JoinSet::new();
    for server in targets {
        let ports = Arc::clone(&ports);
        let timeout = config.timeout;
        tasks.spawn(async move {
            let ping = probe_host(&server.ip, &ports, timeout).await;
            (server.id, ping)
        });
    }

    let mut summary = ProbeSummary::default();
    while let Some(joined) = tasks.join_next().await {
        let (id, ping) = match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Задача проверки завершилась аварийно: {e}");
                continue;
            }
        };

        summary.total += 1;
        let status = if ping.is_some() {
            summary.online += 1;
            ServerStatus::Online
        } else {
            ServerStatus::Offline
        };
        tracing::debug!(server_id = id, ping = ?ping, "Статус: {status}");

        servers::Entity::update_many()
            .col_expr(servers::Column::Status, Expr::value(status.to_string()))
            .col_expr(servers::Column::LastPing, Expr::value(ping))
            .col_expr(servers::Column::LastCheck, Expr::value(Utc::now()))
            .filter(servers::Column::Id.eq(id))
            .exec(db)
            .await?;
    }

    Ok(summary)
}

/// Время TCP-подключения в миллисекундах к первому отвечающему порту.
pub async fn probe_host(host: &str, ports: &[u16], timeout: Duration) -> Option<i32> {
    for &port in ports {
        let started = Instant::now();
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => {
                let elapsed = started.elapsed().as_millis();
                return Some(i32::try_from(elapsed).unwrap_or(i32::MAX));
            }
            Ok(Err(e)) => tracing::debug!("{host}:{port} недоступен: {e}"),
            Err(_) => tracing::debug!("{host}:{port} не ответил за {timeout:?}"),
        }
    }
    None
}
