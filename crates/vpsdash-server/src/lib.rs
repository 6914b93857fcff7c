//! Ядро сервера VPS-дашборда.

pub mod api;
pub mod config;
pub mod error;
pub mod services;


use api::rate_limit::RateLimiter;
use api::AppState;
use config::ServerConfig;
use sea_orm::{Database, DatabaseConnection};
use services::exchange_service::{CbrRateSource, ExchangeService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use vpsdash_migration::{Migrator, MigratorTrait};

/// Запустить сервер.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    // 1. Подключение к БД
    info!("Подключение к базе данных: {}", config.db_url);
    let db: DatabaseConnection = Database::connect(&config.db_url).await?;

    // 2. Автоматические миграции
    info!("Выполнение миграций...");
    Migrator::up(&db, None).await?;

    // 3. Состояние приложения
    let source = CbrRateSource::new(&config.exchange)?;
    let state = AppState {
        db: db.clone(),
        jwt_secret: config.jwt_secret.clone(),
        admin_password_hash: config.admin_password_hash.clone(),
        token_ttl_minutes: config.token_ttl_minutes,
        metrics_retention_hours: config.metrics_retention_hours,
        exchange: ExchangeService::new(Arc::new(source), config.exchange.ttl),
        login_limiter: RateLimiter::new(config.login_rate_limit, Duration::from_secs(60)),
    };

    // 4. Маршрутизатор
    let app = api::build_router(state);

    // 5. Graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Получен сигнал завершения, останавливаю сервер...");
        let _ = shutdown_tx.send(true);
    });

    // 6. Фоновая проверка доступности серверов
    let probe = tokio::spawn(services::probe_service::run_probe_loop(
        db.clone(),
        config.probe.clone(),
        shutdown_rx.clone(),
    ));

    // 7. Запуск сервера
    info!("Сервер запущен на {}", config.listen);
    serve(&config.listen, app, shutdown_rx).await?;
    probe.await.ok();

    info!("Сервер остановлен");
    Ok(())
}

/// HTTP без TLS: сервер рассчитан на работу за обратным прокси.
async fn serve(
    listen: &str,
    app: axum::Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        while !*shutdown_rx.borrow() {
            if shutdown_rx.changed().await.is_err() {
                break;
            }
        }
    })
    .await?;

    Ok(())
}
