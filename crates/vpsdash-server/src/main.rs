//! Точка входа сервера VPS-дашборда.

use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vpsdash_server::config::{
    hash_password, parse_list, random_hex_secret, ExchangeConfig, ProbeConfig, ServerConfig,
};

#[derive(Parser)]
#[command(
    name = "vpsdash-server",
    about = "VPS Dashboard — учёт серверов, оплат и метрик"
)]
struct Cli {
    /// Адрес для прослушивания (host:port)
    #[arg(long, default_value = "0.0.0.0:8000")]
    listen: String,

    /// URL базы данных
    #[arg(
        long,
        default_value = "sqlite:./vpsdash.db?mode=rwc",
        env = "DATABASE_URL"
    )]
    db_url: String,

    /// Секрет JWT (случайный если не задан)
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Пароль администратора
    #[arg(long, env = "ADMIN_PASSWORD")]
    admin_password: Option<String>,

    /// Время жизни токена доступа, минуты (по умолчанию 7 дней)
    #[arg(long, default_value_t = 60 * 24 * 7)]
    token_ttl_minutes: i64,

    /// Интервал проверки доступности, секунды
    #[arg(long, default_value_t = 60)]
    ping_interval_secs: u64,

    /// Таймаут одной попытки подключения, секунды
    #[arg(long, default_value_t = 5)]
    ping_timeout_secs: u64,

    /// Порты для проверки доступности, по порядку
    #[arg(long, default_value = "22,80,443,8080")]
    ping_ports: String,

    /// Источник курсов валют
    #[arg(long, default_value = "https://www.cbr-xml-daily.ru/daily_json.js")]
    exchange_api_url: String,

    /// Время жизни кэша курсов, секунды
    #[arg(long, default_value_t = 3600)]
    exchange_ttl_secs: u64,

    /// Надбавка к курсу ЦБ, рубли
    #[arg(long, default_value_t = 5.0)]
    exchange_markup: f64,

    /// Отслеживаемые валюты
    #[arg(long, default_value = "USD,EUR")]
    tracked_currencies: String,

    /// Сколько часов хранить снимки метрик
    #[arg(long, default_value_t = 24)]
    metrics_retention_hours: i64,

    /// Попыток входа в минуту с одного IP
    #[arg(long, default_value_t = 10)]
    login_rate_limit: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логгера
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    url::Url::parse(&cli.exchange_api_url)
        .map_err(|e| anyhow::anyhow!("Некорректный --exchange-api-url: {e}"))?;
    let ports: Vec<u16> = parse_list(&cli.ping_ports).map_err(|e| anyhow::anyhow!(e))?;
    if ports.is_empty() {
        anyhow::bail!("Список --ping-ports пуст");
    }
    let tracked_currencies: Vec<String> =
        parse_list(&cli.tracked_currencies.to_ascii_uppercase()).map_err(|e| anyhow::anyhow!(e))?;

    // JWT secret: из аргумента или генерируем случайный
    let jwt_secret = match cli.jwt_secret {
        Some(secret) => secret,
        None => {
            tracing::warn!("JWT_SECRET не задан, токены не переживут перезапуск");
            random_hex_secret().map_err(|e| anyhow::anyhow!("Ошибка генерации JWT secret: {e}"))?
        }
    };

    // Хэш пароля администратора
    let admin_password = cli.admin_password.unwrap_or_else(|| {
        tracing::warn!("Пароль администратора не задан, используется 'admin' (небезопасно!)");
        "admin".to_string()
    });

    let config = ServerConfig {
        listen: cli.listen,
        db_url: cli.db_url,
        jwt_secret,
        admin_password_hash: hash_password(&admin_password),
        token_ttl_minutes: cli.token_ttl_minutes,
        login_rate_limit: cli.login_rate_limit,
        metrics_retention_hours: cli.metrics_retention_hours,
        probe: ProbeConfig {
            interval: Duration::from_secs(cli.ping_interval_secs.max(1)),
            timeout: Duration::from_secs(cli.ping_timeout_secs.max(1)),
            ports,
        },
        exchange: ExchangeConfig {
            api_url: cli.exchange_api_url,
            ttl: Duration::from_secs(cli.exchange_ttl_secs),
            markup_rub: cli.exchange_markup,
            tracked_currencies,
        },
    };

    vpsdash_server::run(config).await
}
