//! Конфигурация сервера VPS-дашборда.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Адрес для прослушивания (например "0.0.0.0:8000")
    pub listen: String,

    /// URL подключения к БД
    pub db_url: String,

    /// Секрет JWT (генерируется случайно если не задан)
    pub jwt_secret: String,

    /// Хэш пароля администратора (SHA-256 hex)
    pub admin_password_hash: String,

    /// Время жизни токена доступа, минуты
    pub token_ttl_minutes: i64,

    /// Попыток входа в минуту с одного IP
    pub login_rate_limit: u32,

    /// Сколько часов хранить снимки метрик
    pub metrics_retention_hours: i64,

    pub probe: ProbeConfig,

    pub exchange: ExchangeConfig,
}

/// Проверка доступности серверов.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Период фоновой проверки
    pub interval: Duration,

    /// Таймаут одной попытки TCP-подключения
    pub timeout: Duration,

    /// Порты в порядке перебора
    pub ports: Vec<u16>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(5),
            ports: vec![22, 80, 443, 8080],
        }
    }
}

/// Источник и кэш курсов валют.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// JSON ЦБ РФ с ежедневными курсами
    pub api_url: String,

    /// Время жизни кэша курсов
    pub ttl: Duration,

    /// Надбавка к курсу в рублях (комиссия при оплате картой)
    pub markup_rub: f64,

    /// Валюты, курсы которых сохраняются
    pub tracked_currencies: Vec<String>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.cbr-xml-daily.ru/daily_json.js".to_string(),
            ttl: Duration::from_secs(3600),
            markup_rub: 5.0,
            tracked_currencies: vec!["USD".to_string(), "EUR".to_string()],
        }
    }
}

/// Разобрать список через запятую ("22,80" или "usd, eur").
pub fn parse_list<T: std::str::FromStr>(raw: &str) -> Result<Vec<T>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .map_err(|_| format!("Некорректное значение в списке: {s}"))
        })
        .collect()
}

/// Хэшировать пароль (SHA-256 hex).
pub fn hash_password(password: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Проверить пароль по хэшу за постоянное время.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use subtle::ConstantTimeEq;
    hash_password(password).as_bytes().ct_eq(hash.as_bytes()).into()
}

/// Случайный секрет в hex (32 байта).
pub fn random_hex_secret() -> Result<String, getrandom::Error> {
    let mut buf = [0u8; 32];
    getrandom::fill(&mut buf)?;
    Ok(hex::encode(buf))
}
