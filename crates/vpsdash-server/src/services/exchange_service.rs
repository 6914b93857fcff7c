//! Курсы валют к рублю: загрузка из ЦБ РФ, кэш в БД с TTL.
//!
//! Если источник недоступен, отдаётся устаревший кэш. Если кэша нет,
//! таблица содержит только рубль, а `updated_at` равен `null`.

use crate::config::ExchangeConfig;
use crate::error::AppError;
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, TransactionTrait,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use vpsdash_domain::billing::{normalize_currency, round2};
use vpsdash_domain::models::ExchangeRatesResponse;
use vpsdash_domain::{RateTable, BASE_CURRENCY};
use vpsdash_entities::exchange_rates;

/// Внешний источник курсов.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Курсы отслеживаемых валют (стоимость единицы в рублях).
    async fn fetch(&self) -> anyhow::Result<RateTable>;
}

/// Источник курсов ЦБ РФ (daily_json).
pub struct CbrRateSource {
    client: reqwest::Client,
    url: String,
    markup_rub: f64,
    tracked: Vec<String>,
}

impl CbrRateSource {
    pub fn new(config: &ExchangeConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Не удалось создать HTTP клиент")?;
        Ok(Self {
            client,
            url: config.api_url.clone(),
            markup_rub: config.markup_rub,
            tracked: config
                .tracked_currencies
                .iter()
                .map(|c| normalize_currency(c))
                .collect(),
        })
    }
}

#[async_trait]
impl RateSource for CbrRateSource {
    async fn fetch(&self) -> anyhow::Result<RateTable> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Запрос к {} не выполнен", self.url))?
            .error_for_status()?
            .text()
            .await?;
        parse_cbr_rates(&body, &self.tracked, self.markup_rub)
    }
}

#[derive(Debug, Deserialize)]
struct CbrDaily {
    #[serde(rename = "Valute")]
    valute: HashMap<String, CbrValute>,
}

#[derive(Debug, Deserialize)]
struct CbrValute {
    #[serde(rename = "Nominal")]
    nominal: f64,
    #[serde(rename = "Value")]
    value: f64,
}

/// Разобрать ответ ЦБ: курс = Value / Nominal + надбавка, округление до копеек.
pub fn parse_cbr_rates(body: &str, tracked: &[String], markup_rub: f64) -> anyhow::Result<RateTable> {
    let daily: CbrDaily = serde_json::from_str(body).context("Некорректный ответ ЦБ")?;

    let mut rates = RateTable::new();
    for code in tracked {
        let Some(entry) = daily.valute.get(code) else {
            tracing::warn!("В ответе ЦБ нет валюты {code}");
            continue;
        };
        if entry.nominal <= 0.0 || !entry.value.is_finite() {
            tracing::warn!("Некорректный курс ЦБ для {code}: {entry:?}");
            continue;
        }
        rates.insert(code.clone(), round2(entry.value / entry.nominal + markup_rub));
    }

    if rates.is_empty() {
        anyhow::bail!("В ответе ЦБ нет ни одной отслеживаемой валюты");
    }
    Ok(rates)
}

/// Кэширующий сервис курсов.
#[derive(Clone)]
pub struct ExchangeService {
    source: Arc<dyn RateSource>,
    ttl: chrono::Duration,
    refresh_lock: Arc<Mutex<()>>,
}

impl ExchangeService {
    pub fn new(source: Arc<dyn RateSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1)),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Текущие курсы: из кэша, если он свежий, иначе с обновлением.
    pub async fn get_rates(&self, db: &DatabaseConnection) -> Result<ExchangeRatesResponse, AppError> {
        let cached = load_cached(db).await?;
        if self.is_fresh(&cached) {
            return Ok(cached);
        }

        // Параллельные запросы не должны обновлять кэш одновременно
        let _guard = self.refresh_lock.lock().await;
        let cached = load_cached(db).await?;
        if self.is_fresh(&cached) {
            return Ok(cached);
        }

        match self.source.fetch().await {
            Ok(rates) => {
                store_rates(db, &rates).await?;
                load_cached(db).await
            }
            Err(e) => {
                tracing::warn!("Не удалось обновить курсы, используется кэш: {e:#}");
                Ok(cached)
            }
        }
    }

    /// Принудительное обновление. Ошибка источника возвращается клиенту.
    pub async fn refresh_rates(
        &self,
        db: &DatabaseConnection,
    ) -> Result<ExchangeRatesResponse, AppError> {
        let _guard = self.refresh_lock.lock().await;
        let rates = self.source.fetch().await.map_err(|e| {
            tracing::error!("Обновление курсов не удалось: {e:#}");
            AppError::Upstream(format!("Не удалось получить курсы валют: {e}"))
        })?;
        store_rates(db, &rates).await?;
        tracing::info!("Курсы валют обновлены: {rates:?}");
        load_cached(db).await
    }

    fn is_fresh(&self, cached: &ExchangeRatesResponse) -> bool {
        cached
            .updated_at
            .is_some_and(|at| Utc::now() - at < self.ttl)
    }
}

/// Курсы из БД. Рубль присутствует всегда с курсом 1.
pub async fn load_cached(db: &DatabaseConnection) -> Result<ExchangeRatesResponse, AppError> {
    let rows = exchange_rates::Entity::find().all(db).await?;

    let mut rates = RateTable::new();
    rates.insert(BASE_CURRENCY.to_string(), 1.0);
    let mut updated_at = None;
    for row in rows {
        updated_at = updated_at.max(Some(row.updated_at));
        rates.insert(row.currency, row.rate_to_rub);
    }

    Ok(ExchangeRatesResponse { rates, updated_at })
}

/// Сохранить курсы (upsert по коду валюты).
pub async fn store_rates(db: &DatabaseConnection, rates: &RateTable) -> Result<(), AppError> {
    let now = Utc::now();
    let txn = db.begin().await?;

    for (currency, rate) in rates.iter().filter(|(c, _)| c.as_str() != BASE_CURRENCY) {
        let existing = exchange_rates::Entity::find()
            .filter(exchange_rates::Column::Currency.eq(currency.as_str()))
            .one(&txn)
            .await?;

        match existing {
            Some(row) => {
                let mut model: exchange_rates::ActiveModel = row.into();
                model.rate_to_rub = Set(*rate);
                model.updated_at = Set(now);
                model.update(&txn).await?;
            }
            None => {
                exchange_rates::ActiveModel {
                    currency: Set(currency.clone()),
                    rate_to_rub: Set(*rate),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }
    }

    txn.commit().await?;
    Ok(())
}
