//! Схема JSON API (snake_case, числовые идентификаторы).

use crate::billing::{BillableServer, LedgerEntry, RateTable};
use crate::metrics::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_FOLDER_COLOR: &str = "#6b7280";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const NO_PAYMENT_DATE: &str = "-";
pub const BACKUP_VERSION: &str = "1.0";

fn default_color() -> String {
    DEFAULT_FOLDER_COLOR.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_payment_date() -> String {
    NO_PAYMENT_DATE.to_string()
}

fn default_backup_version() -> String {
    BACKUP_VERSION.to_string()
}

// ── Авторизация ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCheckResponse {
    pub auth_required: bool,
}

/// Тело любого ответа с ошибкой.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

// ── Серверы ──────────────────────────────────────────────────────────────────

/// Состояние доступности сервера.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Online => "online",
            ServerStatus::Offline => "offline",
            ServerStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(ServerStatus::Online),
            "offline" => Ok(ServerStatus::Offline),
            "unknown" => Ok(ServerStatus::Unknown),
            other => Err(format!("Неизвестный статус сервера: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    pub id: i32,
    pub folder_id: i32,
    pub name: String,
    pub ip: String,
    pub provider: String,
    pub price: f64,
    pub currency: String,
    pub payment_date: String,
    #[serde(default)]
    pub status: ServerStatus,
    #[serde(default)]
    pub last_ping: Option<i32>,
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_paid_month: Option<String>,
}

impl BillableServer for ServerResponse {
    fn price(&self) -> f64 {
        self.price
    }
    fn currency(&self) -> &str {
        &self.currency
    }
    fn payment_date(&self) -> &str {
        &self.payment_date
    }
    fn last_paid_month(&self) -> Option<&str> {
        self.last_paid_month.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServerRequest {
    pub folder_id: i32,
    pub name: String,
    pub ip: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_payment_date")]
    pub payment_date: String,
}

/// Частичное обновление сервера: отсутствующие поля не меняются.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateServerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<String>,
}

// ── Папки ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderResponse {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub position: i32,
    #[serde(default)]
    pub servers: Vec<ServerResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFolderRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

// ── Оплаты и курсы ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: i32,
    pub server_id: i32,
    pub server_name: String,
    pub amount: f64,
    pub currency: String,
    pub amount_rub: f64,
    pub exchange_rate: f64,
    pub paid_at: DateTime<Utc>,
    pub payment_month: String,
}

impl LedgerEntry for PaymentResponse {
    fn amount(&self) -> f64 {
        self.amount
    }
    fn currency(&self) -> &str {
        &self.currency
    }
    fn amount_rub(&self) -> f64 {
        self.amount_rub
    }
    fn payment_month(&self) -> &str {
        &self.payment_month
    }
}

/// Сводка оплат за месяц. Валюты без оплат в словари не попадают.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub total_rub: f64,
    pub by_currency: BTreeMap<String, f64>,
    pub by_currency_rub: BTreeMap<String, f64>,
    pub payments_count: usize,
    pub month: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRatesResponse {
    pub rates: RateTable,
    pub updated_at: Option<DateTime<Utc>>,
}

// ── Метрики ──────────────────────────────────────────────────────────────────

/// Данные, которые присылает агент сбора метрик.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSubmit {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_mb: i64,
    pub memory_total_mb: i64,
    pub disk_percent: f64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub uptime_seconds: i64,
    #[serde(default)]
    pub load_avg_1: Option<f64>,
    #[serde(default)]
    pub load_avg_5: Option<f64>,
    #[serde(default)]
    pub load_avg_15: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    pub server_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_mb: i64,
    pub memory_total_mb: i64,
    pub disk_percent: f64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub uptime_seconds: i64,
    pub load_avg_1: Option<f64>,
    pub load_avg_5: Option<f64>,
    pub load_avg_15: Option<f64>,
    pub collected_at: DateTime<Utc>,
}

impl Sample for MetricsSnapshot {
    fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }
    fn cpu_percent(&self) -> f64 {
        self.cpu_percent
    }
    fn memory_percent(&self) -> f64 {
        self.memory_percent
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistoryResponse {
    pub server_id: i32,
    pub server_name: String,
    pub current: Option<MetricsSnapshot>,
    pub history: Vec<MetricsSnapshot>,
    pub avg_cpu_12h: Option<f64>,
    pub avg_memory_12h: Option<f64>,
}

/// Последний снимок сервера для общей панели.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_mb: i64,
    pub memory_total_mb: i64,
    pub disk_percent: f64,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTokenResponse {
    pub agent_token: String,
    pub server_id: i32,
    pub server_name: String,
}

// ── Резервная копия ──────────────────────────────────────────────────────────

/// Сервер в резервной копии: без id, статуса и пинга.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerExport {
    pub name: String,
    pub ip: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_payment_date")]
    pub payment_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderExport {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub servers: Vec<ServerExport>,
}

/// Формат экспорта и импорта.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupData {
    #[serde(default = "default_backup_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    pub folders: Vec<FolderExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub status: String,
    pub imported_folders: usize,
    pub imported_servers: usize,
}
