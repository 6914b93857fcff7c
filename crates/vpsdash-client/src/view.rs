//! Модели представления: camelCase, строковые идентификаторы.
//!
//! Получаются из схемы API через `From`, после типизированного разбора JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vpsdash_domain::billing::{self, BillableServer, LedgerEntry};
use vpsdash_domain::models::{
    AgentTokenResponse, CurrentMetrics, ExchangeRatesResponse, FolderResponse,
    MetricsHistoryResponse, MetricsSnapshot, PaymentResponse, PaymentSummary, ServerResponse,
    ServerStatus,
};
use vpsdash_domain::{Month, RateTable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerView {
    pub id: String,
    pub folder_id: String,
    pub name: String,
    pub ip: String,
    pub status: ServerStatus,
    pub provider: String,
    pub price: f64,
    pub currency: String,
    pub payment_date: String,
    pub last_ping: Option<i32>,
    pub last_check: Option<DateTime<Utc>>,
    pub last_paid_month: Option<String>,
}

impl ServerView {
    pub fn is_paid_for(&self, month: Month) -> bool {
        billing::is_paid_for_month(self, month)
    }

    pub fn is_paid_this_month(&self) -> bool {
        self.is_paid_for(Month::current())
    }

    pub fn is_free(&self) -> bool {
        !billing::is_payable(self)
    }
}

impl From<ServerResponse> for ServerView {
    fn from(s: ServerResponse) -> Self {
        Self {
            id: s.id.to_string(),
            folder_id: s.folder_id.to_string(),
            name: s.name,
            ip: s.ip,
            status: s.status,
            provider: s.provider,
            price: s.price,
            currency: s.currency,
            payment_date: s.payment_date,
            last_ping: s.last_ping,
            last_check: s.last_check,
            last_paid_month: s.last_paid_month,
        }
    }
}

impl BillableServer for ServerView {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderView {
    pub id: String,
    pub name: String,
    pub color: String,
    pub position: i32,
    pub servers: Vec<ServerView>,
}

impl From<FolderResponse> for FolderView {
    fn from(f: FolderResponse) -> Self {
        Self {
            id: f.id.to_string(),
            name: f.name,
            color: f.color,
            position: f.position,
            servers: f.servers.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: String,
    pub server_id: String,
    pub server_name: String,
    pub amount: f64,
    pub currency: String,
    pub amount_rub: f64,
    pub exchange_rate: f64,
    pub paid_at: DateTime<Utc>,
    pub payment_month: String,
}

impl From<PaymentResponse> for PaymentView {
    fn from(p: PaymentResponse) -> Self {
        Self {
            id: p.id.to_string(),
            server_id: p.server_id.to_string(),
            server_name: p.server_name,
            amount: p.amount,
            currency: p.currency,
            amount_rub: p.amount_rub,
            exchange_rate: p.exchange_rate,
            paid_at: p.paid_at,
            payment_month: p.payment_month,
        }
    }
}

impl LedgerEntry for PaymentView {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummaryView {
    pub total_rub: f64,
    pub by_currency: BTreeMap<String, f64>,
    pub by_currency_rub: BTreeMap<String, f64>,
    pub payments_count: usize,
    pub month: String,
}

impl From<PaymentSummary> for PaymentSummaryView {
    fn from(s: PaymentSummary) -> Self {
        Self {
            total_rub: s.total_rub,
            by_currency: s.by_currency,
            by_currency_rub: s.by_currency_rub,
            payments_count: s.payments_count,
            month: s.month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRatesView {
    pub rates: RateTable,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExchangeRatesView {
    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates
            .get(&billing::normalize_currency(currency))
            .copied()
    }
}

impl From<ExchangeRatesResponse> for ExchangeRatesView {
    fn from(r: ExchangeRatesResponse) -> Self {
        Self {
            rates: r.rates,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotView {
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

impl From<MetricsSnapshot> for MetricsSnapshotView {
    fn from(m: MetricsSnapshot) -> Self {
        Self {
            cpu_percent: m.cpu_percent,
            memory_percent: m.memory_percent,
            memory_used_mb: m.memory_used_mb,
            memory_total_mb: m.memory_total_mb,
            disk_percent: m.disk_percent,
            disk_used_gb: m.disk_used_gb,
            disk_total_gb: m.disk_total_gb,
            uptime_seconds: m.uptime_seconds,
            load_avg_1: m.load_avg_1,
            load_avg_5: m.load_avg_5,
            load_avg_15: m.load_avg_15,
            collected_at: m.collected_at,
        }
    }
}

/// Снимок и средние за 12 часов. `None` в средних означает «нет данных».
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsView {
    pub server_id: String,
    pub server_name: String,
    pub current: Option<MetricsSnapshotView>,
    pub history: Vec<MetricsSnapshotView>,
    pub avg_cpu_12h: Option<f64>,
    pub avg_memory_12h: Option<f64>,
}

impl From<MetricsHistoryResponse> for MetricsView {
    fn from(m: MetricsHistoryResponse) -> Self {
        Self {
            server_id: m.server_id.to_string(),
            server_name: m.server_name,
            current: m.current.map(Into::into),
            history: m.history.into_iter().map(Into::into).collect(),
            avg_cpu_12h: m.avg_cpu_12h,
            avg_memory_12h: m.avg_memory_12h,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentMetricsView {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_mb: i64,
    pub memory_total_mb: i64,
    pub disk_percent: f64,
    pub collected_at: DateTime<Utc>,
}

impl From<CurrentMetrics> for CurrentMetricsView {
    fn from(m: CurrentMetrics) -> Self {
        Self {
            cpu_percent: m.cpu_percent,
            memory_percent: m.memory_percent,
            memory_used_mb: m.memory_used_mb,
            memory_total_mb: m.memory_total_mb,
            disk_percent: m.disk_percent,
            collected_at: m.collected_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTokenView {
    pub agent_token: String,
    pub server_id: String,
    pub server_name: String,
}

impl From<AgentTokenResponse> for AgentTokenView {
    fn from(t: AgentTokenResponse) -> Self {
        Self {
            agent_token: t.agent_token,
            server_id: t.server_id.to_string(),
            server_name: t.server_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_server(last_paid_month: Option<&str>, price: f64) -> ServerResponse {
        serde_json::from_value(json!({
            "id": 12, "folder_id": 3, "name": "fra-1", "ip": "10.0.0.1",
            "provider": "Hetzner", "price": price, "currency": "EUR", "payment_date": "5",
            "status": "online", "last_ping": 42, "last_paid_month": last_paid_month
        }))
        .unwrap()
    }

    #[test]
    fn test_folder_view_uses_string_ids_and_camel_case() {
        let folder = FolderResponse {
            id: 3,
            name: "Prod".into(),
            color: "#ff0000".into(),
            position: 0,
            servers: vec![wire_server(Some("2026-01"), 4.5)],
        };

        let view = FolderView::from(folder);
        assert_eq!(view.id, "3");
        assert_eq!(view.servers[0].id, "12");
        assert_eq!(view.servers[0].folder_id, "3");

        let json = serde_json::to_value(&view.servers[0]).unwrap();
        assert_eq!(json["folderId"], "3");
        assert_eq!(json["paymentDate"], "5");
        assert_eq!(json["lastPaidMonth"], "2026-01");
        assert_eq!(json["lastPing"], 42);
        assert_eq!(json["status"], "online");
    }

    #[test]
    fn test_paid_flag_follows_last_paid_month() {
        let month: Month = "2026-01".parse().unwrap();
        let paid = ServerView::from(wire_server(Some("2026-01"), 4.5));
        let stale = ServerView::from(wire_server(Some("2025-12"), 4.5));
        let never = ServerView::from(wire_server(None, 4.5));

        assert!(paid.is_paid_for(month));
        assert!(!stale.is_paid_for(month));
        assert!(!never.is_paid_for(month));
        assert!(ServerView::from(wire_server(None, 0.0)).is_free());
    }

    #[test]
    fn test_metrics_view_keeps_missing_averages() {
        let wire = MetricsHistoryResponse {
            server_id: 7,
            server_name: "s".into(),
            current: None,
            history: vec![],
            avg_cpu_12h: None,
            avg_memory_12h: Some(0.0),
        };

        let view = MetricsView::from(wire);
        assert_eq!(view.server_id, "7");
        assert_eq!(view.avg_cpu_12h, None);
        assert_eq!(view.avg_memory_12h, Some(0.0));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["avgCpu12h"], serde_json::Value::Null);
        assert_eq!(json["avgMemory12h"], json!(0.0));
    }

    #[test]
    fn test_rate_lookup_normalizes_code() {
        let rates = ExchangeRatesView {
            rates: [("USD".to_string(), 95.0)].into_iter().collect(),
            updated_at: None,
        };
        assert_eq!(rates.rate(" usd"), Some(95.0));
        assert_eq!(rates.rate("EUR"), None);
    }
}
