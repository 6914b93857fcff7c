//! Entity для таблицы servers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use vpsdash_domain::models::{ServerExport, ServerResponse, ServerStatus};
use vpsdash_domain::BillableServer;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "servers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Папка, в которой лежит сервер
    pub folder_id: i32,

    pub name: String,

    /// IPv4, IPv6 или имя хоста
    pub ip: String,

    pub provider: String,

    /// Стоимость в месяц; 0 означает бесплатный сервер
    pub price: f64,

    /// Код валюты (USD, EUR, RUB)
    pub currency: String,

    /// День оплаты ("1".."31") или "-"
    pub payment_date: String,

    /// online / offline / unknown
    pub status: String,

    /// Задержка последней проверки, мс
    pub last_ping: Option<i32>,

    pub last_check: Option<ChronoDateTimeUtc>,

    /// Последний оплаченный месяц ("2026-01")
    pub last_paid_month: Option<String>,

    /// Токен агента сбора метрик (показывается администратору)
    #[serde(skip_serializing)]
    pub agent_token: Option<String>,

    /// SHA-256 hex токена агента; по нему агент ищется при отправке метрик
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub agent_token_hash: Option<String>,

    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::folders::Entity",
        from = "Column::FolderId",
        to = "super::folders::Column::Id",
        on_delete = "Cascade"
    )]
    Folder,

    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,

    #[sea_orm(has_many = "super::server_metrics::Entity")]
    Metrics,
}

impl Related<super::folders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Folder.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::server_metrics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Metrics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> ServerStatus {
        self.status.parse().unwrap_or_default()
    }

    pub fn to_export(&self) -> ServerExport {
        ServerExport {
            name: self.name.clone(),
            ip: self.ip.clone(),
            provider: self.provider.clone(),
            price: self.price,
            currency: self.currency.clone(),
            payment_date: self.payment_date.clone(),
        }
    }
}

impl From<Model> for ServerResponse {
    fn from(m: Model) -> Self {
        let status = m.status();
        ServerResponse {
            id: m.id,
            folder_id: m.folder_id,
            name: m.name,
            ip: m.ip,
            provider: m.provider,
            price: m.price,
            currency: m.currency,
            payment_date: m.payment_date,
            status,
            last_ping: m.last_ping,
            last_check: m.last_check,
            last_paid_month: m.last_paid_month,
        }
    }
}

impl BillableServer for Model {
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
