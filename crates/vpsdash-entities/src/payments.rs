//! Entity для таблицы payments. Записи не изменяются, только удаляются.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use vpsdash_domain::models::PaymentResponse;
use vpsdash_domain::LedgerEntry;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub server_id: i32,

    /// Сумма в валюте сервера
    pub amount: f64,

    pub currency: String,

    /// Сумма в рублях по курсу на момент оплаты
    pub amount_rub: f64,

    /// Курс на момент оплаты
    pub exchange_rate: f64,

    pub paid_at: ChronoDateTimeUtc,

    /// Месяц оплаты ("2026-01")
    pub payment_month: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::servers::Entity",
        from = "Column::ServerId",
        to = "super::servers::Column::Id",
        on_delete = "Cascade"
    )]
    Server,
}

impl Related<super::servers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Server.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_response(self, server_name: String) -> PaymentResponse {
        PaymentResponse {
            id: self.id,
            server_id: self.server_id,
            server_name,
            amount: self.amount,
            currency: self.currency,
            amount_rub: self.amount_rub,
            exchange_rate: self.exchange_rate,
            paid_at: self.paid_at,
            payment_month: self.payment_month,
        }
    }
}

impl LedgerEntry for Model {
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
