//! Entity для снимков метрик, присланных агентом.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use vpsdash_domain::metrics::Sample;
use vpsdash_domain::models::{CurrentMetrics, MetricsSnapshot};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "server_metrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub server_id: i32,

    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_mb: i64,
    pub memory_total_mb: i64,
    pub disk_percent: f64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub uptime_seconds: i64,

    /// Средняя загрузка; агент на Windows её не присылает
    pub load_avg_1: Option<f64>,
    pub load_avg_5: Option<f64>,
    pub load_avg_15: Option<f64>,

    pub collected_at: ChronoDateTimeUtc,
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

impl From<Model> for MetricsSnapshot {
    fn from(m: Model) -> Self {
        MetricsSnapshot {
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

impl From<&Model> for CurrentMetrics {
    fn from(m: &Model) -> Self {
        CurrentMetrics {
            cpu_percent: m.cpu_percent,
            memory_percent: m.memory_percent,
            memory_used_mb: m.memory_used_mb,
            memory_total_mb: m.memory_total_mb,
            disk_percent: m.disk_percent,
            collected_at: m.collected_at,
        }
    }
}

impl Sample for Model {
    fn collected_at(&self) -> ChronoDateTimeUtc {
        self.collected_at
    }
    fn cpu_percent(&self) -> f64 {
        self.cpu_percent
    }
    fn memory_percent(&self) -> f64 {
        self.memory_percent
    }
}
