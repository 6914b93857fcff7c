//! Entity для таблицы folders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use vpsdash_domain::models::{FolderResponse, ServerResponse};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "folders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// Цвет в формате #rrggbb
    pub color: String,

    /// Позиция среди папок (0..n-1)
    pub position: i32,

    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::servers::Entity")]
    Servers,
}

impl Related<super::servers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Servers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Ответ API вместе с серверами папки.
    pub fn into_response(self, servers: Vec<ServerResponse>) -> FolderResponse {
        FolderResponse {
            id: self.id,
            name: self.name,
            color: self.color,
            position: self.position,
            servers,
        }
    }
}
