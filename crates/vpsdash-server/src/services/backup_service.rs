//! Экспорт и импорт папок с серверами.

use crate::error::AppError;
use crate::services::folder_service;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, QueryOrder,
    TransactionTrait,
};
use std::collections::HashMap;
use vpsdash_domain::billing::normalize_currency;
use vpsdash_domain::models::{
    BackupData, FolderExport, ImportResult, ServerStatus, BACKUP_VERSION,
};
use vpsdash_domain::validation;
use vpsdash_entities::{folders, payments, server_metrics, servers};

pub async fn export(db: &DatabaseConnection) -> Result<BackupData, AppError> {
    let folders = folders::Entity::find()
        .order_by_asc(folders::Column::Position)
        .order_by_asc(folders::Column::Id)
        .all(db)
        .await?;

    let mut by_folder: HashMap<i32, Vec<servers::Model>> = HashMap::new();
    for server in servers::Entity::find()
        .order_by_asc(servers::Column::Id)
        .all(db)
        .await?
    {
        by_folder.entry(server.folder_id).or_default().push(server);
    }

    let folders = folders
        .into_iter()
        .map(|f| FolderExport {
            servers: by_folder
                .remove(&f.id)
                .unwrap_or_default()
                .iter()
                .map(servers::Model::to_export)
                .collect(),
            name: f.name,
            color: f.color,
        })
        .collect();

    Ok(BackupData {
        version: BACKUP_VERSION.to_string(),
        exported_at: Some(Utc::now()),
        folders,
    })
}

/// Импорт одной транзакцией. При `replace` все папки, серверы, оплаты и
/// метрики удаляются; иначе папки добавляются после существующих.
pub async fn import(
    db: &DatabaseConnection,
    data: BackupData,
    replace: bool,
) -> Result<ImportResult, AppError> {
    if data.version != BACKUP_VERSION {
        return Err(AppError::BadRequest(format!(
            "Неподдерживаемая версия резервной копии: {}",
            data.version
        )));
    }
    for folder in &data.folders {
        validation::validate_folder_export(folder)?;
    }

    let txn = db.begin().await?;

    if replace {
        server_metrics::Entity::delete_many().exec(&txn).await?;
        payments::Entity::delete_many().exec(&txn).await?;
        servers::Entity::delete_many().exec(&txn).await?;
        folders::Entity::delete_many().exec(&txn).await?;
    }

    let start = folder_service::next_position(&txn).await?;
    let now = Utc::now();
    let mut imported_servers = 0;

    for (offset, folder) in data.folders.iter().enumerate() {
        let created = folders::ActiveModel {
            name: Set(folder.name.trim().to_string()),
            color: Set(folder.color.clone()),
            position: Set(start + offset as i32),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for server in &folder.servers {
            servers::ActiveModel {
                folder_id: Set(created.id),
                name: Set(server.name.trim().to_string()),
                ip: Set(server.ip.trim().to_string()),
                provider: Set(server.provider.trim().to_string()),
                price: Set(server.price),
                currency: Set(normalize_currency(&server.currency)),
                payment_date: Set(server.payment_date.trim().to_string()),
                status: Set(ServerStatus::Unknown.to_string()),
                last_ping: Set(None),
                last_check: Set(None),
                last_paid_month: Set(None),
                agent_token: Set(None),
                agent_token_hash: Set(None),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            imported_servers += 1;
        }
    }

    txn.commit().await?;

    tracing::info!(
        "Импорт завершён: {} папок, {imported_servers} серверов (replace={replace})",
        data.folders.len()
    );
    Ok(ImportResult {
        status: "ok".to_string(),
        imported_folders: data.folders.len(),
        imported_servers,
    })
}
