//! Сервис папок: список с серверами, CRUD, порядок, каскадное удаление.

use crate::error::AppError;
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use vpsdash_domain::models::{CreateFolderRequest, FolderResponse, UpdateFolderRequest};
use vpsdash_domain::ordering::{self, SortBy};
use vpsdash_domain::validation;
use vpsdash_entities::{folders, payments, server_metrics, servers};

/// Все папки с вложенными серверами.
///
/// `Position`: папки по позиции, серверы по id. `PaymentUrgency`: серверы по
/// близости даты оплаты, папки по самому срочному серверу, при равенстве по позиции.
pub async fn list_folders(
    db: &DatabaseConnection,
    sort_by: SortBy,
    today: NaiveDate,
) -> Result<Vec<FolderResponse>, AppError> {
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

    let mut grouped: Vec<(folders::Model, Vec<servers::Model>)> = folders
        .into_iter()
        .map(|f| {
            let servers = by_folder.remove(&f.id).unwrap_or_default();
            (f, servers)
        })
        .collect();

    if sort_by == SortBy::PaymentUrgency {
        for (_, servers) in grouped.iter_mut() {
            ordering::sort_by_urgency(servers, today);
        }
        grouped.sort_by_key(|(f, servers)| {
            (ordering::folder_urgency(servers, today), f.position, f.id)
        });
    }

    Ok(grouped
        .into_iter()
        .map(|(f, servers)| f.into_response(servers.into_iter().map(Into::into).collect()))
        .collect())
}

pub async fn find_folder(db: &DatabaseConnection, id: i32) -> Result<folders::Model, AppError> {
    folders::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Папка не найдена: {id}")))
}

/// Папка с серверами, отсортированными по id.
pub async fn get_folder(db: &DatabaseConnection, id: i32) -> Result<FolderResponse, AppError> {
    let folder = find_folder(db, id).await?;
    let servers = servers::Entity::find()
        .filter(servers::Column::FolderId.eq(id))
        .order_by_asc(servers::Column::Id)
        .all(db)
        .await?;
    Ok(folder.into_response(servers.into_iter().map(Into::into).collect()))
}

/// Следующая свободная позиция: max + 1, для пустой таблицы 0.
pub async fn next_position<C: sea_orm::ConnectionTrait>(db: &C) -> Result<i32, AppError> {
    let max: Option<Option<i32>> = folders::Entity::find()
        .select_only()
        .column_as(folders::Column::Position.max(), "max_position")
        .into_tuple()
        .one(db)
        .await?;
    Ok(max.flatten().map_or(0, |m| m + 1))
}

pub async fn create_folder(
    db: &DatabaseConnection,
    req: CreateFolderRequest,
) -> Result<FolderResponse, AppError> {
    validation::validate_create_folder(&req)?;

    let position = next_position(db).await?;
    let folder = folders::ActiveModel {
        name: Set(req.name.trim().to_string()),
        color: Set(req.color),
        position: Set(position),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Создана папка {} «{}»", folder.id, folder.name);
    Ok(folder.into_response(Vec::new()))
}

pub async fn update_folder(
    db: &DatabaseConnection,
    id: i32,
    req: UpdateFolderRequest,
) -> Result<FolderResponse, AppError> {
    validation::validate_update_folder(&req)?;

    let folder = find_folder(db, id).await?;
    let mut model: folders::ActiveModel = folder.into();
    if let Some(name) = req.name {
        model.name = Set(name.trim().to_string());
    }
    if let Some(color) = req.color {
        model.color = Set(color);
    }
    if let Some(position) = req.position {
        model.position = Set(position);
    }
    model.update(db).await?;

    get_folder(db, id).await
}

/// Удалить папку вместе с её серверами, их оплатами и метриками.
pub async fn delete_folder(db: &DatabaseConnection, id: i32) -> Result<(), AppError> {
    let txn = db.begin().await?;

    folders::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Папка не найдена: {id}")))?;

    let server_ids: Vec<i32> = servers::Entity::find()
        .select_only()
        .column(servers::Column::Id)
        .filter(servers::Column::FolderId.eq(id))
        .into_tuple()
        .all(&txn)
        .await?;

    if !server_ids.is_empty() {
        payments::Entity::delete_many()
            .filter(payments::Column::ServerId.is_in(server_ids.clone()))
            .exec(&txn)
            .await?;
        server_metrics::Entity::delete_many()
            .filter(server_metrics::Column::ServerId.is_in(server_ids.clone()))
            .exec(&txn)
            .await?;
        servers::Entity::delete_many()
            .filter(servers::Column::FolderId.eq(id))
            .exec(&txn)
            .await?;
    }

    folders::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        "Удалена папка {id} и {} серверов в ней",
        server_ids.len()
    );
    Ok(())
}

/// Переупорядочить папки: перечисленные получают позиции 0..n в порядке
/// списка, остальные следуют за ними в прежнем относительном порядке.
pub async fn reorder_folders(db: &DatabaseConnection, ids: Vec<i32>) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(AppError::BadRequest(format!(
            "Папка {dup} указана в списке дважды"
        )));
    }

    let txn = db.begin().await?;

    let existing: Vec<i32> = folders::Entity::find()
        .select_only()
        .column(folders::Column::Id)
        .order_by_asc(folders::Column::Position)
        .order_by_asc(folders::Column::Id)
        .into_tuple()
        .all(&txn)
        .await?;

    let known: HashSet<i32> = existing.iter().copied().collect();
    if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
        return Err(AppError::NotFound(format!("Папка не найдена: {missing}")));
    }

    let order = ids
        .iter()
        .copied()
        .chain(existing.into_iter().filter(|id| !seen.contains(id)));

    for (position, id) in order.enumerate() {
        folders::Entity::update_many()
            .col_expr(folders::Column::Position, Expr::value(position as i32))
            .filter(folders::Column::Id.eq(id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;
    tracing::debug!("Порядок папок обновлён: {ids:?}");
    Ok(())
}
