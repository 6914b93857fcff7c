//! Сервис серверов: CRUD с проверкой папки и каскадным удалением.

use crate::error::AppError;
use crate::services::folder_service;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use vpsdash_domain::billing::normalize_currency;
use vpsdash_domain::models::{
    CreateServerRequest, ServerResponse, ServerStatus, UpdateServerRequest,
};
use vpsdash_domain::validation;
use vpsdash_entities::{payments, server_metrics, servers};

pub async fn list_servers(
    db: &DatabaseConnection,
    folder_id: Option<i32>,
) -> Result<Vec<ServerResponse>, AppError> {
    let mut query = servers::Entity::find().order_by_asc(servers::Column::Id);
    if let Some(folder_id) = folder_id {
        query = query.filter(servers::Column::FolderId.eq(folder_id));
    }
    Ok(query.all(db).await?.into_iter().map(Into::into).collect())
}

pub async fn find_server(db: &DatabaseConnection, id: i32) -> Result<servers::Model, AppError> {
    servers::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Сервер не найден: {id}")))
}

pub async fn get_server(db: &DatabaseConnection, id: i32) -> Result<ServerResponse, AppError> {
    Ok(find_server(db, id).await?.into())
}

pub async fn create_server(
    db: &DatabaseConnection,
    req: CreateServerRequest,
) -> Result<ServerResponse, AppError> {
    validation::validate_create_server(&req)?;
    folder_service::find_folder(db, req.folder_id).await?;

    let server = servers::ActiveModel {
        folder_id: Set(req.folder_id),
        name: Set(req.name.trim().to_string()),
        ip: Set(req.ip.trim().to_string()),
        provider: Set(req.provider.trim().to_string()),
        price: Set(req.price),
        currency: Set(normalize_currency(&req.currency)),
        payment_date: Set(req.payment_date.trim().to_string()),
        status: Set(ServerStatus::Unknown.to_string()),
        last_ping: Set(None),
        last_check: Set(None),
        last_paid_month: Set(None),
        agent_token: Set(None),
        agent_token_hash: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(
        "Добавлен сервер {} «{}» ({}) в папку {}",
        server.id,
        server.name,
        server.ip,
        server.folder_id
    );
    Ok(server.into())
}

/// Частичное обновление: меняются только переданные поля.
pub async fn update_server(
    db: &DatabaseConnection,
    id: i32,
    req: UpdateServerRequest,
) -> Result<ServerResponse, AppError> {
    validation::validate_update_server(&req)?;

    let server = find_server(db, id).await?;
    if let Some(folder_id) = req.folder_id {
        if folder_id != server.folder_id {
            folder_service::find_folder(db, folder_id).await?;
        }
    }

    let mut model: servers::ActiveModel = server.into();
    if let Some(folder_id) = req.folder_id {
        model.folder_id = Set(folder_id);
    }
    if let Some(name) = req.name {
        model.name = Set(name.trim().to_string());
    }
    if let Some(ip) = req.ip {
        model.ip = Set(ip.trim().to_string());
    }
    if let Some(provider) = req.provider {
        model.provider = Set(provider.trim().to_string());
    }
    if let Some(price) = req.price {
        model.price = Set(price);
    }
    if let Some(currency) = req.currency {
        model.currency = Set(normalize_currency(&currency));
    }
    if let Some(payment_date) = req.payment_date {
        model.payment_date = Set(payment_date.trim().to_string());
    }

    Ok(model.update(db).await?.into())
}

/// Удалить сервер вместе с его оплатами и метриками.
pub async fn delete_server(db: &DatabaseConnection, id: i32) -> Result<(), AppError> {
    let txn = db.begin().await?;

    servers::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Сервер не найден: {id}")))?;

    payments::Entity::delete_many()
        .filter(payments::Column::ServerId.eq(id))
        .exec(&txn)
        .await?;
    server_metrics::Entity::delete_many()
        .filter(server_metrics::Column::ServerId.eq(id))
        .exec(&txn)
        .await?;
    servers::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Удалён сервер {id}");
    Ok(())
}
