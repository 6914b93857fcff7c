//! Миграция: создание таблиц folders и servers.

use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_create_folders_servers"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Folders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Folders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Folders::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Folders::Color)
                            .string_len(7)
                            .not_null()
                            .default("#6b7280"),
                    )
                    .col(
                        ColumnDef::new(Folders::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Folders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Servers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Servers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Servers::FolderId).integer().not_null())
                    .col(ColumnDef::new(Servers::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Servers::Ip).string_len(45).not_null())
                    .col(
                        ColumnDef::new(Servers::Provider)
                            .string_len(50)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Servers::Price).double().not_null().default(0.0))
                    .col(
                        ColumnDef::new(Servers::Currency)
                            .string_len(3)
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Servers::PaymentDate)
                            .string_len(10)
                            .not_null()
                            .default("-"),
                    )
                    .col(
                        ColumnDef::new(Servers::Status)
                            .string_len(10)
                            .not_null()
                            .default("unknown"),
                    )
                    .col(ColumnDef::new(Servers::LastPing).integer().null())
                    .col(ColumnDef::new(Servers::LastCheck).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Servers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_servers_folder_id")
                            .from(Servers::Table, Servers::FolderId)
                            .to(Folders::Table, Folders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Индекс для выборки серверов папки
        manager
            .create_index(
                Index::create()
                    .table(Servers::Table)
                    .col(Servers::FolderId)
                    .name("ix_servers_folder_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Servers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Folders::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Folders {
    Table,
    Id,
    Name,
    Color,
    Position,
    CreatedAt,
}

#[derive(Iden)]
enum Servers {
    Table,
    Id,
    FolderId,
    Name,
    Ip,
    Provider,
    Price,
    Currency,
    PaymentDate,
    Status,
    LastPing,
    LastCheck,
    CreatedAt,
}
