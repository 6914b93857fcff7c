//! Миграция: токены агентов и таблица снимков метрик.

use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m003_create_metrics"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite не умеет несколько ADD COLUMN в одном ALTER
        manager
            .alter_table(
                Table::alter()
                    .table(Servers::Table)
                    .add_column(ColumnDef::new(Servers::AgentToken).string_len(64).null())
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Servers::Table)
                    .add_column(ColumnDef::new(Servers::AgentTokenHash).string_len(64).null())
                    .to_owned(),
            )
            .await?;

        // Агент ищется по хэшу токена; ADD COLUMN ... UNIQUE в SQLite нет
        manager
            .create_index(
                Index::create()
                    .table(Servers::Table)
                    .col(Servers::AgentTokenHash)
                    .name("ix_servers_agent_token_hash")
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServerMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServerMetrics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ServerMetrics::ServerId).integer().not_null())
                    .col(ColumnDef::new(ServerMetrics::CpuPercent).double().not_null())
                    .col(ColumnDef::new(ServerMetrics::MemoryPercent).double().not_null())
                    .col(ColumnDef::new(ServerMetrics::MemoryUsedMb).big_integer().not_null())
                    .col(ColumnDef::new(ServerMetrics::MemoryTotalMb).big_integer().not_null())
                    .col(ColumnDef::new(ServerMetrics::DiskPercent).double().not_null())
                    .col(ColumnDef::new(ServerMetrics::DiskUsedGb).double().not_null())
                    .col(ColumnDef::new(ServerMetrics::DiskTotalGb).double().not_null())
                    .col(ColumnDef::new(ServerMetrics::UptimeSeconds).big_integer().not_null())
                    .col(ColumnDef::new(ServerMetrics::LoadAvg1).double().null())
                    .col(ColumnDef::new(ServerMetrics::LoadAvg5).double().null())
                    .col(ColumnDef::new(ServerMetrics::LoadAvg15).double().null())
                    .col(
                        ColumnDef::new(ServerMetrics::CollectedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_server_metrics_server_id")
                            .from(ServerMetrics::Table, ServerMetrics::ServerId)
                            .to(Servers::Table, Servers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // История сервера всегда выбирается по server_id и времени
        manager
            .create_index(
                Index::create()
                    .table(ServerMetrics::Table)
                    .col(ServerMetrics::ServerId)
                    .col(ServerMetrics::CollectedAt)
                    .name("ix_server_metrics_server_time")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ServerMetrics::Table).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("ix_servers_agent_token_hash")
                    .table(Servers::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Servers::Table)
                    .drop_column(Servers::AgentTokenHash)
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Servers::Table)
                    .drop_column(Servers::AgentToken)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum Servers {
    Table,
    Id,
    AgentToken,
    AgentTokenHash,
}

#[derive(Iden)]
enum ServerMetrics {
    Table,
    Id,
    ServerId,
    CpuPercent,
    MemoryPercent,
    MemoryUsedMb,
    MemoryTotalMb,
    DiskPercent,
    DiskUsedGb,
    DiskTotalGb,
    UptimeSeconds,
    #[iden = "load_avg_1"]
    LoadAvg1,
    #[iden = "load_avg_5"]
    LoadAvg5,
    #[iden = "load_avg_15"]
    LoadAvg15,
    CollectedAt,
}
