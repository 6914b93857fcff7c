//! Миграция: журнал оплат, кэш курсов, отметка последнего оплаченного месяца.

use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m002_create_payments"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Servers::Table)
                    .add_column(ColumnDef::new(Servers::LastPaidMonth).string_len(7).null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::ServerId).integer().not_null())
                    .col(ColumnDef::new(Payments::Amount).double().not_null())
                    .col(ColumnDef::new(Payments::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Payments::AmountRub).double().not_null())
                    .col(ColumnDef::new(Payments::ExchangeRate).double().not_null())
                    .col(
                        ColumnDef::new(Payments::PaidAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::PaymentMonth).string_len(7).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_server_id")
                            .from(Payments::Table, Payments::ServerId)
                            .to(Servers::Table, Servers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Payments::Table)
                    .col(Payments::ServerId)
                    .name("ix_payments_server_id")
                    .to_owned(),
            )
            .await?;

        // Сводки фильтруют по месяцу
        manager
            .create_index(
                Index::create()
                    .table(Payments::Table)
                    .col(Payments::PaymentMonth)
                    .name("ix_payments_payment_month")
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExchangeRates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExchangeRates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::Currency)
                            .string_len(3)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ExchangeRates::RateToRub).double().not_null())
                    .col(
                        ColumnDef::new(ExchangeRates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExchangeRates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Servers::Table)
                    .drop_column(Servers::LastPaidMonth)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum Servers {
    Table,
    Id,
    LastPaidMonth,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    ServerId,
    Amount,
    Currency,
    AmountRub,
    ExchangeRate,
    PaidAt,
    PaymentMonth,
}

#[derive(Iden)]
enum ExchangeRates {
    Table,
    Id,
    Currency,
    RateToRub,
    UpdatedAt,
}
