//! Migration to create the websites table.
//!
//! Each row is a registered tenant site with the credential its beacon and
//! pixel present on every tracking call.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Websites::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Websites::Id).text().not_null().primary_key())
                    .col(ColumnDef::new(Websites::Name).text().not_null())
                    .col(ColumnDef::new(Websites::Url).text().not_null())
                    .col(ColumnDef::new(Websites::ApiKey).text().not_null())
                    .col(
                        ColumnDef::new(Websites::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_websites_api_key")
                    .table(Websites::Table)
                    .col(Websites::ApiKey)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Websites::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Websites {
    Table,
    Id,
    Name,
    Url,
    ApiKey,
    CreatedAt,
}
