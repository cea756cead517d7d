//! Migration to create the bot_visits table.
//!
//! Append-only log of attributed crawler visits. `website_id` stays null for
//! single-site deployments that run without a tenant registry.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BotVisits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BotVisits::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BotVisits::WebsiteId).text().null())
                    .col(ColumnDef::new(BotVisits::BotSignature).text().not_null())
                    .col(ColumnDef::new(BotVisits::UserAgent).text().not_null())
                    .col(ColumnDef::new(BotVisits::IpAddress).text().null())
                    .col(ColumnDef::new(BotVisits::Path).text().not_null())
                    .col(ColumnDef::new(BotVisits::Referrer).text().null())
                    .col(
                        ColumnDef::new(BotVisits::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bot_visits_website_id")
                            .from(BotVisits::Table, BotVisits::WebsiteId)
                            .to(Websites::Table, Websites::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bot_visits_website_timestamp")
                    .table(BotVisits::Table)
                    .col(BotVisits::WebsiteId)
                    .col(BotVisits::Timestamp)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bot_visits_timestamp")
                    .table(BotVisits::Table)
                    .col(BotVisits::Timestamp)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bot_visits_signature")
                    .table(BotVisits::Table)
                    .col(BotVisits::BotSignature)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_bot_visits_website_timestamp",
            "idx_bot_visits_timestamp",
            "idx_bot_visits_signature",
        ] {
            manager
                .drop_index(Index::drop().name(name).table(BotVisits::Table).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(BotVisits::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BotVisits {
    Table,
    Id,
    WebsiteId,
    BotSignature,
    UserAgent,
    IpAddress,
    Path,
    Referrer,
    Timestamp,
}

#[derive(DeriveIden)]
enum Websites {
    Table,
    Id,
}
