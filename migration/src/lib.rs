//! Database migrations for botwatch.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_01_000001_create_websites;
mod m2025_06_01_000002_create_bot_visits;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_01_000001_create_websites::Migration),
            Box::new(m2025_06_01_000002_create_bot_visits::Migration),
        ]
    }
}
