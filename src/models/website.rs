//! Website entity model
//!
//! SeaORM entity for the `websites` table. A website is a registered tenant:
//! its slug id scopes every visit and analytics query, and `api_key` is the
//! credential presented by its beacon and pixel.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Registered tenant site
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "websites")]
pub struct Model {
    /// Slug derived from the display name at registration; immutable
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Display name
    pub name: String,

    /// Public URL of the site
    pub url: String,

    /// Opaque secret credential; never leaves the registry except at registration
    pub api_key: String,

    /// Timestamp when the website was registered
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bot_visit::Entity")]
    BotVisit,
}

impl Related<super::bot_visit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BotVisit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
