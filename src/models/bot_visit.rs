//! Bot visit entity model
//!
//! SeaORM entity for the append-only `bot_visits` table. Only the matched
//! signature token is stored; display names are resolved at read time.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bot_visits")]
pub struct Model {
    /// Store-assigned surrogate key, increasing with insertion order
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning website; null in single-site deployments
    pub website_id: Option<String>,

    /// Catalog token that matched the user agent
    pub bot_signature: String,

    /// Raw user agent as received
    pub user_agent: String,

    /// Best-effort client address
    pub ip_address: Option<String>,

    /// Request path at time of visit
    pub path: String,

    pub referrer: Option<String>,

    /// Server-side insert time
    pub timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::website::Entity",
        from = "Column::WebsiteId",
        to = "super::website::Column::Id"
    )]
    Website,
}

impl Related<super::website::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Website.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
