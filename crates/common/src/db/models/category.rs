//! Category entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Matched exactly (case-sensitive) when imports resolve a category
    #[sea_orm(column_type = "Text")]
    pub name: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::lead_category::Entity")]
    LeadCategories,
}

impl Related<super::lead_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LeadCategories.def()
    }
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        super::lead_category::Relation::Lead.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::lead_category::Relation::Category.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
