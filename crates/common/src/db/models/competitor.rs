//! Competitor entity, parsed out of the lead's free-text competitors cell

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "competitors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub lead_id: i64,

    #[sea_orm(column_type = "String(StringLen::N(500))", nullable)]
    pub name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub link: Option<String>,

    pub reviews: Option<i32>,
}

/// Competitor row waiting for insertion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCompetitor {
    pub lead_id: i64,
    pub name: Option<String>,
    pub link: Option<String>,
    pub reviews: Option<i32>,
}

impl From<NewCompetitor> for ActiveModel {
    fn from(competitor: NewCompetitor) -> Self {
        use sea_orm::{NotSet, Set};

        ActiveModel {
            id: NotSet,
            lead_id: Set(competitor.lead_id),
            name: Set(competitor.name),
            link: Set(competitor.link),
            reviews: Set(competitor.reviews),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id",
        on_delete = "Cascade"
    )]
    Lead,
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
