//! Lead entity and its status lifecycle

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lead status enum
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    #[serde(rename = "Fresh Lead")]
    FreshLead,
    #[serde(rename = "Interested")]
    Interested,
    #[serde(rename = "Not Interested")]
    NotInterested,
    #[serde(rename = "Follow-up")]
    FollowUp,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::FreshLead,
        LeadStatus::Interested,
        LeadStatus::NotInterested,
        LeadStatus::FollowUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::FreshLead => "Fresh Lead",
            LeadStatus::Interested => "Interested",
            LeadStatus::NotInterested => "Not Interested",
            LeadStatus::FollowUp => "Follow-up",
        }
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::FreshLead
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not one of the known values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown lead status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for LeadStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub name: String,

    pub reviews: Option<i32>,

    #[sea_orm(column_type = "Double", nullable)]
    pub rating: Option<f64>,

    #[sea_orm(column_type = "String(StringLen::N(255))", nullable)]
    pub website: Option<String>,

    #[sea_orm(column_type = "String(StringLen::N(50))", nullable)]
    pub phone: Option<String>,

    #[sea_orm(column_type = "String(StringLen::N(255))", nullable)]
    pub owner_name: Option<String>,

    /// Search tag the lead was scraped under
    #[sea_orm(column_type = "String(StringLen::N(500))", nullable)]
    pub query: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub follow_up_date: Option<Date>,

    #[sea_orm(column_type = "Text")]
    pub notes: String,

    pub assigned_to: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the lead status as an enum, `None` when the stored value is unknown
    pub fn lead_status(&self) -> Option<LeadStatus> {
        self.status.parse().ok()
    }
}

/// Validated lead field-set produced by the importer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub reviews: Option<i32>,
    pub rating: Option<f64>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub owner_name: Option<String>,
    pub query: Option<String>,
    pub status: LeadStatus,
}

impl NewLead {
    /// Active model ready for insertion, timestamps set to `now`
    pub fn into_active_model(self, now: DateTimeWithTimeZone) -> ActiveModel {
        use sea_orm::{NotSet, Set};

        ActiveModel {
            id: NotSet,
            name: Set(self.name),
            reviews: Set(self.reviews),
            rating: Set(self.rating),
            website: Set(self.website),
            phone: Set(self.phone),
            owner_name: Set(self.owner_name),
            query: Set(self.query),
            status: Set(self.status.as_str().to_string()),
            follow_up_date: Set(None),
            notes: Set(String::new()),
            assigned_to: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

/// Partial update applied to an existing lead
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LeadUpdate {
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
    /// `Some(None)` clears the follow-up date
    pub follow_up_date: Option<Option<Date>>,
    /// `Some(None)` unassigns the lead
    pub assigned_to: Option<Option<Uuid>>,
}

impl LeadUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.notes.is_none()
            && self.follow_up_date.is_none()
            && self.assigned_to.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::lead_category::Entity")]
    LeadCategories,

    #[sea_orm(has_many = "super::competitor::Entity")]
    Competitors,
}

impl Related<super::lead_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LeadCategories.def()
    }
}

impl Related<super::competitor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Competitors.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::lead_category::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::lead_category::Relation::Lead.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
