//! SeaORM entity models
//!
//! Database entities for Leadbook

mod category;
mod competitor;
mod lead;
mod lead_category;

pub use category::{
    Entity as CategoryEntity,
    Model as Category,
    ActiveModel as CategoryActiveModel,
    Column as CategoryColumn,
};

pub use lead::{
    Entity as LeadEntity,
    Model as Lead,
    ActiveModel as LeadActiveModel,
    Column as LeadColumn,
    LeadStatus,
    LeadUpdate,
    NewLead,
    UnknownStatus,
};

pub use lead_category::{
    Entity as LeadCategoryEntity,
    Model as LeadCategory,
    ActiveModel as LeadCategoryActiveModel,
    Column as LeadCategoryColumn,
    NewLeadCategory,
};

pub use competitor::{
    Entity as CompetitorEntity,
    Model as Competitor,
    ActiveModel as CompetitorActiveModel,
    Column as CompetitorColumn,
    NewCompetitor,
};
