//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{
    sea_query::Expr,
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Category Operations
    // ========================================================================

    /// Find a category by exact (case-sensitive) name.
    ///
    /// Reads go to the primary so an import sees categories it created a
    /// moment ago even when a lagging replica is configured.
    pub async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        CategoryEntity::find()
            .filter(CategoryColumn::Name.eq(name))
            .order_by_asc(CategoryColumn::Id)
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Create a new category
    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let category = CategoryActiveModel {
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        category.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find category by ID
    pub async fn find_category(&self, id: i64) -> Result<Option<Category>> {
        CategoryEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List all categories ordered by name
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        CategoryEntity::find()
            .order_by_asc(CategoryColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Delete category by ID; links cascade in the database
    pub async fn delete_category(&self, id: i64) -> Result<bool> {
        let result = CategoryEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Lead Operations
    // ========================================================================

    /// Insert leads in one statement.
    ///
    /// Uses `INSERT ... RETURNING`; the returned models line up with the
    /// input order and carry the ids assigned by the database.
    pub async fn insert_leads(&self, leads: Vec<NewLead>) -> Result<Vec<Lead>> {
        if leads.is_empty() {
            return Ok(Vec::new());
        }

        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let models = leads.into_iter().map(|lead| lead.into_active_model(now));

        let mut inserted = LeadEntity::insert_many(models)
            .exec_with_returning_many(self.write_conn())
            .await?;

        // serial ids follow insertion order
        inserted.sort_by_key(|lead| lead.id);
        Ok(inserted)
    }

    /// Insert lead to category links
    pub async fn insert_lead_categories(&self, links: Vec<NewLeadCategory>) -> Result<u64> {
        if links.is_empty() {
            return Ok(0);
        }

        LeadCategoryEntity::insert_many(links.into_iter().map(LeadCategoryActiveModel::from))
            .exec_without_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Find lead by ID
    pub async fn find_lead(&self, id: i64) -> Result<Option<Lead>> {
        LeadEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// All leads linked to a category, newest first
    pub async fn list_leads_for_category(&self, category_id: i64) -> Result<Vec<Lead>> {
        LeadEntity::find()
            .inner_join(LeadCategoryEntity)
            .filter(LeadCategoryColumn::CategoryId.eq(category_id))
            .order_by_desc(LeadColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Apply a partial update and bump `updated_at`
    pub async fn update_lead(&self, id: i64, update: LeadUpdate) -> Result<Lead> {
        let mut lead: LeadActiveModel = LeadEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::LeadNotFound { id: id.to_string() })?
            .into();

        if let Some(status) = update.status {
            lead.status = Set(status.as_str().to_string());
        }

        if let Some(notes) = update.notes {
            lead.notes = Set(notes);
        }

        if let Some(follow_up_date) = update.follow_up_date {
            lead.follow_up_date = Set(follow_up_date);
        }

        if let Some(assigned_to) = update.assigned_to {
            lead.assigned_to = Set(assigned_to);
        }

        lead.updated_at = Set(chrono::Utc::now().into());

        lead.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a lead; its category links and competitors cascade
    pub async fn delete_lead(&self, id: i64) -> Result<bool> {
        let result = LeadEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Assign (or with `None`, unassign) many leads at once.
    ///
    /// Returns how many leads were updated; unknown ids are skipped.
    pub async fn assign_leads(&self, ids: &[i64], assigned_to: Option<Uuid>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let result = LeadEntity::update_many()
            .col_expr(LeadColumn::AssignedTo, Expr::value(assigned_to))
            .col_expr(LeadColumn::UpdatedAt, Expr::value(now))
            .filter(LeadColumn::Id.is_in(ids.iter().copied()))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    // ========================================================================
    // Competitor Operations
    // ========================================================================

    /// Insert parsed competitors
    pub async fn insert_competitors(&self, competitors: Vec<NewCompetitor>) -> Result<u64> {
        if competitors.is_empty() {
            return Ok(0);
        }

        CompetitorEntity::insert_many(competitors.into_iter().map(CompetitorActiveModel::from))
            .exec_without_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Competitors recorded for a lead
    pub async fn competitors_for_lead(&self, lead: &Lead) -> Result<Vec<Competitor>> {
        lead.find_related(CompetitorEntity)
            .order_by_asc(CompetitorColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}
