//! Storage seam of the import pipeline

use leadbook_common::db::models::{Category, Lead, NewCompetitor, NewLead, NewLeadCategory};
use leadbook_common::{Repository, Result};

/// The writes and lookups an import needs
#[async_trait::async_trait]
pub trait LeadStore: Send + Sync {
    /// Exact, case-sensitive name lookup
    async fn find_category(&self, name: &str) -> Result<Option<Category>>;

    async fn create_category(&self, name: &str) -> Result<Category>;

    /// Insert leads; the result must line up with the input order
    async fn bulk_insert_leads(&self, leads: Vec<NewLead>) -> Result<Vec<Lead>>;

    async fn bulk_insert_links(&self, links: Vec<NewLeadCategory>) -> Result<()>;

    async fn bulk_insert_competitors(&self, competitors: Vec<NewCompetitor>) -> Result<()>;
}

#[async_trait::async_trait]
impl LeadStore for Repository {
    async fn find_category(&self, name: &str) -> Result<Option<Category>> {
        self.find_category_by_name(name).await
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        Repository::create_category(self, name).await
    }

    async fn bulk_insert_leads(&self, leads: Vec<NewLead>) -> Result<Vec<Lead>> {
        self.insert_leads(leads).await
    }

    async fn bulk_insert_links(&self, links: Vec<NewLeadCategory>) -> Result<()> {
        self.insert_lead_categories(links).await.map(|_| ())
    }

    async fn bulk_insert_competitors(&self, competitors: Vec<NewCompetitor>) -> Result<()> {
        self.insert_competitors(competitors).await.map(|_| ())
    }
}
