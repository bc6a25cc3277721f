//! In-memory [`LeadStore`]
//!
//! Backs `import --dry-run` and the pipeline tests. Faults can be injected
//! per category or per step to exercise partial-failure handling.

use crate::store::LeadStore;
use chrono::{DateTime, FixedOffset, Utc};
use leadbook_common::db::models::{Category, Lead, NewCompetitor, NewLead, NewLeadCategory};
use leadbook_common::{AppError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A store operation forced to fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Lookup of this category name fails
    Lookup(String),
    /// Creation of this category name fails
    Create(String),
    /// Lead batches containing a lead with this `query` fail
    LeadInsert(String),
    /// Lead batches containing a lead with this `query` lose their last row
    ShortLeadInsert(String),
    Links,
    Competitors,
}

#[derive(Default)]
struct State {
    categories: Vec<Category>,
    leads: Vec<Lead>,
    links: Vec<NewLeadCategory>,
    competitors: Vec<NewCompetitor>,
    faults: Vec<Fault>,
    writes: usize,
}

/// Cloning shares the underlying data
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fault: Fault) {
        self.lock().faults.push(fault);
    }

    pub fn categories(&self) -> Vec<Category> {
        self.lock().categories.clone()
    }

    pub fn leads(&self) -> Vec<Lead> {
        self.lock().leads.clone()
    }

    pub fn links(&self) -> Vec<NewLeadCategory> {
        self.lock().links.clone()
    }

    pub fn competitors(&self) -> Vec<NewCompetitor> {
        self.lock().competitors.clone()
    }

    /// Successful write calls so far
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Leads linked to the category called `name`
    pub fn leads_in(&self, name: &str) -> Vec<Lead> {
        let state = self.lock();
        let category_ids: Vec<i64> = state
            .categories
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.id)
            .collect();

        state
            .leads
            .iter()
            .filter(|lead| {
                state
                    .links
                    .iter()
                    .any(|l| l.lead_id == lead.id && category_ids.contains(&l.category_id))
            })
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    fn has_fault(&self, fault: &Fault) -> bool {
        self.faults.contains(fault)
    }

    fn batch_has_fault(&self, leads: &[NewLead], fault: fn(String) -> Fault) -> bool {
        leads
            .iter()
            .filter_map(|lead| lead.query.clone())
            .any(|query| self.has_fault(&fault(query)))
    }
}

fn injected(operation: &str) -> AppError {
    AppError::Internal {
        message: format!("injected failure: {}", operation),
    }
}

#[async_trait::async_trait]
impl LeadStore for MemoryStore {
    async fn find_category(&self, name: &str) -> Result<Option<Category>> {
        let state = self.lock();
        if state.has_fault(&Fault::Lookup(name.to_string())) {
            return Err(injected("find_category"));
        }
        Ok(state.categories.iter().find(|c| c.name == name).cloned())
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let mut state = self.lock();
        if state.has_fault(&Fault::Create(name.to_string())) {
            return Err(injected("create_category"));
        }

        let category = Category {
            id: state.categories.len() as i64 + 1,
            name: name.to_string(),
            created_at: Utc::now().into(),
        };
        state.categories.push(category.clone());
        state.writes += 1;
        Ok(category)
    }

    async fn bulk_insert_leads(&self, leads: Vec<NewLead>) -> Result<Vec<Lead>> {
        let mut state = self.lock();
        if state.batch_has_fault(&leads, Fault::LeadInsert) {
            return Err(injected("bulk_insert_leads"));
        }
        let short = state.batch_has_fault(&leads, Fault::ShortLeadInsert);

        let now: DateTime<FixedOffset> = Utc::now().into();
        let base = state.leads.len() as i64;
        let mut inserted: Vec<Lead> = leads
            .into_iter()
            .enumerate()
            .map(|(offset, lead)| Lead {
                id: base + offset as i64 + 1,
                name: lead.name,
                reviews: lead.reviews,
                rating: lead.rating,
                website: lead.website,
                phone: lead.phone,
                owner_name: lead.owner_name,
                query: lead.query,
                status: lead.status.as_str().to_string(),
                follow_up_date: None,
                notes: String::new(),
                assigned_to: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        if short {
            inserted.pop();
        }

        state.leads.extend(inserted.iter().cloned());
        state.writes += 1;
        Ok(inserted)
    }

    async fn bulk_insert_links(&self, links: Vec<NewLeadCategory>) -> Result<()> {
        let mut state = self.lock();
        if state.has_fault(&Fault::Links) {
            return Err(injected("bulk_insert_links"));
        }
        state.links.extend(links);
        state.writes += 1;
        Ok(())
    }

    async fn bulk_insert_competitors(&self, competitors: Vec<NewCompetitor>) -> Result<()> {
        let mut state = self.lock();
        if state.has_fault(&Fault::Competitors) {
            return Err(injected("bulk_insert_competitors"));
        }
        state.competitors.extend(competitors);
        state.writes += 1;
        Ok(())
    }
}
