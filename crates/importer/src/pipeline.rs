//! Import orchestrator
//!
//! Decodes a file, groups the valid rows by category and pushes each group
//! through resolve, insert, link and competitor steps. Groups are isolated:
//! a store failure in one is recorded and the run moves on to the next.
//! Nothing is rolled back.

use crate::competitors::CompetitorEntry;
use crate::errors::{GroupError, ImportError, ImportStage};
use crate::options::{CategorySource, ImportOptions};
use crate::row::{self, LeadRow};
use crate::store::LeadStore;
use leadbook_common::db::models::{Category, NewCompetitor, NewLead, NewLeadCategory};
use leadbook_common::metrics;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn, Span};
use uuid::Uuid;

/// Receives coarse progress lines for display
pub type ProgressSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Outcome of one category group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOutcome {
    pub category: String,
    pub category_id: Option<i64>,
    pub new_category: bool,
    pub leads_imported: usize,
    pub competitors_imported: usize,
}

/// Result of an import run
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub run_id: Uuid,
    pub total_leads_imported: usize,
    pub categories_created: usize,
    pub created_categories: Vec<String>,
    pub groups: Vec<GroupOutcome>,
    pub errors: Vec<GroupError>,
}

impl ImportReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            total_leads_imported: 0,
            categories_created: 0,
            created_categories: Vec::new(),
            groups: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// One-line summary for display
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Imported {} leads across {} new categories",
            self.total_leads_imported, self.categories_created
        );
        if !self.errors.is_empty() {
            summary.push_str(&format!(" ({} step(s) failed)", self.errors.len()));
        }
        summary
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    fn record_failure(&mut self, error: GroupError) {
        warn!(
            category = %error.category,
            stage = %error.stage,
            error = %error.message,
            "Import step failed"
        );
        metrics::record_group_failure(error.stage.as_str());
        self.errors.push(error);
    }
}

/// Rows sharing one category name
#[derive(Debug)]
struct ImportGroup {
    category: String,
    rows: Vec<LeadRow>,
}

/// Runs imports against a [`LeadStore`]
pub struct Importer<S> {
    store: S,
    options: ImportOptions,
    progress: Option<ProgressSink>,
}

impl<S: LeadStore> Importer<S> {
    pub fn new(store: S, options: ImportOptions) -> Self {
        Self {
            store,
            options,
            progress: None,
        }
    }

    /// Forward progress lines to `sink`
    pub fn with_progress(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    /// Import one file.
    ///
    /// Only decoding problems and a file without any usable row fail the
    /// call; those are detected before the first write. Store failures are
    /// reported per group in [`ImportReport::errors`].
    #[instrument(skip(self, content), fields(bytes = content.len(), run_id = tracing::field::Empty))]
    pub async fn import(&self, content: &[u8]) -> Result<ImportReport, ImportError> {
        let started = Instant::now();
        let run_id = Uuid::now_v7();
        Span::current().record("run_id", tracing::field::display(run_id));

        let groups = match self.prepare(content) {
            Ok(groups) => groups,
            Err(e) => {
                warn!(error = %e, "Import aborted before any write");
                metrics::record_import_aborted();
                return Err(e);
            }
        };

        info!(groups = groups.len(), "Import started");

        let mut report = ImportReport::new(run_id);
        for group in groups {
            self.import_group(group, &mut report).await;
        }

        let duration = started.elapsed();
        metrics::record_import(
            duration.as_secs_f64(),
            report.total_leads_imported,
            report.categories_created,
            report.errors.len(),
        );

        info!(
            leads = report.total_leads_imported,
            categories_created = report.categories_created,
            failed_steps = report.errors.len(),
            duration_ms = duration.as_millis() as u64,
            "Import finished"
        );
        self.report_progress(&report.summary());

        Ok(report)
    }

    /// Decode, validate and group; no store access
    fn prepare(&self, content: &[u8]) -> Result<Vec<ImportGroup>, ImportError> {
        let raw = row::decode(content, self.options.delimiter())?;
        let total = raw.len();

        let rows: Vec<LeadRow> = raw
            .iter()
            .filter_map(|r| row::normalize(r, &self.options))
            .collect();

        debug!(total, valid = rows.len(), "Rows validated");

        if rows.is_empty() {
            let message = match self.options.category_source() {
                CategorySource::Column(column) => {
                    format!("no row has both a '{}' and a 'name' value", column)
                }
                CategorySource::Explicit(_) => "no row has a 'name' value".to_string(),
            };
            return Err(ImportError::NoValidRows(message));
        }

        Ok(group_rows(rows, self.options.category_source()))
    }

    #[instrument(skip_all, fields(category = %group.category, leads = group.rows.len()))]
    async fn import_group(&self, group: ImportGroup, report: &mut ImportReport) {
        self.report_progress(&format!(
            "Processing category: {} ({} leads)...",
            group.category,
            group.rows.len()
        ));

        let mut outcome = GroupOutcome {
            category: group.category.clone(),
            category_id: None,
            new_category: false,
            leads_imported: 0,
            competitors_imported: 0,
        };

        let category = match self.resolve_category(&group.category).await {
            Ok((category, created)) => {
                if created {
                    report.categories_created += 1;
                    report.created_categories.push(category.name.clone());
                }
                outcome.category_id = Some(category.id);
                outcome.new_category = created;
                category
            }
            Err(e) => {
                report.record_failure(e);
                report.groups.push(outcome);
                return;
            }
        };

        let (leads, competitors): (Vec<NewLead>, Vec<Vec<CompetitorEntry>>) = group
            .rows
            .into_iter()
            .map(|row| (row.lead, row.competitors))
            .unzip();
        let expected = leads.len();

        let inserted = match self.store.bulk_insert_leads(leads).await {
            Ok(inserted) if inserted.len() == expected => inserted,
            Ok(inserted) => {
                report.record_failure(GroupError::new(
                    &group.category,
                    ImportStage::InsertLeads,
                    format!("store returned {} of {} leads", inserted.len(), expected),
                ));
                report.groups.push(outcome);
                return;
            }
            Err(e) => {
                report.record_failure(GroupError::new(&group.category, ImportStage::InsertLeads, e));
                report.groups.push(outcome);
                return;
            }
        };

        outcome.leads_imported = inserted.len();
        report.total_leads_imported += inserted.len();

        let links = inserted
            .iter()
            .map(|lead| NewLeadCategory {
                lead_id: lead.id,
                category_id: category.id,
            })
            .collect();

        if let Err(e) = self.store.bulk_insert_links(links).await {
            report.record_failure(GroupError::new(&group.category, ImportStage::LinkLeads, e));
        }

        let competitors: Vec<NewCompetitor> = inserted
            .iter()
            .zip(competitors)
            .flat_map(|(lead, entries)| {
                entries.into_iter().map(move |entry| NewCompetitor {
                    lead_id: lead.id,
                    name: Some(entry.name),
                    link: entry.link,
                    reviews: entry.reviews,
                })
            })
            .collect();

        if !competitors.is_empty() {
            let count = competitors.len();
            match self.store.bulk_insert_competitors(competitors).await {
                Ok(()) => outcome.competitors_imported = count,
                Err(e) => report.record_failure(GroupError::new(
                    &group.category,
                    ImportStage::InsertCompetitors,
                    e,
                )),
            }
        }

        debug!(
            leads = outcome.leads_imported,
            competitors = outcome.competitors_imported,
            "Category group imported"
        );
        report.groups.push(outcome);
    }

    /// Look the category up by exact name, creating it when missing
    async fn resolve_category(&self, name: &str) -> Result<(Category, bool), GroupError> {
        let existing = self
            .store
            .find_category(name)
            .await
            .map_err(|e| GroupError::new(name, ImportStage::LookupCategory, e))?;

        if let Some(category) = existing {
            return Ok((category, false));
        }

        let category = self
            .store
            .create_category(name)
            .await
            .map_err(|e| GroupError::new(name, ImportStage::CreateCategory, e))?;

        info!(category_id = category.id, name, "Category created");
        Ok((category, true))
    }

    fn report_progress(&self, message: &str) {
        info!("{}", message);
        if let Some(sink) = &self.progress {
            sink(message);
        }
    }
}

/// Partition rows by category, keeping first-seen order
fn group_rows(rows: Vec<LeadRow>, source: &CategorySource) -> Vec<ImportGroup> {
    if let CategorySource::Explicit(name) = source {
        return vec![ImportGroup {
            category: name.clone(),
            rows,
        }];
    }

    let mut groups: Vec<ImportGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(category) = row.category.clone() else {
            continue;
        };
        match index.get(&category) {
            Some(&i) => groups[i].rows.push(row),
            None => {
                index.insert(category.clone(), groups.len());
                groups.push(ImportGroup {
                    category,
                    rows: vec![row],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Fault, MemoryStore};
    use crate::options::ImportOptions;
    use leadbook_common::db::models::LeadStatus;
    use std::sync::Mutex;

    fn importer(store: &MemoryStore) -> Importer<MemoryStore> {
        Importer::new(store.clone(), ImportOptions::builder().build().unwrap())
    }

    #[tokio::test]
    async fn test_groups_by_query_column() {
        let store = MemoryStore::new();
        let csv = "query,name,rating\nDentists,A,4.5\nPlumbers,B,\nDentists,C,3\n";

        let report = importer(&store).import(csv.as_bytes()).await.unwrap();

        assert_eq!(report.total_leads_imported, 3);
        assert_eq!(report.categories_created, 2);
        assert_eq!(report.created_categories, vec!["Dentists", "Plumbers"]);
        assert!(report.is_complete());
        assert_eq!(store.leads_in("Dentists").len(), 2);
        assert_eq!(store.leads_in("Plumbers").len(), 1);
        assert_eq!(store.links().len(), 3);
        assert_eq!(report.summary(), "Imported 3 leads across 2 new categories");
    }

    #[tokio::test]
    async fn test_category_reused_across_imports() {
        let store = MemoryStore::new();
        let importer = importer(&store);

        let first = importer.import(b"query,name\nAcme,A\nAcme,B\n").await.unwrap();
        let second = importer.import(b"query,name\nAcme,C\n").await.unwrap();

        assert_eq!(first.categories_created, 1);
        assert_eq!(second.categories_created, 0);
        assert!(!second.groups[0].new_category);
        assert_eq!(store.categories().len(), 1);
        assert_eq!(store.leads_in("Acme").len(), 3);
    }

    #[tokio::test]
    async fn test_rows_without_required_fields_are_dropped() {
        let store = MemoryStore::new();
        let csv = "name,query\nA,Q\n,Q\n\"\",Q\n";

        let report = importer(&store).import(csv.as_bytes()).await.unwrap();

        assert_eq!(report.total_leads_imported, 1);
        assert_eq!(store.leads()[0].name, "A");
    }

    #[tokio::test]
    async fn test_long_name_is_truncated() {
        let store = MemoryStore::new();
        let csv = format!("name,query\n{},Q\n", "x".repeat(300));

        let report = importer(&store).import(csv.as_bytes()).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(store.leads()[0].name, "x".repeat(255));
    }

    #[tokio::test]
    async fn test_competitors_inserted_after_leads() {
        let store = MemoryStore::new();
        let csv = "name,query,competitors\n\
                   A,Q,\"Name: Bob's Shop\nLink: http://x.test\nReviews: 1,204 ratings\n\nName: Second\"\n\
                   B,Q,\n";

        let report = importer(&store).import(csv.as_bytes()).await.unwrap();

        let lead_a = store.leads().into_iter().find(|l| l.name == "A").unwrap();
        let competitors = store.competitors();
        assert_eq!(competitors.len(), 2);
        assert!(competitors.iter().all(|c| c.lead_id == lead_a.id));
        assert_eq!(competitors[0].name.as_deref(), Some("Bob's Shop"));
        assert_eq!(competitors[0].link.as_deref(), Some("http://x.test"));
        assert_eq!(competitors[0].reviews, Some(1204));
        assert_eq!(competitors[1].name.as_deref(), Some("Second"));
        assert_eq!(competitors[1].reviews, None);
        assert_eq!(report.groups[0].competitors_imported, 2);
    }

    #[tokio::test]
    async fn test_no_competitors_means_no_competitor_write() {
        let store = MemoryStore::new();
        store.fail(Fault::Competitors);

        let report = importer(&store).import(b"name,query\nA,Q\n").await.unwrap();

        assert!(report.is_complete());
        assert!(store.competitors().is_empty());
    }

    #[tokio::test]
    async fn test_failed_group_does_not_stop_siblings() {
        let store = MemoryStore::new();
        store.fail(Fault::LeadInsert("B".into()));
        let csv = "name,query\nb1,B\na1,A\nb2,B\na2,A\n";

        let report = importer(&store).import(csv.as_bytes()).await.unwrap();

        assert_eq!(report.total_leads_imported, 2);
        assert_eq!(store.leads_in("A").len(), 2);
        assert!(store.leads_in("B").is_empty());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].category, "B");
        assert_eq!(report.errors[0].stage, ImportStage::InsertLeads);
        // The category was created before the failing insert and stays
        assert_eq!(report.categories_created, 2);
    }

    #[tokio::test]
    async fn test_lookup_and_create_failures_skip_group() {
        let store = MemoryStore::new();
        store.fail(Fault::Lookup("Down".into()));
        store.fail(Fault::Create("Denied".into()));
        let csv = "name,query\nx,Down\ny,Denied\nz,Fine\n";

        let report = importer(&store).import(csv.as_bytes()).await.unwrap();

        let stages: Vec<ImportStage> = report.errors.iter().map(|e| e.stage).collect();
        assert_eq!(stages, vec![ImportStage::LookupCategory, ImportStage::CreateCategory]);
        assert_eq!(report.total_leads_imported, 1);
        assert_eq!(report.created_categories, vec!["Fine"]);
        assert_eq!(store.leads().len(), 1);
    }

    #[tokio::test]
    async fn test_short_insert_abandons_group() {
        let store = MemoryStore::new();
        store.fail(Fault::ShortLeadInsert("Q".into()));

        let report = importer(&store).import(b"name,query\nA,Q\nB,Q\n").await.unwrap();

        assert_eq!(report.total_leads_imported, 0);
        assert_eq!(report.errors[0].stage, ImportStage::InsertLeads);
        assert!(store.links().is_empty());
    }

    #[tokio::test]
    async fn test_link_and_competitor_failures_keep_leads() {
        let store = MemoryStore::new();
        store.fail(Fault::Links);
        store.fail(Fault::Competitors);
        let csv = "name,query,competitors\nA,Q,Name: X\n";

        let report = importer(&store).import(csv.as_bytes()).await.unwrap();

        assert_eq!(report.total_leads_imported, 1);
        assert_eq!(store.leads().len(), 1);
        let stages: Vec<ImportStage> = report.errors.iter().map(|e| e.stage).collect();
        assert_eq!(stages, vec![ImportStage::LinkLeads, ImportStage::InsertCompetitors]);
        assert_eq!(
            report.summary(),
            "Imported 1 leads across 1 new categories (2 step(s) failed)"
        );
    }

    #[tokio::test]
    async fn test_unbalanced_quotes_write_nothing() {
        let store = MemoryStore::new();
        let csv = "name,query\nA,Q\n\"B,Q\nC,Q\n";

        let err = importer(&store).import(csv.as_bytes()).await.unwrap_err();

        assert!(matches!(err, ImportError::MalformedCsv { .. }));
        assert_eq!(store.write_count(), 0);
        assert!(store.categories().is_empty());
    }

    #[tokio::test]
    async fn test_no_valid_rows_is_fatal() {
        let store = MemoryStore::new();

        let err = importer(&store).import(b"name,phone\nA,555\n").await.unwrap_err();

        assert!(matches!(err, ImportError::NoValidRows(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_explicit_category() {
        let store = MemoryStore::new();
        let options = ImportOptions::builder()
            .category("Roofers")
            .default_status(LeadStatus::FollowUp)
            .build()
            .unwrap();
        let importer = Importer::new(store.clone(), options);

        let report = importer
            .import(b"name,query\nA,ignored\nB,\n")
            .await
            .unwrap();

        assert_eq!(report.created_categories, vec!["Roofers"]);
        assert_eq!(store.leads_in("Roofers").len(), 2);
        assert!(store.leads().iter().all(|l| l.status == "Follow-up"));
    }

    #[tokio::test]
    async fn test_numeric_fields_are_lenient() {
        let store = MemoryStore::new();
        let csv = "name,query,rating,reviews\nA,Q,not-a-number,12\nB,Q,,x\nC,Q,4.5,\n";

        importer(&store).import(csv.as_bytes()).await.unwrap();

        let ratings: Vec<Option<f64>> = store.leads().iter().map(|l| l.rating).collect();
        assert_eq!(ratings, vec![None, None, Some(4.5)]);
        assert_eq!(store.leads()[0].reviews, Some(12));
        assert_eq!(store.leads()[1].reviews, None);
    }

    #[tokio::test]
    async fn test_progress_lines() {
        let store = MemoryStore::new();
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = lines.clone();
        let importer = importer(&store).with_progress(move |line| {
            sink.lock().unwrap().push(line.to_string());
        });

        importer.import(b"name,query\nA,Q\nB,Q\nC,R\n").await.unwrap();

        let lines = lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                "Processing category: Q (2 leads)...".to_string(),
                "Processing category: R (1 leads)...".to_string(),
                "Imported 3 leads across 2 new categories".to_string(),
            ]
        );
    }

    #[test]
    fn test_grouping_is_case_sensitive_and_ordered() {
        let options = ImportOptions::builder().build().unwrap();
        let rows: Vec<LeadRow> = [("a", "acme"), ("b", "Acme"), ("c", "acme")]
            .into_iter()
            .map(|(name, query)| {
                row::normalize(&row::RawRow::from_pairs(&[("name", name), ("query", query)]), &options)
                    .unwrap()
            })
            .collect();

        let groups = group_rows(rows, options.category_source());

        let keys: Vec<(&str, usize)> = groups
            .iter()
            .map(|g| (g.category.as_str(), g.rows.len()))
            .collect();
        assert_eq!(keys, vec![("acme", 2), ("Acme", 1)]);
    }
}
