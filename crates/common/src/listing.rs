//! Lead listing: filter, sort and paginate an in-memory lead list
//!
//! Pure functions over `&[Lead]`, so the dashboard's table state can be
//! tested without a database.

use crate::db::models::{Lead, LeadStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Largest page a caller can request
pub const MAX_PER_PAGE: u64 = 100;

/// Page size used when none is given
pub const DEFAULT_PER_PAGE: u64 = 20;

/// Which leads to keep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    /// Case-insensitive match against name, phone, website and owner
    pub search: Option<String>,
    pub min_rating: Option<f64>,
    /// Keep leads whose follow-up is due on or before this date
    pub due_on_or_before: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Name,
    Rating,
    Reviews,
    FollowUpDate,
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadSort {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }.clamped()
    }

    fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }
}

/// One page of leads plus the totals needed to render pagination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadPage {
    pub items: Vec<Lead>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl LeadFilter {
    /// Check whether a lead passes every populated criterion
    pub fn matches(&self, lead: &Lead) -> bool {
        if let Some(status) = self.status {
            if lead.lead_status() != Some(status) {
                return false;
            }
        }

        if let Some(min) = self.min_rating {
            match lead.rating {
                Some(rating) if rating >= min => {}
                _ => return false,
            }
        }

        if let Some(date) = self.due_on_or_before {
            match lead.follow_up_date {
                Some(due) if due <= date => {}
                _ => return false,
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                let haystacks = [
                    Some(lead.name.as_str()),
                    lead.phone.as_deref(),
                    lead.website.as_deref(),
                    lead.owner_name.as_deref(),
                ];
                haystacks
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// Compare optional values so that missing ones always sort last
fn nulls_last<T>(a: Option<T>, b: Option<T>, order: SortOrder, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => cmp(&a, &b),
            SortOrder::Desc => cmp(&b, &a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl LeadSort {
    pub fn compare(&self, a: &Lead, b: &Lead) -> Ordering {
        let order = self.order;
        match self.field {
            SortField::CreatedAt => nulls_last(Some(a.created_at), Some(b.created_at), order, Ord::cmp),
            SortField::Name => nulls_last(
                Some(a.name.to_lowercase()),
                Some(b.name.to_lowercase()),
                order,
                Ord::cmp,
            ),
            SortField::Rating => nulls_last(a.rating, b.rating, order, f64::total_cmp),
            SortField::Reviews => nulls_last(a.reviews, b.reviews, order, Ord::cmp),
            SortField::FollowUpDate => nulls_last(a.follow_up_date, b.follow_up_date, order, Ord::cmp),
            SortField::Status => nulls_last(Some(&a.status), Some(&b.status), order, Ord::cmp),
        }
    }
}

/// Filter, sort and slice a lead list into one page.
///
/// Sorting is stable; a page past the end yields no items but keeps the
/// totals intact.
pub fn list_leads(leads: &[Lead], filter: &LeadFilter, sort: &LeadSort, page: PageRequest) -> LeadPage {
    let page = page.clamped();

    let mut visible: Vec<&Lead> = leads.iter().filter(|lead| filter.matches(lead)).collect();
    visible.sort_by(|a, b| sort.compare(a, b));

    let total = visible.len() as u64;
    let total_pages = total.div_ceil(page.per_page);
    let start = (page.page - 1).saturating_mul(page.per_page);

    let items = visible
        .into_iter()
        .skip(usize::try_from(start).unwrap_or(usize::MAX))
        .take(page.per_page as usize)
        .cloned()
        .collect();

    LeadPage {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
        total_pages,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub(crate) fn lead(id: i64, name: &str) -> Lead {
        let created = Utc
            .with_ymd_and_hms(2026, 10, 1, 12, 0, 0)
            .unwrap()
            .fixed_offset()
            + chrono::Duration::minutes(id);
        Lead {
            id,
            name: name.to_string(),
            reviews: None,
            rating: None,
            website: None,
            phone: None,
            owner_name: None,
            query: None,
            status: LeadStatus::FreshLead.to_string(),
            follow_up_date: None,
            notes: String::new(),
            assigned_to: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn sample() -> Vec<Lead> {
        let mut a = lead(1, "Acme Plumbing");
        a.rating = Some(4.5);
        a.reviews = Some(120);
        a.phone = Some("555-0100".into());
        let mut b = lead(2, "bolt electric");
        b.rating = Some(3.9);
        b.status = LeadStatus::Interested.to_string();
        b.follow_up_date = NaiveDate::from_ymd_opt(2026, 10, 20);
        let mut c = lead(3, "Cedar Roofing");
        c.owner_name = Some("Dana ACME".into());
        c.follow_up_date = NaiveDate::from_ymd_opt(2026, 10, 10);
        vec![a, b, c]
    }

    fn ids(page: &LeadPage) -> Vec<i64> {
        page.items.iter().map(|l| l.id).collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let page = list_leads(&sample(), &LeadFilter::default(), &LeadSort::default(), PageRequest::default());
        assert_eq!(ids(&page), vec![3, 2, 1]);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let filter = LeadFilter {
            search: Some("acme".into()),
            ..Default::default()
        };
        let sort = LeadSort { field: SortField::Name, order: SortOrder::Asc };
        let page = list_leads(&sample(), &filter, &sort, PageRequest::default());
        assert_eq!(ids(&page), vec![1, 3]);
    }

    #[test]
    fn test_blank_search_keeps_everything() {
        let filter = LeadFilter {
            search: Some("   ".into()),
            ..Default::default()
        };
        let page = list_leads(&sample(), &filter, &LeadSort::default(), PageRequest::default());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_status_and_rating_filters() {
        let filter = LeadFilter {
            status: Some(LeadStatus::Interested),
            ..Default::default()
        };
        assert_eq!(ids(&list_leads(&sample(), &filter, &LeadSort::default(), PageRequest::default())), vec![2]);

        let filter = LeadFilter {
            min_rating: Some(4.0),
            ..Default::default()
        };
        assert_eq!(ids(&list_leads(&sample(), &filter, &LeadSort::default(), PageRequest::default())), vec![1]);
    }

    #[test]
    fn test_due_filter_excludes_leads_without_follow_up() {
        let filter = LeadFilter {
            due_on_or_before: NaiveDate::from_ymd_opt(2026, 10, 15),
            ..Default::default()
        };
        let page = list_leads(&sample(), &filter, &LeadSort::default(), PageRequest::default());
        assert_eq!(ids(&page), vec![3]);
    }

    #[test]
    fn test_missing_values_sort_last_in_both_directions() {
        let asc = LeadSort { field: SortField::Rating, order: SortOrder::Asc };
        let desc = LeadSort { field: SortField::Rating, order: SortOrder::Desc };
        let leads = sample();
        assert_eq!(ids(&list_leads(&leads, &LeadFilter::default(), &asc, PageRequest::default())), vec![2, 1, 3]);
        assert_eq!(ids(&list_leads(&leads, &LeadFilter::default(), &desc, PageRequest::default())), vec![1, 2, 3]);
    }

    #[test]
    fn test_pagination_and_out_of_range_page() {
        let leads: Vec<Lead> = (1..=45).map(|i| lead(i, &format!("Lead {i}"))).collect();
        let sort = LeadSort { field: SortField::CreatedAt, order: SortOrder::Asc };

        let page = list_leads(&leads, &LeadFilter::default(), &sort, PageRequest::new(3, 20));
        assert_eq!(ids(&page), (41..=45).collect::<Vec<_>>());
        assert_eq!(page.total_pages, 3);

        let page = list_leads(&leads, &LeadFilter::default(), &sort, PageRequest::new(9, 20));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 45);
    }

    #[test]
    fn test_page_request_is_clamped() {
        let req = PageRequest::new(0, 1000);
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::new(2, 0).per_page, 1);
    }
}
