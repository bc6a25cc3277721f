//! Category handlers: listing, deletion, per-category leads and analytics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use leadbook_common::{
    analytics::{summarize, LeadAnalytics},
    db::models::{Category, Lead, LeadStatus},
    errors::{AppError, Result},
    listing::{
        list_leads, LeadFilter, LeadPage, LeadSort, PageRequest, SortField, SortOrder,
        DEFAULT_PER_PAGE,
    },
    LeadEvent,
};
use serde::Deserialize;

use crate::AppState;

/// Query string of the lead table
#[derive(Debug, Default, Deserialize)]
pub struct LeadListParams {
    pub status: Option<LeadStatus>,
    pub search: Option<String>,
    pub min_rating: Option<f64>,
    /// Follow-ups due on or before this date
    pub due_before: Option<NaiveDate>,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub order: SortOrder,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl LeadListParams {
    fn filter(&self) -> LeadFilter {
        LeadFilter {
            status: self.status,
            search: self.search.clone(),
            min_rating: self.min_rating,
            due_on_or_before: self.due_before,
        }
    }

    fn sort(&self) -> LeadSort {
        LeadSort {
            field: self.sort,
            order: self.order,
        }
    }

    fn page(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )
    }
}

/// All categories ordered by name
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.repository.list_categories().await?;
    Ok(Json(categories))
}

/// Delete a category; its lead links go with it
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<StatusCode> {
    if !state.repository.delete_category(category_id).await? {
        return Err(AppError::CategoryNotFound {
            id: category_id.to_string(),
        });
    }

    tracing::info!(category_id, "Category deleted");
    state.events.publish(LeadEvent::CategoryDeleted { category_id });

    Ok(StatusCode::NO_CONTENT)
}

/// One page of a category's leads
pub async fn list_category_leads(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
    Query(params): Query<LeadListParams>,
) -> Result<Json<LeadPage>> {
    let leads = category_leads(&state, category_id).await?;
    Ok(Json(list_leads(&leads, &params.filter(), &params.sort(), params.page())))
}

/// Status, rating and activity summary of a category
pub async fn category_analytics(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<Json<LeadAnalytics>> {
    let leads = category_leads(&state, category_id).await?;
    Ok(Json(summarize(&leads, Utc::now().date_naive())))
}

async fn category_leads(state: &AppState, category_id: i64) -> Result<Vec<Lead>> {
    state
        .repository
        .find_category(category_id)
        .await?
        .ok_or_else(|| AppError::CategoryNotFound {
            id: category_id.to_string(),
        })?;

    state.repository.list_leads_for_category(category_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_defaults() {
        let params = LeadListParams::default();
        assert_eq!(params.sort(), LeadSort::default());
        assert_eq!(params.page(), PageRequest::default());
        assert_eq!(params.filter(), LeadFilter::default());
    }

    #[test]
    fn test_params_from_query_string() {
        let params: LeadListParams = parse_query(
            "status=Follow-up&search=smile&min_rating=4&due_before=2026-10-20&sort=rating&order=asc&page=2&per_page=500",
        );
        let filter = params.filter();
        assert_eq!(filter.status, Some(LeadStatus::FollowUp));
        assert_eq!(filter.min_rating, Some(4.0));
        assert_eq!(filter.due_on_or_before, NaiveDate::from_ymd_opt(2026, 10, 20));
        assert_eq!(params.sort().field, SortField::Rating);
        assert_eq!(params.sort().order, SortOrder::Asc);
        assert_eq!(params.page().per_page, leadbook_common::listing::MAX_PER_PAGE);
    }

    fn parse_query(query: &str) -> LeadListParams {
        let uri: axum::http::Uri = format!("/leads?{}", query).parse().unwrap();
        Query::<LeadListParams>::try_from_uri(&uri).unwrap().0
    }
}
