//! Lead handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use leadbook_common::{
    db::models::{Competitor, Lead, LeadStatus, LeadUpdate},
    errors::{AppError, Result},
    metrics, LeadEvent,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;

/// Partial lead update.
///
/// `follow_up_date` and `assigned_to` distinguish an absent key (leave as
/// is) from an explicit `null` (clear).
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLeadRequest {
    pub status: Option<String>,

    #[validate(length(max = 10000))]
    pub notes: Option<String>,

    #[serde(default, deserialize_with = "present")]
    pub follow_up_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "present")]
    pub assigned_to: Option<Option<Uuid>>,
}

impl UpdateLeadRequest {
    fn into_update(self) -> Result<LeadUpdate> {
        self.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: None,
        })?;

        let status = self
            .status
            .as_deref()
            .map(str::parse::<LeadStatus>)
            .transpose()
            .map_err(|e| AppError::Validation {
                message: e.to_string(),
                field: Some("status".to_string()),
            })?;

        let update = LeadUpdate {
            status,
            notes: self.notes,
            follow_up_date: self.follow_up_date,
            assigned_to: self.assigned_to,
        };

        if update.is_empty() {
            return Err(AppError::Validation {
                message: "no fields to update".to_string(),
                field: None,
            });
        }

        Ok(update)
    }
}

fn present<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Bulk assignment of leads to a user; `null` unassigns
#[derive(Debug, Deserialize, Validate)]
pub struct AssignLeadsRequest {
    #[validate(length(min = 1, max = 1000))]
    pub lead_ids: Vec<i64>,

    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AssignLeadsResponse {
    pub updated: u64,
}

/// A lead with its parsed competitors
#[derive(Serialize)]
pub struct LeadDetail {
    #[serde(flatten)]
    pub lead: Lead,
    pub competitors: Vec<Competitor>,
}

/// Get a lead by ID
pub async fn get_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<i64>,
) -> Result<Json<LeadDetail>> {
    let lead = state
        .repository
        .find_lead(lead_id)
        .await?
        .ok_or_else(|| AppError::LeadNotFound {
            id: lead_id.to_string(),
        })?;

    let competitors = state.repository.competitors_for_lead(&lead).await?;

    Ok(Json(LeadDetail { lead, competitors }))
}

/// Update status, notes, follow-up date or assignment
pub async fn update_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<i64>,
    Json(request): Json<UpdateLeadRequest>,
) -> Result<Json<Lead>> {
    let update = request.into_update()?;

    let lead = state.repository.update_lead(lead_id, update).await?;

    tracing::info!(lead_id, status = %lead.status, "Lead updated");
    metrics::record_lead_update(&lead.status);
    state.events.publish(LeadEvent::LeadUpdated {
        lead_id,
        status: lead.status.clone(),
    });

    Ok(Json(lead))
}

/// Delete a lead along with its category links and competitors
pub async fn delete_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<i64>,
) -> Result<StatusCode> {
    if !state.repository.delete_lead(lead_id).await? {
        return Err(AppError::LeadNotFound {
            id: lead_id.to_string(),
        });
    }

    tracing::info!(lead_id, "Lead deleted");
    state.events.publish(LeadEvent::LeadDeleted { lead_id });

    Ok(StatusCode::NO_CONTENT)
}

/// Assign a set of leads to one user
pub async fn assign_leads(
    State(state): State<AppState>,
    Json(request): Json<AssignLeadsRequest>,
) -> Result<Json<AssignLeadsResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("lead_ids".to_string()),
    })?;

    let mut lead_ids = request.lead_ids;
    lead_ids.sort_unstable();
    lead_ids.dedup();

    let updated = state
        .repository
        .assign_leads(&lead_ids, request.assigned_to)
        .await?;

    tracing::info!(
        requested = lead_ids.len(),
        updated,
        assigned_to = ?request.assigned_to,
        "Leads assigned"
    );
    state.events.publish(LeadEvent::LeadsAssigned {
        lead_ids,
        assigned_to: request.assigned_to,
    });

    Ok(Json(AssignLeadsResponse { updated }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> UpdateLeadRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_absent_and_null_dates_differ() {
        let update = request(r#"{"status":"Interested"}"#).into_update().unwrap();
        assert_eq!(update.status, Some(LeadStatus::Interested));
        assert_eq!(update.follow_up_date, None);

        let update = request(r#"{"follow_up_date":null}"#).into_update().unwrap();
        assert_eq!(update.follow_up_date, Some(None));

        let update = request(r#"{"follow_up_date":"2026-11-02"}"#).into_update().unwrap();
        assert_eq!(update.follow_up_date, Some(NaiveDate::from_ymd_opt(2026, 11, 2)));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = request(r#"{"status":"Maybe"}"#).into_update().unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some(ref f), .. } if f == "status"));
    }

    #[test]
    fn test_notes_length_limit() {
        let long = format!(r#"{{"notes":"{}"}}"#, "a".repeat(10_001));
        assert!(request(&long).into_update().is_err());

        let ok = format!(r#"{{"notes":"{}"}}"#, "a".repeat(10_000));
        assert!(request(&ok).into_update().is_ok());
    }

    #[test]
    fn test_empty_update_rejected() {
        assert!(request("{}").into_update().is_err());
    }
}
