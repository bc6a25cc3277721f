//! CSV import handler

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use leadbook_common::{
    db::models::LeadStatus,
    errors::{AppError, Result},
    LeadEvent,
};
use leadbook_importer::{ImportOptionsBuilder, ImportReport, Importer};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ImportParams {
    /// Put every row into this category instead of grouping by column
    pub category: Option<String>,
    /// Column holding the category key
    pub column: Option<String>,
    /// Status for the imported leads
    pub status: Option<String>,
}

/// Import the CSV request body
pub async fn import_csv(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    body: Bytes,
) -> Result<Json<ImportReport>> {
    let limit = state.config.import.max_upload_bytes;
    if body.len() > limit {
        return Err(AppError::PayloadTooLarge {
            size: body.len(),
            limit,
        });
    }

    let mut builder = ImportOptionsBuilder::from_config(&state.config.import)?;
    if let Some(column) = &params.column {
        builder = builder.group_by_column(column);
    }
    if let Some(category) = &params.category {
        builder = builder.category(category);
    }
    if let Some(status) = &params.status {
        let status = status.parse::<LeadStatus>().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: Some("status".to_string()),
        })?;
        builder = builder.default_status(status);
    }

    let importer = Importer::new(state.repository.clone(), builder.build()?);
    let report = importer.import(&body).await?;

    for group in &report.groups {
        let Some(category_id) = group.category_id else {
            continue;
        };
        if group.new_category {
            state.events.publish(LeadEvent::CategoryCreated {
                category_id,
                name: group.category.clone(),
            });
        }
        if group.leads_imported > 0 {
            state.events.publish(LeadEvent::LeadsImported {
                category: group.category.clone(),
                count: group.leads_imported,
            });
        }
    }

    tracing::info!(
        run_id = %report.run_id,
        leads = report.total_leads_imported,
        categories_created = report.categories_created,
        failed_steps = report.errors.len(),
        "CSV import completed"
    );

    Ok(Json(report))
}
