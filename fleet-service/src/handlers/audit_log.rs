use crate::dtos::AuditListParams;
use crate::middleware::AuthAdmin;
use crate::models::{AuditEntry, AuditEntryView, AuditSort};
use crate::query::sort_records;
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

/// Entries of one firm, or of every firm for superusers.
pub async fn list_audit_entries(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<AuditListParams>,
) -> Result<Json<Vec<AuditEntryView>>, AppError> {
    match params.own_firm_id {
        Some(own_firm_id) => admin.ensure_access(own_firm_id)?,
        None => admin.ensure_superuser()?,
    }

    let filter = params.filter();
    let mut entries: Vec<AuditEntry> = state
        .store
        .list_audit(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|e| filter.matches(e))
        .collect();
    sort_records::<AuditSort>(&mut entries, params.sort.as_deref(), params.direction.as_deref());

    Ok(Json(entries.into_iter().map(AuditEntryView::from).collect()))
}
