pub mod admins;
pub mod audit_log;
pub mod auth;
pub mod bills;
pub mod contacts;
pub mod credit_notes;
pub mod customers;
pub mod dashboard;
pub mod debts;
pub mod documents;
pub mod fuel_cards;
pub mod health;
pub mod meetings;
pub mod offdays;
pub mod own_firms;
pub mod tags;
pub mod tours;
pub mod trucks;
pub mod workers;
pub mod worktimes;

use crate::middleware::AuthAdmin;
use crate::models::NewAuditEntry;
use crate::services::metrics::AUDIT_ENTRIES_TOTAL;
use crate::startup::AppState;
use axum::extract::Multipart;
use chrono::{NaiveDate, Utc};
use service_core::error::AppError;

/// Writes the audit entry for a completed mutation.
pub(crate) async fn record_audit(
    state: &AppState,
    admin: &AuthAdmin,
    own_firm_id: Option<i64>,
    entry: NewAuditEntry,
) -> Result<(), AppError> {
    let kind = if entry.changes.is_some() { "mutation" } else { "event" };
    state.store.append_audit(admin.stamp(own_firm_id, entry)).await?;
    AUDIT_ENTRIES_TOTAL.with_label_values(&[kind]).inc();
    Ok(())
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Referenced records must belong to the same owning firm.
pub(crate) fn ensure_same_firm(
    expected: i64,
    actual: i64,
    what: &str,
) -> Result<(), AppError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AppError::BadRequest(anyhow::anyhow!(
            "{} gehört nicht zu dieser Firma",
            what
        )))
    }
}

/// An uploaded document: its original file name and bytes.
pub(crate) struct Upload {
    pub file_name: String,
    pub data: Vec<u8>,
}

pub(crate) const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Request body limit for upload routes: the largest file plus multipart framing.
pub(crate) const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Reads the first file field of a multipart body.
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    let file_name = field.file_name().unwrap_or("unnamed").to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?
        .to_vec();

    if data.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Uploaded file is empty")));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "File too large (max 20MB)"
        )));
    }

    Ok(Upload { file_name, data })
}

/// Removes a replaced or orphaned document; failures only get logged.
pub(crate) async fn discard_document(state: &AppState, key: Option<String>) {
    if let Some(key) = key {
        if let Err(e) = state.files.delete(&key).await {
            tracing::warn!(key = %key, error = %e, "Failed to delete stored document");
        }
    }
}
