use super::record_audit;
use crate::dtos::ContactListParams;
use crate::middleware::AuthAdmin;
use crate::models::{Contact, ContactPatch, ContactSort, NewAuditEntry, NewContact};
use crate::query::sort_records;
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

pub async fn list_contacts(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<ContactListParams>,
) -> Result<Json<Vec<Contact>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let filter = params.filter();
    let mut contacts: Vec<Contact> = state
        .store
        .list_contacts(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect();
    sort_records::<ContactSort>(&mut contacts, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(contacts))
}

pub async fn create_contact(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<NewContact>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_access(req.own_firm_id)?;

    let contact = state.store.create_contact(req).await?;
    record_audit(
        &state,
        &admin,
        Some(contact.own_firm_id),
        NewAuditEntry::event(format!("Kontakt {} wurde hinzugefügt.", contact.name)),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn update_contact(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<ContactPatch>,
) -> Result<Json<Contact>, AppError> {
    let mut contact = state.store.get_contact(id).await?;
    admin.ensure_access(contact.own_firm_id)?;

    let summary = format!("Daten zum Kontakt {} wurden verändert.", contact.name);
    let changes = contact.apply_update(patch);
    state.store.save_contact(&contact).await?;

    record_audit(
        &state,
        &admin,
        Some(contact.own_firm_id),
        NewAuditEntry::mutation(summary, changes),
    )
    .await?;

    Ok(Json(contact))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let contact = state.store.get_contact(id).await?;
    admin.ensure_access(contact.own_firm_id)?;

    state.store.delete_contact(id).await?;
    record_audit(
        &state,
        &admin,
        Some(contact.own_firm_id),
        NewAuditEntry::event(format!("Kontakt {} wurde gelöscht.", contact.name)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
