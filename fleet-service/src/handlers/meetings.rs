use super::record_audit;
use crate::middleware::AuthAdmin;
use crate::models::{Contact, Meeting, MeetingPatch, NewAuditEntry, NewMeeting};
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

async fn contact(state: &AppState, admin: &AuthAdmin, id: i64) -> Result<Contact, AppError> {
    let contact = state.store.get_contact(id).await?;
    admin.ensure_access(contact.own_firm_id)?;
    Ok(contact)
}

pub async fn list_meetings(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Meeting>>, AppError> {
    contact(&state, &admin, id).await?;
    Ok(Json(state.store.list_meetings(id).await?))
}

pub async fn create_meeting(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<NewMeeting>,
) -> Result<impl IntoResponse, AppError> {
    let contact = contact(&state, &admin, id).await?;

    let meeting = state.store.create_meeting(contact.id, req).await?;
    record_audit(
        &state,
        &admin,
        Some(contact.own_firm_id),
        NewAuditEntry::event(format!(
            "Meeting am {} mit dem Kontakt {} wurde hinzugefügt.",
            meeting.date.format("%d.%m.%Y"),
            contact.name
        )),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(meeting)))
}

pub async fn update_meeting(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<MeetingPatch>,
) -> Result<Json<Meeting>, AppError> {
    let mut meeting = state.store.get_meeting(id).await?;
    let contact = contact(&state, &admin, meeting.contact_id).await?;

    let summary = format!("Daten zum Meeting mit {} wurden verändert.", contact.name);
    let changes = meeting.apply_update(patch);
    state.store.save_meeting(&meeting).await?;

    record_audit(
        &state,
        &admin,
        Some(contact.own_firm_id),
        NewAuditEntry::mutation(summary, changes),
    )
    .await?;

    Ok(Json(meeting))
}

pub async fn delete_meeting(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let meeting = state.store.get_meeting(id).await?;
    let contact = contact(&state, &admin, meeting.contact_id).await?;

    state.store.delete_meeting(id).await?;
    record_audit(
        &state,
        &admin,
        Some(contact.own_firm_id),
        NewAuditEntry::event(format!(
            "Meeting am {} mit dem Kontakt {} wurde gelöscht.",
            meeting.date.format("%d.%m.%Y"),
            contact.name
        )),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
