//! Credit notes, their documents and the payments settling them.

use super::{discard_document, ensure_same_firm, read_upload, record_audit, today};
use crate::billing::format_german;
use crate::dtos::{CreditNoteDetail, CreditNoteListParams, PaymentListParams, PaymentPosted};
use crate::export::{ExportFile, ExportPayload};
use crate::middleware::AuthAdmin;
use crate::models::{
    CreditNote, CreditNoteDraft, CreditNotePatch, CreditNotePayment, CreditNoteSort,
    NewAuditEntry, NewCreditNote, NewPayment, PaymentSort, CREDIT_NOTE_DOCUMENTS,
};
use crate::query::sort_records;
use crate::services::files::extension_of;
use crate::services::metrics::{CREDIT_NOTES_TOTAL, PAYMENTS_TOTAL};
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use tracing::info;

/// Counts completion flips caused by a balance change.
fn track_completion(before: &CreditNote, after: &CreditNote) {
    match (before.balance.completed, after.balance.completed) {
        (false, true) => CREDIT_NOTES_TOTAL.with_label_values(&["completed"]).inc(),
        (true, false) => CREDIT_NOTES_TOTAL.with_label_values(&["reopened"]).inc(),
        _ => {}
    }
}

pub async fn list_credit_notes(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<CreditNoteListParams>,
) -> Result<Json<Vec<CreditNote>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let filter = params.filter();
    let mut notes: Vec<CreditNote> = state
        .store
        .list_credit_notes(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|n| filter.matches(n))
        .collect();
    sort_records::<CreditNoteSort>(&mut notes, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(notes))
}

pub async fn get_credit_note(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<CreditNoteDetail>, AppError> {
    let credit_note = state.store.get_credit_note(id).await?;
    admin.ensure_access(credit_note.own_firm_id)?;

    let mut payments = state.store.list_payments(id).await?;
    sort_records::<PaymentSort>(&mut payments, Some("date"), Some("des"));
    Ok(Json(CreditNoteDetail { credit_note, payments }))
}

pub async fn create_credit_note(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<NewCreditNote>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_access(req.own_firm_id)?;

    let customer = state.store.get_customer(req.customer_id).await?;
    ensure_same_firm(req.own_firm_id, customer.own_firm_id, "Kunde")?;

    let note = state
        .store
        .create_credit_note(CreditNoteDraft::new(req, customer.name)?)
        .await?;
    CREDIT_NOTES_TOTAL.with_label_values(&["created"]).inc();
    info!(credit_note_id = note.id, "Credit note created");

    record_audit(
        &state,
        &admin,
        Some(note.own_firm_id),
        NewAuditEntry::event(format!("Gutschrift {} wurde erstellt.", note.document_nr)),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

/// Edits descriptive fields; gross amount or tax rate edits re-derive the
/// open amount against what has been paid so far.
pub async fn update_credit_note(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<CreditNotePatch>,
) -> Result<Json<CreditNote>, AppError> {
    let before = state.store.get_credit_note(id).await?;
    admin.ensure_access(before.own_firm_id)?;

    let customer_name = match patch.customer_id.as_ref().into_option() {
        Some(customer_id) => {
            let customer = state.store.get_customer(*customer_id).await?;
            ensure_same_firm(before.own_firm_id, customer.own_firm_id, "Kunde")?;
            Some(customer.name)
        }
        None => None,
    };

    let (note, changes) = state
        .store
        .update_credit_note(id, patch, customer_name, today())
        .await?;
    track_completion(&before, &note);

    record_audit(
        &state,
        &admin,
        Some(note.own_firm_id),
        NewAuditEntry::mutation(
            format!("Daten zur Gutschrift {} wurden verändert.", before.document_nr),
            changes,
        ),
    )
    .await?;

    Ok(Json(note))
}

pub async fn delete_credit_note(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let note = state.store.get_credit_note(id).await?;
    admin.ensure_access(note.own_firm_id)?;

    state.store.delete_credit_note(id).await?;
    discard_document(&state, note.document_path.clone()).await;

    record_audit(
        &state,
        &admin,
        Some(note.own_firm_id),
        NewAuditEntry::event(format!("Gutschrift {} wurde gelöscht.", note.document_nr)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_credit_note_document(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<CreditNote>, AppError> {
    let note = state.store.get_credit_note(id).await?;
    admin.ensure_access(note.own_firm_id)?;

    let upload = read_upload(multipart).await?;
    let key = state
        .files
        .put(CREDIT_NOTE_DOCUMENTS, &extension_of(&upload.file_name), upload.data)
        .await?;
    let updated = state.store.set_credit_note_document(id, Some(key)).await?;
    discard_document(&state, note.document_path).await;

    record_audit(
        &state,
        &admin,
        Some(updated.own_firm_id),
        NewAuditEntry::event(format!(
            "Ein Dokument wurde der Gutschrift {} hinzugefügt.",
            updated.document_nr
        )),
    )
    .await?;

    Ok(Json(updated))
}

pub async fn download_credit_note_document(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<ExportPayload>, AppError> {
    let note = state.store.get_credit_note(id).await?;
    admin.ensure_access(note.own_firm_id)?;

    let key = note.document_path.as_deref().ok_or_else(|| {
        AppError::NotFound(anyhow::anyhow!(
            "Gutschrift {} hat kein Dokument",
            note.document_nr
        ))
    })?;
    let bytes = state.files.get(key).await?;

    Ok(Json(ExportPayload::from(&ExportFile {
        name: format!("Gutschrift -- {}.{}", note.document_nr, extension_of(key)),
        bytes,
    })))
}

pub async fn list_payments(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    Query(params): Query<PaymentListParams>,
) -> Result<Json<Vec<CreditNotePayment>>, AppError> {
    let note = state.store.get_credit_note(id).await?;
    admin.ensure_access(note.own_firm_id)?;

    let mut payments = state.store.list_payments(id).await?;
    sort_records::<PaymentSort>(&mut payments, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(payments))
}

/// Books a payment of any sign against the note's open amount.
pub async fn post_payment(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<NewPayment>,
) -> Result<impl IntoResponse, AppError> {
    let before = state.store.get_credit_note(id).await?;
    admin.ensure_access(before.own_firm_id)?;

    let (credit_note, payment) = state.store.post_payment(id, &req, today()).await?;
    PAYMENTS_TOTAL.with_label_values(&["posted"]).inc();
    track_completion(&before, &credit_note);
    info!(credit_note_id = id, payment_id = payment.id, "Payment posted");

    record_audit(
        &state,
        &admin,
        Some(credit_note.own_firm_id),
        NewAuditEntry::event(format!(
            "Neue Zahlung im Wert von {} € wurde zur Gutschrift {} hinzugefügt",
            format_german(payment.amount),
            credit_note.document_nr
        )),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(PaymentPosted { credit_note, payment })))
}

/// Removes a payment and reverses it on the note's balance.
pub async fn delete_payment(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<CreditNote>, AppError> {
    let payment = state.store.get_payment(id).await?;
    let before = state.store.get_credit_note(payment.credit_note_id).await?;
    admin.ensure_access(before.own_firm_id)?;

    let (credit_note, payment) = state.store.delete_payment(id, today()).await?;
    PAYMENTS_TOTAL.with_label_values(&["reversed"]).inc();
    track_completion(&before, &credit_note);

    record_audit(
        &state,
        &admin,
        Some(credit_note.own_firm_id),
        NewAuditEntry::event(format!(
            "Zahlung im Wert von {} € wurde von der Gutschrift {} entfernt",
            format_german(payment.amount),
            credit_note.document_nr
        )),
    )
    .await?;

    Ok(Json(credit_note))
}
