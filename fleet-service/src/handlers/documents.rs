//! Documents and appointments of workers and trucks, with an optional
//! attached file each.

use super::{discard_document, read_upload, record_audit, today};
use crate::dtos::{DocumentListParams, FirmDocumentParams};
use crate::export::{ExportFile, ExportPayload};
use crate::middleware::AuthAdmin;
use crate::models::{
    sort_by_expiry, Document, DocumentOwner, DocumentPatch, DocumentSort, NewAuditEntry,
    NewDocument,
};
use crate::query::sort_records;
use crate::services::files::extension_of;
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

/// Owning firm and display name of a document's worker or truck.
async fn owner_of(
    state: &AppState,
    owner: DocumentOwner,
    owner_id: i64,
) -> Result<(i64, String), AppError> {
    match owner {
        DocumentOwner::Worker => {
            let worker = state.store.get_worker(owner_id).await?;
            Ok((worker.own_firm_id, format!("{}({})", worker.name, worker.worker_nr)))
        }
        DocumentOwner::Truck => {
            let truck = state.store.get_truck(owner_id).await?;
            Ok((truck.own_firm_id, truck.plate))
        }
    }
}

/// Stored files of the owner's documents, collected before the owner is
/// deleted together with its documents.
pub(crate) async fn owner_files(
    state: &AppState,
    owner: DocumentOwner,
    owner_id: i64,
) -> Result<Vec<String>, AppError> {
    Ok(state
        .store
        .list_documents(owner, owner_id)
        .await?
        .into_iter()
        .filter_map(|d| d.file_path)
        .collect())
}

async fn list_documents(
    state: AppState,
    admin: AuthAdmin,
    owner: DocumentOwner,
    owner_id: i64,
    params: DocumentListParams,
) -> Result<Json<Vec<Document>>, AppError> {
    let (own_firm_id, _) = owner_of(&state, owner, owner_id).await?;
    admin.ensure_access(own_firm_id)?;

    let mut documents = state.store.list_documents(owner, owner_id).await?;
    if params.sort.is_some() {
        sort_records::<DocumentSort>(
            &mut documents,
            params.sort.as_deref(),
            params.direction.as_deref(),
        );
    } else {
        sort_by_expiry(&mut documents);
    }
    Ok(Json(documents))
}

async fn create_document(
    state: AppState,
    admin: AuthAdmin,
    owner: DocumentOwner,
    owner_id: i64,
    req: NewDocument,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let (own_firm_id, owner_name) = owner_of(&state, owner, owner_id).await?;
    admin.ensure_access(own_firm_id)?;

    let document = state
        .store
        .create_document(own_firm_id, owner, owner_id, req)
        .await?;
    let summary = match owner {
        DocumentOwner::Worker => format!(
            "Neues Dokument {} wurde zum Mitarbeiter {} hinzugefügt.",
            document.name, owner_name
        ),
        DocumentOwner::Truck => format!(
            "Neues Dokument mit dem Namen {} wurde für das LKW {} hinzugefügt.",
            document.name, owner_name
        ),
    };
    record_audit(&state, &admin, Some(own_firm_id), NewAuditEntry::event(summary)).await?;

    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list_worker_documents(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    Query(params): Query<DocumentListParams>,
) -> Result<Json<Vec<Document>>, AppError> {
    list_documents(state, admin, DocumentOwner::Worker, id, params).await
}

pub async fn create_worker_document(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<NewDocument>,
) -> Result<impl IntoResponse, AppError> {
    create_document(state, admin, DocumentOwner::Worker, id, req).await
}

pub async fn list_truck_documents(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    Query(params): Query<DocumentListParams>,
) -> Result<Json<Vec<Document>>, AppError> {
    list_documents(state, admin, DocumentOwner::Truck, id, params).await
}

pub async fn create_truck_document(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<NewDocument>,
) -> Result<impl IntoResponse, AppError> {
    create_document(state, admin, DocumentOwner::Truck, id, req).await
}

/// Appointments of the whole firm, earliest expiry first.
pub async fn list_firm_documents(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<FirmDocumentParams>,
) -> Result<Json<Vec<Document>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let mut documents: Vec<Document> = state
        .store
        .list_firm_documents(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|d| !params.pending_only || d.is_pending())
        .collect();
    sort_by_expiry(&mut documents);
    Ok(Json(documents))
}

pub async fn update_document(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<DocumentPatch>,
) -> Result<Json<Document>, AppError> {
    let mut document = state.store.get_document(id).await?;
    admin.ensure_access(document.own_firm_id)?;

    let summary = format!(
        "Details vom {}/Termin {} wurden verändert.",
        document.owner.label(),
        document.name
    );
    let changes = document.apply_update(patch);
    state.store.save_document(&document).await?;

    record_audit(
        &state,
        &admin,
        Some(document.own_firm_id),
        NewAuditEntry::mutation(summary, changes),
    )
    .await?;

    Ok(Json(document))
}

pub async fn delete_document(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let document = state.store.get_document(id).await?;
    admin.ensure_access(document.own_firm_id)?;

    state.store.delete_document(id).await?;
    discard_document(&state, document.file_path.clone()).await;

    record_audit(
        &state,
        &admin,
        Some(document.own_firm_id),
        NewAuditEntry::event(format!(
            "{} {} wurde gelöscht.",
            document.owner.label(),
            document.name
        )),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Attaches a file to the document, replacing the previous one.
pub async fn upload_document_file(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Document>, AppError> {
    let mut document = state.store.get_document(id).await?;
    admin.ensure_access(document.own_firm_id)?;

    let upload = read_upload(multipart).await?;
    let key = state
        .files
        .put(
            document.owner.category(),
            &extension_of(&upload.file_name),
            upload.data,
        )
        .await?;
    let previous = document.file_path.replace(key);
    document.upload_date = Some(today());
    state.store.save_document(&document).await?;
    discard_document(&state, previous).await;

    record_audit(
        &state,
        &admin,
        Some(document.own_firm_id),
        NewAuditEntry::event(format!(
            "Eine Datei wurde dem {} {} hinzugefügt.",
            document.owner.label(),
            document.name
        )),
    )
    .await?;

    Ok(Json(document))
}

pub async fn download_document_file(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<ExportPayload>, AppError> {
    let document = state.store.get_document(id).await?;
    admin.ensure_access(document.own_firm_id)?;

    let key = document.file_path.as_deref().ok_or_else(|| {
        AppError::NotFound(anyhow::anyhow!("Dokument {} hat keine Datei", document.name))
    })?;
    let bytes = state.files.get(key).await?;

    Ok(Json(ExportPayload::from(&ExportFile {
        name: format!("{}.{}", document.name, extension_of(key)),
        bytes,
    })))
}

pub async fn delete_document_file(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<Document>, AppError> {
    let mut document = state.store.get_document(id).await?;
    admin.ensure_access(document.own_firm_id)?;

    let Some(previous) = document.file_path.take() else {
        return Ok(Json(document));
    };
    document.upload_date = None;
    state.store.save_document(&document).await?;
    discard_document(&state, Some(previous)).await;

    record_audit(
        &state,
        &admin,
        Some(document.own_firm_id),
        NewAuditEntry::event(format!(
            "Datei vom {} {} wurde gelöscht.",
            document.owner.label(),
            document.name
        )),
    )
    .await?;

    Ok(Json(document))
}
