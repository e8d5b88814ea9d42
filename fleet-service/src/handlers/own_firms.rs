//! Owning firms (tenants). Changes are reserved to superusers.

use super::{discard_document, read_upload, record_audit};
use crate::export::{ExportFile, ExportPayload};
use crate::middleware::AuthAdmin;
use crate::models::{NewAuditEntry, NewOwnFirm, OwnFirm, OwnFirmPatch, FIRM_LOGOS};
use crate::services::files::extension_of;
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use tracing::info;

/// Firms the acting admin can access, by name.
pub async fn list_own_firms(
    State(state): State<AppState>,
    admin: AuthAdmin,
) -> Result<Json<Vec<OwnFirm>>, AppError> {
    let mut firms: Vec<OwnFirm> = state
        .store
        .list_own_firms()
        .await?
        .into_iter()
        .filter(|firm| admin.0.can_access(firm.id))
        .collect();
    firms.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(firms))
}

pub async fn create_own_firm(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<NewOwnFirm>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_superuser()?;

    let firm = state.store.create_own_firm(req).await?;
    info!(own_firm_id = firm.id, "Own firm created");

    record_audit(
        &state,
        &admin,
        Some(firm.id),
        NewAuditEntry::event(format!("Firma {} wurde hinzugefügt.", firm.name)),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(firm)))
}

pub async fn update_own_firm(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<OwnFirmPatch>,
) -> Result<Json<OwnFirm>, AppError> {
    admin.ensure_superuser()?;

    let mut firm = state.store.get_own_firm(id).await?;
    let summary = format!("Daten zur Firma {} wurden verändert.", firm.name);
    let changes = firm.apply_update(patch);
    state.store.save_own_firm(&firm).await?;

    record_audit(&state, &admin, Some(firm.id), NewAuditEntry::mutation(summary, changes)).await?;

    Ok(Json(firm))
}

/// Deletes the firm together with everything it owns.
pub async fn delete_own_firm(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    admin.ensure_superuser()?;

    let firm = state.store.get_own_firm(id).await?;
    state.store.delete_own_firm(id).await?;
    discard_document(&state, firm.logo_path.clone()).await;
    info!(own_firm_id = id, "Own firm deleted");

    record_audit(
        &state,
        &admin,
        None,
        NewAuditEntry::event(format!("Firma {} wurde gelöscht.", firm.name)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

const LOGO_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "svg"];

/// Replaces the letterhead logo of the firm.
pub async fn upload_logo(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<OwnFirm>, AppError> {
    admin.ensure_superuser()?;

    let mut firm = state.store.get_own_firm(id).await?;
    let upload = read_upload(multipart).await?;
    let extension = extension_of(&upload.file_name);
    if !LOGO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Das Logo muss ein Bild sein ({})",
            LOGO_EXTENSIONS.join(", ")
        )));
    }

    let key = state.files.put(FIRM_LOGOS, &extension, upload.data).await?;
    let previous = firm.logo_path.replace(key);
    state.store.save_own_firm(&firm).await?;
    discard_document(&state, previous).await;
    info!(own_firm_id = id, "Own firm logo replaced");

    record_audit(
        &state,
        &admin,
        Some(firm.id),
        NewAuditEntry::event(format!("Logo der Firma {} wurde aktualisiert.", firm.name)),
    )
    .await?;

    Ok(Json(firm))
}

pub async fn download_logo(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<ExportPayload>, AppError> {
    admin.ensure_access(id)?;

    let firm = state.store.get_own_firm(id).await?;
    let key = firm
        .logo_path
        .as_deref()
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Firma {} hat kein Logo", firm.name)))?;
    let bytes = state.files.get(key).await?;

    Ok(Json(ExportPayload::from(&ExportFile {
        name: format!("Logo -- {}.{}", firm.name, extension_of(key)),
        bytes,
    })))
}
