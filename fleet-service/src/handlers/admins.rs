//! Administrator management (superusers only).

use super::record_audit;
use crate::audit::Patch;
use crate::dtos::AdminListParams;
use crate::middleware::AuthAdmin;
use crate::models::{Admin, AdminPatch, AdminSort, CreateAdminRequest, NewAdmin, NewAuditEntry};
use crate::query::sort_records;
use crate::services::password::{check_strength, hash_password};
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use std::mem;
use tracing::info;
use uuid::Uuid;

fn weak_password(reason: String) -> AppError {
    AppError::BadRequest(anyhow::anyhow!(reason))
}

/// Every listed firm id must exist.
async fn ensure_firms_exist(state: &AppState, own_firm_ids: &[i64]) -> Result<(), AppError> {
    for id in own_firm_ids {
        state.store.get_own_firm(*id).await.map_err(|_| {
            AppError::BadRequest(anyhow::anyhow!("Firma {} existiert nicht", id))
        })?;
    }
    Ok(())
}

pub async fn list_admins(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<AdminListParams>,
) -> Result<Json<Vec<Admin>>, AppError> {
    admin.ensure_superuser()?;

    let mut admins = state.store.list_admins().await?;
    sort_records::<AdminSort>(&mut admins, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(admins))
}

pub async fn get_admin(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<Admin>, AppError> {
    admin.ensure_superuser()?;
    Ok(Json(state.store.get_admin(id).await?))
}

pub async fn create_admin(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<CreateAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_superuser()?;
    check_strength(&req.password, &req.username).map_err(weak_password)?;
    ensure_firms_exist(&state, &req.own_firm_ids).await?;

    let password_hash = hash_password(&req.password).map_err(AppError::InternalError)?;
    let created = state
        .store
        .create_admin(NewAdmin {
            username: req.username,
            name: req.name,
            password_hash,
            token: Uuid::new_v4(),
            is_superuser: req.is_superuser,
            own_firm_ids: req.own_firm_ids,
        })
        .await?;
    info!(admin_id = created.id, "Admin created");

    record_audit(
        &state,
        &admin,
        None,
        NewAuditEntry::event(format!("Admin {} wurde hinzugefügt.", created.username)),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_admin(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(mut patch): ValidatedJson<AdminPatch>,
) -> Result<Json<Admin>, AppError> {
    admin.ensure_superuser()?;

    let mut target = state.store.get_admin(id).await?;
    if let Patch::Present(ids) = &patch.own_firm_ids {
        ensure_firms_exist(&state, ids).await?;
    }

    let summary = format!("Daten zum Admin {} wurden verändert.", target.username);
    let password = mem::take(&mut patch.password);
    let mut changes = target.apply_update(patch);
    if let Some(password) = password.into_option() {
        check_strength(&password, &target.username).map_err(weak_password)?;
        target.password_hash = hash_password(&password).map_err(AppError::InternalError)?;
        changes.record("password", "Passwort", "***", "***");
    }
    state.store.save_admin(&target).await?;

    record_audit(&state, &admin, None, NewAuditEntry::mutation(summary, changes)).await?;

    Ok(Json(target))
}

pub async fn delete_admin(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    admin.ensure_superuser()?;
    if admin.id() == id {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Der eigene Admin kann nicht gelöscht werden"
        )));
    }

    let target = state.store.get_admin(id).await?;
    state.store.delete_admin(id).await?;

    record_audit(
        &state,
        &admin,
        None,
        NewAuditEntry::event(format!("Admin {} wurde gelöscht.", target.username)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
