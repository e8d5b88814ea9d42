//! Coloured tags shared by all firms. Changes are reserved to superusers.

use super::record_audit;
use crate::dtos::TagListParams;
use crate::middleware::AuthAdmin;
use crate::models::{NewAuditEntry, NewTag, Tag, TagPatch};
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use tracing::info;

pub async fn list_tags(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Query(params): Query<TagListParams>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let mut tags: Vec<Tag> = state
        .store
        .list_tags()
        .await?
        .into_iter()
        .filter(|t| params.section.map_or(true, |section| t.section == section))
        .collect();
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(tags))
}

pub async fn create_tag(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<NewTag>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_superuser()?;

    let tag = state.store.create_tag(req).await?;
    info!(tag_id = tag.id, "Tag created");
    record_audit(
        &state,
        &admin,
        None,
        NewAuditEntry::event(format!("Tag {} wurde hinzugefügt.", tag.name)),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update_tag(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<TagPatch>,
) -> Result<Json<Tag>, AppError> {
    admin.ensure_superuser()?;

    let mut tag = state.store.get_tag(id).await?;
    let summary = format!("Daten zum Tag {} wurden verändert.", tag.name);
    let changes = tag.apply_update(patch);
    state.store.save_tag(&tag).await?;

    record_audit(&state, &admin, None, NewAuditEntry::mutation(summary, changes)).await?;

    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    admin.ensure_superuser()?;

    let tag = state.store.get_tag(id).await?;
    state.store.delete_tag(id).await?;
    record_audit(
        &state,
        &admin,
        None,
        NewAuditEntry::event(format!("Tag {} wurde gelöscht.", tag.name)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
