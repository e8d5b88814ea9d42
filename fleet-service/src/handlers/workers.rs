use super::documents::owner_files;
use super::{discard_document, record_audit, today};
use crate::dtos::{RosterParams, WorkerListParams};
use crate::export::{render_roster, ExportPayload};
use crate::middleware::AuthAdmin;
use crate::models::{
    DocumentOwner, NewAuditEntry, NewWorker, Worker, WorkerFilter, WorkerPatch, WorkerSort,
};
use crate::query::sort_records;
use crate::services::metrics::EXPORTS_TOTAL;
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Datelike;
use service_core::error::AppError;
use tracing::info;

pub async fn list_workers(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<WorkerListParams>,
) -> Result<Json<Vec<Worker>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let filter = params.filter();
    let mut workers: Vec<Worker> = state
        .store
        .list_workers(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|w| filter.matches(w))
        .collect();
    sort_records::<WorkerSort>(&mut workers, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(workers))
}

pub async fn get_worker(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<Worker>, AppError> {
    let worker = state.store.get_worker(id).await?;
    admin.ensure_access(worker.own_firm_id)?;
    Ok(Json(worker))
}

pub async fn create_worker(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<NewWorker>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_access(req.own_firm_id)?;

    let remaining = req.remaining_holidays;
    let mut worker = state.store.create_worker(req).await?;
    if remaining.is_some() {
        state
            .store
            .set_remaining_holidays(worker.id, today().year(), remaining)
            .await?;
        worker.remaining_holidays = remaining;
    }
    record_audit(
        &state,
        &admin,
        Some(worker.own_firm_id),
        NewAuditEntry::event(format!("Mitarbeiter {} wurde hinzugefügt.", worker.name)),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(worker)))
}

pub async fn update_worker(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<WorkerPatch>,
) -> Result<Json<Worker>, AppError> {
    let mut worker = state.store.get_worker(id).await?;
    admin.ensure_access(worker.own_firm_id)?;

    let summary = format!("Details zum Mitarbeiter {} wurden verändert.", worker.name);
    let balance_changed = patch.remaining_holidays.is_present();
    let changes = worker.apply_update(patch);
    state.store.save_worker(&worker).await?;
    if balance_changed {
        state
            .store
            .set_remaining_holidays(worker.id, today().year(), worker.remaining_holidays)
            .await?;
    }

    record_audit(
        &state,
        &admin,
        Some(worker.own_firm_id),
        NewAuditEntry::mutation(summary, changes),
    )
    .await?;

    Ok(Json(worker))
}

pub async fn delete_worker(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let worker = state.store.get_worker(id).await?;
    admin.ensure_access(worker.own_firm_id)?;

    let files = owner_files(&state, DocumentOwner::Worker, id).await?;
    state.store.delete_worker(id).await?;
    for key in files {
        discard_document(&state, Some(key)).await;
    }
    record_audit(
        &state,
        &admin,
        Some(worker.own_firm_id),
        NewAuditEntry::event(format!("Mitarbeiter {} wurde gelöscht.", worker.name)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Spreadsheet of the firm's workers in hiring order.
pub async fn export_roster(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<RosterParams>,
) -> Result<Json<ExportPayload>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let firm = state.store.get_own_firm(params.own_firm_id).await?;
    let filter = WorkerFilter {
        include_quit: params.include_quit,
        ..Default::default()
    };
    let mut workers: Vec<Worker> = state
        .store
        .list_workers(firm.id)
        .await?
        .into_iter()
        .filter(|w| filter.matches(w))
        .collect();
    workers.sort_by_key(|w| w.id);

    let export = render_roster(&firm.name, &workers, today())?;
    EXPORTS_TOTAL.with_label_values(&["roster_xlsx"]).inc();
    info!(own_firm_id = firm.id, workers = workers.len(), "Worker roster exported");

    Ok(Json(ExportPayload::from(&export)))
}
