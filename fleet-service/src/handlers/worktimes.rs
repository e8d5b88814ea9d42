//! Daily working times and the expense allowance paid per worked day.

use super::record_audit;
use crate::billing::format_german;
use crate::dtos::{DailyExpense, ScopedListParams, WorktimeMonthParams};
use crate::middleware::AuthAdmin;
use crate::models::{
    DailyExpenseChange, NewAuditEntry, NewWorkTime, WorkTime, WorkTimeEntry, Worker, WorkerFilter,
    WorkerSort,
};
use crate::query::sort_records;
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

async fn worker(state: &AppState, admin: &AuthAdmin, id: i64) -> Result<Worker, AppError> {
    let worker = state.store.get_worker(id).await?;
    admin.ensure_access(worker.own_firm_id)?;
    Ok(worker)
}

/// Records the worker's day, replacing an earlier entry for the same date.
pub async fn put_worktime(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<NewWorkTime>,
) -> Result<impl IntoResponse, AppError> {
    let worker = worker(&state, &admin, id).await?;

    let entry = WorkTimeEntry::new(worker.id, req, worker.daily_expense).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Die Arbeitszeit darf nicht negativ sein"))
    })?;
    let worktime = state.store.put_worktime(entry).await?;

    record_audit(
        &state,
        &admin,
        Some(worker.own_firm_id),
        NewAuditEntry::event(format!(
            "Arbeitszeiten für den Mitarbeiter {}({}) wurde für den {} eingefügt.",
            worker.name,
            worker.worker_nr,
            worktime.date.format("%d.%m.%Y")
        )),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(worktime)))
}

pub async fn list_worktimes(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    Query(params): Query<WorktimeMonthParams>,
) -> Result<Json<Vec<WorkTime>>, AppError> {
    worker(&state, &admin, id).await?;

    let worktimes = state
        .store
        .list_worktimes(id)
        .await?
        .into_iter()
        .filter(|w| w.date.year() == params.year && w.date.month() == params.month)
        .collect();
    Ok(Json(worktimes))
}

pub async fn delete_worktime(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let worktime = state.store.get_worktime(id).await?;
    let worker = worker(&state, &admin, worktime.worker_id).await?;

    state.store.delete_worktime(id).await?;
    record_audit(
        &state,
        &admin,
        Some(worker.own_firm_id),
        NewAuditEntry::event(format!(
            "Arbeitszeiten für den Mitarbeiter {}({}) vom {} wurden gelöscht.",
            worker.name,
            worker.worker_nr,
            worktime.date.format("%d.%m.%Y")
        )),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Standard daily expense of every worker of the firm.
pub async fn list_daily_expenses(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<ScopedListParams>,
) -> Result<Json<Vec<DailyExpense>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let mut workers: Vec<Worker> = state
        .store
        .list_workers(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|w| WorkerFilter::default().matches(w))
        .collect();
    sort_records::<WorkerSort>(&mut workers, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(
        workers
            .into_iter()
            .map(|w| DailyExpense {
                worker_id: w.id,
                name: w.name,
                worker_nr: w.worker_nr,
                daily_expense: w.daily_expense,
            })
            .collect(),
    ))
}

pub async fn change_daily_expense(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<DailyExpenseChange>,
) -> Result<Json<Worker>, AppError> {
    if req.amount.is_sign_negative() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Der Spesenbetrag darf nicht negativ sein"
        )));
    }
    let mut worker = worker(&state, &admin, id).await?;

    let previous = std::mem::replace(&mut worker.daily_expense, req.amount);
    state.store.save_worker(&worker).await?;

    record_audit(
        &state,
        &admin,
        Some(worker.own_firm_id),
        NewAuditEntry::event(format!(
            "Spesenbetrag des Mitarbeiters {}({}) wurde von {} € auf {} € verändert.",
            worker.name,
            worker.worker_nr,
            format_german(previous),
            format_german(worker.daily_expense)
        )),
    )
    .await?;

    Ok(Json(worker))
}
