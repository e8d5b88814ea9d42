//! Advances paid out to workers and their repayments.

use super::record_audit;
use crate::billing::format_german;
use crate::dtos::DebtLedger;
use crate::middleware::AuthAdmin;
use crate::models::{Debt, DebtPatch, DebtSummary, NewAuditEntry, NewDebt, Worker};
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;

fn ensure_nonzero(amount: Decimal) -> Result<(), AppError> {
    if amount.is_zero() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Der Betrag darf nicht 0 sein")));
    }
    Ok(())
}

async fn debtor(state: &AppState, admin: &AuthAdmin, worker_id: i64) -> Result<Worker, AppError> {
    let worker = state.store.get_worker(worker_id).await?;
    admin.ensure_access(worker.own_firm_id)?;
    Ok(worker)
}

/// The worker's ledger in date order with its totals.
pub async fn list_debts(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<DebtLedger>, AppError> {
    debtor(&state, &admin, id).await?;

    let debts = state.store.list_debts(id).await?;
    let summary = DebtSummary::of(&debts)?;
    Ok(Json(DebtLedger { debts, summary }))
}

/// Books an advance (positive amount) or a repayment (negative amount).
pub async fn create_debt(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<NewDebt>,
) -> Result<impl IntoResponse, AppError> {
    ensure_nonzero(req.amount)?;
    let worker = debtor(&state, &admin, id).await?;

    let debt = state.store.create_debt(worker.id, req).await?;
    let summary = if debt.is_repayment() {
        format!(
            "{} mit der Personalnummer {} hat {} € an Schulden abgeglichen.",
            worker.name,
            worker.worker_nr,
            format_german(debt.amount.abs())
        )
    } else {
        format!(
            "Schulden in Wert von {} € wurde an {}({}) gegeben.",
            format_german(debt.amount),
            worker.name,
            worker.worker_nr
        )
    };
    record_audit(&state, &admin, Some(worker.own_firm_id), NewAuditEntry::event(summary)).await?;

    Ok((StatusCode::CREATED, Json(debt)))
}

pub async fn update_debt(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<DebtPatch>,
) -> Result<Json<Debt>, AppError> {
    let mut debt = state.store.get_debt(id).await?;
    let worker = debtor(&state, &admin, debt.worker_id).await?;

    let summary = format!(
        "Details zur Schulden vom Mitarbeiter {} wurden verändert.",
        worker.name
    );
    let changes = debt.apply_update(patch);
    ensure_nonzero(debt.amount)?;
    state.store.save_debt(&debt).await?;

    record_audit(
        &state,
        &admin,
        Some(worker.own_firm_id),
        NewAuditEntry::mutation(summary, changes),
    )
    .await?;

    Ok(Json(debt))
}

pub async fn delete_debt(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let debt = state.store.get_debt(id).await?;
    let worker = debtor(&state, &admin, debt.worker_id).await?;

    state.store.delete_debt(id).await?;
    record_audit(
        &state,
        &admin,
        Some(worker.own_firm_id),
        NewAuditEntry::event(format!(
            "Schuldeneintrag vom {} für {}({}) wurde gelöscht.",
            debt.date.format("%d.%m.%Y"),
            worker.name,
            worker.worker_nr
        )),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
