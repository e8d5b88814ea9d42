use super::{ensure_same_firm, record_audit};
use crate::dtos::{FuelCardDetail, FuelCardListParams};
use crate::middleware::AuthAdmin;
use crate::models::{
    FuelCard, FuelCardPatch, FuelCardSort, NewAuditEntry, NewFuelCard, NewHandover,
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
use service_core::error::AppError;

pub async fn list_fuel_cards(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<FuelCardListParams>,
) -> Result<Json<Vec<FuelCard>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let filter = params.filter();
    let mut cards: Vec<FuelCard> = state
        .store
        .list_fuel_cards(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect();
    sort_records::<FuelCardSort>(&mut cards, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(cards))
}

/// The card with its handover history, latest first.
pub async fn get_fuel_card(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<FuelCardDetail>, AppError> {
    let card = state.store.get_fuel_card(id).await?;
    admin.ensure_access(card.own_firm_id)?;

    let mut handovers = state.store.list_handovers(id).await?;
    handovers.sort_by(|a, b| b.received_date.cmp(&a.received_date).then(b.id.cmp(&a.id)));
    Ok(Json(FuelCardDetail { card, handovers }))
}

pub async fn create_fuel_card(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<NewFuelCard>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_access(req.own_firm_id)?;

    let card = state.store.create_fuel_card(req).await?;
    record_audit(
        &state,
        &admin,
        Some(card.own_firm_id),
        NewAuditEntry::event(format!("Tankkarte {} wurde hinzugefügt.", card.card_nr)),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update_fuel_card(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<FuelCardPatch>,
) -> Result<Json<FuelCard>, AppError> {
    let mut card = state.store.get_fuel_card(id).await?;
    admin.ensure_access(card.own_firm_id)?;

    let summary = format!("Daten zur Tankkarte {} wurden verändert.", card.card_nr);
    let changes = card.apply_update(patch);
    state.store.save_fuel_card(&card).await?;

    record_audit(
        &state,
        &admin,
        Some(card.own_firm_id),
        NewAuditEntry::mutation(summary, changes),
    )
    .await?;

    Ok(Json(card))
}

pub async fn delete_fuel_card(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let card = state.store.get_fuel_card(id).await?;
    admin.ensure_access(card.own_firm_id)?;

    state.store.delete_fuel_card(id).await?;
    record_audit(
        &state,
        &admin,
        Some(card.own_firm_id),
        NewAuditEntry::event(format!("Tankkarte {} wurde gelöscht.", card.card_nr)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Gives the card to another worker and closes the previous holder's period.
pub async fn hand_over_fuel_card(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<NewHandover>,
) -> Result<impl IntoResponse, AppError> {
    let card = state.store.get_fuel_card(id).await?;
    admin.ensure_access(card.own_firm_id)?;

    let worker = state.store.get_worker(req.worker_id).await?;
    ensure_same_firm(card.own_firm_id, worker.own_firm_id, "Mitarbeiter")?;
    if let Some(returned) = req.returned_date {
        if returned < req.received_date {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Das Rückgabedatum liegt vor dem Übergabedatum"
            )));
        }
    }

    let (card, handover) = state.store.hand_over_fuel_card(id, &req).await?;
    tracing::info!(fuel_card_id = id, handover_id = handover.id, "Fuel card handed over");
    record_audit(
        &state,
        &admin,
        Some(card.own_firm_id),
        NewAuditEntry::event(format!(
            "Tankkarte {} wurde am {} an {} abgegeben",
            card.card_nr,
            req.received_date.format("%d.%m.%Y"),
            worker.name
        )),
    )
    .await?;

    let mut handovers = state.store.list_handovers(id).await?;
    handovers.sort_by(|a, b| b.received_date.cmp(&a.received_date).then(b.id.cmp(&a.id)));
    Ok((StatusCode::CREATED, Json(FuelCardDetail { card, handovers })))
}
