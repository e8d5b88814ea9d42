use super::documents::owner_files;
use super::{discard_document, record_audit};
use crate::dtos::TruckListParams;
use crate::middleware::AuthAdmin;
use crate::models::{
    DocumentOwner, NewAuditEntry, NewTruck, Truck, TruckPatch, TruckPaymentPatch, TruckSort,
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

pub async fn list_trucks(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<TruckListParams>,
) -> Result<Json<Vec<Truck>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let filter = params.filter();
    let mut trucks: Vec<Truck> = state
        .store
        .list_trucks(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|t| filter.matches(t))
        .collect();
    sort_records::<TruckSort>(&mut trucks, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(trucks))
}

pub async fn get_truck(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<Truck>, AppError> {
    let truck = state.store.get_truck(id).await?;
    admin.ensure_access(truck.own_firm_id)?;
    Ok(Json(truck))
}

pub async fn create_truck(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<NewTruck>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_access(req.own_firm_id)?;

    let truck = state.store.create_truck(req).await?;
    record_audit(
        &state,
        &admin,
        Some(truck.own_firm_id),
        NewAuditEntry::event(format!("LKW {} wurde hinzugefügt.", truck.plate)),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(truck)))
}

pub async fn update_truck(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<TruckPatch>,
) -> Result<Json<Truck>, AppError> {
    let mut truck = state.store.get_truck(id).await?;
    admin.ensure_access(truck.own_firm_id)?;

    let summary = format!("Daten zum LKW {} wurden verändert.", truck.plate);
    let changes = truck.apply_update(patch);
    state.store.save_truck(&truck).await?;

    record_audit(
        &state,
        &admin,
        Some(truck.own_firm_id),
        NewAuditEntry::mutation(summary, changes),
    )
    .await?;

    Ok(Json(truck))
}

/// Purchase and installment details.
pub async fn update_truck_payment(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<TruckPaymentPatch>,
) -> Result<Json<Truck>, AppError> {
    let mut truck = state.store.get_truck(id).await?;
    admin.ensure_access(truck.own_firm_id)?;

    let changes = truck.apply_payment_update(patch);
    state.store.save_truck(&truck).await?;

    record_audit(
        &state,
        &admin,
        Some(truck.own_firm_id),
        NewAuditEntry::mutation(
            format!("Zahlungsdetails vom LKW {} wurden verändert.", truck.plate),
            changes,
        ),
    )
    .await?;

    Ok(Json(truck))
}

pub async fn delete_truck(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let truck = state.store.get_truck(id).await?;
    admin.ensure_access(truck.own_firm_id)?;

    let files = owner_files(&state, DocumentOwner::Truck, id).await?;
    state.store.delete_truck(id).await?;
    for key in files {
        discard_document(&state, Some(key)).await;
    }
    record_audit(
        &state,
        &admin,
        Some(truck.own_firm_id),
        NewAuditEntry::event(format!("LKW {} wurde gelöscht.", truck.plate)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
