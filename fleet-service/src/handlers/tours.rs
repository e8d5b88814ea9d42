use super::record_audit;
use crate::audit::Patch;
use crate::dtos::{TourDetail, TourListParams};
use crate::middleware::AuthAdmin;
use crate::models::{
    list_dates, working_days, NewAuditEntry, NewTour, NewTourDays, RemoveTourDays, Tour,
    TourDay, TourPatch, TourReferences, TourSort,
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
use std::collections::HashMap;

/// Display names of the customers, trucks and workers of one firm.
async fn firm_references(state: &AppState, own_firm_id: i64) -> Result<TourReferences, AppError> {
    let customers = state.store.list_customers(own_firm_id).await?;
    let trucks = state.store.list_trucks(own_firm_id).await?;
    let workers = state.store.list_workers(own_firm_id).await?;

    Ok(TourReferences {
        customers: customers.into_iter().map(|c| (c.id, c.name)).collect(),
        trucks: trucks.into_iter().map(|t| (t.id, t.plate)).collect(),
        drivers: workers.into_iter().map(|w| (w.id, w.name)).collect(),
    })
}

/// A referenced id must name a record of the tour's own firm.
fn check_reference(
    names: &HashMap<i64, String>,
    id: Option<i64>,
    what: &str,
) -> Result<(), AppError> {
    match id {
        Some(id) if !names.contains_key(&id) => Err(AppError::BadRequest(anyhow::anyhow!(
            "{} {} gehört nicht zu dieser Firma",
            what,
            id
        ))),
        _ => Ok(()),
    }
}

fn patched_id(patch: &Patch<Option<i64>>) -> Option<i64> {
    match patch {
        Patch::Present(id) => *id,
        Patch::Absent => None,
    }
}

pub async fn list_tours(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<TourListParams>,
) -> Result<Json<Vec<Tour>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let filter = params.filter();
    let mut tours: Vec<Tour> = state
        .store
        .list_tours(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|t| filter.matches(t))
        .collect();
    sort_records::<TourSort>(&mut tours, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(tours))
}

pub async fn get_tour(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<TourDetail>, AppError> {
    let tour = state.store.get_tour(id).await?;
    admin.ensure_access(tour.own_firm_id)?;

    let mut days = state.store.list_tour_days(id).await?;
    days.sort_by_key(|d| d.date);
    Ok(Json(TourDetail { tour, days }))
}

pub async fn create_tour(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<NewTour>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_access(req.own_firm_id)?;

    let refs = firm_references(&state, req.own_firm_id).await?;
    check_reference(&refs.customers, req.customer_id, "Kunde")?;
    check_reference(&refs.trucks, req.truck_id, "LKW")?;
    check_reference(&refs.drivers, req.driver_id, "Fahrer")?;

    let tour = state.store.create_tour(req).await?;
    record_audit(
        &state,
        &admin,
        Some(tour.own_firm_id),
        NewAuditEntry::event(format!("Tour {} wurde hinzugefügt.", tour.roller_nr)),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(tour)))
}

pub async fn update_tour(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<TourPatch>,
) -> Result<Json<Tour>, AppError> {
    let mut tour = state.store.get_tour(id).await?;
    admin.ensure_access(tour.own_firm_id)?;

    let refs = firm_references(&state, tour.own_firm_id).await?;
    check_reference(&refs.customers, patched_id(&patch.customer_id), "Kunde")?;
    check_reference(&refs.trucks, patched_id(&patch.truck_id), "LKW")?;
    check_reference(&refs.drivers, patched_id(&patch.driver_id), "Fahrer")?;

    let summary = format!("Tour {} wurde verändert.", tour.roller_nr);
    let changes = tour.apply_update(patch, &refs);
    state.store.save_tour(&tour).await?;

    record_audit(
        &state,
        &admin,
        Some(tour.own_firm_id),
        NewAuditEntry::mutation(summary, changes),
    )
    .await?;

    Ok(Json(tour))
}

pub async fn delete_tour(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let tour = state.store.get_tour(id).await?;
    admin.ensure_access(tour.own_firm_id)?;

    state.store.delete_tour(id).await?;
    record_audit(
        &state,
        &admin,
        Some(tour.own_firm_id),
        NewAuditEntry::event(format!("Tour {} wurde gelöscht.", tour.roller_nr)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Schedules the working days among `dates`; weekends are skipped.
pub async fn add_tour_days(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<NewTourDays>,
) -> Result<impl IntoResponse, AppError> {
    let tour = state.store.get_tour(id).await?;
    admin.ensure_access(tour.own_firm_id)?;

    let dates = working_days(&req.dates);
    if dates.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Keine Arbeitstage unter den angegebenen Daten"
        )));
    }

    let refs = firm_references(&state, tour.own_firm_id).await?;
    check_reference(&refs.trucks, req.truck_id, "LKW")?;
    for driver in &req.driver_ids {
        check_reference(&refs.drivers, Some(*driver), "Fahrer")?;
    }

    let days: Vec<TourDay> = state.store.put_tour_days(id, &dates, &req).await?;
    record_audit(
        &state,
        &admin,
        Some(tour.own_firm_id),
        NewAuditEntry::event(format!(
            "Neue Tour Tage wurden für die Tour {} hinzugefügt. Tage: {}",
            tour.roller_nr,
            list_dates(&dates)
        )),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(days)))
}

pub async fn remove_tour_days(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RemoveTourDays>,
) -> Result<Json<Vec<TourDay>>, AppError> {
    let tour = state.store.get_tour(id).await?;
    admin.ensure_access(tour.own_firm_id)?;

    let mut removed = state.store.delete_tour_days(id, &req.day_ids).await?;
    if removed.is_empty() {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Keine passenden Tour Tage gefunden"
        )));
    }
    removed.sort_by_key(|d| d.date);
    let dates: Vec<_> = removed.iter().map(|d| d.date).collect();

    record_audit(
        &state,
        &admin,
        Some(tour.own_firm_id),
        NewAuditEntry::event(format!(
            "Tour Tage wurden von der Tour {} entfernt. Tage: {}",
            tour.roller_nr,
            list_dates(&dates)
        )),
    )
    .await?;

    Ok(Json(removed))
}
