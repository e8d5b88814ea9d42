//! Offday planning and the yearly holiday overview.

use super::record_audit;
use crate::dtos::{
    HolidayOverview, HolidayOverviewParams, OffdayCalendarParams, OffdayView, WorkerHolidays,
    WorkerOffdays,
};
use crate::middleware::AuthAdmin;
use crate::models::{
    list_offdays, offdays_by_month, working_days, NewAuditEntry, Offday, OffdayPlan,
    PlanOffdays, RemoveOffdays, Tag, TagSection, Worker, WorkerFilter,
};
use crate::query::Range;
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Months, NaiveDate};
use service_core::error::AppError;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

fn bad_request(message: &str) -> AppError {
    AppError::BadRequest(anyhow::anyhow!("{}", message))
}

/// First and last day of a calendar month.
fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| bad_request("Ungültiger Monat"))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| bad_request("Ungültiger Monat"))?;
    Ok((first, last))
}

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| bad_request("Ungültiges Jahr"))?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(|| bad_request("Ungültiges Jahr"))?;
    Ok((first, last))
}

async fn offday_tags(state: &AppState) -> Result<HashMap<i64, Tag>, AppError> {
    Ok(state
        .store
        .list_tags()
        .await?
        .into_iter()
        .filter(|t| t.section == TagSection::Offday)
        .map(|t| (t.id, t))
        .collect())
}

fn tag_name(tags: &HashMap<i64, Tag>, offday: &Offday) -> String {
    tags.get(&offday.tag_id)
        .map(|t| t.name.clone())
        .unwrap_or_default()
}

async fn planned_worker(state: &AppState, admin: &AuthAdmin, id: i64) -> Result<Worker, AppError> {
    let worker = state.store.get_worker(id).await?;
    admin.ensure_access(worker.own_firm_id)?;
    Ok(worker)
}

/// Plans the weekdays among the given dates with one offday tag. Weekend
/// dates are skipped; earlier plans on the same dates are replaced.
pub async fn plan_offdays(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<PlanOffdays>,
) -> Result<impl IntoResponse, AppError> {
    let worker = planned_worker(&state, &admin, id).await?;

    let tag = state.store.get_tag(req.tag_id).await?;
    if tag.section != TagSection::Offday {
        return Err(bad_request("Der Tag gehört nicht zur Urlaubsplanung"));
    }
    let dates = working_days(&req.dates);
    if dates.is_empty() {
        return Err(bad_request("Keine Werktage ausgewählt"));
    }

    let plan = OffdayPlan {
        dates,
        tag_id: tag.id,
        is_holiday: tag.is_holiday(),
        notes: req.notes,
    };
    let planned = state.store.plan_offdays(&worker, &plan).await?;
    info!(worker_id = worker.id, days = planned.len(), tag = %tag.name, "Offdays planned");

    let listed = list_offdays(planned.iter().map(|o| (&o.date, tag.name.as_str())), " - ");
    record_audit(
        &state,
        &admin,
        Some(worker.own_firm_id),
        NewAuditEntry::event(format!(
            "Urlaubsplanung für Mitarbeiter {}({}) hinzugefügt: {}",
            worker.name, worker.worker_nr, listed
        )),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(planned)))
}

pub async fn remove_offdays(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RemoveOffdays>,
) -> Result<Json<Vec<Offday>>, AppError> {
    let worker = planned_worker(&state, &admin, id).await?;

    let removed = state.store.delete_offdays(&worker, &req.ids).await?;
    if removed.is_empty() {
        return Ok(Json(removed));
    }

    let tags = offday_tags(&state).await?;
    let names: Vec<String> = removed.iter().map(|o| tag_name(&tags, o)).collect();
    let listed = list_offdays(
        removed.iter().zip(&names).map(|(o, name)| (&o.date, name.as_str())),
        " : ",
    );
    record_audit(
        &state,
        &admin,
        Some(worker.own_firm_id),
        NewAuditEntry::event(format!(
            "Tage von der Urlaubsplanung für {}({}) wurden gelöscht: {}",
            worker.name, worker.worker_nr, listed
        )),
    )
    .await?;

    Ok(Json(removed))
}

/// Offdays of one month per active worker.
pub async fn offday_calendar(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<OffdayCalendarParams>,
) -> Result<Json<Vec<WorkerOffdays>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let (from, to) = month_bounds(params.year, params.month)?;
    let remaining = Range::new(params.remaining_from, params.remaining_to);
    let workers: Vec<Worker> = state
        .store
        .list_workers(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|w| WorkerFilter::default().matches(w))
        .filter(|w| params.worker_id.map_or(true, |id| w.id == id))
        .filter(|w| remaining.contains(&w.holidays_left()))
        .collect();

    let tags = offday_tags(&state).await?;
    let offdays = state.store.list_offdays(params.own_firm_id, from, to).await?;

    let calendar = workers
        .into_iter()
        .map(|worker| WorkerOffdays {
            worker_id: worker.id,
            remaining_holidays: worker.holidays_left(),
            offdays: offdays
                .iter()
                .filter(|o| o.worker_id == worker.id)
                .filter(|o| params.tag_id.map_or(true, |id| o.tag_id == id))
                .map(|o| OffdayView {
                    id: o.id,
                    date: o.date,
                    tag_id: o.tag_id,
                    tag: tag_name(&tags, o),
                    tag_colour: tags
                        .get(&o.tag_id)
                        .map(|t| t.colour.clone())
                        .unwrap_or_default(),
                    notes: o.notes.clone(),
                })
                .collect(),
            name: worker.name,
        })
        .collect();
    Ok(Json(calendar))
}

/// Holiday accounts of one year with each worker's holiday, sick and unpaid
/// days per month. Workers without an account show their full entitlement.
pub async fn holiday_overview(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<HolidayOverviewParams>,
) -> Result<Json<HolidayOverview>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let (from, to) = year_bounds(params.year)?;
    let accounts = state.store.list_holiday_accounts(params.own_firm_id).await?;
    let available_years: Vec<i32> = accounts
        .iter()
        .map(|a| a.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let tags = offday_tags(&state).await?;
    let offdays = state.store.list_offdays(params.own_firm_id, from, to).await?;
    let mut workers: Vec<Worker> = state
        .store
        .list_workers(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|w| WorkerFilter::default().matches(w))
        .collect();
    workers.sort_by(|a, b| a.name.cmp(&b.name));

    let details = workers
        .into_iter()
        .map(|worker| {
            let account = accounts
                .iter()
                .find(|a| a.worker_id == worker.id && a.year == params.year);
            let named: Vec<(NaiveDate, String)> = offdays
                .iter()
                .filter(|o| o.worker_id == worker.id)
                .map(|o| (o.date, tag_name(&tags, o)))
                .collect();
            WorkerHolidays {
                worker_id: worker.id,
                remaining_holiday_days: account.map_or(worker.holidays, |a| a.remaining_days),
                used_holiday_days: account.map_or(0, |a| a.used_days),
                months: offdays_by_month(named.iter().map(|(date, tag)| (date, tag.as_str()))),
                name: worker.name,
            }
        })
        .collect();

    Ok(Json(HolidayOverview {
        year: params.year,
        available_years,
        workers: details,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_bounds_cover_the_whole_month() {
        let (first, last) = month_bounds(2024, 2).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let (_, december) = month_bounds(2024, 12).unwrap();
        assert_eq!(december, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert!(month_bounds(2024, 13).is_err());
    }
}
