//! Start page of a firm: sales, today's tours and upcoming appointments.

use super::today;
use crate::billing::sales_report;
use crate::dtos::{Appointment, Appointments, Dashboard, DashboardParams, DashboardTour};
use crate::middleware::AuthAdmin;
use crate::models::{sort_by_expiry, Document, DocumentOwner};
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;
use std::collections::HashMap;

/// Pending appointments listed per owner kind.
const APPOINTMENTS_SHOWN: usize = 8;

fn appointments(
    documents: &[Document],
    owner: DocumentOwner,
    names: &HashMap<i64, String>,
) -> Vec<Appointment> {
    documents
        .iter()
        .filter(|d| d.owner == owner && d.is_pending())
        .take(APPOINTMENTS_SHOWN)
        .map(|d| Appointment {
            document_id: d.id,
            owner_id: d.owner_id,
            owner: names.get(&d.owner_id).cloned().unwrap_or_default(),
            name: d.name.clone(),
            expiry_date: d.expiry_date,
        })
        .collect()
}

pub async fn dashboard(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<DashboardParams>,
) -> Result<Json<Dashboard>, AppError> {
    admin.ensure_access(params.own_firm_id)?;
    let own_firm_id = params.own_firm_id;
    let as_of = params.as_of.unwrap_or_else(today);

    let bills = state.store.list_bills(own_firm_id).await?;
    let payments = state.store.list_firm_payments(own_firm_id).await?;
    let sales = sales_report(
        as_of,
        bills.iter().map(|b| (b.creation_date, b.total)),
        payments.iter().map(|p| (p.date, p.amount)),
    )?;
    let current_month = sales
        .months
        .first()
        .cloned()
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Ungültiges Datum")))?;

    let workers: HashMap<i64, String> = state
        .store
        .list_workers(own_firm_id)
        .await?
        .into_iter()
        .map(|w| (w.id, w.name))
        .collect();
    let trucks: HashMap<i64, String> = state
        .store
        .list_trucks(own_firm_id)
        .await?
        .into_iter()
        .map(|t| (t.id, t.plate))
        .collect();
    let customers: HashMap<i64, String> = state
        .store
        .list_customers(own_firm_id)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let tours: HashMap<i64, _> = state
        .store
        .list_tours(own_firm_id)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    let mut todays_tours: Vec<DashboardTour> = state
        .store
        .list_firm_tour_days(own_firm_id, as_of)
        .await?
        .into_iter()
        .filter_map(|day| {
            let tour = tours.get(&day.tour_id)?;
            Some(DashboardTour {
                tour_id: tour.id,
                roller_nr: tour.roller_nr.clone(),
                plate: day.truck_id.and_then(|id| trucks.get(&id).cloned()),
                drivers: day
                    .driver_ids
                    .iter()
                    .filter_map(|id| workers.get(id).cloned())
                    .collect(),
                customer: tour.customer_id.and_then(|id| customers.get(&id).cloned()),
            })
        })
        .collect();
    todays_tours.sort_by(|a, b| a.roller_nr.cmp(&b.roller_nr));

    let mut documents = state.store.list_firm_documents(own_firm_id).await?;
    sort_by_expiry(&mut documents);

    Ok(Json(Dashboard {
        as_of,
        sales,
        current_month,
        tours: todays_tours,
        appointments: Appointments {
            trucks: appointments(&documents, DocumentOwner::Truck, &trucks),
            workers: appointments(&documents, DocumentOwner::Worker, &workers),
        },
    }))
}
