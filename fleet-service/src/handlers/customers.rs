use super::record_audit;
use crate::dtos::ScopedListParams;
use crate::middleware::AuthAdmin;
use crate::models::{Customer, CustomerPatch, CustomerSort, NewAuditEntry, NewCustomer};
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

pub async fn list_customers(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<ScopedListParams>,
) -> Result<Json<Vec<Customer>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let mut customers = state.store.list_customers(params.own_firm_id).await?;
    sort_records::<CustomerSort>(&mut customers, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(customers))
}

pub async fn create_customer(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<NewCustomer>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_access(req.own_firm_id)?;

    let customer = state.store.create_customer(req).await?;
    record_audit(
        &state,
        &admin,
        Some(customer.own_firm_id),
        NewAuditEntry::event(format!("Kunde {} wurde hinzugefügt.", customer.name)),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<CustomerPatch>,
) -> Result<Json<Customer>, AppError> {
    let mut customer = state.store.get_customer(id).await?;
    admin.ensure_access(customer.own_firm_id)?;

    let summary = format!("Daten zum Kunden {} wurden verändert.", customer.name);
    let changes = customer.apply_update(patch);
    state.store.save_customer(&customer).await?;

    record_audit(
        &state,
        &admin,
        Some(customer.own_firm_id),
        NewAuditEntry::mutation(summary, changes),
    )
    .await?;

    Ok(Json(customer))
}

/// Refused while invoices or credit notes still point at the customer.
pub async fn delete_customer(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let customer = state.store.get_customer(id).await?;
    admin.ensure_access(customer.own_firm_id)?;

    state.store.delete_customer(id).await?;
    record_audit(
        &state,
        &admin,
        Some(customer.own_firm_id),
        NewAuditEntry::event(format!("Kunde {} wurde gelöscht.", customer.name)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
