//! Invoices: numbered creation with PDF rendering, listing and documents.

use super::{discard_document, read_upload, record_audit};
use crate::dtos::{BillListParams, CreatedBill};
use crate::export::{render_invoice, ExportFile, ExportPayload};
use crate::middleware::AuthAdmin;
use crate::models::{
    Bill, BillDraft, BillSort, CreateBillRequest, NewAuditEntry, NewCustomer, OwnFirm,
    BILL_DOCUMENTS,
};
use crate::query::sort_records;
use crate::services::files::extension_of;
use crate::services::metrics::{BILLS_TOTAL, EXPORTS_TOTAL};
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use tracing::{error, info, warn};

pub async fn list_bills(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Query(params): Query<BillListParams>,
) -> Result<Json<Vec<Bill>>, AppError> {
    admin.ensure_access(params.own_firm_id)?;

    let filter = params.filter();
    let mut bills: Vec<Bill> = state
        .store
        .list_bills(params.own_firm_id)
        .await?
        .into_iter()
        .filter(|b| filter.matches(b))
        .collect();
    sort_records::<BillSort>(&mut bills, params.sort.as_deref(), params.direction.as_deref());
    Ok(Json(bills))
}

pub async fn get_bill(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<Bill>, AppError> {
    let bill = state.store.get_bill(id).await?;
    admin.ensure_access(bill.own_firm_id)?;
    Ok(Json(bill))
}

/// Numbers the invoice within its firm and year, renders and stores the
/// PDF and returns it base64 encoded.
///
/// The customer is looked up by name within the firm and created on first use.
pub async fn create_bill(
    State(state): State<AppState>,
    admin: AuthAdmin,
    ValidatedJson(req): ValidatedJson<CreateBillRequest>,
) -> Result<impl IntoResponse, AppError> {
    admin.ensure_access(req.own_firm_id)?;
    if let (Some(start), Some(end)) = (req.pay_start, req.pay_end) {
        if start > end {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Der Zahlungszeitraum endet vor seinem Beginn"
            )));
        }
    }

    let firm = state.store.get_own_firm(req.own_firm_id).await?;
    let customer = match state
        .store
        .find_customer_by_name(firm.id, &req.customer_name)
        .await?
    {
        Some(customer) => customer,
        None => {
            state
                .store
                .create_customer(NewCustomer {
                    own_firm_id: firm.id,
                    name: req.customer_name.clone(),
                    vat_id: req.vat_id.clone(),
                    address: req.address.clone(),
                })
                .await?
        }
    };

    let draft = BillDraft::new(req, customer.id)?;
    let bill = state.store.create_bill(draft).await?;
    let (bill, export) = match attach_invoice_document(&state, &firm, &bill).await {
        Ok(stored) => stored,
        Err(err) => {
            warn!(bill_id = bill.id, error = %err, "Invoice document failed, withdrawing bill");
            if let Err(cleanup) = state.store.delete_bill(bill.id).await {
                error!(bill_id = bill.id, error = %cleanup, "Failed to withdraw bill");
            }
            return Err(err);
        }
    };
    BILLS_TOTAL.with_label_values(&[&firm.id.to_string()]).inc();
    info!(bill_id = bill.id, number = %bill.number, "Invoice created");

    record_audit(
        &state,
        &admin,
        Some(firm.id),
        NewAuditEntry::event(format!(
            "Rechnung {} für {} wurde erstellt.",
            bill.number, bill.customer_name
        )),
    )
    .await?;

    let payload = ExportPayload::from(&export);
    Ok((
        StatusCode::CREATED,
        Json(CreatedBill {
            id: bill.id,
            number: bill.number,
            name: payload.name,
            file: payload.file,
        }),
    ))
}

/// Renders the PDF for a freshly numbered bill and links it. A stored file
/// whose link fails is removed again.
async fn attach_invoice_document(
    state: &AppState,
    firm: &OwnFirm,
    bill: &Bill,
) -> Result<(Bill, ExportFile), AppError> {
    let export = render_invoice(firm, bill)?;
    EXPORTS_TOTAL.with_label_values(&["invoice_pdf"]).inc();
    let key = state
        .files
        .put(BILL_DOCUMENTS, "pdf", export.bytes.clone())
        .await?;
    match state.store.set_bill_document(bill.id, Some(key.clone())).await {
        Ok(bill) => Ok((bill, export)),
        Err(err) => {
            discard_document(state, Some(key)).await;
            Err(err)
        }
    }
}

pub async fn delete_bill(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let bill = state.store.get_bill(id).await?;
    admin.ensure_access(bill.own_firm_id)?;

    state.store.delete_bill(id).await?;
    discard_document(&state, bill.document_path.clone()).await;

    record_audit(
        &state,
        &admin,
        Some(bill.own_firm_id),
        NewAuditEntry::event(format!("Rechnung {} wurde gelöscht.", bill.number)),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Replaces the stored document (e.g. a signed scan) of an invoice.
pub async fn upload_bill_document(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Bill>, AppError> {
    let bill = state.store.get_bill(id).await?;
    admin.ensure_access(bill.own_firm_id)?;

    let upload = read_upload(multipart).await?;
    let key = state
        .files
        .put(BILL_DOCUMENTS, &extension_of(&upload.file_name), upload.data)
        .await?;
    let updated = state.store.set_bill_document(id, Some(key)).await?;
    discard_document(&state, bill.document_path).await;

    record_audit(
        &state,
        &admin,
        Some(updated.own_firm_id),
        NewAuditEntry::event(format!(
            "Ein Dokument wurde der Rechnung {} hinzugefügt.",
            updated.number
        )),
    )
    .await?;

    Ok(Json(updated))
}

pub async fn download_bill_document(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i64>,
) -> Result<Json<ExportPayload>, AppError> {
    let bill = state.store.get_bill(id).await?;
    admin.ensure_access(bill.own_firm_id)?;

    let key = bill
        .document_path
        .as_deref()
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Rechnung {} hat kein Dokument", bill.number))
        })?;
    let firm = state.store.get_own_firm(bill.own_firm_id).await?;
    let bytes = state.files.get(key).await?;

    Ok(Json(ExportPayload::from(&ExportFile {
        name: format!("Rechnung -- {} -- {}.{}", firm.name, bill.number, extension_of(key)),
        bytes,
    })))
}
