//! Query strings of the listing endpoints.
//!
//! `sort` names one of the entity's sortable fields and `direction` is
//! `asc` or `des`; filters left out of the query string do not restrict.

use crate::models::{
    AuditFilter, BillFilter, ContactFilter, CreditNoteFilter, FuelCardFilter, TagSection,
    TourFilter, TruckFilter, WorkerFilter,
};
use crate::query::Range;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ScopedListParams {
    pub own_firm_id: i64,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminListParams {
    pub sort: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentListParams {
    pub sort: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkerListParams {
    pub own_firm_id: i64,
    pub sort: Option<String>,
    pub direction: Option<String>,
    #[serde(default)]
    pub include_quit: bool,
    #[serde(default)]
    pub drivers_only: bool,
    pub name: Option<String>,
}

impl WorkerListParams {
    pub fn filter(&self) -> WorkerFilter {
        WorkerFilter {
            include_quit: self.include_quit,
            drivers_only: self.drivers_only,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RosterParams {
    pub own_firm_id: i64,
    #[serde(default)]
    pub include_quit: bool,
}

#[derive(Debug, Deserialize)]
pub struct TruckListParams {
    pub own_firm_id: i64,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub plate: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

impl TruckListParams {
    pub fn filter(&self) -> TruckFilter {
        TruckFilter {
            plate: self.plate.clone(),
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TourListParams {
    pub own_firm_id: i64,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub customer_id: Option<i64>,
}

impl TourListParams {
    pub fn filter(&self) -> TourFilter {
        TourFilter {
            customer_id: self.customer_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FuelCardListParams {
    pub own_firm_id: i64,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub provider: Option<String>,
    pub holder_id: Option<i64>,
    #[serde(default)]
    pub active_only: bool,
}

impl FuelCardListParams {
    pub fn filter(&self) -> FuelCardFilter {
        FuelCardFilter {
            provider: self.provider.clone(),
            holder_id: self.holder_id,
            active_only: self.active_only,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContactListParams {
    pub own_firm_id: i64,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub name: Option<String>,
    pub company: Option<String>,
}

impl ContactListParams {
    pub fn filter(&self) -> ContactFilter {
        ContactFilter {
            name: self.name.clone(),
            company: self.company.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BillListParams {
    pub own_firm_id: i64,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub customer_id: Option<i64>,
    pub sum_from: Option<Decimal>,
    pub sum_to: Option<Decimal>,
    pub total_from: Option<Decimal>,
    pub total_to: Option<Decimal>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
}

impl BillListParams {
    pub fn filter(&self) -> BillFilter {
        BillFilter {
            customer_id: self.customer_id,
            sum: Range::new(self.sum_from, self.sum_to),
            total: Range::new(self.total_from, self.total_to),
            created: Range::new(self.created_from, self.created_to),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreditNoteListParams {
    pub own_firm_id: i64,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub customer_id: Option<i64>,
    pub advice_nr: Option<String>,
    pub document_nr: Option<String>,
    pub paid_from: Option<Decimal>,
    pub paid_to: Option<Decimal>,
    pub open_from: Option<Decimal>,
    pub open_to: Option<Decimal>,
}

impl CreditNoteListParams {
    pub fn filter(&self) -> CreditNoteFilter {
        CreditNoteFilter {
            customer_id: self.customer_id,
            advice_nr: self.advice_nr.clone(),
            document_nr: self.document_nr.clone(),
            paid: Range::new(self.paid_from, self.paid_to),
            open: Range::new(self.open_from, self.open_to),
        }
    }
}

/// Without `own_firm_id` the whole log is listed (superusers only).
#[derive(Debug, Deserialize)]
pub struct AuditListParams {
    pub own_firm_id: Option<i64>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub admin_id: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditListParams {
    pub fn filter(&self) -> AuditFilter {
        AuditFilter {
            admin_id: self.admin_id,
            recorded: Range::new(self.from, self.to),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentListParams {
    pub sort: Option<String>,
    pub direction: Option<String>,
}

/// Appointments of all the firm's workers and trucks.
#[derive(Debug, Deserialize)]
pub struct FirmDocumentParams {
    pub own_firm_id: i64,
    #[serde(default)]
    pub pending_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct TagListParams {
    pub section: Option<TagSection>,
}

/// One month of the firm's offday calendar.
#[derive(Debug, Deserialize)]
pub struct OffdayCalendarParams {
    pub own_firm_id: i64,
    pub year: i32,
    pub month: u32,
    pub worker_id: Option<i64>,
    pub tag_id: Option<i64>,
    /// Bounds on the remaining holidays of this year's account.
    pub remaining_from: Option<i32>,
    pub remaining_to: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct HolidayOverviewParams {
    pub own_firm_id: i64,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct WorktimeMonthParams {
    pub year: i32,
    pub month: u32,
}

/// Without `as_of` the dashboard reports on today.
#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    pub own_firm_id: i64,
    pub as_of: Option<NaiveDate>,
}
