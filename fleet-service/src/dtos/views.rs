use crate::models::{
    CreditNote, CreditNotePayment, Debt, DebtSummary, FuelCard, FuelCardHandover, MonthOffdays,
    Tour, TourDay,
};
use crate::billing::money::serialize_cents;
use crate::billing::{MonthlySales, SalesReport};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TourDetail {
    #[serde(flatten)]
    pub tour: Tour,
    pub days: Vec<TourDay>,
}

#[derive(Debug, Serialize)]
pub struct FuelCardDetail {
    #[serde(flatten)]
    pub card: FuelCard,
    pub handovers: Vec<FuelCardHandover>,
}

#[derive(Debug, Serialize)]
pub struct CreditNoteDetail {
    #[serde(flatten)]
    pub credit_note: CreditNote,
    pub payments: Vec<CreditNotePayment>,
}

#[derive(Debug, Serialize)]
pub struct PaymentPosted {
    pub credit_note: CreditNote,
    pub payment: CreditNotePayment,
}

/// Response of invoice creation: the id plus the rendered PDF.
#[derive(Debug, Serialize)]
pub struct CreatedBill {
    pub id: i64,
    pub number: String,
    pub name: String,
    pub file: String,
}

#[derive(Debug, Serialize)]
pub struct DebtLedger {
    pub debts: Vec<Debt>,
    pub summary: DebtSummary,
}

#[derive(Debug, Serialize)]
pub struct OffdayView {
    pub id: i64,
    pub date: NaiveDate,
    pub tag_id: i64,
    pub tag: String,
    pub tag_colour: String,
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct WorkerOffdays {
    pub worker_id: i64,
    pub name: String,
    pub remaining_holidays: i32,
    pub offdays: Vec<OffdayView>,
}

#[derive(Debug, Serialize)]
pub struct WorkerHolidays {
    pub worker_id: i64,
    pub name: String,
    pub remaining_holiday_days: i32,
    pub used_holiday_days: i32,
    /// January first.
    pub months: [MonthOffdays; 12],
}

#[derive(Debug, Serialize)]
pub struct HolidayOverview {
    pub year: i32,
    pub available_years: Vec<i32>,
    pub workers: Vec<WorkerHolidays>,
}

#[derive(Debug, Serialize)]
pub struct DailyExpense {
    pub worker_id: i64,
    pub name: String,
    pub worker_nr: String,
    #[serde(serialize_with = "serialize_cents")]
    pub daily_expense: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DashboardTour {
    pub tour_id: i64,
    pub roller_nr: String,
    pub plate: Option<String>,
    pub drivers: Vec<String>,
    pub customer: Option<String>,
}

/// A pending document of a worker or truck.
#[derive(Debug, Serialize)]
pub struct Appointment {
    pub document_id: i64,
    pub owner_id: i64,
    /// Worker name or truck plate.
    pub owner: String,
    pub name: String,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct Appointments {
    pub trucks: Vec<Appointment>,
    pub workers: Vec<Appointment>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub as_of: NaiveDate,
    pub sales: SalesReport,
    pub current_month: MonthlySales,
    pub tours: Vec<DashboardTour>,
    pub appointments: Appointments,
}
