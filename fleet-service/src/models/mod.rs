//! Domain models for fleet-service.

mod admin;
mod audit_entry;
mod bill;
mod contact;
mod credit_note;
mod customer;
mod debt;
mod document;
mod fuel_card;
mod meeting;
mod offday;
mod own_firm;
mod tag;
mod tour;
mod truck;
mod worker;
mod worktime;

pub use admin::{Admin, AdminPatch, AdminSort, CreateAdminRequest, NewAdmin, DUPLICATE_USERNAME};
pub use audit_entry::{AuditEntry, AuditEntryView, AuditFilter, AuditSort, NewAuditEntry};
pub use bill::{
    Bill, BillDraft, BillFilter, BillSort, CreateBillRequest, LineItem, LineItemDraft,
    LineItemInput, BILL_DOCUMENTS,
};
pub use contact::{Contact, ContactFilter, ContactPatch, ContactSort, NewContact};
pub use credit_note::{
    CreditNote, CreditNoteDraft, CreditNoteFilter, CreditNotePatch, CreditNotePayment,
    CreditNoteSort, NewCreditNote, NewPayment, PaymentSort, CREDIT_NOTE_DOCUMENTS,
    DUPLICATE_DOCUMENT_NR,
};
pub use customer::{
    Customer, CustomerPatch, CustomerSort, NewCustomer, CUSTOMER_IN_USE, DUPLICATE_CUSTOMER,
};
pub use debt::{Debt, DebtPatch, DebtSummary, NewDebt};
pub use document::{
    sort_by_expiry, Document, DocumentOwner, DocumentPatch, DocumentSort, NewDocument,
    TRUCK_DOCUMENTS, WORKER_DOCUMENTS,
};
pub use fuel_card::{
    latest_handover, FuelCard, FuelCardFilter, FuelCardHandover, FuelCardPatch, FuelCardSort,
    NewFuelCard, NewHandover, DUPLICATE_CARD_NR,
};
pub use meeting::{Meeting, MeetingPatch, NewMeeting};
pub use offday::{
    holiday_deltas, list_offdays, offdays_by_month, HolidayAccount, MonthOffdays, Offday,
    OffdayPlan, PlanOffdays, RemoveOffdays,
};
pub use own_firm::{NewOwnFirm, OwnFirm, OwnFirmPatch, DUPLICATE_OWN_FIRM, FIRM_LOGOS};
pub use tag::{
    NewTag, Tag, TagPatch, TagSection, DUPLICATE_TAG, HOLIDAY_TAG, SICK_TAG, TAG_IN_USE,
    UNPAID_HOLIDAY_TAG,
};
pub use tour::{
    list_dates, working_days, NewTour, NewTourDays, RemoveTourDays, Tour, TourDay, TourFilter,
    TourPatch, TourReferences, TourSort, DUPLICATE_ROLLER_NR,
};
pub use truck::{
    NewTruck, PaymentMethod, Truck, TruckFilter, TruckPatch, TruckPaymentPatch, TruckSort,
    DUPLICATE_PLATE,
};
pub use worker::{
    is_driver_position, NewWorker, Worker, WorkerFilter, WorkerPatch, WorkerSort,
    DUPLICATE_WORKER_NR,
};
pub use worktime::{worked_minutes, DailyExpenseChange, NewWorkTime, WorkTime, WorkTimeEntry};
