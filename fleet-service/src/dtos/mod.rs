pub mod auth;
pub mod listing;
pub mod views;

pub use auth::{LoginRequest, LoginResponse};
pub use listing::{
    AdminListParams, AuditListParams, BillListParams, ContactListParams, CreditNoteListParams,
    DashboardParams, DocumentListParams, FirmDocumentParams, FuelCardListParams,
    HolidayOverviewParams, OffdayCalendarParams, PaymentListParams, RosterParams,
    ScopedListParams, TagListParams, TourListParams, TruckListParams, WorkerListParams,
    WorktimeMonthParams,
};
pub use views::{
    Appointment, Appointments, CreatedBill, CreditNoteDetail, DailyExpense, Dashboard,
    DashboardTour, DebtLedger, FuelCardDetail, HolidayOverview, OffdayView, PaymentPosted,
    TourDetail, WorkerHolidays, WorkerOffdays,
};
