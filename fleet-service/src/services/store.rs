//! Persistence seam shared by the Postgres and in-memory backends.

use crate::audit::ChangeSet;
use crate::models::{
    Admin, AuditEntry, Bill, BillDraft, Contact, CreditNote, CreditNoteDraft, CreditNotePatch,
    CreditNotePayment, Customer, Debt, Document, DocumentOwner, FuelCard, FuelCardHandover,
    HolidayAccount, Meeting, NewAdmin, NewAuditEntry, NewContact, NewCustomer, NewDebt,
    NewDocument, NewFuelCard, NewHandover, NewMeeting, NewOwnFirm, NewPayment, NewTag, NewTour,
    NewTourDays, NewTruck, NewWorker, Offday, OffdayPlan, OwnFirm, Tag, Tour, TourDay, Truck,
    WorkTime, WorkTimeEntry, Worker,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;

/// Record lookups fail with `NotFound`; uniqueness violations fail with
/// `Conflict` carrying the user-facing message. Listings are unsorted; the
/// query layer orders them.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // Own firms
    async fn list_own_firms(&self) -> Result<Vec<OwnFirm>, AppError>;
    async fn get_own_firm(&self, id: i64) -> Result<OwnFirm, AppError>;
    async fn create_own_firm(&self, input: NewOwnFirm) -> Result<OwnFirm, AppError>;
    async fn save_own_firm(&self, firm: &OwnFirm) -> Result<(), AppError>;
    /// Deletes the firm with everything it owns.
    async fn delete_own_firm(&self, id: i64) -> Result<(), AppError>;

    // Admins
    async fn count_admins(&self) -> Result<i64, AppError>;
    async fn list_admins(&self) -> Result<Vec<Admin>, AppError>;
    async fn get_admin(&self, id: i64) -> Result<Admin, AppError>;
    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>, AppError>;
    async fn find_admin_by_token(&self, token: uuid::Uuid) -> Result<Option<Admin>, AppError>;
    async fn create_admin(&self, input: NewAdmin) -> Result<Admin, AppError>;
    async fn save_admin(&self, admin: &Admin) -> Result<(), AppError>;
    async fn delete_admin(&self, id: i64) -> Result<(), AppError>;

    // Customers
    async fn list_customers(&self, own_firm_id: i64) -> Result<Vec<Customer>, AppError>;
    async fn get_customer(&self, id: i64) -> Result<Customer, AppError>;
    async fn find_customer_by_name(
        &self,
        own_firm_id: i64,
        name: &str,
    ) -> Result<Option<Customer>, AppError>;
    async fn create_customer(&self, input: NewCustomer) -> Result<Customer, AppError>;
    async fn save_customer(&self, customer: &Customer) -> Result<(), AppError>;
    /// Fails with `Conflict` while invoices or credit notes reference the customer.
    async fn delete_customer(&self, id: i64) -> Result<(), AppError>;

    // Workers
    async fn list_workers(&self, own_firm_id: i64) -> Result<Vec<Worker>, AppError>;
    async fn get_worker(&self, id: i64) -> Result<Worker, AppError>;
    async fn create_worker(&self, input: NewWorker) -> Result<Worker, AppError>;
    async fn save_worker(&self, worker: &Worker) -> Result<(), AppError>;
    /// Deletes the worker with their documents, debts, offdays, holiday
    /// accounts and working times.
    async fn delete_worker(&self, id: i64) -> Result<(), AppError>;
    /// Overrides the remaining days of the worker's account for `year`.
    /// `None` drops the account so the full entitlement applies again.
    async fn set_remaining_holidays(
        &self,
        worker_id: i64,
        year: i32,
        remaining: Option<i32>,
    ) -> Result<(), AppError>;

    // Trucks
    async fn list_trucks(&self, own_firm_id: i64) -> Result<Vec<Truck>, AppError>;
    async fn get_truck(&self, id: i64) -> Result<Truck, AppError>;
    async fn create_truck(&self, input: NewTruck) -> Result<Truck, AppError>;
    async fn save_truck(&self, truck: &Truck) -> Result<(), AppError>;
    /// Deletes the truck with its documents.
    async fn delete_truck(&self, id: i64) -> Result<(), AppError>;

    // Tours
    async fn list_tours(&self, own_firm_id: i64) -> Result<Vec<Tour>, AppError>;
    async fn get_tour(&self, id: i64) -> Result<Tour, AppError>;
    async fn create_tour(&self, input: NewTour) -> Result<Tour, AppError>;
    async fn save_tour(&self, tour: &Tour) -> Result<(), AppError>;
    async fn delete_tour(&self, id: i64) -> Result<(), AppError>;
    async fn list_tour_days(&self, tour_id: i64) -> Result<Vec<TourDay>, AppError>;
    /// Schedules `dates` on the tour, replacing any day already on the same date.
    async fn put_tour_days(
        &self,
        tour_id: i64,
        dates: &[NaiveDate],
        template: &NewTourDays,
    ) -> Result<Vec<TourDay>, AppError>;
    /// Removes the given days of the tour and returns what was removed.
    async fn delete_tour_days(&self, tour_id: i64, day_ids: &[i64]) -> Result<Vec<TourDay>, AppError>;
    /// Days of all the firm's tours scheduled on `date`.
    async fn list_firm_tour_days(
        &self,
        own_firm_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TourDay>, AppError>;

    // Fuel cards
    async fn list_fuel_cards(&self, own_firm_id: i64) -> Result<Vec<FuelCard>, AppError>;
    async fn get_fuel_card(&self, id: i64) -> Result<FuelCard, AppError>;
    async fn create_fuel_card(&self, input: NewFuelCard) -> Result<FuelCard, AppError>;
    async fn save_fuel_card(&self, card: &FuelCard) -> Result<(), AppError>;
    async fn delete_fuel_card(&self, id: i64) -> Result<(), AppError>;
    async fn list_handovers(&self, fuel_card_id: i64) -> Result<Vec<FuelCardHandover>, AppError>;
    /// Closes the latest handover at the new received date, opens a new one
    /// and makes the worker the card holder.
    async fn hand_over_fuel_card(
        &self,
        fuel_card_id: i64,
        input: &NewHandover,
    ) -> Result<(FuelCard, FuelCardHandover), AppError>;

    // Contacts
    async fn list_contacts(&self, own_firm_id: i64) -> Result<Vec<Contact>, AppError>;
    async fn get_contact(&self, id: i64) -> Result<Contact, AppError>;
    async fn create_contact(&self, input: NewContact) -> Result<Contact, AppError>;
    async fn save_contact(&self, contact: &Contact) -> Result<(), AppError>;
    /// Deletes the contact with its meetings.
    async fn delete_contact(&self, id: i64) -> Result<(), AppError>;

    // Meetings
    async fn list_meetings(&self, contact_id: i64) -> Result<Vec<Meeting>, AppError>;
    async fn get_meeting(&self, id: i64) -> Result<Meeting, AppError>;
    async fn create_meeting(&self, contact_id: i64, input: NewMeeting) -> Result<Meeting, AppError>;
    async fn save_meeting(&self, meeting: &Meeting) -> Result<(), AppError>;
    async fn delete_meeting(&self, id: i64) -> Result<(), AppError>;

    // Worker and truck documents
    async fn list_documents(
        &self,
        owner: DocumentOwner,
        owner_id: i64,
    ) -> Result<Vec<Document>, AppError>;
    /// Documents of every worker and truck of the firm.
    async fn list_firm_documents(&self, own_firm_id: i64) -> Result<Vec<Document>, AppError>;
    async fn get_document(&self, id: i64) -> Result<Document, AppError>;
    async fn create_document(
        &self,
        own_firm_id: i64,
        owner: DocumentOwner,
        owner_id: i64,
        input: NewDocument,
    ) -> Result<Document, AppError>;
    /// Saves the details and the attached file of the document.
    async fn save_document(&self, document: &Document) -> Result<(), AppError>;
    async fn delete_document(&self, id: i64) -> Result<(), AppError>;

    // Worker debts
    async fn list_debts(&self, worker_id: i64) -> Result<Vec<Debt>, AppError>;
    async fn get_debt(&self, id: i64) -> Result<Debt, AppError>;
    async fn create_debt(&self, worker_id: i64, input: NewDebt) -> Result<Debt, AppError>;
    async fn save_debt(&self, debt: &Debt) -> Result<(), AppError>;
    async fn delete_debt(&self, id: i64) -> Result<(), AppError>;

    // Working times
    async fn list_worktimes(&self, worker_id: i64) -> Result<Vec<WorkTime>, AppError>;
    async fn get_worktime(&self, id: i64) -> Result<WorkTime, AppError>;
    /// Stores the entry, replacing the worker's entry on the same date.
    async fn put_worktime(&self, entry: WorkTimeEntry) -> Result<WorkTime, AppError>;
    async fn delete_worktime(&self, id: i64) -> Result<(), AppError>;

    // Tags
    async fn list_tags(&self) -> Result<Vec<Tag>, AppError>;
    async fn get_tag(&self, id: i64) -> Result<Tag, AppError>;
    /// Names are unique within a section.
    async fn create_tag(&self, input: NewTag) -> Result<Tag, AppError>;
    async fn save_tag(&self, tag: &Tag) -> Result<(), AppError>;
    /// Fails with `Conflict` while offdays carry the tag.
    async fn delete_tag(&self, id: i64) -> Result<(), AppError>;

    // Offdays and holiday accounts
    /// Offdays of the firm's workers dated within `from..=to`.
    async fn list_offdays(
        &self,
        own_firm_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Offday>, AppError>;
    /// Replaces the worker's offdays on the planned dates and books holiday
    /// days against the accounts of their years, opening accounts from the
    /// worker's entitlement. Returns the new offdays.
    async fn plan_offdays(&self, worker: &Worker, plan: &OffdayPlan) -> Result<Vec<Offday>, AppError>;
    /// Removes the worker's given offdays, refunding holiday days, and
    /// returns what was removed.
    async fn delete_offdays(&self, worker: &Worker, ids: &[i64]) -> Result<Vec<Offday>, AppError>;
    /// Accounts of all the firm's workers over all years.
    async fn list_holiday_accounts(&self, own_firm_id: i64) -> Result<Vec<HolidayAccount>, AppError>;

    // Bills
    /// Bills without their line items.
    async fn list_bills(&self, own_firm_id: i64) -> Result<Vec<Bill>, AppError>;
    /// Bill with its line items in position order.
    async fn get_bill(&self, id: i64) -> Result<Bill, AppError>;
    /// Assigns the next number of the (firm, year) scope and inserts the bill
    /// with its items atomically.
    async fn create_bill(&self, draft: BillDraft) -> Result<Bill, AppError>;
    async fn set_bill_document(&self, id: i64, path: Option<String>) -> Result<Bill, AppError>;
    async fn delete_bill(&self, id: i64) -> Result<(), AppError>;

    // Credit notes
    async fn list_credit_notes(&self, own_firm_id: i64) -> Result<Vec<CreditNote>, AppError>;
    async fn get_credit_note(&self, id: i64) -> Result<CreditNote, AppError>;
    async fn create_credit_note(&self, draft: CreditNoteDraft) -> Result<CreditNote, AppError>;
    /// Applies the patch to the locked row so the balance is recomputed
    /// against the current payment total.
    async fn update_credit_note(
        &self,
        id: i64,
        patch: CreditNotePatch,
        customer_name: Option<String>,
        today: NaiveDate,
    ) -> Result<(CreditNote, ChangeSet), AppError>;
    async fn set_credit_note_document(
        &self,
        id: i64,
        path: Option<String>,
    ) -> Result<CreditNote, AppError>;
    async fn delete_credit_note(&self, id: i64) -> Result<(), AppError>;

    // Credit-note payments
    async fn list_payments(&self, credit_note_id: i64) -> Result<Vec<CreditNotePayment>, AppError>;
    /// Payments on all credit notes of the firm.
    async fn list_firm_payments(&self, own_firm_id: i64) -> Result<Vec<CreditNotePayment>, AppError>;
    async fn get_payment(&self, id: i64) -> Result<CreditNotePayment, AppError>;
    /// Records the payment and updates the note balance atomically.
    async fn post_payment(
        &self,
        credit_note_id: i64,
        input: &NewPayment,
        today: NaiveDate,
    ) -> Result<(CreditNote, CreditNotePayment), AppError>;
    /// Removes the payment and reverses it on the note balance atomically.
    async fn delete_payment(
        &self,
        id: i64,
        today: NaiveDate,
    ) -> Result<(CreditNote, CreditNotePayment), AppError>;

    // Audit log
    async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, AppError>;
    /// Entries of one firm, or every entry when `own_firm_id` is `None`.
    async fn list_audit(&self, own_firm_id: Option<i64>) -> Result<Vec<AuditEntry>, AppError>;
}

pub(crate) fn not_found(what: &str, id: i64) -> AppError {
    AppError::NotFound(anyhow::anyhow!("{} {} not found", what, id))
}

pub(crate) fn conflict(message: &str) -> AppError {
    AppError::Conflict(anyhow::anyhow!("{}", message))
}
