//! In-memory store used for development and the test suite.
//!
//! All state sits behind one async mutex, so every operation, including bill
//! numbering and balance updates, is serialized.

use super::store::{conflict, not_found, Store};
use crate::audit::ChangeSet;
use crate::billing::DocumentNumber;
use crate::models::{
    holiday_deltas, latest_handover, Admin, AuditEntry, Bill, BillDraft, Contact, CreditNote,
    CreditNoteDraft, CreditNotePatch, CreditNotePayment, Customer, Debt, Document, DocumentOwner,
    FuelCard, FuelCardHandover, HolidayAccount, LineItem, Meeting, NewAdmin, NewAuditEntry,
    NewContact, NewCustomer, NewDebt, NewDocument, NewFuelCard, NewHandover, NewMeeting,
    NewOwnFirm, NewPayment, NewTag, NewTour, NewTourDays, NewTruck, NewWorker, Offday, OffdayPlan,
    OwnFirm, Tag, Tour, TourDay, Truck, WorkTime, WorkTimeEntry, Worker, CUSTOMER_IN_USE,
    DUPLICATE_CARD_NR, DUPLICATE_CUSTOMER, DUPLICATE_DOCUMENT_NR, DUPLICATE_OWN_FIRM,
    DUPLICATE_PLATE, DUPLICATE_ROLLER_NR, DUPLICATE_TAG, DUPLICATE_USERNAME, DUPLICATE_WORKER_NR,
    TAG_IN_USE,
};
use crate::models::is_driver_position;
use crate::query::Identified;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use service_core::error::AppError;
use sqlx::types::Json;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct State {
    last_id: i64,
    own_firms: Vec<OwnFirm>,
    admins: Vec<Admin>,
    customers: Vec<Customer>,
    workers: Vec<Worker>,
    trucks: Vec<Truck>,
    tours: Vec<Tour>,
    tour_days: Vec<TourDay>,
    fuel_cards: Vec<FuelCard>,
    handovers: Vec<FuelCardHandover>,
    contacts: Vec<Contact>,
    meetings: Vec<Meeting>,
    documents: Vec<Document>,
    debts: Vec<Debt>,
    worktimes: Vec<WorkTime>,
    tags: Vec<Tag>,
    offdays: Vec<Offday>,
    holiday_accounts: Vec<HolidayAccount>,
    bills: Vec<Bill>,
    credit_notes: Vec<CreditNote>,
    payments: Vec<CreditNotePayment>,
    audit: Vec<AuditEntry>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// The worker with the remaining days of this year's account.
    fn with_holidays(&self, worker: &Worker) -> Worker {
        let year = Utc::now().year();
        Worker {
            remaining_holidays: self
                .holiday_accounts
                .iter()
                .find(|a| a.worker_id == worker.id && a.year == year)
                .map(|a| a.remaining_days),
            ..worker.clone()
        }
    }

    /// Books `days` on the worker's account for `year`, opening it from the
    /// entitlement when missing.
    fn book_holidays(&mut self, worker_id: i64, entitlement: i32, year: i32, days: i32) {
        match self
            .holiday_accounts
            .iter_mut()
            .find(|a| a.worker_id == worker_id && a.year == year)
        {
            Some(account) => account.book(days),
            None => {
                let mut account = HolidayAccount::opening(worker_id, year, entitlement);
                account.book(days);
                self.holiday_accounts.push(account);
            }
        }
    }

    fn forget_workers(&mut self, worker_ids: &[i64]) {
        self.documents
            .retain(|d| !(d.owner == DocumentOwner::Worker && worker_ids.contains(&d.owner_id)));
        self.debts.retain(|d| !worker_ids.contains(&d.worker_id));
        self.worktimes.retain(|w| !worker_ids.contains(&w.worker_id));
        self.offdays.retain(|o| !worker_ids.contains(&o.worker_id));
        self.holiday_accounts.retain(|a| !worker_ids.contains(&a.worker_id));
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn position<T: Identified>(items: &[T], id: i64, what: &str) -> Result<usize, AppError> {
    items
        .iter()
        .position(|r| r.id() == id)
        .ok_or_else(|| not_found(what, id))
}

fn find<T: Identified + Clone>(items: &[T], id: i64, what: &str) -> Result<T, AppError> {
    let index = position(items, id, what)?;
    Ok(items[index].clone())
}

fn replace<T: Identified + Clone>(items: &mut [T], record: &T, what: &str) -> Result<(), AppError> {
    let index = position(items, record.id(), what)?;
    items[index] = record.clone();
    Ok(())
}

fn remove<T: Identified>(items: &mut Vec<T>, id: i64, what: &str) -> Result<T, AppError> {
    let index = position(items, id, what)?;
    Ok(items.remove(index))
}

fn ensure_unique(taken: bool, message: &str) -> Result<(), AppError> {
    if taken {
        Err(conflict(message))
    } else {
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Own firms
    // -------------------------------------------------------------------------

    async fn list_own_firms(&self) -> Result<Vec<OwnFirm>, AppError> {
        Ok(self.state.lock().await.own_firms.clone())
    }

    async fn get_own_firm(&self, id: i64) -> Result<OwnFirm, AppError> {
        find(&self.state.lock().await.own_firms, id, "Own firm")
    }

    async fn create_own_firm(&self, input: NewOwnFirm) -> Result<OwnFirm, AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state.own_firms.iter().any(|f| f.name == input.name),
            DUPLICATE_OWN_FIRM,
        )?;
        let firm = OwnFirm {
            id: state.next_id(),
            name: input.name,
            address: input.address,
            phone: input.phone,
            mail: input.mail,
            chairman: input.chairman,
            company_place: input.company_place,
            register_court: input.register_court,
            tax_nr: input.tax_nr,
            vat_id: input.vat_id,
            contact_name: input.contact_name,
            contact_phone: input.contact_phone,
            contact_fax: input.contact_fax,
            bank_name: input.bank_name,
            iban: input.iban,
            bic: input.bic,
            logo_path: None,
            created_utc: Utc::now(),
        };
        state.own_firms.push(firm.clone());
        Ok(firm)
    }

    async fn save_own_firm(&self, firm: &OwnFirm) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state
                .own_firms
                .iter()
                .any(|f| f.id != firm.id && f.name == firm.name),
            DUPLICATE_OWN_FIRM,
        )?;
        replace(&mut state.own_firms, firm, "Own firm")
    }

    async fn delete_own_firm(&self, id: i64) -> Result<(), AppError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        remove(&mut state.own_firms, id, "Own firm")?;

        let tour_ids: Vec<i64> = state
            .tours
            .iter()
            .filter(|t| t.own_firm_id == id)
            .map(|t| t.id)
            .collect();
        let card_ids: Vec<i64> = state
            .fuel_cards
            .iter()
            .filter(|c| c.own_firm_id == id)
            .map(|c| c.id)
            .collect();
        let note_ids: Vec<i64> = state
            .credit_notes
            .iter()
            .filter(|n| n.own_firm_id == id)
            .map(|n| n.id)
            .collect();
        let worker_ids: Vec<i64> = state
            .workers
            .iter()
            .filter(|w| w.own_firm_id == id)
            .map(|w| w.id)
            .collect();
        let contact_ids: Vec<i64> = state
            .contacts
            .iter()
            .filter(|c| c.own_firm_id == id)
            .map(|c| c.id)
            .collect();

        state.tour_days.retain(|d| !tour_ids.contains(&d.tour_id));
        state.handovers.retain(|h| !card_ids.contains(&h.fuel_card_id));
        state.payments.retain(|p| !note_ids.contains(&p.credit_note_id));
        state.forget_workers(&worker_ids);
        state.meetings.retain(|m| !contact_ids.contains(&m.contact_id));
        state.documents.retain(|d| d.own_firm_id != id);
        state.customers.retain(|r| r.own_firm_id != id);
        state.workers.retain(|r| r.own_firm_id != id);
        state.trucks.retain(|r| r.own_firm_id != id);
        state.tours.retain(|r| r.own_firm_id != id);
        state.fuel_cards.retain(|r| r.own_firm_id != id);
        state.contacts.retain(|r| r.own_firm_id != id);
        state.bills.retain(|r| r.own_firm_id != id);
        state.credit_notes.retain(|r| r.own_firm_id != id);
        for admin in state.admins.iter_mut() {
            admin.own_firm_ids.retain(|firm| *firm != id);
        }
        debug!(own_firm_id = id, "Own firm removed with its records");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Admins
    // -------------------------------------------------------------------------

    async fn count_admins(&self) -> Result<i64, AppError> {
        Ok(self.state.lock().await.admins.len() as i64)
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, AppError> {
        Ok(self.state.lock().await.admins.clone())
    }

    async fn get_admin(&self, id: i64) -> Result<Admin, AppError> {
        find(&self.state.lock().await.admins, id, "Admin")
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>, AppError> {
        let state = self.state.lock().await;
        Ok(state.admins.iter().find(|a| a.username == username).cloned())
    }

    async fn find_admin_by_token(&self, token: uuid::Uuid) -> Result<Option<Admin>, AppError> {
        let state = self.state.lock().await;
        Ok(state.admins.iter().find(|a| a.token == token).cloned())
    }

    async fn create_admin(&self, input: NewAdmin) -> Result<Admin, AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state.admins.iter().any(|a| a.username == input.username),
            DUPLICATE_USERNAME,
        )?;
        let admin = Admin {
            id: state.next_id(),
            username: input.username,
            name: input.name,
            password_hash: input.password_hash,
            token: input.token,
            is_superuser: input.is_superuser,
            own_firm_ids: input.own_firm_ids,
            created_utc: Utc::now(),
        };
        state.admins.push(admin.clone());
        Ok(admin)
    }

    async fn save_admin(&self, admin: &Admin) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state
                .admins
                .iter()
                .any(|a| a.id != admin.id && a.username == admin.username),
            DUPLICATE_USERNAME,
        )?;
        replace(&mut state.admins, admin, "Admin")
    }

    async fn delete_admin(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.admins, id, "Admin")?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    async fn list_customers(&self, own_firm_id: i64) -> Result<Vec<Customer>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .customers
            .iter()
            .filter(|c| c.own_firm_id == own_firm_id)
            .cloned()
            .collect())
    }

    async fn get_customer(&self, id: i64) -> Result<Customer, AppError> {
        find(&self.state.lock().await.customers, id, "Customer")
    }

    async fn find_customer_by_name(
        &self,
        own_firm_id: i64,
        name: &str,
    ) -> Result<Option<Customer>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .customers
            .iter()
            .find(|c| c.own_firm_id == own_firm_id && c.name == name)
            .cloned())
    }

    async fn create_customer(&self, input: NewCustomer) -> Result<Customer, AppError> {
        let mut state = self.state.lock().await;
        if !state.own_firms.iter().any(|f| f.id == input.own_firm_id) {
            return Err(not_found("Own firm", input.own_firm_id));
        }
        ensure_unique(
            state
                .customers
                .iter()
                .any(|c| c.own_firm_id == input.own_firm_id && c.name == input.name),
            DUPLICATE_CUSTOMER,
        )?;
        let customer = Customer {
            id: state.next_id(),
            own_firm_id: input.own_firm_id,
            name: input.name,
            vat_id: input.vat_id,
            address: input.address,
            created_utc: Utc::now(),
        };
        state.customers.push(customer.clone());
        Ok(customer)
    }

    async fn save_customer(&self, customer: &Customer) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state.customers.iter().any(|c| {
                c.id != customer.id
                    && c.own_firm_id == customer.own_firm_id
                    && c.name == customer.name
            }),
            DUPLICATE_CUSTOMER,
        )?;
        replace(&mut state.customers, customer, "Customer")
    }

    async fn delete_customer(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        position(&state.customers, id, "Customer")?;
        ensure_unique(
            state.bills.iter().any(|b| b.customer_id == id)
                || state.credit_notes.iter().any(|n| n.customer_id == id),
            CUSTOMER_IN_USE,
        )?;
        remove(&mut state.customers, id, "Customer")?;
        for tour in state.tours.iter_mut().filter(|t| t.customer_id == Some(id)) {
            tour.customer_id = None;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Workers
    // -------------------------------------------------------------------------

    async fn list_workers(&self, own_firm_id: i64) -> Result<Vec<Worker>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .workers
            .iter()
            .filter(|w| w.own_firm_id == own_firm_id)
            .map(|w| state.with_holidays(w))
            .collect())
    }

    async fn get_worker(&self, id: i64) -> Result<Worker, AppError> {
        let state = self.state.lock().await;
        let worker = find(&state.workers, id, "Worker")?;
        Ok(state.with_holidays(&worker))
    }

    async fn create_worker(&self, input: NewWorker) -> Result<Worker, AppError> {
        let mut state = self.state.lock().await;
        if !state.own_firms.iter().any(|f| f.id == input.own_firm_id) {
            return Err(not_found("Own firm", input.own_firm_id));
        }
        ensure_unique(
            state.workers.iter().any(|w| w.worker_nr == input.worker_nr),
            DUPLICATE_WORKER_NR,
        )?;
        let worker = Worker {
            id: state.next_id(),
            own_firm_id: input.own_firm_id,
            worker_nr: input.worker_nr,
            name: input.name,
            is_driver: is_driver_position(&input.position),
            position: input.position,
            salary: input.salary,
            daily_expense: input.daily_expense,
            holidays: input.holidays,
            remaining_holidays: None,
            start_date: input.start_date,
            quit_date: input.quit_date,
            note: input.note,
            created_utc: Utc::now(),
        };
        state.workers.push(worker.clone());
        Ok(worker)
    }

    async fn save_worker(&self, worker: &Worker) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state
                .workers
                .iter()
                .any(|w| w.id != worker.id && w.worker_nr == worker.worker_nr),
            DUPLICATE_WORKER_NR,
        )?;
        replace(&mut state.workers, worker, "Worker")
    }

    async fn delete_worker(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.workers, id, "Worker")?;
        for tour in state.tours.iter_mut().filter(|t| t.driver_id == Some(id)) {
            tour.driver_id = None;
        }
        for card in state.fuel_cards.iter_mut().filter(|c| c.holder_id == Some(id)) {
            card.holder_id = None;
        }
        state.handovers.retain(|h| h.worker_id != id);
        state.forget_workers(&[id]);
        Ok(())
    }

    async fn set_remaining_holidays(
        &self,
        worker_id: i64,
        year: i32,
        remaining: Option<i32>,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        position(&state.workers, worker_id, "Worker")?;
        let existing = state
            .holiday_accounts
            .iter()
            .position(|a| a.worker_id == worker_id && a.year == year);
        match (existing, remaining) {
            (Some(index), Some(days)) => state.holiday_accounts[index].remaining_days = days,
            (None, Some(days)) => state.holiday_accounts.push(HolidayAccount {
                worker_id,
                year,
                used_days: 0,
                remaining_days: days,
            }),
            (Some(index), None) => {
                state.holiday_accounts.remove(index);
            }
            (None, None) => {}
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Trucks
    // -------------------------------------------------------------------------

    async fn list_trucks(&self, own_firm_id: i64) -> Result<Vec<Truck>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .trucks
            .iter()
            .filter(|t| t.own_firm_id == own_firm_id)
            .cloned()
            .collect())
    }

    async fn get_truck(&self, id: i64) -> Result<Truck, AppError> {
        find(&self.state.lock().await.trucks, id, "Truck")
    }

    async fn create_truck(&self, input: NewTruck) -> Result<Truck, AppError> {
        let mut state = self.state.lock().await;
        if !state.own_firms.iter().any(|f| f.id == input.own_firm_id) {
            return Err(not_found("Own firm", input.own_firm_id));
        }
        ensure_unique(
            state.trucks.iter().any(|t| t.plate == input.plate),
            DUPLICATE_PLATE,
        )?;
        let truck = Truck {
            id: state.next_id(),
            own_firm_id: input.own_firm_id,
            plate: input.plate,
            manufacturer: input.manufacturer,
            model: input.model,
            price: None,
            payment_method: None,
            paid_day: None,
            is_paid: false,
            installment_months: None,
            monthly_installment: None,
            installment_start: None,
            installment_end: None,
            created_utc: Utc::now(),
        };
        state.trucks.push(truck.clone());
        Ok(truck)
    }

    async fn save_truck(&self, truck: &Truck) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state
                .trucks
                .iter()
                .any(|t| t.id != truck.id && t.plate == truck.plate),
            DUPLICATE_PLATE,
        )?;
        replace(&mut state.trucks, truck, "Truck")
    }

    async fn delete_truck(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.trucks, id, "Truck")?;
        for tour in state.tours.iter_mut().filter(|t| t.truck_id == Some(id)) {
            tour.truck_id = None;
        }
        for day in state.tour_days.iter_mut().filter(|d| d.truck_id == Some(id)) {
            day.truck_id = None;
        }
        state
            .documents
            .retain(|d| !(d.owner == DocumentOwner::Truck && d.owner_id == id));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tours
    // -------------------------------------------------------------------------

    async fn list_tours(&self, own_firm_id: i64) -> Result<Vec<Tour>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .tours
            .iter()
            .filter(|t| t.own_firm_id == own_firm_id)
            .cloned()
            .collect())
    }

    async fn get_tour(&self, id: i64) -> Result<Tour, AppError> {
        find(&self.state.lock().await.tours, id, "Tour")
    }

    async fn create_tour(&self, input: NewTour) -> Result<Tour, AppError> {
        let mut state = self.state.lock().await;
        if !state.own_firms.iter().any(|f| f.id == input.own_firm_id) {
            return Err(not_found("Own firm", input.own_firm_id));
        }
        ensure_unique(
            state.tours.iter().any(|t| t.roller_nr == input.roller_nr),
            DUPLICATE_ROLLER_NR,
        )?;
        let tour = Tour {
            id: state.next_id(),
            own_firm_id: input.own_firm_id,
            roller_nr: input.roller_nr,
            customer_id: input.customer_id,
            notes: input.notes,
            truck_id: input.truck_id,
            driver_id: input.driver_id,
            created_utc: Utc::now(),
        };
        state.tours.push(tour.clone());
        Ok(tour)
    }

    async fn save_tour(&self, tour: &Tour) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state
                .tours
                .iter()
                .any(|t| t.id != tour.id && t.roller_nr == tour.roller_nr),
            DUPLICATE_ROLLER_NR,
        )?;
        replace(&mut state.tours, tour, "Tour")
    }

    async fn delete_tour(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.tours, id, "Tour")?;
        state.tour_days.retain(|d| d.tour_id != id);
        Ok(())
    }

    async fn list_tour_days(&self, tour_id: i64) -> Result<Vec<TourDay>, AppError> {
        let state = self.state.lock().await;
        let mut days: Vec<TourDay> = state
            .tour_days
            .iter()
            .filter(|d| d.tour_id == tour_id)
            .cloned()
            .collect();
        days.sort_by_key(|d| d.date);
        Ok(days)
    }

    async fn put_tour_days(
        &self,
        tour_id: i64,
        dates: &[NaiveDate],
        template: &NewTourDays,
    ) -> Result<Vec<TourDay>, AppError> {
        let mut state = self.state.lock().await;
        position(&state.tours, tour_id, "Tour")?;

        let mut scheduled = Vec::with_capacity(dates.len());
        for date in dates {
            let existing = state
                .tour_days
                .iter()
                .position(|d| d.tour_id == tour_id && d.date == *date);
            let day = match existing {
                Some(index) => {
                    let day = &mut state.tour_days[index];
                    day.status = template.status.clone();
                    day.note = template.note.clone();
                    day.truck_id = template.truck_id;
                    day.driver_ids = template.driver_ids.clone();
                    day.clone()
                }
                None => {
                    let day = TourDay {
                        id: state.next_id(),
                        tour_id,
                        date: *date,
                        status: template.status.clone(),
                        driver_ids: template.driver_ids.clone(),
                        truck_id: template.truck_id,
                        note: template.note.clone(),
                    };
                    state.tour_days.push(day.clone());
                    day
                }
            };
            scheduled.push(day);
        }
        Ok(scheduled)
    }

    async fn delete_tour_days(&self, tour_id: i64, day_ids: &[i64]) -> Result<Vec<TourDay>, AppError> {
        let mut state = self.state.lock().await;
        let (removed, kept): (Vec<TourDay>, Vec<TourDay>) = std::mem::take(&mut state.tour_days)
            .into_iter()
            .partition(|d| d.tour_id == tour_id && day_ids.contains(&d.id));
        state.tour_days = kept;
        Ok(removed)
    }

    async fn list_firm_tour_days(
        &self,
        own_firm_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TourDay>, AppError> {
        let state = self.state.lock().await;
        let tour_ids: Vec<i64> = state
            .tours
            .iter()
            .filter(|t| t.own_firm_id == own_firm_id)
            .map(|t| t.id)
            .collect();
        Ok(state
            .tour_days
            .iter()
            .filter(|d| d.date == date && tour_ids.contains(&d.tour_id))
            .cloned()
            .collect())
    }

    // -------------------------------------------------------------------------
    // Fuel cards
    // -------------------------------------------------------------------------

    async fn list_fuel_cards(&self, own_firm_id: i64) -> Result<Vec<FuelCard>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .fuel_cards
            .iter()
            .filter(|c| c.own_firm_id == own_firm_id)
            .cloned()
            .collect())
    }

    async fn get_fuel_card(&self, id: i64) -> Result<FuelCard, AppError> {
        find(&self.state.lock().await.fuel_cards, id, "Fuel card")
    }

    async fn create_fuel_card(&self, input: NewFuelCard) -> Result<FuelCard, AppError> {
        let mut state = self.state.lock().await;
        if !state.own_firms.iter().any(|f| f.id == input.own_firm_id) {
            return Err(not_found("Own firm", input.own_firm_id));
        }
        ensure_unique(
            state.fuel_cards.iter().any(|c| c.card_nr == input.card_nr),
            DUPLICATE_CARD_NR,
        )?;
        let card = FuelCard {
            id: state.next_id(),
            own_firm_id: input.own_firm_id,
            provider: input.provider,
            card_nr: input.card_nr,
            holder_id: None,
            is_active: input.is_active,
            notes: input.notes,
            created_utc: Utc::now(),
        };
        state.fuel_cards.push(card.clone());
        Ok(card)
    }

    async fn save_fuel_card(&self, card: &FuelCard) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state
                .fuel_cards
                .iter()
                .any(|c| c.id != card.id && c.card_nr == card.card_nr),
            DUPLICATE_CARD_NR,
        )?;
        replace(&mut state.fuel_cards, card, "Fuel card")
    }

    async fn delete_fuel_card(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.fuel_cards, id, "Fuel card")?;
        state.handovers.retain(|h| h.fuel_card_id != id);
        Ok(())
    }

    async fn list_handovers(&self, fuel_card_id: i64) -> Result<Vec<FuelCardHandover>, AppError> {
        let state = self.state.lock().await;
        let mut handovers: Vec<FuelCardHandover> = state
            .handovers
            .iter()
            .filter(|h| h.fuel_card_id == fuel_card_id)
            .cloned()
            .collect();
        handovers.sort_by_key(|h| (h.received_date, h.id));
        Ok(handovers)
    }

    async fn hand_over_fuel_card(
        &self,
        fuel_card_id: i64,
        input: &NewHandover,
    ) -> Result<(FuelCard, FuelCardHandover), AppError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let card_index = position(&state.fuel_cards, fuel_card_id, "Fuel card")?;

        let previous: Vec<FuelCardHandover> = state
            .handovers
            .iter()
            .filter(|h| h.fuel_card_id == fuel_card_id)
            .cloned()
            .collect();
        if let Some(latest) = latest_handover(&previous).map(|index| previous[index].id) {
            if let Some(open) = state
                .handovers
                .iter_mut()
                .find(|h| h.id == latest && h.returned_date.is_none())
            {
                open.returned_date = Some(input.received_date);
            }
        }

        let handover = FuelCardHandover {
            id: state.next_id(),
            fuel_card_id,
            worker_id: input.worker_id,
            received_date: input.received_date,
            returned_date: input.returned_date,
        };
        state.handovers.push(handover.clone());

        let card = &mut state.fuel_cards[card_index];
        card.holder_id = Some(input.worker_id);
        Ok((card.clone(), handover))
    }

    // -------------------------------------------------------------------------
    // Contacts
    // -------------------------------------------------------------------------

    async fn list_contacts(&self, own_firm_id: i64) -> Result<Vec<Contact>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .contacts
            .iter()
            .filter(|c| c.own_firm_id == own_firm_id)
            .cloned()
            .collect())
    }

    async fn get_contact(&self, id: i64) -> Result<Contact, AppError> {
        find(&self.state.lock().await.contacts, id, "Contact")
    }

    async fn create_contact(&self, input: NewContact) -> Result<Contact, AppError> {
        let mut state = self.state.lock().await;
        if !state.own_firms.iter().any(|f| f.id == input.own_firm_id) {
            return Err(not_found("Own firm", input.own_firm_id));
        }
        let contact = Contact {
            id: state.next_id(),
            own_firm_id: input.own_firm_id,
            name: input.name,
            company: input.company,
            label: input.label,
            phone: input.phone,
            fax: input.fax,
            mail: input.mail,
            address: input.address,
            note: input.note,
            created_utc: Utc::now(),
        };
        state.contacts.push(contact.clone());
        Ok(contact)
    }

    async fn save_contact(&self, contact: &Contact) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        replace(&mut state.contacts, contact, "Contact")
    }

    async fn delete_contact(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.contacts, id, "Contact")?;
        state.meetings.retain(|m| m.contact_id != id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Meetings
    // -------------------------------------------------------------------------

    async fn list_meetings(&self, contact_id: i64) -> Result<Vec<Meeting>, AppError> {
        let state = self.state.lock().await;
        let mut meetings: Vec<Meeting> = state
            .meetings
            .iter()
            .filter(|m| m.contact_id == contact_id)
            .cloned()
            .collect();
        meetings.sort_by_key(|m| (m.date, m.id));
        Ok(meetings)
    }

    async fn get_meeting(&self, id: i64) -> Result<Meeting, AppError> {
        find(&self.state.lock().await.meetings, id, "Meeting")
    }

    async fn create_meeting(&self, contact_id: i64, input: NewMeeting) -> Result<Meeting, AppError> {
        let mut state = self.state.lock().await;
        position(&state.contacts, contact_id, "Contact")?;
        let meeting = Meeting {
            id: state.next_id(),
            contact_id,
            date: input.date,
            notes: input.notes,
            created_utc: Utc::now(),
        };
        state.meetings.push(meeting.clone());
        Ok(meeting)
    }

    async fn save_meeting(&self, meeting: &Meeting) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        replace(&mut state.meetings, meeting, "Meeting")
    }

    async fn delete_meeting(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.meetings, id, "Meeting")?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Worker and truck documents
    // -------------------------------------------------------------------------

    async fn list_documents(
        &self,
        owner: DocumentOwner,
        owner_id: i64,
    ) -> Result<Vec<Document>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .documents
            .iter()
            .filter(|d| d.owner == owner && d.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_firm_documents(&self, own_firm_id: i64) -> Result<Vec<Document>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .documents
            .iter()
            .filter(|d| d.own_firm_id == own_firm_id)
            .cloned()
            .collect())
    }

    async fn get_document(&self, id: i64) -> Result<Document, AppError> {
        find(&self.state.lock().await.documents, id, "Document")
    }

    async fn create_document(
        &self,
        own_firm_id: i64,
        owner: DocumentOwner,
        owner_id: i64,
        input: NewDocument,
    ) -> Result<Document, AppError> {
        let mut state = self.state.lock().await;
        match owner {
            DocumentOwner::Worker => position(&state.workers, owner_id, "Worker")?,
            DocumentOwner::Truck => position(&state.trucks, owner_id, "Truck")?,
        };
        let document = Document {
            id: state.next_id(),
            own_firm_id,
            owner,
            owner_id,
            name: input.name,
            expiry_date: input.expiry_date,
            done: input.done,
            file_path: None,
            upload_date: None,
            created_utc: Utc::now(),
        };
        state.documents.push(document.clone());
        Ok(document)
    }

    async fn save_document(&self, document: &Document) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        replace(&mut state.documents, document, "Document")
    }

    async fn delete_document(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.documents, id, "Document")?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Worker debts
    // -------------------------------------------------------------------------

    async fn list_debts(&self, worker_id: i64) -> Result<Vec<Debt>, AppError> {
        let state = self.state.lock().await;
        let mut debts: Vec<Debt> = state
            .debts
            .iter()
            .filter(|d| d.worker_id == worker_id)
            .cloned()
            .collect();
        debts.sort_by_key(|d| (d.date, d.id));
        Ok(debts)
    }

    async fn get_debt(&self, id: i64) -> Result<Debt, AppError> {
        find(&self.state.lock().await.debts, id, "Debt")
    }

    async fn create_debt(&self, worker_id: i64, input: NewDebt) -> Result<Debt, AppError> {
        let mut state = self.state.lock().await;
        position(&state.workers, worker_id, "Worker")?;
        let debt = Debt {
            id: state.next_id(),
            worker_id,
            amount: input.amount,
            date: input.date,
            notes: input.notes,
            created_utc: Utc::now(),
        };
        state.debts.push(debt.clone());
        Ok(debt)
    }

    async fn save_debt(&self, debt: &Debt) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        replace(&mut state.debts, debt, "Debt")
    }

    async fn delete_debt(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.debts, id, "Debt")?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Working times
    // -------------------------------------------------------------------------

    async fn list_worktimes(&self, worker_id: i64) -> Result<Vec<WorkTime>, AppError> {
        let state = self.state.lock().await;
        let mut worktimes: Vec<WorkTime> = state
            .worktimes
            .iter()
            .filter(|w| w.worker_id == worker_id)
            .cloned()
            .collect();
        worktimes.sort_by_key(|w| w.date);
        Ok(worktimes)
    }

    async fn get_worktime(&self, id: i64) -> Result<WorkTime, AppError> {
        find(&self.state.lock().await.worktimes, id, "Working time")
    }

    async fn put_worktime(&self, entry: WorkTimeEntry) -> Result<WorkTime, AppError> {
        let mut state = self.state.lock().await;
        position(&state.workers, entry.worker_id, "Worker")?;
        let existing = state
            .worktimes
            .iter()
            .position(|w| w.worker_id == entry.worker_id && w.date == entry.date);
        let id = match existing {
            Some(index) => state.worktimes.remove(index).id,
            None => state.next_id(),
        };
        let worktime = WorkTime {
            id,
            worker_id: entry.worker_id,
            date: entry.date,
            start: entry.start,
            end: entry.end,
            pause_minutes: entry.pause_minutes,
            duration_minutes: entry.duration_minutes,
            cost: entry.cost,
            created_utc: Utc::now(),
        };
        state.worktimes.push(worktime.clone());
        Ok(worktime)
    }

    async fn delete_worktime(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.worktimes, id, "Working time")?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tags
    // -------------------------------------------------------------------------

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        Ok(self.state.lock().await.tags.clone())
    }

    async fn get_tag(&self, id: i64) -> Result<Tag, AppError> {
        find(&self.state.lock().await.tags, id, "Tag")
    }

    async fn create_tag(&self, input: NewTag) -> Result<Tag, AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state
                .tags
                .iter()
                .any(|t| t.section == input.section && t.name == input.name),
            DUPLICATE_TAG,
        )?;
        let tag = Tag {
            id: state.next_id(),
            section: input.section,
            name: input.name,
            colour: input.colour,
            created_utc: Utc::now(),
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn save_tag(&self, tag: &Tag) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        ensure_unique(
            state
                .tags
                .iter()
                .any(|t| t.id != tag.id && t.section == tag.section && t.name == tag.name),
            DUPLICATE_TAG,
        )?;
        replace(&mut state.tags, tag, "Tag")
    }

    async fn delete_tag(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        position(&state.tags, id, "Tag")?;
        ensure_unique(state.offdays.iter().any(|o| o.tag_id == id), TAG_IN_USE)?;
        remove(&mut state.tags, id, "Tag")?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Offdays and holiday accounts
    // -------------------------------------------------------------------------

    async fn list_offdays(
        &self,
        own_firm_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Offday>, AppError> {
        let state = self.state.lock().await;
        let mut offdays: Vec<Offday> = state
            .offdays
            .iter()
            .filter(|o| o.own_firm_id == own_firm_id && o.date >= from && o.date <= to)
            .cloned()
            .collect();
        offdays.sort_by_key(|o| (o.date, o.id));
        Ok(offdays)
    }

    async fn plan_offdays(&self, worker: &Worker, plan: &OffdayPlan) -> Result<Vec<Offday>, AppError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        position(&state.workers, worker.id, "Worker")?;
        position(&state.tags, plan.tag_id, "Tag")?;

        let (replaced, kept): (Vec<Offday>, Vec<Offday>) = std::mem::take(&mut state.offdays)
            .into_iter()
            .partition(|o| o.worker_id == worker.id && plan.dates.contains(&o.date));
        state.offdays = kept;

        let booked: &[NaiveDate] = if plan.is_holiday { &plan.dates } else { &[] };
        for (year, days) in holiday_deltas(booked, &replaced) {
            state.book_holidays(worker.id, worker.holidays, year, days);
        }

        let mut planned = Vec::with_capacity(plan.dates.len());
        for date in &plan.dates {
            let offday = Offday {
                id: state.next_id(),
                own_firm_id: worker.own_firm_id,
                worker_id: worker.id,
                date: *date,
                tag_id: plan.tag_id,
                is_holiday: plan.is_holiday,
                notes: plan.notes.clone(),
                created_utc: Utc::now(),
            };
            state.offdays.push(offday.clone());
            planned.push(offday);
        }
        debug!(worker_id = worker.id, days = planned.len(), "Offdays planned");
        Ok(planned)
    }

    async fn delete_offdays(&self, worker: &Worker, ids: &[i64]) -> Result<Vec<Offday>, AppError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let (removed, kept): (Vec<Offday>, Vec<Offday>) = std::mem::take(&mut state.offdays)
            .into_iter()
            .partition(|o| o.worker_id == worker.id && ids.contains(&o.id));
        state.offdays = kept;

        for (year, days) in holiday_deltas(&[], &removed) {
            state.book_holidays(worker.id, worker.holidays, year, days);
        }
        Ok(removed)
    }

    async fn list_holiday_accounts(&self, own_firm_id: i64) -> Result<Vec<HolidayAccount>, AppError> {
        let state = self.state.lock().await;
        let worker_ids: Vec<i64> = state
            .workers
            .iter()
            .filter(|w| w.own_firm_id == own_firm_id)
            .map(|w| w.id)
            .collect();
        Ok(state
            .holiday_accounts
            .iter()
            .filter(|a| worker_ids.contains(&a.worker_id))
            .cloned()
            .collect())
    }

    // -------------------------------------------------------------------------
    // Bills
    // -------------------------------------------------------------------------

    async fn list_bills(&self, own_firm_id: i64) -> Result<Vec<Bill>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .bills
            .iter()
            .filter(|b| b.own_firm_id == own_firm_id)
            .map(|b| Bill {
                items: Vec::new(),
                ..b.clone()
            })
            .collect())
    }

    async fn get_bill(&self, id: i64) -> Result<Bill, AppError> {
        find(&self.state.lock().await.bills, id, "Bill")
    }

    async fn create_bill(&self, draft: BillDraft) -> Result<Bill, AppError> {
        let mut state = self.state.lock().await;
        if !state.own_firms.iter().any(|f| f.id == draft.own_firm_id) {
            return Err(not_found("Own firm", draft.own_firm_id));
        }
        let year = draft.year();
        let number = DocumentNumber::next_in_scope(
            state
                .bills
                .iter()
                .filter(|b| b.own_firm_id == draft.own_firm_id && b.number_year == year)
                .map(|b| b.number_seq),
            year,
        );

        let bill_id = state.next_id();
        let mut items = Vec::with_capacity(draft.items.len());
        for item in draft.items {
            items.push(LineItem {
                id: state.next_id(),
                bill_id,
                position: item.position,
                description: item.description,
                quantity: item.quantity,
                unit: item.unit,
                unit_price: item.unit_price,
                line_sum: item.line_sum,
            });
        }

        let bill = Bill {
            id: bill_id,
            own_firm_id: draft.own_firm_id,
            customer_id: draft.customer_id,
            customer_name: draft.customer_name,
            vat_id: draft.vat_id,
            address: draft.address,
            number_seq: number.sequence,
            number_year: number.year,
            number: number.to_string(),
            creation_date: draft.creation_date,
            pay_start: draft.pay_start,
            pay_end: draft.pay_end,
            sum: draft.sum,
            tax_rate: draft.tax_rate,
            total: draft.total,
            document_path: None,
            created_utc: Utc::now(),
            items,
        };
        state.bills.push(bill.clone());
        debug!(bill_id = bill.id, number = %bill.number, "Bill numbered");
        Ok(bill)
    }

    async fn set_bill_document(&self, id: i64, path: Option<String>) -> Result<Bill, AppError> {
        let mut state = self.state.lock().await;
        let index = position(&state.bills, id, "Bill")?;
        state.bills[index].document_path = path;
        Ok(state.bills[index].clone())
    }

    async fn delete_bill(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.bills, id, "Bill")?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Credit notes
    // -------------------------------------------------------------------------

    async fn list_credit_notes(&self, own_firm_id: i64) -> Result<Vec<CreditNote>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .credit_notes
            .iter()
            .filter(|n| n.own_firm_id == own_firm_id)
            .cloned()
            .collect())
    }

    async fn get_credit_note(&self, id: i64) -> Result<CreditNote, AppError> {
        find(&self.state.lock().await.credit_notes, id, "Credit note")
    }

    async fn create_credit_note(&self, draft: CreditNoteDraft) -> Result<CreditNote, AppError> {
        let mut state = self.state.lock().await;
        position(&state.customers, draft.customer_id, "Customer")?;
        ensure_unique(
            state
                .credit_notes
                .iter()
                .any(|n| n.document_nr == draft.document_nr),
            DUPLICATE_DOCUMENT_NR,
        )?;
        let note = CreditNote {
            id: state.next_id(),
            own_firm_id: draft.own_firm_id,
            customer_id: draft.customer_id,
            customer_name: draft.customer_name,
            document_nr: draft.document_nr,
            advice_nr: draft.advice_nr,
            balance: draft.balance,
            creation_date: draft.creation_date,
            period_start: draft.period_start,
            period_end: draft.period_end,
            document_path: None,
            created_utc: Utc::now(),
        };
        state.credit_notes.push(note.clone());
        Ok(note)
    }

    async fn update_credit_note(
        &self,
        id: i64,
        patch: CreditNotePatch,
        customer_name: Option<String>,
        today: NaiveDate,
    ) -> Result<(CreditNote, ChangeSet), AppError> {
        let mut state = self.state.lock().await;
        let index = position(&state.credit_notes, id, "Credit note")?;
        let mut note = state.credit_notes[index].clone();
        let changes = note.apply_update(patch, customer_name, today)?;
        ensure_unique(
            state
                .credit_notes
                .iter()
                .any(|n| n.id != id && n.document_nr == note.document_nr),
            DUPLICATE_DOCUMENT_NR,
        )?;
        state.credit_notes[index] = note.clone();
        Ok((note, changes))
    }

    async fn set_credit_note_document(
        &self,
        id: i64,
        path: Option<String>,
    ) -> Result<CreditNote, AppError> {
        let mut state = self.state.lock().await;
        let index = position(&state.credit_notes, id, "Credit note")?;
        state.credit_notes[index].document_path = path;
        Ok(state.credit_notes[index].clone())
    }

    async fn delete_credit_note(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        remove(&mut state.credit_notes, id, "Credit note")?;
        state.payments.retain(|p| p.credit_note_id != id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Credit-note payments
    // -------------------------------------------------------------------------

    async fn list_payments(&self, credit_note_id: i64) -> Result<Vec<CreditNotePayment>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .iter()
            .filter(|p| p.credit_note_id == credit_note_id)
            .cloned()
            .collect())
    }

    async fn list_firm_payments(&self, own_firm_id: i64) -> Result<Vec<CreditNotePayment>, AppError> {
        let state = self.state.lock().await;
        let note_ids: Vec<i64> = state
            .credit_notes
            .iter()
            .filter(|n| n.own_firm_id == own_firm_id)
            .map(|n| n.id)
            .collect();
        Ok(state
            .payments
            .iter()
            .filter(|p| note_ids.contains(&p.credit_note_id))
            .cloned()
            .collect())
    }

    async fn get_payment(&self, id: i64) -> Result<CreditNotePayment, AppError> {
        find(&self.state.lock().await.payments, id, "Payment")
    }

    async fn post_payment(
        &self,
        credit_note_id: i64,
        input: &NewPayment,
        today: NaiveDate,
    ) -> Result<(CreditNote, CreditNotePayment), AppError> {
        let mut state = self.state.lock().await;
        let index = position(&state.credit_notes, credit_note_id, "Credit note")?;
        let mut note = state.credit_notes[index].clone();
        note.balance.post_payment(input.amount, today)?;
        let payment = CreditNotePayment {
            id: state.next_id(),
            credit_note_id,
            amount: input.amount,
            date: input.date,
            created_utc: Utc::now(),
        };
        state.payments.push(payment.clone());
        state.credit_notes[index] = note.clone();
        Ok((note, payment))
    }

    async fn delete_payment(
        &self,
        id: i64,
        today: NaiveDate,
    ) -> Result<(CreditNote, CreditNotePayment), AppError> {
        let mut state = self.state.lock().await;
        let payment_index = position(&state.payments, id, "Payment")?;
        let note_id = state.payments[payment_index].credit_note_id;
        let note_index = position(&state.credit_notes, note_id, "Credit note")?;
        let mut note = state.credit_notes[note_index].clone();
        note.balance.reverse_payment(state.payments[payment_index].amount, today)?;
        let payment = state.payments.remove(payment_index);
        state.credit_notes[note_index] = note.clone();
        Ok((note, payment))
    }

    // -------------------------------------------------------------------------
    // Audit log
    // -------------------------------------------------------------------------

    async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, AppError> {
        let mut state = self.state.lock().await;
        let entry = AuditEntry {
            id: state.next_id(),
            admin_id: entry.admin_id,
            admin_name: entry.admin_name,
            own_firm_id: entry.own_firm_id,
            summary: entry.summary,
            changes: entry.changes.map(Json),
            recorded_utc: Utc::now(),
        };
        state.audit.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit(&self, own_firm_id: Option<i64>) -> Result<Vec<AuditEntry>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .audit
            .iter()
            .filter(|e| own_firm_id.map_or(true, |id| e.own_firm_id == Some(id)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateBillRequest, LineItemInput, NewCreditNote};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn firm(store: &MemoryStore, name: &str) -> OwnFirm {
        store
            .create_own_firm(NewOwnFirm {
                name: name.into(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    async fn customer(store: &MemoryStore, own_firm_id: i64) -> Customer {
        store
            .create_customer(NewCustomer {
                own_firm_id,
                name: "Paketdienst Süd".into(),
                vat_id: String::new(),
                address: String::new(),
            })
            .await
            .unwrap()
    }

    fn draft(own_firm_id: i64, customer_id: i64, creation_date: NaiveDate) -> BillDraft {
        BillDraft::new(
            CreateBillRequest {
                own_firm_id,
                customer_name: "Paketdienst Süd".into(),
                vat_id: String::new(),
                address: String::new(),
                creation_date,
                pay_start: None,
                pay_end: None,
                tax_rate: d("19"),
                items: vec![LineItemInput {
                    position: None,
                    description: "Tour 12".into(),
                    quantity: d("1"),
                    unit: "Tag".into(),
                    unit_price: d("100.00"),
                }],
            },
            customer_id,
        )
        .unwrap()
    }

    async fn credit_note(store: &MemoryStore, customer: &Customer) -> CreditNote {
        let draft = CreditNoteDraft::new(
            NewCreditNote {
                own_firm_id: customer.own_firm_id,
                customer_id: customer.id,
                document_nr: "GS-1".into(),
                advice_nr: None,
                gross_amount: d("1000.00"),
                tax_rate: d("19"),
                creation_date: date(2024, 4, 1),
                period_start: None,
                period_end: None,
            },
            customer.name.clone(),
        )
        .unwrap();
        store.create_credit_note(draft).await.unwrap()
    }

    #[tokio::test]
    async fn numbering_restarts_per_firm_and_year() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let b = firm(&store, "Spedition B").await;
        let ca = customer(&store, a.id).await;
        let cb = customer(&store, b.id).await;

        let first = store.create_bill(draft(a.id, ca.id, date(2024, 3, 1))).await.unwrap();
        let second = store.create_bill(draft(a.id, ca.id, date(2024, 5, 1))).await.unwrap();
        let other_firm = store.create_bill(draft(b.id, cb.id, date(2024, 5, 1))).await.unwrap();
        let next_year = store.create_bill(draft(a.id, ca.id, date(2025, 1, 2))).await.unwrap();

        assert_eq!(first.number, "001/2024");
        assert_eq!(second.number, "002/2024");
        assert_eq!(other_firm.number, "001/2024");
        assert_eq!(next_year.number, "001/2025");
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].bill_id, first.id);
    }

    #[tokio::test]
    async fn customer_with_bills_cannot_be_deleted() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let c = customer(&store, a.id).await;
        store.create_bill(draft(a.id, c.id, date(2024, 3, 1))).await.unwrap();

        let result = store.delete_customer(c.id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn deleting_a_payment_reverses_it() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let c = customer(&store, a.id).await;
        let note = credit_note(&store, &c).await;

        let payment = NewPayment {
            amount: d("1190.00"),
            date: date(2024, 4, 2),
        };
        let (paid, posted) = store.post_payment(note.id, &payment, date(2024, 4, 2)).await.unwrap();
        assert!(paid.balance.completed);
        assert_eq!(paid.balance.open_amount, d("0.00"));

        let (reopened, _) = store.delete_payment(posted.id, date(2024, 4, 3)).await.unwrap();
        assert!(!reopened.balance.completed);
        assert_eq!(reopened.balance.completed_date, None);
        assert_eq!(reopened.balance.open_amount, d("1190.00"));
        assert_eq!(reopened.balance.paid_amount, d("0.00"));
        assert!(store.list_payments(note.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overflowing_payment_is_rejected_without_a_trace() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let c = customer(&store, a.id).await;
        let note = credit_note(&store, &c).await;

        let payment = NewPayment {
            amount: -Decimal::MAX,
            date: date(2024, 4, 2),
        };
        for _ in 0..2 {
            let result = store.post_payment(note.id, &payment, date(2024, 4, 2)).await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }

        assert!(store.list_payments(note.id).await.unwrap().is_empty());
        let stored = store.get_credit_note(note.id).await.unwrap();
        assert_eq!(stored.balance, note.balance);
        assert_eq!(stored.balance.open_amount, d("1190.00"));
    }

    #[tokio::test]
    async fn handover_closes_previous_holder() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let card = store
            .create_fuel_card(NewFuelCard {
                own_firm_id: a.id,
                card_nr: "7001".into(),
                provider: "DKV".into(),
                is_active: true,
                notes: String::new(),
            })
            .await
            .unwrap();

        let first = NewHandover {
            worker_id: 10,
            received_date: date(2024, 1, 1),
            returned_date: None,
        };
        let second = NewHandover {
            worker_id: 11,
            received_date: date(2024, 2, 1),
            returned_date: None,
        };
        store.hand_over_fuel_card(card.id, &first).await.unwrap();
        let (card, _) = store.hand_over_fuel_card(card.id, &second).await.unwrap();

        assert_eq!(card.holder_id, Some(11));
        let history = store.list_handovers(card.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].returned_date, Some(date(2024, 2, 1)));
        assert_eq!(history[1].returned_date, None);
    }

    async fn worker(store: &MemoryStore, own_firm_id: i64) -> Worker {
        store
            .create_worker(NewWorker {
                own_firm_id,
                worker_nr: "P-7".into(),
                name: "Jan Kowalski".into(),
                position: "Fahrer".into(),
                salary: d("2500.00"),
                daily_expense: d("28.00"),
                holidays: 25,
                remaining_holidays: None,
                start_date: None,
                quit_date: None,
                note: String::new(),
            })
            .await
            .unwrap()
    }

    async fn offday_tag(store: &MemoryStore, name: &str) -> Tag {
        store
            .create_tag(NewTag {
                section: crate::models::TagSection::Offday,
                name: name.into(),
                colour: "#ff8800".into(),
            })
            .await
            .unwrap()
    }

    fn plan(tag: &Tag, dates: Vec<NaiveDate>) -> OffdayPlan {
        OffdayPlan {
            dates,
            tag_id: tag.id,
            is_holiday: tag.is_holiday(),
            notes: String::new(),
        }
    }

    async fn account(store: &MemoryStore, own_firm_id: i64, year: i32) -> Option<HolidayAccount> {
        store
            .list_holiday_accounts(own_firm_id)
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.year == year)
    }

    #[tokio::test]
    async fn holidays_are_booked_and_refunded() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let w = worker(&store, a.id).await;
        let holiday = offday_tag(&store, "Urlaub").await;
        let sick = offday_tag(&store, "Krank").await;

        let days = vec![date(2024, 7, 1), date(2024, 7, 2), date(2024, 7, 3)];
        let planned = store.plan_offdays(&w, &plan(&holiday, days)).await.unwrap();
        assert_eq!(planned.len(), 3);
        let booked = account(&store, a.id, 2024).await.unwrap();
        assert_eq!((booked.used_days, booked.remaining_days), (3, 22));

        // Sick on a planned holiday gives the day back.
        store
            .plan_offdays(&w, &plan(&sick, vec![date(2024, 7, 2)]))
            .await
            .unwrap();
        let after_sick = account(&store, a.id, 2024).await.unwrap();
        assert_eq!((after_sick.used_days, after_sick.remaining_days), (2, 23));

        let removed = store.delete_offdays(&w, &[planned[0].id]).await.unwrap();
        assert_eq!(removed.len(), 1);
        let after_delete = account(&store, a.id, 2024).await.unwrap();
        assert_eq!((after_delete.used_days, after_delete.remaining_days), (1, 24));

        let listed = store
            .list_offdays(a.id, date(2024, 7, 1), date(2024, 7, 31))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].tag_id, sick.id);
    }

    #[tokio::test]
    async fn tags_in_use_cannot_be_deleted() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let w = worker(&store, a.id).await;
        let sick = offday_tag(&store, "Krank").await;
        store
            .plan_offdays(&w, &plan(&sick, vec![date(2024, 7, 1)]))
            .await
            .unwrap();

        let result = store.delete_tag(sick.id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        let duplicate = store
            .create_tag(NewTag {
                section: crate::models::TagSection::Offday,
                name: "Krank".into(),
                colour: "#000".into(),
            })
            .await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn remaining_holidays_come_from_this_years_account() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let w = worker(&store, a.id).await;
        assert_eq!(w.holidays_left(), 25);

        let year = Utc::now().year();
        store.set_remaining_holidays(w.id, year, Some(12)).await.unwrap();
        assert_eq!(store.get_worker(w.id).await.unwrap().remaining_holidays, Some(12));

        store.set_remaining_holidays(w.id, year, None).await.unwrap();
        assert_eq!(store.get_worker(w.id).await.unwrap().holidays_left(), 25);
    }

    #[tokio::test]
    async fn worktime_on_the_same_day_is_replaced() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let w = worker(&store, a.id).await;
        let entry = |end: u32| WorkTimeEntry {
            worker_id: w.id,
            date: date(2024, 6, 3),
            start: chrono::NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            end: chrono::NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            pause_minutes: 0,
            duration_minutes: (end as i32 - 6) * 60,
            cost: d("28.00"),
        };

        let first = store.put_worktime(entry(14)).await.unwrap();
        let second = store.put_worktime(entry(16)).await.unwrap();
        assert_eq!(first.id, second.id);
        let stored = store.list_worktimes(w.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].duration_minutes, 600);
    }

    #[tokio::test]
    async fn deleting_a_worker_removes_their_records() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let w = worker(&store, a.id).await;
        store
            .create_debt(
                w.id,
                NewDebt {
                    amount: d("300.00"),
                    date: date(2024, 5, 1),
                    notes: String::new(),
                },
            )
            .await
            .unwrap();
        store
            .create_document(
                a.id,
                DocumentOwner::Worker,
                w.id,
                NewDocument {
                    name: "Führerschein".into(),
                    expiry_date: Some(date(2026, 1, 1)),
                    done: false,
                },
            )
            .await
            .unwrap();

        store.delete_worker(w.id).await.unwrap();
        assert!(store.list_debts(w.id).await.unwrap().is_empty());
        assert!(store.list_firm_documents(a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_firm_removes_its_records() {
        let store = MemoryStore::new();
        let a = firm(&store, "Spedition A").await;
        let b = firm(&store, "Spedition B").await;
        customer(&store, a.id).await;
        customer(&store, b.id).await;

        store.delete_own_firm(a.id).await.unwrap();
        assert!(store.list_customers(a.id).await.unwrap().is_empty());
        assert_eq!(store.list_customers(b.id).await.unwrap().len(), 1);
    }
}
