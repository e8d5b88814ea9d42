//! Postgres store for fleet-service.

use super::metrics::DB_QUERY_DURATION;
use super::store::{conflict, not_found, Store};
use crate::audit::ChangeSet;
use crate::billing::DocumentNumber;
use crate::models::{
    holiday_deltas, Admin, AuditEntry, Bill, BillDraft, Contact, CreditNote, CreditNoteDraft,
    CreditNotePatch, CreditNotePayment, Customer, Debt, Document, DocumentOwner, FuelCard,
    FuelCardHandover, HolidayAccount, LineItem, Meeting, NewAdmin, NewAuditEntry, NewContact,
    NewCustomer, NewDebt, NewDocument, NewFuelCard, NewHandover, NewMeeting, NewOwnFirm,
    NewPayment, NewTag, NewTour, NewTourDays, NewTruck, NewWorker, Offday, OffdayPlan, OwnFirm,
    Tag, Tour, TourDay, Truck, WorkTime, WorkTimeEntry, Worker, CUSTOMER_IN_USE, DUPLICATE_CARD_NR,
    DUPLICATE_CUSTOMER, DUPLICATE_DOCUMENT_NR, DUPLICATE_OWN_FIRM, DUPLICATE_PLATE,
    DUPLICATE_ROLLER_NR, DUPLICATE_TAG, DUPLICATE_USERNAME, DUPLICATE_WORKER_NR, TAG_IN_USE,
};
use crate::models::is_driver_position;
use async_trait::async_trait;
use chrono::NaiveDate;
use prometheus::HistogramTimer;
use service_core::error::AppError;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgQueryResult};
use sqlx::types::Json;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const OWN_FIRM_COLUMNS: &str = "id, name, address, phone, mail, chairman, company_place, \
     register_court, tax_nr, vat_id, contact_name, contact_phone, contact_fax, bank_name, iban, \
     bic, logo_path, created_utc";
const ADMIN_COLUMNS: &str =
    "id, username, name, password_hash, token, is_superuser, own_firm_ids, created_utc";
const CUSTOMER_COLUMNS: &str = "id, own_firm_id, name, vat_id, address, created_utc";
/// Columns returned by worker writes; the balance lives in `holiday_accounts`.
const WORKER_COLUMNS: &str = "id, own_firm_id, worker_nr, name, position, is_driver, salary, \
     daily_expense, holidays, NULL::INTEGER AS remaining_holidays, start_date, quit_date, note, \
     created_utc";
/// Workers joined with the balance of the current year's holiday account.
const WORKER_SELECT: &str = "SELECT w.id, w.own_firm_id, w.worker_nr, w.name, w.position, \
     w.is_driver, w.salary, w.daily_expense, w.holidays, h.remaining_days AS remaining_holidays, \
     w.start_date, w.quit_date, w.note, w.created_utc \
     FROM workers w LEFT JOIN holiday_accounts h \
     ON h.worker_id = w.id AND h.year = EXTRACT(YEAR FROM CURRENT_DATE)::INTEGER";
const TRUCK_COLUMNS: &str = "id, own_firm_id, plate, manufacturer, model, price, payment_method, \
     paid_day, is_paid, installment_months, monthly_installment, installment_start, \
     installment_end, created_utc";
const TOUR_COLUMNS: &str =
    "id, own_firm_id, roller_nr, customer_id, notes, truck_id, driver_id, created_utc";
const TOUR_DAY_COLUMNS: &str = "id, tour_id, date, status, driver_ids, truck_id, note";
const FUEL_CARD_COLUMNS: &str =
    "id, own_firm_id, provider, card_nr, holder_id, is_active, notes, created_utc";
const HANDOVER_COLUMNS: &str = "id, fuel_card_id, worker_id, received_date, returned_date";
const CONTACT_COLUMNS: &str =
    "id, own_firm_id, name, company, label, phone, fax, mail, address, note, created_utc";
const BILL_COLUMNS: &str = "id, own_firm_id, customer_id, customer_name, vat_id, address, \
     number_seq, number_year, number, creation_date, pay_start, pay_end, sum, tax_rate, total, \
     document_path, created_utc";
const LINE_ITEM_COLUMNS: &str =
    "id, bill_id, position, description, quantity, unit, unit_price, line_sum";
const CREDIT_NOTE_COLUMNS: &str = "id, own_firm_id, customer_id, customer_name, document_nr, \
     advice_nr, gross_amount, tax_rate, open_amount, paid_amount, completed, completed_date, \
     creation_date, period_start, period_end, document_path, created_utc";
const PAYMENT_COLUMNS: &str = "id, credit_note_id, amount, date, created_utc";
const MEETING_COLUMNS: &str = "id, contact_id, date, notes, created_utc";
const DOCUMENT_COLUMNS: &str = "id, own_firm_id, \
     CASE WHEN worker_id IS NOT NULL THEN 'worker' ELSE 'truck' END::document_owner AS owner, \
     COALESCE(worker_id, truck_id) AS owner_id, name, expiry_date, done, file_path, upload_date, \
     created_utc";
const DEBT_COLUMNS: &str = "id, worker_id, amount, date, notes, created_utc";
const WORKTIME_COLUMNS: &str =
    "id, worker_id, date, start, \"end\", pause_minutes, duration_minutes, cost, created_utc";
const TAG_COLUMNS: &str = "id, section, name, colour, created_utc";
const OFFDAY_COLUMNS: &str =
    "id, own_firm_id, worker_id, date, tag_id, is_holiday, notes, created_utc";
const HOLIDAY_ACCOUNT_COLUMNS: &str = "worker_id, year, used_days, remaining_days";
const AUDIT_COLUMNS: &str =
    "id, admin_id, admin_name, own_firm_id, summary, changes, recorded_utc";

fn timer(operation: &str) -> HistogramTimer {
    DB_QUERY_DURATION
        .with_label_values(&[operation])
        .start_timer()
}

fn db_error(action: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", action, e))
}

/// Maps unique violations to a `Conflict` carrying `message`.
fn unique_error(message: &'static str, action: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => conflict(message),
        _ => AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", action, e)),
    }
}

fn ensure_affected(result: PgQueryResult, what: &str, id: i64) -> Result<(), AppError> {
    if result.rows_affected() == 0 {
        return Err(not_found(what, id));
    }
    Ok(())
}

/// Postgres connection pool wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "fleet-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn delete_by_id(&self, table: &str, what: &str, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete record"))?;
        ensure_affected(result, what, id)
    }
}

async fn lock_credit_note(conn: &mut PgConnection, id: i64) -> Result<CreditNote, AppError> {
    sqlx::query_as::<_, CreditNote>(&format!(
        "SELECT {} FROM credit_notes WHERE id = $1 FOR UPDATE",
        CREDIT_NOTE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(db_error("lock credit note"))?
    .ok_or_else(|| not_found("Credit note", id))
}

async fn lock_worker(conn: &mut PgConnection, id: i64) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM workers WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(db_error("lock worker"))?
        .ok_or_else(|| not_found("Worker", id))?;
    Ok(())
}

/// Books `days` against the worker's account for `year`, opening it from the
/// worker's entitlement. Negative days refund.
async fn book_holidays(
    conn: &mut PgConnection,
    worker_id: i64,
    year: i32,
    days: i32,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO holiday_accounts (worker_id, year, used_days, remaining_days)
        SELECT id, $2, $3, holidays - $3 FROM workers WHERE id = $1
        ON CONFLICT (worker_id, year) DO UPDATE
        SET used_days = holiday_accounts.used_days + EXCLUDED.used_days,
            remaining_days = holiday_accounts.remaining_days - EXCLUDED.used_days
        "#,
    )
    .bind(worker_id)
    .bind(year)
    .bind(days)
    .execute(conn)
    .await
    .map_err(db_error("book holidays"))?;
    Ok(())
}

async fn write_balance(conn: &mut PgConnection, note: &CreditNote) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE credit_notes
        SET gross_amount = $2, tax_rate = $3, open_amount = $4, paid_amount = $5,
            completed = $6, completed_date = $7
        WHERE id = $1
        "#,
    )
    .bind(note.id)
    .bind(note.balance.gross_amount)
    .bind(note.balance.tax_rate)
    .bind(note.balance.open_amount)
    .bind(note.balance.paid_amount)
    .bind(note.balance.completed)
    .bind(note.balance.completed_date)
    .execute(conn)
    .await
    .map_err(db_error("update credit note balance"))?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Own firms
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_own_firms(&self) -> Result<Vec<OwnFirm>, AppError> {
        let _timer = timer("list_own_firms");
        sqlx::query_as::<_, OwnFirm>(&format!("SELECT {} FROM own_firms", OWN_FIRM_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list own firms"))
    }

    #[instrument(skip(self))]
    async fn get_own_firm(&self, id: i64) -> Result<OwnFirm, AppError> {
        let _timer = timer("get_own_firm");
        sqlx::query_as::<_, OwnFirm>(&format!(
            "SELECT {} FROM own_firms WHERE id = $1",
            OWN_FIRM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get own firm"))?
        .ok_or_else(|| not_found("Own firm", id))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_own_firm(&self, input: NewOwnFirm) -> Result<OwnFirm, AppError> {
        let _timer = timer("create_own_firm");
        let firm = sqlx::query_as::<_, OwnFirm>(&format!(
            r#"
            INSERT INTO own_firms (name, address, phone, mail, chairman, company_place,
                register_court, tax_nr, vat_id, contact_name, contact_phone, contact_fax,
                bank_name, iban, bic)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {}
            "#,
            OWN_FIRM_COLUMNS
        ))
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.mail)
        .bind(&input.chairman)
        .bind(&input.company_place)
        .bind(&input.register_court)
        .bind(&input.tax_nr)
        .bind(&input.vat_id)
        .bind(&input.contact_name)
        .bind(&input.contact_phone)
        .bind(&input.contact_fax)
        .bind(&input.bank_name)
        .bind(&input.iban)
        .bind(&input.bic)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_OWN_FIRM, "create own firm"))?;

        info!(own_firm_id = firm.id, "Own firm created");
        Ok(firm)
    }

    #[instrument(skip(self, firm), fields(own_firm_id = firm.id))]
    async fn save_own_firm(&self, firm: &OwnFirm) -> Result<(), AppError> {
        let _timer = timer("save_own_firm");
        let result = sqlx::query(
            r#"
            UPDATE own_firms
            SET name = $2, address = $3, phone = $4, mail = $5, chairman = $6,
                company_place = $7, register_court = $8, tax_nr = $9, vat_id = $10,
                contact_name = $11, contact_phone = $12, contact_fax = $13, bank_name = $14,
                iban = $15, bic = $16, logo_path = $17
            WHERE id = $1
            "#,
        )
        .bind(firm.id)
        .bind(&firm.name)
        .bind(&firm.address)
        .bind(&firm.phone)
        .bind(&firm.mail)
        .bind(&firm.chairman)
        .bind(&firm.company_place)
        .bind(&firm.register_court)
        .bind(&firm.tax_nr)
        .bind(&firm.vat_id)
        .bind(&firm.contact_name)
        .bind(&firm.contact_phone)
        .bind(&firm.contact_fax)
        .bind(&firm.bank_name)
        .bind(&firm.iban)
        .bind(&firm.bic)
        .bind(&firm.logo_path)
        .execute(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_OWN_FIRM, "update own firm"))?;
        ensure_affected(result, "Own firm", firm.id)
    }

    #[instrument(skip(self))]
    async fn delete_own_firm(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_own_firm");
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        sqlx::query("UPDATE admins SET own_firm_ids = array_remove(own_firm_ids, $1)")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("revoke own firm access"))?;

        let result = sqlx::query("DELETE FROM own_firms WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete own firm"))?;
        ensure_affected(result, "Own firm", id)?;

        tx.commit().await.map_err(db_error("commit transaction"))?;
        info!(own_firm_id = id, "Own firm deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Admins
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn count_admins(&self) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count admins"))
    }

    #[instrument(skip(self))]
    async fn list_admins(&self) -> Result<Vec<Admin>, AppError> {
        let _timer = timer("list_admins");
        sqlx::query_as::<_, Admin>(&format!("SELECT {} FROM admins", ADMIN_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list admins"))
    }

    #[instrument(skip(self))]
    async fn get_admin(&self, id: i64) -> Result<Admin, AppError> {
        let _timer = timer("get_admin");
        sqlx::query_as::<_, Admin>(&format!("SELECT {} FROM admins WHERE id = $1", ADMIN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get admin"))?
            .ok_or_else(|| not_found("Admin", id))
    }

    #[instrument(skip(self))]
    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>, AppError> {
        let _timer = timer("find_admin_by_username");
        sqlx::query_as::<_, Admin>(&format!(
            "SELECT {} FROM admins WHERE username = $1",
            ADMIN_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find admin"))
    }

    #[instrument(skip(self, token))]
    async fn find_admin_by_token(&self, token: Uuid) -> Result<Option<Admin>, AppError> {
        let _timer = timer("find_admin_by_token");
        sqlx::query_as::<_, Admin>(&format!("SELECT {} FROM admins WHERE token = $1", ADMIN_COLUMNS))
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find admin"))
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    async fn create_admin(&self, input: NewAdmin) -> Result<Admin, AppError> {
        let _timer = timer("create_admin");
        let admin = sqlx::query_as::<_, Admin>(&format!(
            r#"
            INSERT INTO admins (username, name, password_hash, token, is_superuser, own_firm_ids)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ADMIN_COLUMNS
        ))
        .bind(&input.username)
        .bind(&input.name)
        .bind(&input.password_hash)
        .bind(input.token)
        .bind(input.is_superuser)
        .bind(input.own_firm_ids.as_slice())
        .fetch_one(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_USERNAME, "create admin"))?;

        info!(admin_id = admin.id, "Admin created");
        Ok(admin)
    }

    #[instrument(skip(self, admin), fields(admin_id = admin.id))]
    async fn save_admin(&self, admin: &Admin) -> Result<(), AppError> {
        let _timer = timer("save_admin");
        let result = sqlx::query(
            r#"
            UPDATE admins
            SET username = $2, name = $3, password_hash = $4, token = $5, is_superuser = $6,
                own_firm_ids = $7
            WHERE id = $1
            "#,
        )
        .bind(admin.id)
        .bind(&admin.username)
        .bind(&admin.name)
        .bind(&admin.password_hash)
        .bind(admin.token)
        .bind(admin.is_superuser)
        .bind(admin.own_firm_ids.as_slice())
        .execute(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_USERNAME, "update admin"))?;
        ensure_affected(result, "Admin", admin.id)
    }

    #[instrument(skip(self))]
    async fn delete_admin(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_admin");
        self.delete_by_id("admins", "Admin", id).await
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_customers(&self, own_firm_id: i64) -> Result<Vec<Customer>, AppError> {
        let _timer = timer("list_customers");
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE own_firm_id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list customers"))
    }

    #[instrument(skip(self))]
    async fn get_customer(&self, id: i64) -> Result<Customer, AppError> {
        let _timer = timer("get_customer");
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get customer"))?
        .ok_or_else(|| not_found("Customer", id))
    }

    #[instrument(skip(self))]
    async fn find_customer_by_name(
        &self,
        own_firm_id: i64,
        name: &str,
    ) -> Result<Option<Customer>, AppError> {
        let _timer = timer("find_customer_by_name");
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE own_firm_id = $1 AND name = $2",
            CUSTOMER_COLUMNS
        ))
        .bind(own_firm_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find customer"))
    }

    #[instrument(skip(self, input), fields(own_firm_id = input.own_firm_id))]
    async fn create_customer(&self, input: NewCustomer) -> Result<Customer, AppError> {
        let _timer = timer("create_customer");
        sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (own_firm_id, name, vat_id, address)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(input.own_firm_id)
        .bind(&input.name)
        .bind(&input.vat_id)
        .bind(&input.address)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_CUSTOMER, "create customer"))
    }

    #[instrument(skip(self, customer), fields(customer_id = customer.id))]
    async fn save_customer(&self, customer: &Customer) -> Result<(), AppError> {
        let _timer = timer("save_customer");
        let result =
            sqlx::query("UPDATE customers SET name = $2, vat_id = $3, address = $4 WHERE id = $1")
                .bind(customer.id)
                .bind(&customer.name)
                .bind(&customer.vat_id)
                .bind(&customer.address)
                .execute(&self.pool)
                .await
                .map_err(unique_error(DUPLICATE_CUSTOMER, "update customer"))?;
        ensure_affected(result, "Customer", customer.id)
    }

    #[instrument(skip(self))]
    async fn delete_customer(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_customer");
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    conflict(CUSTOMER_IN_USE)
                }
                _ => AppError::DatabaseError(anyhow::anyhow!("Failed to delete customer: {}", e)),
            })?;
        ensure_affected(result, "Customer", id)
    }

    // -------------------------------------------------------------------------
    // Workers
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_workers(&self, own_firm_id: i64) -> Result<Vec<Worker>, AppError> {
        let _timer = timer("list_workers");
        sqlx::query_as::<_, Worker>(&format!("{} WHERE w.own_firm_id = $1", WORKER_SELECT))
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list workers"))
    }

    #[instrument(skip(self))]
    async fn get_worker(&self, id: i64) -> Result<Worker, AppError> {
        let _timer = timer("get_worker");
        sqlx::query_as::<_, Worker>(&format!("{} WHERE w.id = $1", WORKER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get worker"))?
            .ok_or_else(|| not_found("Worker", id))
    }

    #[instrument(skip(self, input), fields(own_firm_id = input.own_firm_id))]
    async fn create_worker(&self, input: NewWorker) -> Result<Worker, AppError> {
        let _timer = timer("create_worker");
        sqlx::query_as::<_, Worker>(&format!(
            r#"
            INSERT INTO workers (own_firm_id, worker_nr, name, position, is_driver, salary,
                daily_expense, holidays, start_date, quit_date, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            WORKER_COLUMNS
        ))
        .bind(input.own_firm_id)
        .bind(&input.worker_nr)
        .bind(&input.name)
        .bind(&input.position)
        .bind(is_driver_position(&input.position))
        .bind(input.salary)
        .bind(input.daily_expense)
        .bind(input.holidays)
        .bind(input.start_date)
        .bind(input.quit_date)
        .bind(&input.note)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_WORKER_NR, "create worker"))
    }

    #[instrument(skip(self, worker), fields(worker_id = worker.id))]
    async fn save_worker(&self, worker: &Worker) -> Result<(), AppError> {
        let _timer = timer("save_worker");
        let result = sqlx::query(
            r#"
            UPDATE workers
            SET worker_nr = $2, name = $3, position = $4, is_driver = $5, salary = $6,
                daily_expense = $7, holidays = $8, start_date = $9, quit_date = $10, note = $11
            WHERE id = $1
            "#,
        )
        .bind(worker.id)
        .bind(&worker.worker_nr)
        .bind(&worker.name)
        .bind(&worker.position)
        .bind(worker.is_driver)
        .bind(worker.salary)
        .bind(worker.daily_expense)
        .bind(worker.holidays)
        .bind(worker.start_date)
        .bind(worker.quit_date)
        .bind(&worker.note)
        .execute(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_WORKER_NR, "update worker"))?;
        ensure_affected(result, "Worker", worker.id)
    }

    #[instrument(skip(self))]
    async fn delete_worker(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_worker");
        self.delete_by_id("workers", "Worker", id).await
    }

    #[instrument(skip(self))]
    async fn set_remaining_holidays(
        &self,
        worker_id: i64,
        year: i32,
        remaining: Option<i32>,
    ) -> Result<(), AppError> {
        let _timer = timer("set_remaining_holidays");
        let result = match remaining {
            Some(days) => sqlx::query(
                r#"
                INSERT INTO holiday_accounts (worker_id, year, used_days, remaining_days)
                SELECT id, $2, 0, $3 FROM workers WHERE id = $1
                ON CONFLICT (worker_id, year) DO UPDATE SET remaining_days = EXCLUDED.remaining_days
                "#,
            )
            .bind(worker_id)
            .bind(year)
            .bind(days)
            .execute(&self.pool)
            .await
            .map_err(db_error("set holiday account"))?,
            None => {
                sqlx::query("DELETE FROM holiday_accounts WHERE worker_id = $1 AND year = $2")
                    .bind(worker_id)
                    .bind(year)
                    .execute(&self.pool)
                    .await
                    .map_err(db_error("drop holiday account"))?;
                return Ok(());
            }
        };
        ensure_affected(result, "Worker", worker_id)
    }

    // -------------------------------------------------------------------------
    // Trucks
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_trucks(&self, own_firm_id: i64) -> Result<Vec<Truck>, AppError> {
        let _timer = timer("list_trucks");
        sqlx::query_as::<_, Truck>(&format!(
            "SELECT {} FROM trucks WHERE own_firm_id = $1",
            TRUCK_COLUMNS
        ))
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list trucks"))
    }

    #[instrument(skip(self))]
    async fn get_truck(&self, id: i64) -> Result<Truck, AppError> {
        let _timer = timer("get_truck");
        sqlx::query_as::<_, Truck>(&format!("SELECT {} FROM trucks WHERE id = $1", TRUCK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get truck"))?
            .ok_or_else(|| not_found("Truck", id))
    }

    #[instrument(skip(self, input), fields(own_firm_id = input.own_firm_id))]
    async fn create_truck(&self, input: NewTruck) -> Result<Truck, AppError> {
        let _timer = timer("create_truck");
        sqlx::query_as::<_, Truck>(&format!(
            r#"
            INSERT INTO trucks (own_firm_id, plate, manufacturer, model)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            TRUCK_COLUMNS
        ))
        .bind(input.own_firm_id)
        .bind(&input.plate)
        .bind(&input.manufacturer)
        .bind(&input.model)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_PLATE, "create truck"))
    }

    #[instrument(skip(self, truck), fields(truck_id = truck.id))]
    async fn save_truck(&self, truck: &Truck) -> Result<(), AppError> {
        let _timer = timer("save_truck");
        let result = sqlx::query(
            r#"
            UPDATE trucks
            SET plate = $2, manufacturer = $3, model = $4, price = $5, payment_method = $6,
                paid_day = $7, is_paid = $8, installment_months = $9, monthly_installment = $10,
                installment_start = $11, installment_end = $12
            WHERE id = $1
            "#,
        )
        .bind(truck.id)
        .bind(&truck.plate)
        .bind(&truck.manufacturer)
        .bind(&truck.model)
        .bind(truck.price)
        .bind(truck.payment_method)
        .bind(truck.paid_day)
        .bind(truck.is_paid)
        .bind(truck.installment_months)
        .bind(truck.monthly_installment)
        .bind(truck.installment_start)
        .bind(truck.installment_end)
        .execute(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_PLATE, "update truck"))?;
        ensure_affected(result, "Truck", truck.id)
    }

    #[instrument(skip(self))]
    async fn delete_truck(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_truck");
        self.delete_by_id("trucks", "Truck", id).await
    }

    // -------------------------------------------------------------------------
    // Tours
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_tours(&self, own_firm_id: i64) -> Result<Vec<Tour>, AppError> {
        let _timer = timer("list_tours");
        sqlx::query_as::<_, Tour>(&format!(
            "SELECT {} FROM tours WHERE own_firm_id = $1",
            TOUR_COLUMNS
        ))
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list tours"))
    }

    #[instrument(skip(self))]
    async fn get_tour(&self, id: i64) -> Result<Tour, AppError> {
        let _timer = timer("get_tour");
        sqlx::query_as::<_, Tour>(&format!("SELECT {} FROM tours WHERE id = $1", TOUR_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get tour"))?
            .ok_or_else(|| not_found("Tour", id))
    }

    #[instrument(skip(self, input), fields(own_firm_id = input.own_firm_id))]
    async fn create_tour(&self, input: NewTour) -> Result<Tour, AppError> {
        let _timer = timer("create_tour");
        sqlx::query_as::<_, Tour>(&format!(
            r#"
            INSERT INTO tours (own_firm_id, roller_nr, customer_id, notes, truck_id, driver_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            TOUR_COLUMNS
        ))
        .bind(input.own_firm_id)
        .bind(&input.roller_nr)
        .bind(input.customer_id)
        .bind(&input.notes)
        .bind(input.truck_id)
        .bind(input.driver_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_ROLLER_NR, "create tour"))
    }

    #[instrument(skip(self, tour), fields(tour_id = tour.id))]
    async fn save_tour(&self, tour: &Tour) -> Result<(), AppError> {
        let _timer = timer("save_tour");
        let result = sqlx::query(
            r#"
            UPDATE tours
            SET roller_nr = $2, customer_id = $3, notes = $4, truck_id = $5, driver_id = $6
            WHERE id = $1
            "#,
        )
        .bind(tour.id)
        .bind(&tour.roller_nr)
        .bind(tour.customer_id)
        .bind(&tour.notes)
        .bind(tour.truck_id)
        .bind(tour.driver_id)
        .execute(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_ROLLER_NR, "update tour"))?;
        ensure_affected(result, "Tour", tour.id)
    }

    #[instrument(skip(self))]
    async fn delete_tour(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_tour");
        self.delete_by_id("tours", "Tour", id).await
    }

    #[instrument(skip(self))]
    async fn list_tour_days(&self, tour_id: i64) -> Result<Vec<TourDay>, AppError> {
        let _timer = timer("list_tour_days");
        sqlx::query_as::<_, TourDay>(&format!(
            "SELECT {} FROM tour_days WHERE tour_id = $1 ORDER BY date",
            TOUR_DAY_COLUMNS
        ))
        .bind(tour_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list tour days"))
    }

    #[instrument(skip(self, dates, template), fields(days = dates.len()))]
    async fn put_tour_days(
        &self,
        tour_id: i64,
        dates: &[NaiveDate],
        template: &NewTourDays,
    ) -> Result<Vec<TourDay>, AppError> {
        let _timer = timer("put_tour_days");
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM tours WHERE id = $1 FOR UPDATE")
            .bind(tour_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("lock tour"))?
            .ok_or_else(|| not_found("Tour", tour_id))?;

        let mut days = Vec::with_capacity(dates.len());
        for date in dates {
            let day = sqlx::query_as::<_, TourDay>(&format!(
                r#"
                INSERT INTO tour_days (tour_id, date, status, driver_ids, truck_id, note)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (tour_id, date) DO UPDATE
                SET status = EXCLUDED.status, driver_ids = EXCLUDED.driver_ids,
                    truck_id = EXCLUDED.truck_id, note = EXCLUDED.note
                RETURNING {}
                "#,
                TOUR_DAY_COLUMNS
            ))
            .bind(tour_id)
            .bind(date)
            .bind(&template.status)
            .bind(template.driver_ids.as_slice())
            .bind(template.truck_id)
            .bind(&template.note)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("schedule tour day"))?;
            days.push(day);
        }

        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok(days)
    }

    #[instrument(skip(self, day_ids))]
    async fn delete_tour_days(&self, tour_id: i64, day_ids: &[i64]) -> Result<Vec<TourDay>, AppError> {
        let _timer = timer("delete_tour_days");
        sqlx::query_as::<_, TourDay>(&format!(
            "DELETE FROM tour_days WHERE tour_id = $1 AND id = ANY($2) RETURNING {}",
            TOUR_DAY_COLUMNS
        ))
        .bind(tour_id)
        .bind(day_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("delete tour days"))
    }

    #[instrument(skip(self))]
    async fn list_firm_tour_days(
        &self,
        own_firm_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TourDay>, AppError> {
        let _timer = timer("list_firm_tour_days");
        sqlx::query_as::<_, TourDay>(
            r#"
            SELECT d.id, d.tour_id, d.date, d.status, d.driver_ids, d.truck_id, d.note
            FROM tour_days d JOIN tours t ON t.id = d.tour_id
            WHERE t.own_firm_id = $1 AND d.date = $2
            ORDER BY t.roller_nr
            "#,
        )
        .bind(own_firm_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list firm tour days"))
    }

    // -------------------------------------------------------------------------
    // Fuel cards
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_fuel_cards(&self, own_firm_id: i64) -> Result<Vec<FuelCard>, AppError> {
        let _timer = timer("list_fuel_cards");
        sqlx::query_as::<_, FuelCard>(&format!(
            "SELECT {} FROM fuel_cards WHERE own_firm_id = $1",
            FUEL_CARD_COLUMNS
        ))
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list fuel cards"))
    }

    #[instrument(skip(self))]
    async fn get_fuel_card(&self, id: i64) -> Result<FuelCard, AppError> {
        let _timer = timer("get_fuel_card");
        sqlx::query_as::<_, FuelCard>(&format!(
            "SELECT {} FROM fuel_cards WHERE id = $1",
            FUEL_CARD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get fuel card"))?
        .ok_or_else(|| not_found("Fuel card", id))
    }

    #[instrument(skip(self, input), fields(own_firm_id = input.own_firm_id))]
    async fn create_fuel_card(&self, input: NewFuelCard) -> Result<FuelCard, AppError> {
        let _timer = timer("create_fuel_card");
        sqlx::query_as::<_, FuelCard>(&format!(
            r#"
            INSERT INTO fuel_cards (own_firm_id, provider, card_nr, is_active, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            FUEL_CARD_COLUMNS
        ))
        .bind(input.own_firm_id)
        .bind(&input.provider)
        .bind(&input.card_nr)
        .bind(input.is_active)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_CARD_NR, "create fuel card"))
    }

    #[instrument(skip(self, card), fields(fuel_card_id = card.id))]
    async fn save_fuel_card(&self, card: &FuelCard) -> Result<(), AppError> {
        let _timer = timer("save_fuel_card");
        let result = sqlx::query(
            r#"
            UPDATE fuel_cards
            SET provider = $2, card_nr = $3, holder_id = $4, is_active = $5, notes = $6
            WHERE id = $1
            "#,
        )
        .bind(card.id)
        .bind(&card.provider)
        .bind(&card.card_nr)
        .bind(card.holder_id)
        .bind(card.is_active)
        .bind(&card.notes)
        .execute(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_CARD_NR, "update fuel card"))?;
        ensure_affected(result, "Fuel card", card.id)
    }

    #[instrument(skip(self))]
    async fn delete_fuel_card(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_fuel_card");
        self.delete_by_id("fuel_cards", "Fuel card", id).await
    }

    #[instrument(skip(self))]
    async fn list_handovers(&self, fuel_card_id: i64) -> Result<Vec<FuelCardHandover>, AppError> {
        let _timer = timer("list_handovers");
        sqlx::query_as::<_, FuelCardHandover>(&format!(
            "SELECT {} FROM fuel_card_handovers WHERE fuel_card_id = $1 ORDER BY received_date, id",
            HANDOVER_COLUMNS
        ))
        .bind(fuel_card_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list handovers"))
    }

    #[instrument(skip(self, input), fields(worker_id = input.worker_id))]
    async fn hand_over_fuel_card(
        &self,
        fuel_card_id: i64,
        input: &NewHandover,
    ) -> Result<(FuelCard, FuelCardHandover), AppError> {
        let _timer = timer("hand_over_fuel_card");
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM fuel_cards WHERE id = $1 FOR UPDATE")
            .bind(fuel_card_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("lock fuel card"))?
            .ok_or_else(|| not_found("Fuel card", fuel_card_id))?;

        sqlx::query(
            r#"
            UPDATE fuel_card_handovers SET returned_date = $2
            WHERE id = (
                SELECT id FROM fuel_card_handovers
                WHERE fuel_card_id = $1
                ORDER BY received_date DESC, id DESC
                LIMIT 1
            )
            AND returned_date IS NULL
            "#,
        )
        .bind(fuel_card_id)
        .bind(input.received_date)
        .execute(&mut *tx)
        .await
        .map_err(db_error("close handover"))?;

        let handover = sqlx::query_as::<_, FuelCardHandover>(&format!(
            r#"
            INSERT INTO fuel_card_handovers (fuel_card_id, worker_id, received_date, returned_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            HANDOVER_COLUMNS
        ))
        .bind(fuel_card_id)
        .bind(input.worker_id)
        .bind(input.received_date)
        .bind(input.returned_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("record handover"))?;

        let card = sqlx::query_as::<_, FuelCard>(&format!(
            "UPDATE fuel_cards SET holder_id = $2 WHERE id = $1 RETURNING {}",
            FUEL_CARD_COLUMNS
        ))
        .bind(fuel_card_id)
        .bind(input.worker_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("update fuel card holder"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok((card, handover))
    }

    // -------------------------------------------------------------------------
    // Contacts
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_contacts(&self, own_firm_id: i64) -> Result<Vec<Contact>, AppError> {
        let _timer = timer("list_contacts");
        sqlx::query_as::<_, Contact>(&format!(
            "SELECT {} FROM contacts WHERE own_firm_id = $1",
            CONTACT_COLUMNS
        ))
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list contacts"))
    }

    #[instrument(skip(self))]
    async fn get_contact(&self, id: i64) -> Result<Contact, AppError> {
        let _timer = timer("get_contact");
        sqlx::query_as::<_, Contact>(&format!(
            "SELECT {} FROM contacts WHERE id = $1",
            CONTACT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get contact"))?
        .ok_or_else(|| not_found("Contact", id))
    }

    #[instrument(skip(self, input), fields(own_firm_id = input.own_firm_id))]
    async fn create_contact(&self, input: NewContact) -> Result<Contact, AppError> {
        let _timer = timer("create_contact");
        sqlx::query_as::<_, Contact>(&format!(
            r#"
            INSERT INTO contacts (own_firm_id, name, company, label, phone, fax, mail, address, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            CONTACT_COLUMNS
        ))
        .bind(input.own_firm_id)
        .bind(&input.name)
        .bind(&input.company)
        .bind(&input.label)
        .bind(&input.phone)
        .bind(&input.fax)
        .bind(&input.mail)
        .bind(&input.address)
        .bind(&input.note)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create contact"))
    }

    #[instrument(skip(self, contact), fields(contact_id = contact.id))]
    async fn save_contact(&self, contact: &Contact) -> Result<(), AppError> {
        let _timer = timer("save_contact");
        let result = sqlx::query(
            r#"
            UPDATE contacts
            SET name = $2, company = $3, label = $4, phone = $5, fax = $6, mail = $7,
                address = $8, note = $9
            WHERE id = $1
            "#,
        )
        .bind(contact.id)
        .bind(&contact.name)
        .bind(&contact.company)
        .bind(&contact.label)
        .bind(&contact.phone)
        .bind(&contact.fax)
        .bind(&contact.mail)
        .bind(&contact.address)
        .bind(&contact.note)
        .execute(&self.pool)
        .await
        .map_err(db_error("update contact"))?;
        ensure_affected(result, "Contact", contact.id)
    }

    #[instrument(skip(self))]
    async fn delete_contact(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_contact");
        self.delete_by_id("contacts", "Contact", id).await
    }

    // -------------------------------------------------------------------------
    // Meetings
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_meetings(&self, contact_id: i64) -> Result<Vec<Meeting>, AppError> {
        let _timer = timer("list_meetings");
        sqlx::query_as::<_, Meeting>(&format!(
            "SELECT {} FROM meetings WHERE contact_id = $1 ORDER BY date, id",
            MEETING_COLUMNS
        ))
        .bind(contact_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list meetings"))
    }

    #[instrument(skip(self))]
    async fn get_meeting(&self, id: i64) -> Result<Meeting, AppError> {
        let _timer = timer("get_meeting");
        sqlx::query_as::<_, Meeting>(&format!("SELECT {} FROM meetings WHERE id = $1", MEETING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get meeting"))?
            .ok_or_else(|| not_found("Meeting", id))
    }

    #[instrument(skip(self, input))]
    async fn create_meeting(&self, contact_id: i64, input: NewMeeting) -> Result<Meeting, AppError> {
        let _timer = timer("create_meeting");
        sqlx::query_as::<_, Meeting>(&format!(
            "INSERT INTO meetings (contact_id, date, notes) VALUES ($1, $2, $3) RETURNING {}",
            MEETING_COLUMNS
        ))
        .bind(contact_id)
        .bind(input.date)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create meeting"))
    }

    #[instrument(skip(self, meeting), fields(meeting_id = meeting.id))]
    async fn save_meeting(&self, meeting: &Meeting) -> Result<(), AppError> {
        let _timer = timer("save_meeting");
        let result = sqlx::query("UPDATE meetings SET date = $2, notes = $3 WHERE id = $1")
            .bind(meeting.id)
            .bind(meeting.date)
            .bind(&meeting.notes)
            .execute(&self.pool)
            .await
            .map_err(db_error("update meeting"))?;
        ensure_affected(result, "Meeting", meeting.id)
    }

    #[instrument(skip(self))]
    async fn delete_meeting(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_meeting");
        self.delete_by_id("meetings", "Meeting", id).await
    }

    // -------------------------------------------------------------------------
    // Worker and truck documents
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_documents(
        &self,
        owner: DocumentOwner,
        owner_id: i64,
    ) -> Result<Vec<Document>, AppError> {
        let _timer = timer("list_documents");
        let owner_column = match owner {
            DocumentOwner::Worker => "worker_id",
            DocumentOwner::Truck => "truck_id",
        };
        sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE {} = $1",
            DOCUMENT_COLUMNS, owner_column
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list documents"))
    }

    #[instrument(skip(self))]
    async fn list_firm_documents(&self, own_firm_id: i64) -> Result<Vec<Document>, AppError> {
        let _timer = timer("list_firm_documents");
        sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE own_firm_id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list firm documents"))
    }

    #[instrument(skip(self))]
    async fn get_document(&self, id: i64) -> Result<Document, AppError> {
        let _timer = timer("get_document");
        sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get document"))?
        .ok_or_else(|| not_found("Document", id))
    }

    #[instrument(skip(self, input))]
    async fn create_document(
        &self,
        own_firm_id: i64,
        owner: DocumentOwner,
        owner_id: i64,
        input: NewDocument,
    ) -> Result<Document, AppError> {
        let _timer = timer("create_document");
        let (worker_id, truck_id) = match owner {
            DocumentOwner::Worker => (Some(owner_id), None),
            DocumentOwner::Truck => (None, Some(owner_id)),
        };
        sqlx::query_as::<_, Document>(&format!(
            r#"
            INSERT INTO documents (own_firm_id, worker_id, truck_id, name, expiry_date, done)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(own_firm_id)
        .bind(worker_id)
        .bind(truck_id)
        .bind(&input.name)
        .bind(input.expiry_date)
        .bind(input.done)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create document"))
    }

    #[instrument(skip(self, document), fields(document_id = document.id))]
    async fn save_document(&self, document: &Document) -> Result<(), AppError> {
        let _timer = timer("save_document");
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET name = $2, expiry_date = $3, done = $4, file_path = $5, upload_date = $6
            WHERE id = $1
            "#,
        )
        .bind(document.id)
        .bind(&document.name)
        .bind(document.expiry_date)
        .bind(document.done)
        .bind(&document.file_path)
        .bind(document.upload_date)
        .execute(&self.pool)
        .await
        .map_err(db_error("update document"))?;
        ensure_affected(result, "Document", document.id)
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_document");
        self.delete_by_id("documents", "Document", id).await
    }

    // -------------------------------------------------------------------------
    // Worker debts
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_debts(&self, worker_id: i64) -> Result<Vec<Debt>, AppError> {
        let _timer = timer("list_debts");
        sqlx::query_as::<_, Debt>(&format!(
            "SELECT {} FROM debts WHERE worker_id = $1 ORDER BY date, id",
            DEBT_COLUMNS
        ))
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list debts"))
    }

    #[instrument(skip(self))]
    async fn get_debt(&self, id: i64) -> Result<Debt, AppError> {
        let _timer = timer("get_debt");
        sqlx::query_as::<_, Debt>(&format!("SELECT {} FROM debts WHERE id = $1", DEBT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get debt"))?
            .ok_or_else(|| not_found("Debt", id))
    }

    #[instrument(skip(self, input))]
    async fn create_debt(&self, worker_id: i64, input: NewDebt) -> Result<Debt, AppError> {
        let _timer = timer("create_debt");
        sqlx::query_as::<_, Debt>(&format!(
            "INSERT INTO debts (worker_id, amount, date, notes) VALUES ($1, $2, $3, $4) RETURNING {}",
            DEBT_COLUMNS
        ))
        .bind(worker_id)
        .bind(input.amount)
        .bind(input.date)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create debt"))
    }

    #[instrument(skip(self, debt), fields(debt_id = debt.id))]
    async fn save_debt(&self, debt: &Debt) -> Result<(), AppError> {
        let _timer = timer("save_debt");
        let result = sqlx::query("UPDATE debts SET amount = $2, date = $3, notes = $4 WHERE id = $1")
            .bind(debt.id)
            .bind(debt.amount)
            .bind(debt.date)
            .bind(&debt.notes)
            .execute(&self.pool)
            .await
            .map_err(db_error("update debt"))?;
        ensure_affected(result, "Debt", debt.id)
    }

    #[instrument(skip(self))]
    async fn delete_debt(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_debt");
        self.delete_by_id("debts", "Debt", id).await
    }

    // -------------------------------------------------------------------------
    // Working times
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_worktimes(&self, worker_id: i64) -> Result<Vec<WorkTime>, AppError> {
        let _timer = timer("list_worktimes");
        sqlx::query_as::<_, WorkTime>(&format!(
            "SELECT {} FROM worktimes WHERE worker_id = $1 ORDER BY date",
            WORKTIME_COLUMNS
        ))
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list working times"))
    }

    #[instrument(skip(self))]
    async fn get_worktime(&self, id: i64) -> Result<WorkTime, AppError> {
        let _timer = timer("get_worktime");
        sqlx::query_as::<_, WorkTime>(&format!(
            "SELECT {} FROM worktimes WHERE id = $1",
            WORKTIME_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get working time"))?
        .ok_or_else(|| not_found("Working time", id))
    }

    #[instrument(skip(self, entry), fields(worker_id = entry.worker_id))]
    async fn put_worktime(&self, entry: WorkTimeEntry) -> Result<WorkTime, AppError> {
        let _timer = timer("put_worktime");
        sqlx::query_as::<_, WorkTime>(&format!(
            r#"
            INSERT INTO worktimes (worker_id, date, start, "end", pause_minutes, duration_minutes,
                cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (worker_id, date) DO UPDATE
            SET start = EXCLUDED.start, "end" = EXCLUDED."end",
                pause_minutes = EXCLUDED.pause_minutes,
                duration_minutes = EXCLUDED.duration_minutes, cost = EXCLUDED.cost
            RETURNING {}
            "#,
            WORKTIME_COLUMNS
        ))
        .bind(entry.worker_id)
        .bind(entry.date)
        .bind(entry.start)
        .bind(entry.end)
        .bind(entry.pause_minutes)
        .bind(entry.duration_minutes)
        .bind(entry.cost)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("store working time"))
    }

    #[instrument(skip(self))]
    async fn delete_worktime(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_worktime");
        self.delete_by_id("worktimes", "Working time", id).await
    }

    // -------------------------------------------------------------------------
    // Tags
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        let _timer = timer("list_tags");
        sqlx::query_as::<_, Tag>(&format!("SELECT {} FROM tags ORDER BY id", TAG_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list tags"))
    }

    #[instrument(skip(self))]
    async fn get_tag(&self, id: i64) -> Result<Tag, AppError> {
        let _timer = timer("get_tag");
        sqlx::query_as::<_, Tag>(&format!("SELECT {} FROM tags WHERE id = $1", TAG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get tag"))?
            .ok_or_else(|| not_found("Tag", id))
    }

    #[instrument(skip(self, input))]
    async fn create_tag(&self, input: NewTag) -> Result<Tag, AppError> {
        let _timer = timer("create_tag");
        sqlx::query_as::<_, Tag>(&format!(
            "INSERT INTO tags (section, name, colour) VALUES ($1, $2, $3) RETURNING {}",
            TAG_COLUMNS
        ))
        .bind(input.section)
        .bind(&input.name)
        .bind(&input.colour)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_TAG, "create tag"))
    }

    #[instrument(skip(self, tag), fields(tag_id = tag.id))]
    async fn save_tag(&self, tag: &Tag) -> Result<(), AppError> {
        let _timer = timer("save_tag");
        let result = sqlx::query("UPDATE tags SET name = $2, colour = $3 WHERE id = $1")
            .bind(tag.id)
            .bind(&tag.name)
            .bind(&tag.colour)
            .execute(&self.pool)
            .await
            .map_err(unique_error(DUPLICATE_TAG, "update tag"))?;
        ensure_affected(result, "Tag", tag.id)
    }

    #[instrument(skip(self))]
    async fn delete_tag(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_tag");
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    conflict(TAG_IN_USE)
                }
                _ => AppError::DatabaseError(anyhow::anyhow!("Failed to delete tag: {}", e)),
            })?;
        ensure_affected(result, "Tag", id)
    }

    // -------------------------------------------------------------------------
    // Offdays and holiday accounts
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_offdays(
        &self,
        own_firm_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Offday>, AppError> {
        let _timer = timer("list_offdays");
        sqlx::query_as::<_, Offday>(&format!(
            "SELECT {} FROM offdays WHERE own_firm_id = $1 AND date BETWEEN $2 AND $3 \
             ORDER BY date, id",
            OFFDAY_COLUMNS
        ))
        .bind(own_firm_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list offdays"))
    }

    #[instrument(skip(self, worker, plan), fields(worker_id = worker.id, days = plan.dates.len()))]
    async fn plan_offdays(&self, worker: &Worker, plan: &OffdayPlan) -> Result<Vec<Offday>, AppError> {
        let _timer = timer("plan_offdays");
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        lock_worker(&mut *tx, worker.id).await?;

        let replaced = sqlx::query_as::<_, Offday>(&format!(
            "DELETE FROM offdays WHERE worker_id = $1 AND date = ANY($2) RETURNING {}",
            OFFDAY_COLUMNS
        ))
        .bind(worker.id)
        .bind(plan.dates.as_slice())
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("replace offdays"))?;

        let booked: &[NaiveDate] = if plan.is_holiday { &plan.dates } else { &[] };
        for (year, days) in holiday_deltas(booked, &replaced) {
            book_holidays(&mut *tx, worker.id, year, days).await?;
        }

        let mut planned = Vec::with_capacity(plan.dates.len());
        for date in &plan.dates {
            let offday = sqlx::query_as::<_, Offday>(&format!(
                r#"
                INSERT INTO offdays (own_firm_id, worker_id, date, tag_id, is_holiday, notes)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {}
                "#,
                OFFDAY_COLUMNS
            ))
            .bind(worker.own_firm_id)
            .bind(worker.id)
            .bind(date)
            .bind(plan.tag_id)
            .bind(plan.is_holiday)
            .bind(&plan.notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("plan offday"))?;
            planned.push(offday);
        }

        tx.commit().await.map_err(db_error("commit transaction"))?;
        info!(worker_id = worker.id, days = planned.len(), "Offdays planned");
        Ok(planned)
    }

    #[instrument(skip(self, worker, ids), fields(worker_id = worker.id))]
    async fn delete_offdays(&self, worker: &Worker, ids: &[i64]) -> Result<Vec<Offday>, AppError> {
        let _timer = timer("delete_offdays");
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        lock_worker(&mut *tx, worker.id).await?;

        let removed = sqlx::query_as::<_, Offday>(&format!(
            "DELETE FROM offdays WHERE worker_id = $1 AND id = ANY($2) RETURNING {}",
            OFFDAY_COLUMNS
        ))
        .bind(worker.id)
        .bind(ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("delete offdays"))?;

        for (year, days) in holiday_deltas(&[], &removed) {
            book_holidays(&mut *tx, worker.id, year, days).await?;
        }

        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn list_holiday_accounts(&self, own_firm_id: i64) -> Result<Vec<HolidayAccount>, AppError> {
        let _timer = timer("list_holiday_accounts");
        sqlx::query_as::<_, HolidayAccount>(
            r#"
            SELECT h.worker_id, h.year, h.used_days, h.remaining_days
            FROM holiday_accounts h JOIN workers w ON w.id = h.worker_id
            WHERE w.own_firm_id = $1
            ORDER BY h.worker_id, h.year
            "#,
        )
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list holiday accounts"))
    }

    // -------------------------------------------------------------------------
    // Bills
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_bills(&self, own_firm_id: i64) -> Result<Vec<Bill>, AppError> {
        let _timer = timer("list_bills");
        sqlx::query_as::<_, Bill>(&format!(
            "SELECT {} FROM bills WHERE own_firm_id = $1",
            BILL_COLUMNS
        ))
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list bills"))
    }

    #[instrument(skip(self))]
    async fn get_bill(&self, id: i64) -> Result<Bill, AppError> {
        let _timer = timer("get_bill");
        let mut bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {} FROM bills WHERE id = $1",
            BILL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get bill"))?
        .ok_or_else(|| not_found("Bill", id))?;

        bill.items = sqlx::query_as::<_, LineItem>(&format!(
            "SELECT {} FROM bill_items WHERE bill_id = $1 ORDER BY position",
            LINE_ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("get bill items"))?;

        Ok(bill)
    }

    /// Locks the owning firm row so concurrent creations in the same firm
    /// take turns reading the highest sequence of the year.
    #[instrument(skip(self, draft), fields(own_firm_id = draft.own_firm_id, year = draft.year()))]
    async fn create_bill(&self, draft: BillDraft) -> Result<Bill, AppError> {
        let _timer = timer("create_bill");
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM own_firms WHERE id = $1 FOR UPDATE")
            .bind(draft.own_firm_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("lock own firm"))?
            .ok_or_else(|| not_found("Own firm", draft.own_firm_id))?;

        let year = draft.year();
        let last = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(number_seq) FROM bills WHERE own_firm_id = $1 AND number_year = $2",
        )
        .bind(draft.own_firm_id)
        .bind(year)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("read last bill number"))?;
        let number = DocumentNumber::following(last, year);

        let mut bill = sqlx::query_as::<_, Bill>(&format!(
            r#"
            INSERT INTO bills (own_firm_id, customer_id, customer_name, vat_id, address,
                number_seq, number_year, number, creation_date, pay_start, pay_end, sum,
                tax_rate, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            BILL_COLUMNS
        ))
        .bind(draft.own_firm_id)
        .bind(draft.customer_id)
        .bind(&draft.customer_name)
        .bind(&draft.vat_id)
        .bind(&draft.address)
        .bind(number.sequence)
        .bind(number.year)
        .bind(number.to_string())
        .bind(draft.creation_date)
        .bind(draft.pay_start)
        .bind(draft.pay_end)
        .bind(draft.sum)
        .bind(draft.tax_rate)
        .bind(draft.total)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create bill"))?;

        for item in &draft.items {
            let line = sqlx::query_as::<_, LineItem>(&format!(
                r#"
                INSERT INTO bill_items (bill_id, position, description, quantity, unit,
                    unit_price, line_sum)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {}
                "#,
                LINE_ITEM_COLUMNS
            ))
            .bind(bill.id)
            .bind(item.position)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(&item.unit)
            .bind(item.unit_price)
            .bind(item.line_sum)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("create bill item"))?;
            bill.items.push(line);
        }

        tx.commit().await.map_err(db_error("commit transaction"))?;

        info!(bill_id = bill.id, number = %bill.number, "Bill created");
        Ok(bill)
    }

    #[instrument(skip(self, path))]
    async fn set_bill_document(&self, id: i64, path: Option<String>) -> Result<Bill, AppError> {
        let _timer = timer("set_bill_document");
        sqlx::query("UPDATE bills SET document_path = $2 WHERE id = $1")
            .bind(id)
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(db_error("update bill document"))
            .and_then(|result| ensure_affected(result, "Bill", id))?;
        self.get_bill(id).await
    }

    #[instrument(skip(self))]
    async fn delete_bill(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_bill");
        self.delete_by_id("bills", "Bill", id).await
    }

    // -------------------------------------------------------------------------
    // Credit notes
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_credit_notes(&self, own_firm_id: i64) -> Result<Vec<CreditNote>, AppError> {
        let _timer = timer("list_credit_notes");
        sqlx::query_as::<_, CreditNote>(&format!(
            "SELECT {} FROM credit_notes WHERE own_firm_id = $1",
            CREDIT_NOTE_COLUMNS
        ))
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list credit notes"))
    }

    #[instrument(skip(self))]
    async fn get_credit_note(&self, id: i64) -> Result<CreditNote, AppError> {
        let _timer = timer("get_credit_note");
        sqlx::query_as::<_, CreditNote>(&format!(
            "SELECT {} FROM credit_notes WHERE id = $1",
            CREDIT_NOTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get credit note"))?
        .ok_or_else(|| not_found("Credit note", id))
    }

    #[instrument(skip(self, draft), fields(own_firm_id = draft.own_firm_id))]
    async fn create_credit_note(&self, draft: CreditNoteDraft) -> Result<CreditNote, AppError> {
        let _timer = timer("create_credit_note");
        let note = sqlx::query_as::<_, CreditNote>(&format!(
            r#"
            INSERT INTO credit_notes (own_firm_id, customer_id, customer_name, document_nr,
                advice_nr, gross_amount, tax_rate, open_amount, paid_amount, completed,
                completed_date, creation_date, period_start, period_end)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            CREDIT_NOTE_COLUMNS
        ))
        .bind(draft.own_firm_id)
        .bind(draft.customer_id)
        .bind(&draft.customer_name)
        .bind(&draft.document_nr)
        .bind(&draft.advice_nr)
        .bind(draft.balance.gross_amount)
        .bind(draft.balance.tax_rate)
        .bind(draft.balance.open_amount)
        .bind(draft.balance.paid_amount)
        .bind(draft.balance.completed)
        .bind(draft.balance.completed_date)
        .bind(draft.creation_date)
        .bind(draft.period_start)
        .bind(draft.period_end)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_error(DUPLICATE_DOCUMENT_NR, "create credit note"))?;

        info!(credit_note_id = note.id, "Credit note created");
        Ok(note)
    }

    #[instrument(skip(self, patch, customer_name))]
    async fn update_credit_note(
        &self,
        id: i64,
        patch: CreditNotePatch,
        customer_name: Option<String>,
        today: NaiveDate,
    ) -> Result<(CreditNote, ChangeSet), AppError> {
        let _timer = timer("update_credit_note");
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let mut note = lock_credit_note(&mut *tx, id).await?;
        let changes = note.apply_update(patch, customer_name, today)?;

        sqlx::query(
            r#"
            UPDATE credit_notes
            SET customer_id = $2, customer_name = $3, document_nr = $4, advice_nr = $5,
                creation_date = $6, period_start = $7, period_end = $8
            WHERE id = $1
            "#,
        )
        .bind(note.id)
        .bind(note.customer_id)
        .bind(&note.customer_name)
        .bind(&note.document_nr)
        .bind(&note.advice_nr)
        .bind(note.creation_date)
        .bind(note.period_start)
        .bind(note.period_end)
        .execute(&mut *tx)
        .await
        .map_err(unique_error(DUPLICATE_DOCUMENT_NR, "update credit note"))?;
        write_balance(&mut *tx, &note).await?;

        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok((note, changes))
    }

    #[instrument(skip(self, path))]
    async fn set_credit_note_document(
        &self,
        id: i64,
        path: Option<String>,
    ) -> Result<CreditNote, AppError> {
        let _timer = timer("set_credit_note_document");
        sqlx::query_as::<_, CreditNote>(&format!(
            "UPDATE credit_notes SET document_path = $2 WHERE id = $1 RETURNING {}",
            CREDIT_NOTE_COLUMNS
        ))
        .bind(id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update credit note document"))?
        .ok_or_else(|| not_found("Credit note", id))
    }

    #[instrument(skip(self))]
    async fn delete_credit_note(&self, id: i64) -> Result<(), AppError> {
        let _timer = timer("delete_credit_note");
        self.delete_by_id("credit_notes", "Credit note", id).await
    }

    // -------------------------------------------------------------------------
    // Credit-note payments
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_payments(&self, credit_note_id: i64) -> Result<Vec<CreditNotePayment>, AppError> {
        let _timer = timer("list_payments");
        sqlx::query_as::<_, CreditNotePayment>(&format!(
            "SELECT {} FROM credit_note_payments WHERE credit_note_id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(credit_note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list payments"))
    }

    #[instrument(skip(self))]
    async fn list_firm_payments(&self, own_firm_id: i64) -> Result<Vec<CreditNotePayment>, AppError> {
        let _timer = timer("list_firm_payments");
        sqlx::query_as::<_, CreditNotePayment>(
            r#"
            SELECT p.id, p.credit_note_id, p.amount, p.date, p.created_utc
            FROM credit_note_payments p JOIN credit_notes n ON n.id = p.credit_note_id
            WHERE n.own_firm_id = $1
            ORDER BY p.date, p.id
            "#,
        )
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list firm payments"))
    }

    #[instrument(skip(self))]
    async fn get_payment(&self, id: i64) -> Result<CreditNotePayment, AppError> {
        let _timer = timer("get_payment");
        sqlx::query_as::<_, CreditNotePayment>(&format!(
            "SELECT {} FROM credit_note_payments WHERE id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get payment"))?
        .ok_or_else(|| not_found("Payment", id))
    }

    #[instrument(skip(self, input), fields(amount = %input.amount))]
    async fn post_payment(
        &self,
        credit_note_id: i64,
        input: &NewPayment,
        today: NaiveDate,
    ) -> Result<(CreditNote, CreditNotePayment), AppError> {
        let _timer = timer("post_payment");
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let mut note = lock_credit_note(&mut *tx, credit_note_id).await?;
        note.balance.post_payment(input.amount, today)?;
        let payment = sqlx::query_as::<_, CreditNotePayment>(&format!(
            r#"
            INSERT INTO credit_note_payments (credit_note_id, amount, date)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(credit_note_id)
        .bind(input.amount)
        .bind(input.date)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("record payment"))?;

        write_balance(&mut *tx, &note).await?;

        tx.commit().await.map_err(db_error("commit transaction"))?;
        info!(credit_note_id, payment_id = payment.id, "Payment posted");
        Ok((note, payment))
    }

    #[instrument(skip(self))]
    async fn delete_payment(
        &self,
        id: i64,
        today: NaiveDate,
    ) -> Result<(CreditNote, CreditNotePayment), AppError> {
        let _timer = timer("delete_payment");
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let credit_note_id = sqlx::query_scalar::<_, i64>(
            "SELECT credit_note_id FROM credit_note_payments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("get payment"))?
        .ok_or_else(|| not_found("Payment", id))?;

        let mut note = lock_credit_note(&mut *tx, credit_note_id).await?;
        let payment = sqlx::query_as::<_, CreditNotePayment>(&format!(
            "DELETE FROM credit_note_payments WHERE id = $1 RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("delete payment"))?
        .ok_or_else(|| not_found("Payment", id))?;

        note.balance.reverse_payment(payment.amount, today)?;
        write_balance(&mut *tx, &note).await?;

        tx.commit().await.map_err(db_error("commit transaction"))?;
        info!(credit_note_id, payment_id = id, "Payment reversed");
        Ok((note, payment))
    }

    // -------------------------------------------------------------------------
    // Audit log
    // -------------------------------------------------------------------------

    #[instrument(skip(self, entry), fields(own_firm_id = ?entry.own_firm_id))]
    async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, AppError> {
        let _timer = timer("append_audit");
        sqlx::query_as::<_, AuditEntry>(&format!(
            r#"
            INSERT INTO audit_entries (admin_id, admin_name, own_firm_id, summary, changes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            AUDIT_COLUMNS
        ))
        .bind(entry.admin_id)
        .bind(&entry.admin_name)
        .bind(entry.own_firm_id)
        .bind(&entry.summary)
        .bind(entry.changes.map(Json))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("append audit entry"))
    }

    #[instrument(skip(self))]
    async fn list_audit(&self, own_firm_id: Option<i64>) -> Result<Vec<AuditEntry>, AppError> {
        let _timer = timer("list_audit");
        sqlx::query_as::<_, AuditEntry>(&format!(
            "SELECT {} FROM audit_entries WHERE ($1::BIGINT IS NULL OR own_firm_id = $1)",
            AUDIT_COLUMNS
        ))
        .bind(own_firm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list audit entries"))
    }
}
