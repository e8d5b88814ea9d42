//! Application startup and lifecycle management.

use crate::config::{FleetConfig, StoreBackend};
use crate::handlers::{
    admins, audit_log, auth, bills, contacts, credit_notes, customers, dashboard, debts,
    documents, fuel_cards, health, meetings, offdays, own_firms, tags, tours, trucks, workers,
    worktimes, UPLOAD_BODY_LIMIT,
};
use crate::models::NewAdmin;
use crate::services::metrics::metrics_middleware;
use crate::services::password::hash_password;
use crate::services::{init_metrics, FileStorage, LocalFileStorage, MemoryStore, PgStore, Store};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FleetConfig>,
    pub store: Arc<dyn Store>,
    pub files: Arc<dyn FileStorage>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: FleetConfig) -> Result<Self, AppError> {
        init_metrics();

        let store: Arc<dyn Store> = match (config.store, &config.database) {
            (StoreBackend::Postgres, Some(database)) => {
                let pg = PgStore::new(
                    &database.url,
                    database.max_connections,
                    database.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;
                pg.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;
                Arc::new(pg)
            }
            (StoreBackend::Postgres, None) => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Postgres store selected without database settings"
                )));
            }
            (StoreBackend::Memory, _) => {
                tracing::warn!("Using the in-memory store; data is lost on shutdown");
                Arc::new(MemoryStore::new())
            }
        };

        let files: Arc<dyn FileStorage> =
            Arc::new(LocalFileStorage::new(config.storage.local_path.clone()).await?);

        bootstrap_superuser(store.as_ref(), &config).await?;

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Fleet service listener bound");

        Ok(Self {
            port,
            listener,
            state: AppState {
                config: Arc::new(config),
                store,
                files,
            },
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = router(self.state);

        tracing::info!(
            service = "fleet-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

/// Creates the configured superuser while no admin exists yet.
async fn bootstrap_superuser(store: &dyn Store, config: &FleetConfig) -> Result<(), AppError> {
    let Some(bootstrap) = &config.bootstrap_admin else {
        return Ok(());
    };
    if store.count_admins().await? > 0 {
        return Ok(());
    }

    let password_hash = hash_password(&bootstrap.password).map_err(AppError::InternalError)?;
    let admin = store
        .create_admin(NewAdmin {
            username: bootstrap.username.clone(),
            name: bootstrap.username.clone(),
            password_hash,
            token: Uuid::new_v4(),
            is_superuser: true,
            own_firm_ids: Vec::new(),
        })
        .await?;

    tracing::info!(admin_id = admin.id, username = %admin.username, "Bootstrap superuser created");
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_handler))
        .route("/login", post(auth::login))
        .route(
            "/own-firms",
            get(own_firms::list_own_firms).post(own_firms::create_own_firm),
        )
        .route(
            "/own-firms/:id",
            patch(own_firms::update_own_firm).delete(own_firms::delete_own_firm),
        )
        .route(
            "/own-firms/:id/logo",
            get(own_firms::download_logo)
                .put(own_firms::upload_logo)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/dashboard", get(dashboard::dashboard))
        .route("/admins", get(admins::list_admins).post(admins::create_admin))
        .route(
            "/admins/:id",
            get(admins::get_admin)
                .patch(admins::update_admin)
                .delete(admins::delete_admin),
        )
        .route(
            "/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route(
            "/customers/:id",
            patch(customers::update_customer).delete(customers::delete_customer),
        )
        .route("/workers", get(workers::list_workers).post(workers::create_worker))
        .route("/workers/roster", get(workers::export_roster))
        .route(
            "/workers/:id",
            get(workers::get_worker)
                .patch(workers::update_worker)
                .delete(workers::delete_worker),
        )
        .route(
            "/workers/:id/documents",
            get(documents::list_worker_documents).post(documents::create_worker_document),
        )
        .route(
            "/workers/:id/debts",
            get(debts::list_debts).post(debts::create_debt),
        )
        .route(
            "/workers/:id/worktimes",
            get(worktimes::list_worktimes).post(worktimes::put_worktime),
        )
        .route("/workers/:id/daily-expense", put(worktimes::change_daily_expense))
        .route(
            "/workers/:id/offdays",
            post(offdays::plan_offdays).delete(offdays::remove_offdays),
        )
        .route("/debts/:id", patch(debts::update_debt).delete(debts::delete_debt))
        .route("/worktimes/:id", delete(worktimes::delete_worktime))
        .route("/daily-expenses", get(worktimes::list_daily_expenses))
        .route("/offdays", get(offdays::offday_calendar))
        .route("/holiday-accounts", get(offdays::holiday_overview))
        .route("/trucks", get(trucks::list_trucks).post(trucks::create_truck))
        .route(
            "/trucks/:id",
            get(trucks::get_truck)
                .patch(trucks::update_truck)
                .delete(trucks::delete_truck),
        )
        .route("/trucks/:id/payment", patch(trucks::update_truck_payment))
        .route(
            "/trucks/:id/documents",
            get(documents::list_truck_documents).post(documents::create_truck_document),
        )
        .route("/documents", get(documents::list_firm_documents))
        .route(
            "/documents/:id",
            patch(documents::update_document).delete(documents::delete_document),
        )
        .route(
            "/documents/:id/file",
            get(documents::download_document_file)
                .put(documents::upload_document_file)
                .delete(documents::delete_document_file)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/tours", get(tours::list_tours).post(tours::create_tour))
        .route(
            "/tours/:id",
            get(tours::get_tour)
                .patch(tours::update_tour)
                .delete(tours::delete_tour),
        )
        .route(
            "/tours/:id/days",
            post(tours::add_tour_days).delete(tours::remove_tour_days),
        )
        .route(
            "/fuel-cards",
            get(fuel_cards::list_fuel_cards).post(fuel_cards::create_fuel_card),
        )
        .route(
            "/fuel-cards/:id",
            get(fuel_cards::get_fuel_card)
                .patch(fuel_cards::update_fuel_card)
                .delete(fuel_cards::delete_fuel_card),
        )
        .route(
            "/fuel-cards/:id/handovers",
            post(fuel_cards::hand_over_fuel_card),
        )
        .route(
            "/contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route(
            "/contacts/:id",
            patch(contacts::update_contact).delete(contacts::delete_contact),
        )
        .route(
            "/contacts/:id/meetings",
            get(meetings::list_meetings).post(meetings::create_meeting),
        )
        .route(
            "/meetings/:id",
            patch(meetings::update_meeting).delete(meetings::delete_meeting),
        )
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/:id", patch(tags::update_tag).delete(tags::delete_tag))
        .route("/bills", get(bills::list_bills).post(bills::create_bill))
        .route("/bills/:id", get(bills::get_bill).delete(bills::delete_bill))
        .route(
            "/bills/:id/document",
            get(bills::download_bill_document)
                .put(bills::upload_bill_document)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/credit-notes",
            get(credit_notes::list_credit_notes).post(credit_notes::create_credit_note),
        )
        .route(
            "/credit-notes/:id",
            get(credit_notes::get_credit_note)
                .patch(credit_notes::update_credit_note)
                .delete(credit_notes::delete_credit_note),
        )
        .route(
            "/credit-notes/:id/document",
            get(credit_notes::download_credit_note_document)
                .put(credit_notes::upload_credit_note_document)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/credit-notes/:id/payments",
            get(credit_notes::list_payments).post(credit_notes::post_payment),
        )
        .route("/credit-note-payments/:id", delete(credit_notes::delete_payment))
        .route("/audit-log", get(audit_log::list_audit_entries))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
