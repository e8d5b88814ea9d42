use crate::dtos::{LoginRequest, LoginResponse};
use crate::services::password::verify_password;
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{extract::State, Json};
use service_core::error::AppError;
use tracing::{info, warn};

const INVALID_CREDENTIALS: &str = "Benutzername oder Passwort ist falsch";

/// Exchanges username and password for the admin's access token.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let admin = state
        .store
        .find_admin_by_username(&req.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!(INVALID_CREDENTIALS)))?;

    if verify_password(&req.password, &admin.password_hash).is_err() {
        warn!(username = %req.username, "Rejected login");
        return Err(AppError::Unauthorized(anyhow::anyhow!(INVALID_CREDENTIALS)));
    }

    info!(admin_id = admin.id, "Admin logged in");

    Ok(Json(LoginResponse {
        token: admin.token,
        role: admin.role().to_string(),
        name: admin.name,
    }))
}
