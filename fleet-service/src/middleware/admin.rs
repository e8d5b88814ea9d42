//! Acting administrator resolved from the `X-Admin-Token` header.

use crate::models::{Admin, NewAuditEntry};
use crate::startup::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Debug, Clone)]
pub struct AuthAdmin(pub Admin);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing X-Admin-Token header")))?;

        let token = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid admin token")))?;

        let admin = state
            .store
            .find_admin_by_token(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid admin token")))?;

        tracing::debug!(admin_id = admin.id, "Admin authenticated");

        Ok(AuthAdmin(admin))
    }
}

impl AuthAdmin {
    pub fn id(&self) -> i64 {
        self.0.id
    }

    /// Superusers reach every firm; other admins only their assigned ones.
    pub fn ensure_access(&self, own_firm_id: i64) -> Result<(), AppError> {
        if self.0.can_access(own_firm_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Kein Zugriff auf die Firma {}",
                own_firm_id
            )))
        }
    }

    pub fn ensure_superuser(&self) -> Result<(), AppError> {
        if self.0.is_superuser {
            Ok(())
        } else {
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Nur Superuser dürfen diese Aktion ausführen"
            )))
        }
    }

    /// Stamps an audit entry with this admin and the firm it concerns.
    pub fn stamp(&self, own_firm_id: Option<i64>, entry: NewAuditEntry) -> NewAuditEntry {
        NewAuditEntry {
            admin_id: Some(self.0.id),
            admin_name: self.0.name.clone(),
            own_firm_id,
            ..entry
        }
    }
}
