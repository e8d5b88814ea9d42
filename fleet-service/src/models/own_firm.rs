//! Owning organization (tenant) on whose behalf everything else is managed.

use crate::audit::{ChangeSet, Patch};
use crate::query::Identified;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const DUPLICATE_OWN_FIRM: &str = "Es existiert bereits eine Firma mit diesem Namen.";

pub const FIRM_LOGOS: &str = "Logos";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OwnFirm {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub mail: String,
    pub chairman: String,
    pub company_place: String,
    pub register_court: String,
    pub tax_nr: String,
    pub vat_id: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_fax: String,
    pub bank_name: String,
    pub iban: String,
    pub bic: String,
    /// Storage key of the uploaded letterhead logo.
    pub logo_path: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Identified for OwnFirm {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct NewOwnFirm {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub address: String,
    pub phone: String,
    pub mail: String,
    pub chairman: String,
    pub company_place: String,
    pub register_court: String,
    pub tax_nr: String,
    pub vat_id: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_fax: String,
    pub bank_name: String,
    pub iban: String,
    pub bic: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct OwnFirmPatch {
    pub name: Patch<String>,
    pub address: Patch<String>,
    pub phone: Patch<String>,
    pub mail: Patch<String>,
    pub chairman: Patch<String>,
    pub company_place: Patch<String>,
    pub register_court: Patch<String>,
    pub tax_nr: Patch<String>,
    pub vat_id: Patch<String>,
    pub contact_name: Patch<String>,
    pub contact_phone: Patch<String>,
    pub contact_fax: Patch<String>,
    pub bank_name: Patch<String>,
    pub iban: Patch<String>,
    pub bic: Patch<String>,
}

impl OwnFirm {
    pub fn apply_update(&mut self, patch: OwnFirmPatch) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.apply("name", "Name", &mut self.name, patch.name);
        changes.apply("address", "Adresse", &mut self.address, patch.address);
        changes.apply("phone", "Telefonnummer", &mut self.phone, patch.phone);
        changes.apply("mail", "E-Mail", &mut self.mail, patch.mail);
        changes.apply("chairman", "Geschäftsführer", &mut self.chairman, patch.chairman);
        changes.apply("company_place", "Sitz", &mut self.company_place, patch.company_place);
        changes.apply("register_court", "Registergericht", &mut self.register_court, patch.register_court);
        changes.apply("tax_nr", "Steuernummer", &mut self.tax_nr, patch.tax_nr);
        changes.apply("vat_id", "USt-IdNr.", &mut self.vat_id, patch.vat_id);
        changes.apply("contact_name", "Ansprechpartner", &mut self.contact_name, patch.contact_name);
        changes.apply("contact_phone", "Telefon Ansprechpartner", &mut self.contact_phone, patch.contact_phone);
        changes.apply("contact_fax", "Fax", &mut self.contact_fax, patch.contact_fax);
        changes.apply("bank_name", "Bank", &mut self.bank_name, patch.bank_name);
        changes.apply("iban", "IBAN", &mut self.iban, patch.iban);
        changes.apply("bic", "BIC", &mut self.bic, patch.bic);
        changes
    }
}
