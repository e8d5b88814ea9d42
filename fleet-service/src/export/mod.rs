//! Invoice PDF and worker roster spreadsheet rendering.

pub mod invoice_pdf;
pub mod roster;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use service_core::error::AppError;
use thiserror::Error;

pub use invoice_pdf::render_invoice;
pub use roster::render_roster;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("Spreadsheet rendering failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// A rendered document and the file name it is offered under.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// `{name, file}` response body with the document base64 encoded.
#[derive(Debug, Clone, Serialize)]
pub struct ExportPayload {
    pub name: String,
    pub file: String,
}

impl From<&ExportFile> for ExportPayload {
    fn from(export: &ExportFile) -> Self {
        Self {
            name: export.name.clone(),
            file: STANDARD.encode(&export.bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_base64() {
        let export = ExportFile {
            name: "a.pdf".into(),
            bytes: b"%PDF".to_vec(),
        };
        let payload = ExportPayload::from(&export);
        assert_eq!(payload.name, "a.pdf");
        assert_eq!(payload.file, "JVBERg==");
    }
}
