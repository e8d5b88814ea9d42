//! Stored documents (generated invoice PDFs, uploaded credit notes).

use async_trait::async_trait;
use service_core::error::AppError;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `data` under `<category>/<random id>.<extension>` and return the key.
    async fn put(&self, category: &str, extension: &str, data: Vec<u8>) -> Result<String, AppError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

pub struct LocalFileStorage {
    base_path: PathBuf,
}

impl LocalFileStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::BadRequest(anyhow::anyhow!("Invalid document key")));
        }
        Ok(self.base_path.join(relative))
    }
}

/// Lower-cased extension of an uploaded file name, `bin` when absent.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn put(&self, category: &str, extension: &str, data: Vec<u8>) -> Result<String, AppError> {
        let key = format!("{}/{}.{}", category, Uuid::new_v4(), extension);
        let path = self.resolve(&key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        tracing::debug!(key = %key, "Document stored");
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key)?;
        fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(anyhow::anyhow!("Document not found"))
            }
            _ => AppError::from(e),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path()).await.unwrap();

        let key = storage.put("Gutschriften", "pdf", b"%PDF-1.4".to_vec()).await.unwrap();
        assert!(key.starts_with("Gutschriften/"));
        assert!(key.ends_with(".pdf"));
        assert_eq!(storage.get(&key).await.unwrap(), b"%PDF-1.4");

        storage.delete(&key).await.unwrap();
        assert!(matches!(storage.get(&key).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn keys_cannot_escape_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path()).await.unwrap();
        assert!(storage.get("../secret").await.is_err());
        assert!(storage.get("/etc/passwd").await.is_err());
    }

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(extension_of("Gutschrift.PDF"), "pdf");
        assert_eq!(extension_of("scan"), "bin");
        assert_eq!(extension_of("evil.p/df"), "bin");
    }
}
