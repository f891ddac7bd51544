use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const PUBLIC_PREFIX: &str = "/uploads";

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Product images on local disk, referenced from the database as `/uploads/<file>`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist an uploaded image and return its public reference.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(AppError::Validation("image is empty".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(AppError::Validation(format!(
                "image exceeds {} bytes",
                self.max_bytes
            )));
        }
        let ext = image_extension(original_name)?;
        let file_name = format!("{}.{}", Uuid::new_v4().simple(), ext);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        tokio::fs::write(self.root.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(format!("{PUBLIC_PREFIX}/{file_name}"))
    }

    /// Remove the file behind a stored reference. References that do not point into
    /// the upload directory are ignored.
    pub async fn remove(&self, reference: &str) -> std::io::Result<()> {
        let Some(file_name) = file_name_from_reference(reference) else {
            return Ok(());
        };
        match tokio::fs::remove_file(self.root.join(file_name)).await {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Best-effort removal; a failure is logged and otherwise ignored.
    pub async fn discard(&self, reference: Option<&str>) {
        let Some(reference) = reference else {
            return;
        };
        if let Err(err) = self.remove(reference).await {
            tracing::warn!(error = %err, reference, "image delete failed");
        }
    }
}

fn image_extension(original_name: &str) -> AppResult<String> {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| AppError::Validation("image must have a file extension".into()))?;
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(AppError::Validation(format!(
            "unsupported image type `{ext}`"
        )))
    }
}

fn file_name_from_reference(reference: &str) -> Option<&str> {
    let name = reference
        .strip_prefix(PUBLIC_PREFIX)?
        .strip_prefix('/')?;
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> ImageStore {
        let dir = std::env::temp_dir().join(format!("image-store-{}", Uuid::new_v4()));
        ImageStore::new(dir, 1024)
    }

    #[test]
    fn only_image_extensions_are_accepted() {
        assert_eq!(image_extension("box.PNG").unwrap(), "png");
        assert_eq!(image_extension("tape.jpeg").unwrap(), "jpeg");
        assert!(image_extension("script.sh").is_err());
        assert!(image_extension("noext").is_err());
    }

    #[test]
    fn references_outside_uploads_are_rejected() {
        assert_eq!(file_name_from_reference("/uploads/a.png"), Some("a.png"));
        assert_eq!(file_name_from_reference("/uploads/../etc/passwd"), None);
        assert_eq!(file_name_from_reference("https://cdn.example.com/a.png"), None);
        assert_eq!(file_name_from_reference("/uploads/"), None);
    }

    #[tokio::test]
    async fn save_then_remove_round_trip() {
        let store = temp_store();
        let reference = store.save("mailer.png", b"\x89PNG").await.unwrap();
        assert!(reference.starts_with("/uploads/"));

        let name = file_name_from_reference(&reference).unwrap();
        assert!(store.root().join(name).exists());

        store.remove(&reference).await.unwrap();
        assert!(!store.root().join(name).exists());
        // removing twice is fine
        store.remove(&reference).await.unwrap();
    }

    #[tokio::test]
    async fn oversized_and_empty_uploads_fail() {
        let store = temp_store();
        assert!(store.save("big.png", &[0u8; 2048]).await.is_err());
        assert!(store.save("empty.png", &[]).await.is_err());
    }
}
