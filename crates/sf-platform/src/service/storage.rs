//! Asset Storage
//!
//! Validates uploaded bytes and writes them to the upload directory under a
//! generated name. The content type is sniffed from the bytes; neither the
//! client filename nor its declared type is consulted.

use std::path::{Path, PathBuf};

use sf_config::UploadConfig;
use tracing::{debug, warn};

use crate::error::{PlatformError, Result};

/// A file written to the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub stored_name: String,
    pub mime_type: &'static str,
    pub size: usize,
}

pub struct AssetStorage {
    dir: PathBuf,
    max_bytes: usize,
    allowed_mime_types: Vec<String>,
}

impl AssetStorage {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_bytes: config.max_bytes,
            allowed_mime_types: config.allowed_mime_types.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Identify the image format from magic bytes
    pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
        match bytes {
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
            [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
            _ => None,
        }
    }

    pub fn extension_for(mime_type: &str) -> Option<&'static str> {
        match mime_type {
            "image/png" => Some("png"),
            "image/jpeg" => Some("jpg"),
            "image/gif" => Some("gif"),
            "image/webp" => Some("webp"),
            _ => None,
        }
    }

    /// Check size and content type, returning the sniffed MIME type.
    pub fn validate(&self, bytes: &[u8]) -> Result<&'static str> {
        if bytes.is_empty() {
            return Err(PlatformError::validation("Uploaded file is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(PlatformError::validation(format!(
                "File exceeds the maximum size of {} bytes",
                self.max_bytes
            )));
        }

        let mime = Self::sniff_mime(bytes)
            .ok_or_else(|| PlatformError::validation("Unsupported file type"))?;
        if !self.allowed_mime_types.iter().any(|m| m == mime) {
            return Err(PlatformError::validation(format!("File type {} is not allowed", mime)));
        }
        Ok(mime)
    }

    pub async fn save(&self, bytes: &[u8]) -> Result<StoredFile> {
        let mime_type = self.validate(bytes)?;
        let ext = Self::extension_for(mime_type)
            .ok_or_else(|| PlatformError::validation("Unsupported file type"))?;
        let stored_name = format!("{}.{}", uuid::Uuid::new_v4(), ext);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&stored_name), bytes).await?;
        debug!(stored_name = %stored_name, size = bytes.len(), "Stored upload");

        Ok(StoredFile {
            stored_name,
            mime_type,
            size: bytes.len(),
        })
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, stored_name: &str) -> Result<()> {
        if stored_name.is_empty() || stored_name.contains(['/', '\\']) || stored_name.starts_with('.') {
            return Err(PlatformError::internal(format!("Refusing to remove '{}'", stored_name)));
        }
        match tokio::fs::remove_file(self.dir.join(stored_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(stored_name = %stored_name, "Stored file already missing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of many files, used when a tenant is deleted
    pub async fn remove_all(&self, stored_names: &[String]) {
        for name in stored_names {
            if let Err(e) = self.remove(name).await {
                warn!(stored_name = %name, error = %e, "Failed to remove stored file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    fn storage(dir: &Path, max_bytes: usize) -> AssetStorage {
        AssetStorage::new(&UploadConfig {
            dir: dir.to_path_buf(),
            max_bytes,
            ..UploadConfig::default()
        })
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(AssetStorage::sniff_mime(PNG), Some("image/png"));
        assert_eq!(AssetStorage::sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(AssetStorage::sniff_mime(b"GIF89a...."), Some("image/gif"));
        assert_eq!(AssetStorage::sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some("image/webp"));
        assert_eq!(AssetStorage::sniff_mime(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"), None);
        assert_eq!(AssetStorage::sniff_mime(b"%PDF-1.7"), None);
    }

    #[test]
    fn test_validate_rejects_oversize_and_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path(), 16);

        assert_eq!(storage.validate(PNG).unwrap(), "image/png");
        assert!(storage.validate(&[]).is_err());
        assert!(storage.validate(b"#!/bin/sh\necho hi").is_err());

        let mut big = PNG.to_vec();
        big.resize(17, 0);
        assert!(matches!(storage.validate(&big), Err(PlatformError::Validation { .. })));
    }

    #[test]
    fn test_allow_list_applies_to_sniffed_type() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AssetStorage::new(&UploadConfig {
            dir: dir.path().to_path_buf(),
            max_bytes: 1024,
            allowed_mime_types: vec!["image/jpeg".to_string()],
        });
        assert!(storage.validate(PNG).is_err());
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir.path().join("nested"), 1024);

        let stored = storage.save(PNG).await.unwrap();
        assert!(stored.stored_name.ends_with(".png"));
        assert_eq!(stored.size, PNG.len());

        let path = storage.dir().join(&stored.stored_name);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), PNG);

        storage.remove(&stored.stored_name).await.unwrap();
        assert!(!path.exists());
        storage.remove(&stored.stored_name).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path(), 1024);
        assert!(storage.remove("../etc/passwd").await.is_err());
        assert!(storage.remove("..").await.is_err());
    }
}
