//! Asset Entity
//!
//! An uploaded image referenced from signature templates.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct Asset {
    pub id: String,
    pub tenant_id: String,
    /// Original client-supplied filename, display only
    pub filename: String,
    /// Sniffed from content, never taken from the client
    pub mime_type: String,
    pub size: i64,
    /// Public path, `/uploads/<stored_name>`
    pub url: String,
    /// Generated on-disk name
    pub stored_name: String,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn new(
        tenant_id: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        size: i64,
        stored_name: impl Into<String>,
        uploaded_by: impl Into<String>,
    ) -> Self {
        let stored_name = stored_name.into();
        Self {
            id: super::new_id(),
            tenant_id: tenant_id.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            size,
            url: format!("/uploads/{}", stored_name),
            stored_name,
            uploaded_by: Some(uploaded_by.into()),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_url() {
        let asset = Asset::new("t1", "logo.png", "image/png", 42, "abc.png", "u1");
        assert_eq!(asset.url, "/uploads/abc.png");
        assert_eq!(asset.uploaded_by.as_deref(), Some("u1"));
    }
}
