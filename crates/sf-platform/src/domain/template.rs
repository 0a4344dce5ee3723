//! Signature Template Entities

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct SignatureTemplate {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub html_content: String,
    /// At most one template per tenant is the default
    pub is_default: bool,
    /// Creating user; cleared when that user is removed
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SignatureTemplate {
    pub fn new(
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        html_content: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            html_content: html_content.into(),
            is_default: false,
            created_by: Some(created_by.into()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Assignment of a template to a user, unique per (user, template)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAssignment {
    pub user_id: String,
    pub template_id: String,
    pub assigned_at: DateTime<Utc>,
}

impl TemplateAssignment {
    pub fn new(user_id: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            template_id: template_id.into(),
            assigned_at: Utc::now(),
        }
    }
}
