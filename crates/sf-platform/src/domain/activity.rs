//! Activity Entity
//!
//! Append-only record of user-initiated actions, shown on the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Activity action type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// Tenant and first admin registered
    Register,
    /// Successful login
    Login,
    /// Session logout
    Logout,
    /// All sessions revoked
    LogoutAll,
    /// Entity created
    Create,
    /// Entity updated
    Update,
    /// Entity deleted
    Delete,
    /// Template assigned to a user
    Assign,
    /// Template assignment removed
    Unassign,
    /// Asset uploaded
    Upload,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::LogoutAll => "logout_all",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Assign => "assign",
            Self::Unassign => "unassign",
            Self::Upload => "upload",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "register" => Some(Self::Register),
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            "logout_all" => Some(Self::LogoutAll),
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "assign" => Some(Self::Assign),
            "unassign" => Some(Self::Unassign),
            "upload" => Some(Self::Upload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Activity {
    pub id: String,
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub action: ActivityAction,
    /// Entity type affected (e.g., "Template", "Asset", "User")
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        tenant_id: impl Into<String>,
        action: ActivityAction,
        entity_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: super::new_id(),
            tenant_id: tenant_id.into(),
            user_id: None,
            action,
            entity_type: entity_type.into(),
            entity_id: None,
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn by_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Activity row joined with the acting user's display name
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub activity: Activity,
    pub user_name: Option<String>,
}
