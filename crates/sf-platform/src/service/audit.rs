//! Activity Service
//!
//! Records user-initiated actions for the dashboard feed. A failed write is
//! logged and never fails the operation that triggered it.

use std::sync::Arc;
use tracing::{error, info};

use crate::domain::{Activity, ActivityAction, ActivityEntry, TenantScope, User};
use crate::error::Result;
use crate::repository::ActivityRepository;
use crate::service::authorization::AuthContext;

/// Most recent entries returned when no limit is given
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 10;
pub const MAX_ACTIVITY_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct ActivityService {
    repo: Arc<ActivityRepository>,
}

impl ActivityService {
    pub fn new(repo: Arc<ActivityRepository>) -> Self {
        Self { repo }
    }

    pub async fn log_create(&self, auth: &AuthContext, entity_type: &str, entity_id: &str, description: impl Into<String>) {
        self.log_entity(auth, ActivityAction::Create, entity_type, entity_id, description).await
    }

    pub async fn log_update(&self, auth: &AuthContext, entity_type: &str, entity_id: &str, description: impl Into<String>) {
        self.log_entity(auth, ActivityAction::Update, entity_type, entity_id, description).await
    }

    pub async fn log_delete(&self, auth: &AuthContext, entity_type: &str, entity_id: &str, description: impl Into<String>) {
        self.log_entity(auth, ActivityAction::Delete, entity_type, entity_id, description).await
    }

    pub async fn log_assign(&self, auth: &AuthContext, template_id: &str, user_email: &str) {
        let desc = format!("Assigned template to {}", user_email);
        self.log_entity(auth, ActivityAction::Assign, "Template", template_id, desc).await
    }

    pub async fn log_unassign(&self, auth: &AuthContext, template_id: &str, user_id: &str) {
        let desc = format!("Removed template assignment for user {}", user_id);
        self.log_entity(auth, ActivityAction::Unassign, "Template", template_id, desc).await
    }

    pub async fn log_upload(&self, auth: &AuthContext, asset_id: &str, filename: &str) {
        let desc = format!("Uploaded '{}'", filename);
        self.log_entity(auth, ActivityAction::Upload, "Asset", asset_id, desc).await
    }

    /// Registration happens before any auth context exists
    pub async fn log_register(&self, scope: &TenantScope, admin: &User, organization: &str) {
        let activity = Activity::new(
            scope.tenant_id(),
            ActivityAction::Register,
            "Tenant",
            format!("Registered organization '{}'", organization),
        )
        .with_entity(scope.tenant_id())
        .by_user(&admin.id);
        self.insert(scope, activity).await
    }

    pub async fn log_login(&self, user: &User) {
        let activity = Activity::new(
            &user.tenant_id,
            ActivityAction::Login,
            "Session",
            format!("{} logged in", user.email),
        )
        .by_user(&user.id);
        self.insert(&TenantScope::new(&user.tenant_id), activity).await
    }

    pub async fn log_logout(&self, auth: &AuthContext) {
        let activity = self.build(auth, ActivityAction::Logout, "Session", format!("{} logged out", auth.email));
        self.insert(&auth.scope(), activity).await
    }

    pub async fn log_logout_all(&self, auth: &AuthContext) {
        let activity = self.build(
            auth,
            ActivityAction::LogoutAll,
            "Session",
            format!("{} signed out of all sessions", auth.email),
        );
        self.insert(&auth.scope(), activity).await
    }

    /// Most recent entries for the tenant; `limit` is clamped to 1..=100.
    pub async fn recent(&self, scope: &TenantScope, limit: Option<i64>) -> Result<Vec<ActivityEntry>> {
        let limit = limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT).clamp(1, MAX_ACTIVITY_LIMIT);
        self.repo.recent(scope, limit).await
    }

    async fn log_entity(
        &self,
        auth: &AuthContext,
        action: ActivityAction,
        entity_type: &str,
        entity_id: &str,
        description: impl Into<String>,
    ) {
        let activity = self.build(auth, action, entity_type, description).with_entity(entity_id);
        self.insert(&auth.scope(), activity).await
    }

    fn build(
        &self,
        auth: &AuthContext,
        action: ActivityAction,
        entity_type: &str,
        description: impl Into<String>,
    ) -> Activity {
        Activity::new(&auth.tenant_id, action, entity_type, description).by_user(&auth.user_id)
    }

    async fn insert(&self, scope: &TenantScope, activity: Activity) {
        info!(
            tenant_id = %activity.tenant_id,
            action = activity.action.as_str(),
            entity_type = %activity.entity_type,
            entity_id = ?activity.entity_id,
            user_id = ?activity.user_id,
            "Activity recorded"
        );

        if let Err(e) = self.repo.insert(scope, &activity).await {
            error!(error = %e, action = activity.action.as_str(), "Failed to record activity");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Tenant, UserRole};
    use crate::repository::{connect, init_schema, TenantRepository};

    #[tokio::test]
    async fn test_recent_limit_is_clamped() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        init_schema(&pool).await.unwrap();
        let tenant = Tenant::new("Acme", "acme.com");
        let admin = User::new(&tenant.id, "a@acme.com", "h", "Ada", "Admin", UserRole::Admin);
        let scope = TenantRepository::new(&pool).insert_with_admin(&tenant, &admin).await.unwrap();

        let service = ActivityService::new(Arc::new(ActivityRepository::new(&pool)));
        let auth = AuthContext::from_user(&admin);
        for i in 0..12 {
            service.log_create(&auth, "Template", &format!("tpl-{}", i), "Created template").await;
        }

        assert_eq!(service.recent(&scope, None).await.unwrap().len(), 10);
        assert_eq!(service.recent(&scope, Some(0)).await.unwrap().len(), 1);
        assert_eq!(service.recent(&scope, Some(500)).await.unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_panic() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        init_schema(&pool).await.unwrap();
        let service = ActivityService::new(Arc::new(ActivityRepository::new(&pool)));

        // No tenant row, so the foreign key rejects the insert
        let user = User::new("missing-tenant", "x@y.com", "h", "X", "Y", UserRole::Member);
        service.log_login(&user).await;

        let scope = TenantScope::new("missing-tenant");
        assert!(service.recent(&scope, None).await.unwrap().is_empty());
    }
}
