//! Activity Repository
//!
//! Append-only: there is no update or delete path. Rows disappear only with
//! their tenant.

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::{from_millis, to_millis};
use crate::domain::{display_name, Activity, ActivityAction, ActivityEntry, TenantScope};
use crate::error::{PlatformError, Result};

pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn insert(&self, scope: &TenantScope, activity: &Activity) -> Result<()> {
        scope.ensure_owns("Activity", &activity.tenant_id)?;
        sqlx::query(
            "INSERT INTO activities (id, tenant_id, user_id, action, entity_type, entity_id, description, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&activity.id)
        .bind(&activity.tenant_id)
        .bind(&activity.user_id)
        .bind(activity.action.as_str())
        .bind(&activity.entity_type)
        .bind(&activity.entity_id)
        .bind(&activity.description)
        .bind(to_millis(activity.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent `limit` entries for the tenant, newest first, with the
    /// acting user's display name when the user still exists.
    pub async fn recent(&self, scope: &TenantScope, limit: i64) -> Result<Vec<ActivityEntry>> {
        let rows = sqlx::query(
            "SELECT a.id, a.tenant_id, a.user_id, a.action, a.entity_type, a.entity_id, \
                    a.description, a.created_at, u.email, u.first_name, u.last_name \
             FROM activities a \
             LEFT JOIN users u ON u.id = a.user_id \
             WHERE a.tenant_id = ? \
             ORDER BY a.created_at DESC, a.rowid DESC \
             LIMIT ?",
        )
        .bind(scope.tenant_id())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_entry).collect()
    }
}

fn map_entry(row: &SqliteRow) -> Result<ActivityEntry> {
    let action: String = row.try_get("action")?;
    let email: Option<String> = row.try_get("email")?;
    let user_name = match email {
        Some(email) => {
            let first: String = row.try_get("first_name")?;
            let last: String = row.try_get("last_name")?;
            Some(display_name(&first, &last, &email))
        }
        None => None,
    };

    Ok(ActivityEntry {
        activity: Activity {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            user_id: row.try_get("user_id")?,
            action: ActivityAction::parse(&action)
                .ok_or_else(|| PlatformError::internal(format!("Unknown activity action: {}", action)))?,
            entity_type: row.try_get("entity_type")?,
            entity_id: row.try_get("entity_id")?,
            description: row.try_get("description")?,
            created_at: from_millis(row.try_get("created_at")?)?,
        },
        user_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Tenant, User, UserRole};
    use crate::repository::{connect, init_schema, TenantRepository};

    #[tokio::test]
    async fn test_recent_is_scoped_and_ordered() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        init_schema(&pool).await.unwrap();
        let tenants = TenantRepository::new(&pool);
        let repo = ActivityRepository::new(&pool);

        let acme = Tenant::new("Acme", "acme.com");
        let admin = User::new(&acme.id, "a@acme.com", "h", "Ada", "Admin", UserRole::Admin);
        let acme_scope = tenants.insert_with_admin(&acme, &admin).await.unwrap();
        let globex = Tenant::new("Globex", "globex.com");
        let globex_scope = tenants
            .insert_with_admin(&globex, &User::new(&globex.id, "g@globex.com", "h", "G", "G", UserRole::Admin))
            .await
            .unwrap();

        for i in 0..5 {
            let activity = Activity::new(acme_scope.tenant_id(), ActivityAction::Create, "Template", format!("Created {}", i))
                .by_user(&admin.id);
            repo.insert(&acme_scope, &activity).await.unwrap();
        }
        let system = Activity::new(globex_scope.tenant_id(), ActivityAction::Register, "Tenant", "Registered");
        repo.insert(&globex_scope, &system).await.unwrap();

        let recent = repo.recent(&acme_scope, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].activity.description, "Created 4");
        assert_eq!(recent[0].user_name.as_deref(), Some("Ada Admin"));

        let other = repo.recent(&globex_scope, 10).await.unwrap();
        assert_eq!(other.len(), 1);
        assert!(other[0].user_name.is_none());
    }

    #[tokio::test]
    async fn test_insert_into_foreign_scope_rejected() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        init_schema(&pool).await.unwrap();
        let repo = ActivityRepository::new(&pool);
        let scope = TenantScope::new("tenant-a");

        let activity = Activity::new("tenant-b", ActivityAction::Login, "Session", "login");
        assert!(matches!(
            repo.insert(&scope, &activity).await,
            Err(PlatformError::Forbidden { .. })
        ));
    }
}
