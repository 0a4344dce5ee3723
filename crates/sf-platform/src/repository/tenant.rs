//! Tenant Repository

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

use super::{from_millis, to_millis};
use crate::domain::{Tenant, TenantPlan, TenantScope, User};
use crate::error::{PlatformError, Result};

pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Create a tenant and its first admin in one transaction.
    ///
    /// Fails with `Duplicate` on a taken domain or email; nothing is written
    /// in that case. The first statement is a write: the transaction must
    /// never hold a read lock it later upgrades.
    pub async fn insert_with_admin(&self, tenant: &Tenant, admin: &User) -> Result<TenantScope> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO tenants (id, name, domain, plan, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.domain)
        .bind(tenant.plan.as_str())
        .bind(to_millis(tenant.created_at))
        .bind(to_millis(tenant.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_to_duplicate(e, "Tenant", "domain", &tenant.domain))?;

        super::user::insert_user(&mut *tx, admin)
            .await
            .map_err(|e| unique_to_duplicate(e, "User", "email", &admin.email))?;

        tx.commit().await?;
        info!(tenant_id = %tenant.id, domain = %tenant.domain, "Tenant registered");
        Ok(TenantScope::new(&tenant.id))
    }

    /// Load the scope's own tenant
    pub async fn get(&self, scope: &TenantScope) -> Result<Tenant> {
        let row = sqlx::query(
            "SELECT id, name, domain, plan, created_at, updated_at FROM tenants WHERE id = ?",
        )
        .bind(scope.tenant_id())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_tenant(&row),
            None => Err(PlatformError::not_found("Tenant", scope.tenant_id())),
        }
    }

    pub async fn update(&self, scope: &TenantScope, tenant: &Tenant) -> Result<()> {
        scope.ensure_owns("Tenant", &tenant.id)?;
        let result = sqlx::query("UPDATE tenants SET name = ?, plan = ?, updated_at = ? WHERE id = ?")
            .bind(&tenant.name)
            .bind(tenant.plan.as_str())
            .bind(to_millis(tenant.updated_at))
            .bind(scope.tenant_id())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("Tenant", scope.tenant_id()));
        }
        Ok(())
    }

    /// Delete the tenant; foreign keys cascade to every child row.
    pub async fn delete(&self, scope: &TenantScope) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = ?")
            .bind(scope.tenant_id())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_tenant(row: &SqliteRow) -> Result<Tenant> {
    let plan: String = row.try_get("plan")?;
    Ok(Tenant {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        domain: row.try_get("domain")?,
        plan: TenantPlan::parse(&plan)
            .ok_or_else(|| PlatformError::internal(format!("Unknown plan: {}", plan)))?,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}

pub(crate) fn unique_to_duplicate(err: sqlx::Error, entity_type: &str, field: &str, value: &str) -> PlatformError {
    if PlatformError::is_unique_violation(&err) {
        PlatformError::duplicate(entity_type, field, value)
    } else {
        PlatformError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::repository::{connect, init_schema};

    async fn pool() -> SqlitePool {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    fn admin_for(tenant: &Tenant, email: &str) -> User {
        User::new(&tenant.id, email, "hash", "Ada", "Admin", UserRole::Admin)
    }

    async fn row_count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_with_admin() {
        let pool = pool().await;
        let repo = TenantRepository::new(&pool);
        let tenant = Tenant::new("Acme", "acme.com");

        let scope = repo.insert_with_admin(&tenant, &admin_for(&tenant, "a@acme.com")).await.unwrap();
        assert_eq!(scope.tenant_id(), tenant.id);

        let loaded = repo.get(&scope).await.unwrap();
        assert_eq!(loaded.domain, "acme.com");
    }

    #[tokio::test]
    async fn test_duplicate_domain_writes_nothing() {
        let pool = pool().await;
        let repo = TenantRepository::new(&pool);
        let first = Tenant::new("Acme", "acme.com");
        repo.insert_with_admin(&first, &admin_for(&first, "a@acme.com")).await.unwrap();

        let second = Tenant::new("Acme Again", "acme.com");
        let err = repo
            .insert_with_admin(&second, &admin_for(&second, "b@acme.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Duplicate { ref field, .. } if field == "domain"));
        assert_eq!(row_count(&pool, "tenants").await, 1);
        assert_eq!(row_count(&pool, "users").await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_writes_nothing() {
        let pool = pool().await;
        let repo = TenantRepository::new(&pool);
        let first = Tenant::new("Acme", "acme.com");
        repo.insert_with_admin(&first, &admin_for(&first, "a@acme.com")).await.unwrap();

        let second = Tenant::new("Globex", "globex.com");
        let err = repo
            .insert_with_admin(&second, &admin_for(&second, "A@acme.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Duplicate { ref field, .. } if field == "email"));
        assert_eq!(row_count(&pool, "tenants").await, 1);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let pool = pool().await;
        let repo = TenantRepository::new(&pool);
        let tenant = Tenant::new("Acme", "acme.com");
        let scope = repo.insert_with_admin(&tenant, &admin_for(&tenant, "a@acme.com")).await.unwrap();

        assert!(repo.delete(&scope).await.unwrap());
        assert_eq!(row_count(&pool, "users").await, 0);
        assert!(matches!(repo.get(&scope).await, Err(PlatformError::NotFound { .. })));
    }
}
