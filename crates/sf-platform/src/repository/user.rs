//! User Repository

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, Sqlite, SqlitePool};

use super::{from_millis, from_millis_opt, to_millis};
use super::tenant::unique_to_duplicate;
use crate::domain::{normalize_email, TenantScope, User, UserRole};
use crate::error::{PlatformError, Result};

const USER_COLUMNS: &str = "id, tenant_id, email, password_hash, first_name, last_name, role, \
     token_version, last_login_at, created_at, updated_at";

pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn insert(&self, scope: &TenantScope, user: &User) -> Result<()> {
        scope.ensure_owns("User", &user.tenant_id)?;
        insert_user(&self.pool, user)
            .await
            .map_err(|e| unique_to_duplicate(e, "User", "email", &user.email))?;
        Ok(())
    }

    /// Credential lookup by globally unique email.
    ///
    /// Only the login path uses this; it runs before any tenant is known.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_user).transpose()
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Fetch a user by id; `NotFound` when missing, `Forbidden` when it
    /// belongs to another tenant.
    pub async fn get(&self, scope: &TenantScope, id: &str) -> Result<User> {
        let user = self.find_by_id_any_tenant(id).await?
            .ok_or_else(|| PlatformError::not_found("User", id))?;
        scope.ensure_owns("User", &user.tenant_id)?;
        Ok(user)
    }

    pub async fn find(&self, scope: &TenantScope, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = ? AND tenant_id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(scope.tenant_id())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_user).transpose()
    }

    pub async fn list(&self, scope: &TenantScope) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE tenant_id = ? ORDER BY created_at ASC",
            USER_COLUMNS
        ))
        .bind(scope.tenant_id())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_user).collect()
    }

    pub async fn count(&self, scope: &TenantScope) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE tenant_id = ?")
            .bind(scope.tenant_id())
            .fetch_one(&self.pool)
            .await?)
    }

    /// Change a user's role in one guarded statement.
    ///
    /// Returns `false` when the change would leave the tenant without an
    /// admin; the admin count is read inside the same `UPDATE`.
    pub async fn update_role(&self, scope: &TenantScope, id: &str, role: UserRole) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET role = ?, updated_at = ? WHERE id = ? AND tenant_id = ? \
             AND (role <> 'admin' OR ? = 'admin' \
                  OR (SELECT COUNT(*) FROM users WHERE tenant_id = ? AND role = 'admin') > 1)",
        )
        .bind(role.as_str())
        .bind(to_millis(Utc::now()))
        .bind(id)
        .bind(scope.tenant_id())
        .bind(role.as_str())
        .bind(scope.tenant_id())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        match self.find(scope, id).await? {
            Some(_) => Ok(false),
            None => Err(PlatformError::not_found("User", id)),
        }
    }

    pub async fn record_login(&self, scope: &TenantScope, id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ? AND tenant_id = ?")
            .bind(to_millis(at))
            .bind(id)
            .bind(scope.tenant_id())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Bump the token version, returning the new value.
    pub async fn increment_token_version(&self, scope: &TenantScope, id: &str) -> Result<i64> {
        let version: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET token_version = token_version + 1, updated_at = ? \
             WHERE id = ? AND tenant_id = ? RETURNING token_version",
        )
        .bind(to_millis(Utc::now()))
        .bind(id)
        .bind(scope.tenant_id())
        .fetch_optional(&self.pool)
        .await?;
        version.ok_or_else(|| PlatformError::not_found("User", id))
    }

    /// Delete a user unless it is the tenant's last admin.
    pub async fn delete(&self, scope: &TenantScope, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM users WHERE id = ? AND tenant_id = ? \
             AND (role <> 'admin' \
                  OR (SELECT COUNT(*) FROM users WHERE tenant_id = ? AND role = 'admin') > 1)",
        )
        .bind(id)
        .bind(scope.tenant_id())
        .bind(scope.tenant_id())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id_any_tenant(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_user).transpose()
    }
}

pub(crate) async fn insert_user<'e, E>(executor: E, user: &User) -> std::result::Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(&format!(
        "INSERT INTO users ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        USER_COLUMNS
    ))
    .bind(&user.id)
    .bind(&user.tenant_id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role.as_str())
    .bind(user.token_version)
    .bind(user.last_login_at.map(to_millis))
    .bind(to_millis(user.created_at))
    .bind(to_millis(user.updated_at))
    .execute(executor)
    .await?;
    Ok(())
}

fn map_user(row: &SqliteRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        role: UserRole::parse(&role)
            .ok_or_else(|| PlatformError::internal(format!("Unknown role: {}", role)))?,
        token_version: row.try_get("token_version")?,
        last_login_at: from_millis_opt(row.try_get("last_login_at")?)?,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tenant;
    use crate::repository::{connect, init_schema, TenantRepository};

    async fn setup() -> (UserRepository, TenantScope, TenantScope) {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        init_schema(&pool).await.unwrap();
        let tenants = TenantRepository::new(&pool);

        let acme = Tenant::new("Acme", "acme.com");
        let acme_scope = tenants
            .insert_with_admin(&acme, &User::new(&acme.id, "a@acme.com", "h", "A", "A", UserRole::Admin))
            .await
            .unwrap();
        let globex = Tenant::new("Globex", "globex.com");
        let globex_scope = tenants
            .insert_with_admin(&globex, &User::new(&globex.id, "g@globex.com", "h", "G", "G", UserRole::Admin))
            .await
            .unwrap();

        (UserRepository::new(&pool), acme_scope, globex_scope)
    }

    #[tokio::test]
    async fn test_insert_and_list_scoped() {
        let (repo, acme, globex) = setup().await;
        let member = User::new(acme.tenant_id(), "m@acme.com", "h", "M", "M", UserRole::Member);
        repo.insert(&acme, &member).await.unwrap();

        assert_eq!(repo.list(&acme).await.unwrap().len(), 2);
        assert_eq!(repo.list(&globex).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sole_admin_cannot_be_demoted() {
        let (repo, acme, globex) = setup().await;
        let admin = repo.find_by_email("a@acme.com").await.unwrap().unwrap();

        assert!(!repo.update_role(&acme, &admin.id, UserRole::Member).await.unwrap());
        assert_eq!(repo.get(&acme, &admin.id).await.unwrap().role, UserRole::Admin);

        let second = User::new(acme.tenant_id(), "b@acme.com", "h", "B", "B", UserRole::Member);
        repo.insert(&acme, &second).await.unwrap();
        assert!(repo.update_role(&acme, &second.id, UserRole::Admin).await.unwrap());
        assert!(repo.update_role(&acme, &admin.id, UserRole::Member).await.unwrap());
        // The promoted member is now the only admin
        assert!(!repo.update_role(&acme, &second.id, UserRole::Member).await.unwrap());

        let err = repo.update_role(&globex, &admin.id, UserRole::Admin).await.unwrap_err();
        assert!(matches!(err, PlatformError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_deleted() {
        let (repo, acme, _) = setup().await;
        let admin = repo.find_by_email("a@acme.com").await.unwrap().unwrap();
        let other = User::new(acme.tenant_id(), "o@acme.com", "h", "O", "O", UserRole::Admin);
        repo.insert(&acme, &other).await.unwrap();

        assert!(repo.delete(&acme, &other.id).await.unwrap());
        assert!(!repo.delete(&acme, &admin.id).await.unwrap());
        assert!(repo.find(&acme, &admin.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_into_foreign_scope_rejected() {
        let (repo, acme, globex) = setup().await;
        let user = User::new(globex.tenant_id(), "x@globex.com", "h", "X", "X", UserRole::Member);
        let err = repo.insert(&acme, &user).await.unwrap_err();
        assert!(matches!(err, PlatformError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_get_across_tenants_is_forbidden() {
        let (repo, acme, globex) = setup().await;
        let globex_admin = repo.find_by_email("g@globex.com").await.unwrap().unwrap();

        let err = repo.get(&acme, &globex_admin.id).await.unwrap_err();
        assert!(matches!(err, PlatformError::Forbidden { .. }));
        assert!(repo.find(&acme, &globex_admin.id).await.unwrap().is_none());
        assert!(repo.get(&globex, &globex_admin.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_increment_token_version() {
        let (repo, acme, globex) = setup().await;
        let admin = repo.find_by_email("A@ACME.COM").await.unwrap().unwrap();

        assert_eq!(repo.increment_token_version(&acme, &admin.id).await.unwrap(), 1);
        assert_eq!(repo.increment_token_version(&acme, &admin.id).await.unwrap(), 2);
        assert!(repo.increment_token_version(&globex, &admin.id).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let (repo, acme, _) = setup().await;
        let dup = User::new(acme.tenant_id(), "a@acme.com", "h", "A", "A", UserRole::Member);
        let err = repo.insert(&acme, &dup).await.unwrap_err();
        assert!(matches!(err, PlatformError::Duplicate { .. }));
    }
}
