//! Refresh Token Repository

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::{from_millis, to_millis};
use crate::domain::{RefreshToken, TenantScope};
use crate::error::Result;

const TOKEN_COLUMNS: &str = "id, user_id, tenant_id, token_hash, expires_at, revoked, created_at";

pub struct RefreshTokenRepository {
    pool: SqlitePool,
}

impl RefreshTokenRepository {
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn insert(&self, scope: &TenantScope, token: &RefreshToken) -> Result<()> {
        scope.ensure_owns("RefreshToken", &token.tenant_id)?;
        sqlx::query(&format!(
            "INSERT INTO refresh_tokens ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            TOKEN_COLUMNS
        ))
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(&token.tenant_id)
        .bind(&token.token_hash)
        .bind(to_millis(token.expires_at))
        .bind(token.revoked)
        .bind(to_millis(token.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Lookup by hash of the presented cookie value. The hash itself is the
    /// credential, so this runs before any tenant is known.
    pub async fn find_valid_by_hash(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<RefreshToken>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM refresh_tokens WHERE token_hash = ? AND revoked = 0 AND expires_at > ?",
            TOKEN_COLUMNS
        ))
        .bind(token_hash)
        .bind(to_millis(now))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_token).transpose()
    }

    /// Revoke a single token; returns false if it was unknown or already revoked.
    pub async fn revoke_by_hash(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE token_hash = ? AND revoked = 0")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn revoke_all_for_user(&self, scope: &TenantScope, user_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ? AND tenant_id = ? AND revoked = 0",
        )
        .bind(user_id)
        .bind(scope.tenant_id())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Remove expired and revoked rows
    pub async fn purge_stale(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE revoked = 1 OR expires_at <= ?")
            .bind(to_millis(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn map_token(row: &SqliteRow) -> Result<RefreshToken> {
    Ok(RefreshToken {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        tenant_id: row.try_get("tenant_id")?,
        token_hash: row.try_get("token_hash")?,
        expires_at: from_millis(row.try_get("expires_at")?)?,
        revoked: row.try_get("revoked")?,
        created_at: from_millis(row.try_get("created_at")?)?,
    })
}
