//! Asset Repository

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::{from_millis, to_millis};
use crate::domain::{Asset, TenantScope};
use crate::error::{PlatformError, Result};

const ASSET_COLUMNS: &str =
    "id, tenant_id, filename, mime_type, size, url, stored_name, uploaded_by, created_at";

pub struct AssetRepository {
    pool: SqlitePool,
}

impl AssetRepository {
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn insert(&self, scope: &TenantScope, asset: &Asset) -> Result<()> {
        scope.ensure_owns("Asset", &asset.tenant_id)?;
        sqlx::query(&format!(
            "INSERT INTO assets ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            ASSET_COLUMNS
        ))
        .bind(&asset.id)
        .bind(&asset.tenant_id)
        .bind(&asset.filename)
        .bind(&asset.mime_type)
        .bind(asset.size)
        .bind(&asset.url)
        .bind(&asset.stored_name)
        .bind(&asset.uploaded_by)
        .bind(to_millis(asset.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch an asset by id; `NotFound` when missing, `Forbidden` when it
    /// belongs to another tenant.
    pub async fn get(&self, scope: &TenantScope, id: &str) -> Result<Asset> {
        let row = sqlx::query(&format!("SELECT {} FROM assets WHERE id = ?", ASSET_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let asset = match row {
            Some(row) => map_asset(&row)?,
            None => return Err(PlatformError::not_found("Asset", id)),
        };
        scope.ensure_owns("Asset", &asset.tenant_id)?;
        Ok(asset)
    }

    pub async fn list(&self, scope: &TenantScope) -> Result<Vec<Asset>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM assets WHERE tenant_id = ? ORDER BY created_at DESC",
            ASSET_COLUMNS
        ))
        .bind(scope.tenant_id())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_asset).collect()
    }

    pub async fn count(&self, scope: &TenantScope) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE tenant_id = ?")
            .bind(scope.tenant_id())
            .fetch_one(&self.pool)
            .await?)
    }

    /// On-disk names of every asset in the tenant
    pub async fn stored_names(&self, scope: &TenantScope) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar("SELECT stored_name FROM assets WHERE tenant_id = ?")
            .bind(scope.tenant_id())
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn delete(&self, scope: &TenantScope, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM assets WHERE id = ? AND tenant_id = ?")
            .bind(id)
            .bind(scope.tenant_id())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_asset(row: &SqliteRow) -> Result<Asset> {
    Ok(Asset {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        filename: row.try_get("filename")?,
        mime_type: row.try_get("mime_type")?,
        size: row.try_get("size")?,
        url: row.try_get("url")?,
        stored_name: row.try_get("stored_name")?,
        uploaded_by: row.try_get("uploaded_by")?,
        created_at: from_millis(row.try_get("created_at")?)?,
    })
}
