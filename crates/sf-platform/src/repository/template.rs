//! Signature Template Repository
//!
//! Templates and their user assignments. Assignment rows carry no tenant
//! column; they are scoped through the template and user they join.

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::{from_millis, to_millis};
use crate::domain::{display_name, SignatureTemplate, TemplateAssignment, TenantScope};
use crate::error::{PlatformError, Result};

const TEMPLATE_COLUMNS: &str =
    "id, tenant_id, name, html_content, is_default, created_by, created_at, updated_at";

/// Assignment joined with the assigned user's identity
#[derive(Debug, Clone)]
pub struct AssignmentRow {
    pub assignment: TemplateAssignment,
    pub email: String,
    pub user_name: String,
}

pub struct TemplateRepository {
    pool: SqlitePool,
}

impl TemplateRepository {
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn insert(&self, scope: &TenantScope, template: &SignatureTemplate) -> Result<()> {
        scope.ensure_owns("Template", &template.tenant_id)?;
        let mut tx = self.pool.begin().await?;

        if template.is_default {
            clear_default(&mut tx, scope).await?;
        }

        sqlx::query(&format!(
            "INSERT INTO signature_templates ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            TEMPLATE_COLUMNS
        ))
        .bind(&template.id)
        .bind(&template.tenant_id)
        .bind(&template.name)
        .bind(&template.html_content)
        .bind(template.is_default)
        .bind(&template.created_by)
        .bind(to_millis(template.created_at))
        .bind(to_millis(template.updated_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Fetch a template by id; `NotFound` when missing, `Forbidden` when it
    /// belongs to another tenant.
    pub async fn get(&self, scope: &TenantScope, id: &str) -> Result<SignatureTemplate> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM signature_templates WHERE id = ?",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let template = match row {
            Some(row) => map_template(&row)?,
            None => return Err(PlatformError::not_found("Template", id)),
        };
        scope.ensure_owns("Template", &template.tenant_id)?;
        Ok(template)
    }

    pub async fn list(&self, scope: &TenantScope) -> Result<Vec<SignatureTemplate>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM signature_templates WHERE tenant_id = ? ORDER BY is_default DESC, name ASC",
            TEMPLATE_COLUMNS
        ))
        .bind(scope.tenant_id())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_template).collect()
    }

    pub async fn count(&self, scope: &TenantScope) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM signature_templates WHERE tenant_id = ?")
            .bind(scope.tenant_id())
            .fetch_one(&self.pool)
            .await?)
    }

    /// Persist name and content changes. Default status is changed only
    /// through [`set_default`](Self::set_default).
    pub async fn update(&self, scope: &TenantScope, template: &SignatureTemplate) -> Result<()> {
        scope.ensure_owns("Template", &template.tenant_id)?;
        let result = sqlx::query(
            "UPDATE signature_templates SET name = ?, html_content = ?, updated_at = ? \
             WHERE id = ? AND tenant_id = ?",
        )
        .bind(&template.name)
        .bind(&template.html_content)
        .bind(to_millis(template.updated_at))
        .bind(&template.id)
        .bind(scope.tenant_id())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("Template", &template.id));
        }
        Ok(())
    }

    /// Make `id` the tenant's only default template.
    pub async fn set_default(&self, scope: &TenantScope, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        clear_default(&mut tx, scope).await?;

        let result = sqlx::query(
            "UPDATE signature_templates SET is_default = 1, updated_at = ? WHERE id = ? AND tenant_id = ?",
        )
        .bind(to_millis(Utc::now()))
        .bind(id)
        .bind(scope.tenant_id())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found("Template", id));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete(&self, scope: &TenantScope, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM signature_templates WHERE id = ? AND tenant_id = ?")
            .bind(id)
            .bind(scope.tenant_id())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Assign a template to a user. Returns false when the pair already
    /// existed or either side is outside the scope.
    pub async fn assign(&self, scope: &TenantScope, template_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO template_assignments (user_id, template_id, assigned_at) \
             SELECT ?, ?, ? \
             WHERE EXISTS (SELECT 1 FROM signature_templates WHERE id = ? AND tenant_id = ?) \
               AND EXISTS (SELECT 1 FROM users WHERE id = ? AND tenant_id = ?)",
        )
        .bind(user_id)
        .bind(template_id)
        .bind(to_millis(Utc::now()))
        .bind(template_id)
        .bind(scope.tenant_id())
        .bind(user_id)
        .bind(scope.tenant_id())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn unassign(&self, scope: &TenantScope, template_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM template_assignments WHERE template_id = ? AND user_id = ? \
             AND template_id IN (SELECT id FROM signature_templates WHERE tenant_id = ?)",
        )
        .bind(template_id)
        .bind(user_id)
        .bind(scope.tenant_id())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn assignments(&self, scope: &TenantScope, template_id: &str) -> Result<Vec<AssignmentRow>> {
        let rows = sqlx::query(
            "SELECT a.user_id, a.template_id, a.assigned_at, u.email, u.first_name, u.last_name \
             FROM template_assignments a \
             JOIN signature_templates t ON t.id = a.template_id \
             JOIN users u ON u.id = a.user_id \
             WHERE a.template_id = ? AND t.tenant_id = ? \
             ORDER BY a.assigned_at ASC",
        )
        .bind(template_id)
        .bind(scope.tenant_id())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let email: String = row.try_get("email")?;
                let first_name: String = row.try_get("first_name")?;
                let last_name: String = row.try_get("last_name")?;
                Ok(AssignmentRow {
                    assignment: TemplateAssignment {
                        user_id: row.try_get("user_id")?,
                        template_id: row.try_get("template_id")?,
                        assigned_at: from_millis(row.try_get("assigned_at")?)?,
                    },
                    user_name: display_name(&first_name, &last_name, &email),
                    email,
                })
            })
            .collect()
    }
}

async fn clear_default(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, scope: &TenantScope) -> Result<()> {
    sqlx::query("UPDATE signature_templates SET is_default = 0 WHERE tenant_id = ? AND is_default = 1")
        .bind(scope.tenant_id())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn map_template(row: &SqliteRow) -> Result<SignatureTemplate> {
    Ok(SignatureTemplate {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        name: row.try_get("name")?,
        html_content: row.try_get("html_content")?,
        is_default: row.try_get("is_default")?,
        created_by: row.try_get("created_by")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}
