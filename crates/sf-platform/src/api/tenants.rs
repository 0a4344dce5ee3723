//! Tenants API
//!
//! A caller can only ever see its own tenant. The path tenant id is checked
//! against the token's tenant before anything else.

use axum::{
    routing::get,
    extract::{State, Path},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::api::common::{JsonBody, SuccessResponse, TenantResponse};
use crate::api::middleware::Authenticated;
use crate::domain::TenantPlan;
use crate::error::PlatformError;
use crate::repository::{AssetRepository, TenantRepository};
use crate::service::{checks, ActivityService, AssetStorage, Validator};

/// Update tenant request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantRequest {
    pub name: Option<String>,

    /// free, pro or enterprise
    pub plan: Option<String>,
}

#[derive(Clone)]
pub struct TenantsState {
    pub tenant_repo: Arc<TenantRepository>,
    pub asset_repo: Arc<AssetRepository>,
    pub storage: Arc<AssetStorage>,
    pub activity: ActivityService,
}

/// Get tenant
#[utoipa::path(
    get,
    path = "/api/tenants/{tenant_id}",
    tag = "tenants",
    params(("tenant_id" = String, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant", body = TenantResponse),
        (status = 403, description = "Another tenant", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_tenant(
    State(state): State<TenantsState>,
    auth: Authenticated,
    Path(tenant_id): Path<String>,
) -> Result<Json<TenantResponse>, PlatformError> {
    checks::require_tenant(&auth.0, &tenant_id)?;
    let tenant = state.tenant_repo.get(&auth.0.scope()).await?;
    Ok(Json(tenant.into()))
}

/// Update tenant (admin)
#[utoipa::path(
    put,
    path = "/api/tenants/{tenant_id}",
    tag = "tenants",
    params(("tenant_id" = String, Path, description = "Tenant ID")),
    request_body = UpdateTenantRequest,
    responses(
        (status = 200, description = "Updated tenant", body = TenantResponse),
        (status = 400, description = "Validation failed", body = crate::api::ApiError),
        (status = 403, description = "Not an admin or another tenant", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_tenant(
    State(state): State<TenantsState>,
    auth: Authenticated,
    Path(tenant_id): Path<String>,
    JsonBody(req): JsonBody<UpdateTenantRequest>,
) -> Result<Json<TenantResponse>, PlatformError> {
    checks::require_tenant(&auth.0, &tenant_id)?;
    checks::require_admin(&auth.0)?;

    let mut validator = Validator::new();
    if let Some(name) = &req.name {
        validator.required("name", name).max_len("name", name, 200);
    }
    let plan = match req.plan.as_deref() {
        Some(p) => match TenantPlan::parse(p) {
            Some(plan) => Some(plan),
            None => {
                validator.add("plan", "must be one of free, pro, enterprise");
                None
            }
        },
        None => None,
    };
    validator.finish()?;

    let scope = auth.0.scope();
    let mut tenant = state.tenant_repo.get(&scope).await?;
    if let Some(name) = req.name {
        tenant.name = name.trim().to_string();
    }
    if let Some(plan) = plan {
        tenant.plan = plan;
    }
    tenant.updated_at = Utc::now();
    state.tenant_repo.update(&scope, &tenant).await?;

    state
        .activity
        .log_update(&auth.0, "Tenant", &tenant.id, format!("Updated organization '{}'", tenant.name))
        .await;

    Ok(Json(tenant.into()))
}

/// Delete tenant (admin)
///
/// Removes every user, template, assignment, asset and activity of the
/// tenant, including stored files.
#[utoipa::path(
    delete,
    path = "/api/tenants/{tenant_id}",
    tag = "tenants",
    params(("tenant_id" = String, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant deleted", body = SuccessResponse),
        (status = 403, description = "Not an admin or another tenant", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_tenant(
    State(state): State<TenantsState>,
    auth: Authenticated,
    Path(tenant_id): Path<String>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    checks::require_tenant(&auth.0, &tenant_id)?;
    checks::require_admin(&auth.0)?;

    let scope = auth.0.scope();
    let stored_names = state.asset_repo.stored_names(&scope).await?;
    if !state.tenant_repo.delete(&scope).await? {
        return Err(PlatformError::not_found("Tenant", &tenant_id));
    }
    state.storage.remove_all(&stored_names).await;

    info!(tenant_id = %tenant_id, deleted_by = %auth.0.user_id, files = stored_names.len(), "Tenant deleted");
    Ok(Json(SuccessResponse::with_message("Tenant deleted")))
}

/// Create tenants router
pub fn tenants_router(state: TenantsState) -> Router {
    Router::new()
        .route("/:tenant_id", get(get_tenant).put(update_tenant).delete(delete_tenant))
        .with_state(state)
}
