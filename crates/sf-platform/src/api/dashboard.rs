//! Dashboard API
//!
//! Tenant counters and the recent activity feed.

use axum::{
    routing::get,
    extract::State,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::common::{LimitParams, QueryParams};
use crate::api::middleware::Authenticated;
use crate::domain::ActivityEntry;
use crate::error::PlatformError;
use crate::repository::{AssetRepository, TemplateRepository, UserRepository};
use crate::service::ActivityService;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub templates: i64,
    pub users: i64,
    pub assets: i64,
}

/// Activity feed entry
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub description: String,
    pub user_id: Option<String>,
    /// Display name of the acting user, if still present
    pub user_name: Option<String>,
    pub created_at: String,
}

impl From<ActivityEntry> for ActivityResponse {
    fn from(entry: ActivityEntry) -> Self {
        let a = entry.activity;
        Self {
            id: a.id,
            action: a.action.as_str().to_string(),
            entity_type: a.entity_type,
            entity_id: a.entity_id,
            description: a.description,
            user_id: a.user_id,
            user_name: entry.user_name,
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

#[derive(Clone)]
pub struct DashboardState {
    pub template_repo: Arc<TemplateRepository>,
    pub user_repo: Arc<UserRepository>,
    pub asset_repo: Arc<AssetRepository>,
    pub activity: ActivityService,
}

/// Tenant counters
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "dashboard",
    responses((status = 200, description = "Counts for the caller's tenant", body = DashboardStats)),
    security(("bearer_auth" = []))
)]
pub async fn stats(
    State(state): State<DashboardState>,
    auth: Authenticated,
) -> Result<Json<DashboardStats>, PlatformError> {
    let scope = auth.0.scope();
    Ok(Json(DashboardStats {
        templates: state.template_repo.count(&scope).await?,
        users: state.user_repo.count(&scope).await?,
        assets: state.asset_repo.count(&scope).await?,
    }))
}

/// Recent activity
#[utoipa::path(
    get,
    path = "/api/dashboard/activity",
    tag = "dashboard",
    params(LimitParams),
    responses((status = 200, description = "Newest first", body = Vec<ActivityResponse>)),
    security(("bearer_auth" = []))
)]
pub async fn recent_activity(
    State(state): State<DashboardState>,
    auth: Authenticated,
    QueryParams(params): QueryParams<LimitParams>,
) -> Result<Json<Vec<ActivityResponse>>, PlatformError> {
    let entries = state.activity.recent(&auth.0.scope(), params.limit).await?;
    Ok(Json(entries.into_iter().map(ActivityResponse::from).collect()))
}

/// Create dashboard router
pub fn dashboard_router(state: DashboardState) -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/activity", get(recent_activity))
        .with_state(state)
}
