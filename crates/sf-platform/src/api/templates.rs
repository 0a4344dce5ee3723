//! Signature Templates API
//!
//! Template CRUD, the tenant default, and user assignments. Any member of
//! the tenant may manage templates.

use axum::{
    routing::{get, post, delete},
    extract::{State, Path},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::common::{CreatedResponse, JsonBody, SuccessResponse};
use crate::api::middleware::Authenticated;
use crate::domain::SignatureTemplate;
use crate::error::PlatformError;
use crate::repository::{AssignmentRow, TemplateRepository, UserRepository};
use crate::service::{checks, ActivityService, Validator};

const MAX_HTML_CHARS: usize = 100_000;

/// Create template request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    pub html_content: String,

    /// Make this the tenant's default template
    #[serde(default)]
    pub is_default: bool,

    /// Optional; must match the caller's tenant when present
    pub tenant_id: Option<String>,
}

/// Update template request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub html_content: Option<String>,

    /// Optional; must match the caller's tenant when present
    pub tenant_id: Option<String>,
}

/// Assign template request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignTemplateRequest {
    pub user_id: String,
}

/// Template response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResponse {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub html_content: String,
    pub is_default: bool,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SignatureTemplate> for TemplateResponse {
    fn from(t: SignatureTemplate) -> Self {
        Self {
            id: t.id,
            tenant_id: t.tenant_id,
            name: t.name,
            html_content: t.html_content,
            is_default: t.is_default,
            created_by: t.created_by,
            created_at: t.created_at.to_rfc3339(),
            updated_at: t.updated_at.to_rfc3339(),
        }
    }
}

/// Assignment response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub user_id: String,
    pub template_id: String,
    pub email: String,
    pub name: String,
    pub assigned_at: String,
}

impl From<AssignmentRow> for AssignmentResponse {
    fn from(row: AssignmentRow) -> Self {
        Self {
            user_id: row.assignment.user_id,
            template_id: row.assignment.template_id,
            email: row.email,
            name: row.user_name,
            assigned_at: row.assignment.assigned_at.to_rfc3339(),
        }
    }
}

#[derive(Clone)]
pub struct TemplatesState {
    pub template_repo: Arc<TemplateRepository>,
    pub user_repo: Arc<UserRepository>,
    pub activity: ActivityService,
}

/// List templates
#[utoipa::path(
    get,
    path = "/api/templates",
    tag = "templates",
    responses((status = 200, description = "Templates, default first", body = Vec<TemplateResponse>)),
    security(("bearer_auth" = []))
)]
pub async fn list_templates(
    State(state): State<TemplatesState>,
    auth: Authenticated,
) -> Result<Json<Vec<TemplateResponse>>, PlatformError> {
    let templates = state.template_repo.list(&auth.0.scope()).await?;
    Ok(Json(templates.into_iter().map(TemplateResponse::from).collect()))
}

/// Create a template
#[utoipa::path(
    post,
    path = "/api/templates",
    tag = "templates",
    request_body = CreateTemplateRequest,
    responses(
        (status = 200, description = "Template created", body = TemplateResponse),
        (status = 400, description = "Validation failed", body = crate::api::ApiError),
        (status = 403, description = "Body names another tenant", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_template(
    State(state): State<TemplatesState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<CreateTemplateRequest>,
) -> Result<Json<TemplateResponse>, PlatformError> {
    checks::require_body_tenant(&auth.0, req.tenant_id.as_deref())?;

    Validator::new()
        .required("name", &req.name)
        .max_len("name", &req.name, 200)
        .max_len("htmlContent", &req.html_content, MAX_HTML_CHARS)
        .finish()?;

    let mut template = SignatureTemplate::new(
        &auth.0.tenant_id,
        req.name.trim(),
        req.html_content,
        &auth.0.user_id,
    );
    if req.is_default {
        template = template.as_default();
    }
    state.template_repo.insert(&auth.0.scope(), &template).await?;

    state
        .activity
        .log_create(&auth.0, "Template", &template.id, format!("Created template '{}'", template.name))
        .await;

    Ok(Json(template.into()))
}

/// Get a template
#[utoipa::path(
    get,
    path = "/api/templates/{id}",
    tag = "templates",
    params(("id" = String, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template", body = TemplateResponse),
        (status = 403, description = "Template of another tenant", body = crate::api::ApiError),
        (status = 404, description = "Not found", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_template(
    State(state): State<TemplatesState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<TemplateResponse>, PlatformError> {
    let template = state.template_repo.get(&auth.0.scope(), &id).await?;
    Ok(Json(template.into()))
}

/// Update a template
#[utoipa::path(
    put,
    path = "/api/templates/{id}",
    tag = "templates",
    params(("id" = String, Path, description = "Template ID")),
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Updated template", body = TemplateResponse),
        (status = 403, description = "Template of another tenant", body = crate::api::ApiError),
        (status = 404, description = "Not found", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_template(
    State(state): State<TemplatesState>,
    auth: Authenticated,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateTemplateRequest>,
) -> Result<Json<TemplateResponse>, PlatformError> {
    checks::require_body_tenant(&auth.0, req.tenant_id.as_deref())?;

    let mut validator = Validator::new();
    if let Some(name) = &req.name {
        validator.required("name", name).max_len("name", name, 200);
    }
    if let Some(html) = &req.html_content {
        validator.max_len("htmlContent", html, MAX_HTML_CHARS);
    }
    validator.finish()?;

    let scope = auth.0.scope();
    let mut template = state.template_repo.get(&scope, &id).await?;
    if let Some(name) = req.name {
        template.name = name.trim().to_string();
    }
    if let Some(html) = req.html_content {
        template.html_content = html;
    }
    template.updated_at = Utc::now();
    state.template_repo.update(&scope, &template).await?;

    state
        .activity
        .log_update(&auth.0, "Template", &id, format!("Updated template '{}'", template.name))
        .await;

    Ok(Json(template.into()))
}

/// Delete a template
#[utoipa::path(
    delete,
    path = "/api/templates/{id}",
    tag = "templates",
    params(("id" = String, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template deleted", body = SuccessResponse),
        (status = 403, description = "Template of another tenant", body = crate::api::ApiError),
        (status = 404, description = "Not found", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_template(
    State(state): State<TemplatesState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    let scope = auth.0.scope();
    let template = state.template_repo.get(&scope, &id).await?;
    if !state.template_repo.delete(&scope, &id).await? {
        return Err(PlatformError::not_found("Template", &id));
    }

    state
        .activity
        .log_delete(&auth.0, "Template", &id, format!("Deleted template '{}'", template.name))
        .await;

    Ok(Json(SuccessResponse::ok()))
}

/// Make a template the tenant default
#[utoipa::path(
    post,
    path = "/api/templates/{id}/default",
    tag = "templates",
    params(("id" = String, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Default template", body = TemplateResponse),
        (status = 403, description = "Template of another tenant", body = crate::api::ApiError),
        (status = 404, description = "Not found", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_default_template(
    State(state): State<TemplatesState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<TemplateResponse>, PlatformError> {
    let scope = auth.0.scope();
    state.template_repo.get(&scope, &id).await?;
    state.template_repo.set_default(&scope, &id).await?;

    let template = state.template_repo.get(&scope, &id).await?;
    state
        .activity
        .log_update(&auth.0, "Template", &id, format!("Set '{}' as default template", template.name))
        .await;

    Ok(Json(template.into()))
}

/// List users assigned to a template
#[utoipa::path(
    get,
    path = "/api/templates/{id}/assignments",
    tag = "templates",
    params(("id" = String, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Assignments", body = Vec<AssignmentResponse>),
        (status = 403, description = "Template of another tenant", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_assignments(
    State(state): State<TemplatesState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Vec<AssignmentResponse>>, PlatformError> {
    let scope = auth.0.scope();
    state.template_repo.get(&scope, &id).await?;
    let rows = state.template_repo.assignments(&scope, &id).await?;
    Ok(Json(rows.into_iter().map(AssignmentResponse::from).collect()))
}

/// Assign a template to a user
///
/// Idempotent: assigning an existing pair succeeds without a new row.
#[utoipa::path(
    post,
    path = "/api/templates/{id}/assignments",
    tag = "templates",
    params(("id" = String, Path, description = "Template ID")),
    request_body = AssignTemplateRequest,
    responses(
        (status = 200, description = "Assigned", body = CreatedResponse),
        (status = 403, description = "Template or user of another tenant", body = crate::api::ApiError),
        (status = 404, description = "Template or user not found", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn assign_template(
    State(state): State<TemplatesState>,
    auth: Authenticated,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AssignTemplateRequest>,
) -> Result<Json<CreatedResponse>, PlatformError> {
    let scope = auth.0.scope();
    state.template_repo.get(&scope, &id).await?;
    let user = state.user_repo.get(&scope, &req.user_id).await?;

    if state.template_repo.assign(&scope, &id, &user.id).await? {
        state.activity.log_assign(&auth.0, &id, &user.email).await;
    }

    Ok(Json(CreatedResponse::new(user.id)))
}

/// Remove a template assignment
#[utoipa::path(
    delete,
    path = "/api/templates/{id}/assignments/{user_id}",
    tag = "templates",
    params(
        ("id" = String, Path, description = "Template ID"),
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Unassigned", body = SuccessResponse),
        (status = 403, description = "Template of another tenant", body = crate::api::ApiError),
        (status = 404, description = "No such assignment", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn unassign_template(
    State(state): State<TemplatesState>,
    auth: Authenticated,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    let scope = auth.0.scope();
    state.template_repo.get(&scope, &id).await?;

    if !state.template_repo.unassign(&scope, &id, &user_id).await? {
        return Err(PlatformError::not_found("TemplateAssignment", format!("{}/{}", id, user_id)));
    }
    state.activity.log_unassign(&auth.0, &id, &user_id).await;

    Ok(Json(SuccessResponse::ok()))
}

/// Create templates router
pub fn templates_router(state: TemplatesState) -> Router {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route("/:id", get(get_template).put(update_template).delete(delete_template))
        .route("/:id/default", post(set_default_template))
        .route("/:id/assignments", get(list_assignments).post(assign_template))
        .route("/:id/assignments/:user_id", delete(unassign_template))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTemplateRequest =
            serde_json::from_str(r#"{"name":"Sales","htmlContent":"<p>{{name}}</p>"}"#).unwrap();
        assert!(!req.is_default);
        assert!(req.tenant_id.is_none());
    }

    #[test]
    fn test_template_response_serialization() {
        let template = SignatureTemplate::new("t1", "Sales", "<p/>", "u1").as_default();
        let json = serde_json::to_value(TemplateResponse::from(template)).unwrap();
        assert_eq!(json["isDefault"], true);
        assert_eq!(json["htmlContent"], "<p/>");
        assert_eq!(json["createdBy"], "u1");
    }
}
