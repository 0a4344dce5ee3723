//! Team API
//!
//! Users of the caller's tenant. Everyone may read the team; only admins
//! invite, change roles or remove users.

use axum::{
    routing::{get, put},
    extract::{State, Path},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::common::{JsonBody, SuccessResponse, UserResponse};
use crate::api::middleware::Authenticated;
use crate::domain::{User, UserRole};
use crate::error::PlatformError;
use crate::repository::UserRepository;
use crate::service::{checks, ActivityService, PasswordService, Validator};

/// Invite user request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// admin or member (default member)
    #[serde(default)]
    pub role: Option<String>,

    /// Initial password, at least 8 characters
    pub password: String,
}

/// Update role request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    /// admin or member
    pub role: String,
}

#[derive(Clone)]
pub struct TeamState {
    pub user_repo: Arc<UserRepository>,
    pub passwords: Arc<PasswordService>,
    pub activity: ActivityService,
}

fn parse_role(validator: &mut Validator, role: Option<&str>) -> UserRole {
    match role {
        None => UserRole::Member,
        Some(r) => UserRole::parse(r).unwrap_or_else(|| {
            validator.add("role", "must be admin or member");
            UserRole::Member
        }),
    }
}

/// List team members
#[utoipa::path(
    get,
    path = "/api/team",
    tag = "team",
    responses((status = 200, description = "Users of the tenant", body = Vec<UserResponse>)),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<TeamState>,
    auth: Authenticated,
) -> Result<Json<Vec<UserResponse>>, PlatformError> {
    let users = state.user_repo.list(&auth.0.scope()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Invite a user (admin)
#[utoipa::path(
    post,
    path = "/api/team",
    tag = "team",
    request_body = InviteUserRequest,
    responses(
        (status = 200, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed or email taken", body = crate::api::ApiError),
        (status = 403, description = "Not an admin", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn invite_user(
    State(state): State<TeamState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<InviteUserRequest>,
) -> Result<Json<UserResponse>, PlatformError> {
    checks::require_admin(&auth.0)?;

    let mut validator = Validator::new();
    validator
        .email("email", &req.email)
        .required("firstName", &req.first_name)
        .max_len("firstName", &req.first_name, 100)
        .required("lastName", &req.last_name)
        .max_len("lastName", &req.last_name, 100);
    let role = parse_role(&mut validator, req.role.as_deref());
    if let Err(reason) = state.passwords.policy().check(&req.password) {
        validator.add("password", reason);
    }
    validator.finish()?;

    if state.user_repo.email_exists(&req.email).await? {
        return Err(PlatformError::duplicate("User", "email", req.email.trim().to_lowercase()));
    }

    let hash = state.passwords.hash_password(&req.password).await?;
    let user = User::new(
        &auth.0.tenant_id,
        &req.email,
        hash,
        req.first_name.trim(),
        req.last_name.trim(),
        role,
    );
    state.user_repo.insert(&auth.0.scope(), &user).await?;

    state
        .activity
        .log_create(&auth.0, "User", &user.id, format!("Invited {} as {}", user.email, role.as_str()))
        .await;

    Ok(Json(user.into()))
}

/// Get a team member
#[utoipa::path(
    get,
    path = "/api/team/{id}",
    tag = "team",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "User of another tenant", body = crate::api::ApiError),
        (status = 404, description = "Not found", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<TeamState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, PlatformError> {
    let user = state.user_repo.get(&auth.0.scope(), &id).await?;
    Ok(Json(user.into()))
}

/// Change a member's role (admin)
///
/// The last admin of a tenant cannot be demoted.
#[utoipa::path(
    put,
    path = "/api/team/{id}/role",
    tag = "team",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid role", body = crate::api::ApiError),
        (status = 403, description = "Not an admin", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_role(
    State(state): State<TeamState>,
    auth: Authenticated,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, PlatformError> {
    checks::require_admin(&auth.0)?;

    let mut validator = Validator::new();
    let role = parse_role(&mut validator, Some(&req.role));
    validator.finish()?;

    let scope = auth.0.scope();
    let user = state.user_repo.get(&scope, &id).await?;
    if !state.user_repo.update_role(&scope, &id, role).await? {
        return Err(PlatformError::validation("A tenant must keep at least one admin"));
    }

    state
        .activity
        .log_update(&auth.0, "User", &id, format!("Changed role of {} to {}", user.email, role.as_str()))
        .await;

    let updated = state.user_repo.get(&scope, &id).await?;
    Ok(Json(updated.into()))
}

/// Remove a team member (admin)
///
/// Admins cannot remove themselves.
#[utoipa::path(
    delete,
    path = "/api/team/{id}",
    tag = "team",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User removed", body = SuccessResponse),
        (status = 400, description = "Attempted to remove self", body = crate::api::ApiError),
        (status = 403, description = "Not an admin or another tenant", body = crate::api::ApiError),
        (status = 404, description = "Not found", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_user(
    State(state): State<TeamState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    checks::require_admin(&auth.0)?;
    if id == auth.0.user_id {
        return Err(PlatformError::validation("You cannot remove yourself"));
    }

    let scope = auth.0.scope();
    let user = state.user_repo.get(&scope, &id).await?;
    if !state.user_repo.delete(&scope, &id).await? {
        return Err(PlatformError::validation("A tenant must keep at least one admin"));
    }

    state
        .activity
        .log_delete(&auth.0, "User", &id, format!("Removed {}", user.email))
        .await;

    Ok(Json(SuccessResponse::ok()))
}

/// Create team router
pub fn team_router(state: TeamState) -> Router {
    Router::new()
        .route("/", get(list_users).post(invite_user))
        .route("/:id", get(get_user).delete(remove_user))
        .route("/:id/role", put(update_role))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        let mut validator = Validator::new();
        assert_eq!(parse_role(&mut validator, None), UserRole::Member);
        assert_eq!(parse_role(&mut validator, Some("Admin")), UserRole::Admin);
        assert!(validator.finish().is_ok());

        parse_role(&mut validator, Some("owner"));
        assert!(validator.finish().is_err());
    }

    #[test]
    fn test_invite_request_defaults_role() {
        let json = r#"{"email":"m@acme.com","firstName":"M","lastName":"M","password":"password123"}"#;
        let req: InviteUserRequest = serde_json::from_str(json).unwrap();
        assert!(req.role.is_none());
    }
}
