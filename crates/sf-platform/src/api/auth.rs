//! Auth API Endpoints
//!
//! - POST /api/auth/register - Create a tenant and its first admin
//! - POST /api/auth/login - Password login
//! - POST /api/auth/refresh - Reissue an access token
//! - POST /api/auth/logout - End this session
//! - POST /api/auth/logout-all - End every session of the caller
//! - GET /api/auth/me - Current user and tenant
//!
//! The refresh token travels only in the `sf_refresh` httpOnly cookie,
//! scoped to `/api/auth`.

use axum::{
    routing::{get, post},
    extract::State,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::common::{JsonBody, SuccessResponse, TenantResponse, UserResponse};
use crate::api::middleware::{Authenticated, OptionalBearer};
use crate::error::PlatformError;
use crate::service::{CredentialService, RegisterInput, Session};

pub const REFRESH_COOKIE: &str = "sf_refresh";
const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// Registration request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub organization_name: String,
    /// Organization domain, unique across tenants
    pub domain: String,
    pub first_name: String,
    pub last_name: String,
    /// Admin email, unique across all tenants
    pub email: String,
    /// At least 8 characters
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued session
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Access token
    pub token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Seconds until the access token expires
    pub expires_in: i64,

    pub user: UserResponse,
    pub tenant: TenantResponse,
}

/// Refreshed access token
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
    pub tenant: TenantResponse,
}

/// Auth service state
#[derive(Clone)]
pub struct AuthState {
    pub credentials: Arc<CredentialService>,
    pub cookie_secure: bool,
    pub refresh_token_ttl_secs: i64,
}

impl AuthState {
    fn refresh_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((REFRESH_COOKIE, value))
            .path(REFRESH_COOKIE_PATH)
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Strict)
            .max_age(time::Duration::seconds(self.refresh_token_ttl_secs))
            .build()
    }

    fn expired_cookie(&self) -> Cookie<'static> {
        Cookie::build((REFRESH_COOKIE, ""))
            .path(REFRESH_COOKIE_PATH)
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Strict)
            .build()
    }

    fn session_response(&self, jar: CookieJar, session: Session) -> (CookieJar, Json<AuthResponse>) {
        let jar = jar.add(self.refresh_cookie(session.refresh_token));
        let body = AuthResponse {
            token: session.access_token,
            token_type: "Bearer".to_string(),
            expires_in: session.expires_in,
            user: session.user.into(),
            tenant: session.tenant.into(),
        };
        (jar, Json(body))
    }
}

fn refresh_cookie_value(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE).map(|c| c.value().to_string())
}

/// Register an organization
///
/// Creates the tenant and its first admin, then opens a session.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = AuthResponse),
        (status = 400, description = "Validation failed or domain/email taken", body = crate::api::ApiError)
    )
)]
pub async fn register(
    State(state): State<AuthState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), PlatformError> {
    let session = state
        .credentials
        .register(RegisterInput {
            organization_name: req.organization_name,
            domain: req.domain,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(state.session_response(jar, session))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::api::ApiError)
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), PlatformError> {
    let session = state.credentials.login(&req.email, &req.password).await?;
    Ok(state.session_response(jar, session))
}

/// Refresh the access token
///
/// Returns the presented bearer token unchanged while it is outside the
/// refresh window. Otherwise consumes and rotates the refresh cookie.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "Token refreshed", body = RefreshResponse),
        (status = 401, description = "Missing or invalid refresh token", body = crate::api::ApiError)
    )
)]
pub async fn refresh(
    State(state): State<AuthState>,
    jar: CookieJar,
    OptionalBearer(bearer): OptionalBearer,
) -> Result<(CookieJar, Json<RefreshResponse>), PlatformError> {
    let cookie = refresh_cookie_value(&jar);
    let outcome = state
        .credentials
        .refresh(bearer.as_deref(), cookie.as_deref())
        .await?;

    let jar = match outcome.refresh_token {
        Some(rotated) => jar.add(state.refresh_cookie(rotated)),
        None => jar,
    };

    Ok((
        jar,
        Json(RefreshResponse {
            token: outcome.access_token,
            token_type: "Bearer".to_string(),
            expires_in: outcome.expires_in,
        }),
    ))
}

/// Logout
///
/// Revokes the refresh token in the cookie and clears the cookie.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = SuccessResponse),
        (status = 401, description = "Not authenticated", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AuthState>,
    auth: Authenticated,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SuccessResponse>), PlatformError> {
    let cookie = refresh_cookie_value(&jar);
    state.credentials.logout(&auth.0, cookie.as_deref()).await?;
    Ok((jar.remove(state.expired_cookie()), Json(SuccessResponse::ok())))
}

/// Logout everywhere
///
/// Invalidates every access and refresh token issued to the caller.
#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    tag = "auth",
    responses(
        (status = 200, description = "All sessions ended", body = SuccessResponse),
        (status = 401, description = "Not authenticated", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout_all(
    State(state): State<AuthState>,
    auth: Authenticated,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SuccessResponse>), PlatformError> {
    state.credentials.logout_all(&auth.0).await?;
    Ok((
        jar.remove(state.expired_cookie()),
        Json(SuccessResponse::with_message("All sessions have been signed out")),
    ))
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user and tenant", body = MeResponse),
        (status = 401, description = "Not authenticated", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<AuthState>,
    auth: Authenticated,
) -> Result<Json<MeResponse>, PlatformError> {
    let (user, tenant) = state.credentials.me(&auth.0).await?;
    Ok(Json(MeResponse {
        user: user.into(),
        tenant: tenant.into(),
    }))
}

/// Create the auth router
pub fn auth_router(state: AuthState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/me", get(me))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_deserialization() {
        let json = r#"{"organizationName":"Acme","domain":"acme.com","firstName":"Ada",
            "lastName":"Admin","email":"a@acme.com","password":"password123"}"#;
        let req: RegisterRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.organization_name, "Acme");
        assert_eq!(req.first_name, "Ada");
    }

    #[test]
    fn test_refresh_response_serialization() {
        let json = serde_json::to_string(&RefreshResponse {
            token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 900,
        })
        .unwrap();
        assert!(json.contains("tokenType"));
        assert!(json.contains("expiresIn"));
    }
}
