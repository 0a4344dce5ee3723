//! API Middleware
//!
//! Bearer-token authentication extractor for Axum.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use crate::error::PlatformError;
use crate::service::{AuthContext, CredentialService};

/// Shared services needed to authenticate a request.
///
/// Installed on the router as an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialService>,
}

/// Extractor for authenticated requests.
///
/// Validates the bearer token and its token version, then exposes the
/// caller as an [`AuthContext`].
pub struct Authenticated(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PlatformError::unauthorized("Missing Authorization header"))?;

        let token = crate::service::extract_bearer_token(auth_header)
            .ok_or_else(|| PlatformError::unauthorized("Invalid Authorization header format"))?;

        let app_state = parts
            .extensions
            .get::<AppState>()
            .ok_or_else(|| PlatformError::internal("AppState not found"))?;

        let context = app_state.credentials.verify(token).await?;

        Ok(Authenticated(context))
    }
}

/// Raw bearer token, if the request carries a well-formed one. Never rejects.
pub struct OptionalBearer(pub Option<String>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalBearer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(crate::service::extract_bearer_token)
            .map(str::to_string);
        Ok(OptionalBearer(token))
    }
}
