//! Authentication Service
//!
//! Issues and validates HS256 access tokens.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sf_config::AuthSettings;
use tracing::debug;

use crate::domain::User;
use crate::error::{PlatformError, Result};

/// Token settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl_secs: i64,
    pub refresh_window_secs: i64,
}

impl AuthConfig {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self {
            secret: settings.jwt_secret.clone(),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            access_token_ttl_secs: settings.access_token_ttl_secs,
            refresh_window_secs: settings.refresh_window_secs,
        }
    }
}

/// Access token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenClaims {
    /// User id
    pub sub: String,
    pub tenant_id: String,
    pub email: String,
    pub role: String,
    /// Must match the user's stored version for the token to be accepted
    pub token_version: i64,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        }
    }

    pub fn generate_access_token(&self, user: &User) -> Result<String> {
        self.generate_access_token_at(user, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn generate_access_token_at(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = AccessTokenClaims {
            sub: user.id.clone(),
            tenant_id: user.tenant_id.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            token_version: user.token_version,
            iat,
            exp: iat + self.config.access_token_ttl_secs,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PlatformError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Check signature, issuer, audience and expiry.
    ///
    /// Does not check the token version; see `AuthorizationService::build_context`.
    pub fn validate_token(&self, token: &str) -> Result<AccessTokenClaims> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token validation failed");
                match e.kind() {
                    ErrorKind::ExpiredSignature => PlatformError::TokenExpired,
                    _ => PlatformError::invalid_token("Invalid access token"),
                }
            })
    }

    /// True when the token expires within the refresh window.
    pub fn needs_refresh(&self, claims: &AccessTokenClaims, now: DateTime<Utc>) -> bool {
        claims.exp - now.timestamp() <= self.config.refresh_window_secs
    }

    pub fn expires_in(&self) -> i64 {
        self.config.access_token_ttl_secs
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}
