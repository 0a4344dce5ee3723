//! Credential Service
//!
//! Session lifecycle: register, login, refresh, logout and logout-all.
//!
//! A session is a short-lived access token (bearer header) paired with a
//! long-lived refresh token (httpOnly cookie). Refresh tokens are rotated on
//! every use. Logout-all bumps the user's token version, which invalidates
//! every access token issued before it.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{RefreshToken, Tenant, TenantScope, User, UserRole};
use crate::error::{PlatformError, Result};
use crate::repository::{RefreshTokenRepository, TenantRepository, UserRepository};
use crate::service::audit::ActivityService;
use crate::service::auth::AuthService;
use crate::service::authorization::{AuthContext, AuthorizationService};
use crate::service::password::PasswordService;
use crate::service::validation::Validator;

/// Registration form
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub organization_name: String,
    pub domain: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// A newly issued session
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub expires_in: i64,
    /// Raw refresh token, to be placed in the cookie
    pub refresh_token: String,
    pub user: User,
    pub tenant: Tenant,
}

/// Result of a refresh request
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub expires_in: i64,
    /// Set when the refresh cookie was rotated
    pub refresh_token: Option<String>,
}

pub struct CredentialService {
    tenants: Arc<TenantRepository>,
    users: Arc<UserRepository>,
    refresh_tokens: Arc<RefreshTokenRepository>,
    auth: Arc<AuthService>,
    authz: Arc<AuthorizationService>,
    passwords: Arc<PasswordService>,
    activity: ActivityService,
    refresh_token_ttl_secs: i64,
}

impl CredentialService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenants: Arc<TenantRepository>,
        users: Arc<UserRepository>,
        refresh_tokens: Arc<RefreshTokenRepository>,
        auth: Arc<AuthService>,
        authz: Arc<AuthorizationService>,
        passwords: Arc<PasswordService>,
        activity: ActivityService,
        refresh_token_ttl_secs: i64,
    ) -> Self {
        Self {
            tenants,
            users,
            refresh_tokens,
            auth,
            authz,
            passwords,
            activity,
            refresh_token_ttl_secs,
        }
    }

    /// Create a tenant with its first admin and open a session for them.
    pub async fn register(&self, input: RegisterInput) -> Result<Session> {
        let mut validator = Validator::new();
        validator
            .required("organizationName", &input.organization_name)
            .max_len("organizationName", &input.organization_name, 200)
            .domain("domain", &input.domain)
            .required("firstName", &input.first_name)
            .max_len("firstName", &input.first_name, 100)
            .required("lastName", &input.last_name)
            .max_len("lastName", &input.last_name, 100)
            .email("email", &input.email);
        if let Err(reason) = self.passwords.policy().check(&input.password) {
            validator.add("password", reason);
        }
        validator.finish()?;

        let tenant = Tenant::new(input.organization_name.trim(), &input.domain);
        let hash = self.passwords.hash_password(&input.password).await?;
        let admin = User::new(
            &tenant.id,
            &input.email,
            hash,
            input.first_name.trim(),
            input.last_name.trim(),
            UserRole::Admin,
        );

        let scope = self.tenants.insert_with_admin(&tenant, &admin).await?;
        self.activity.log_register(&scope, &admin, &tenant.name).await;

        self.open_session(&scope, admin, tenant).await
    }

    /// Password login. Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                self.passwords.verify_dummy(password).await?;
                return Err(PlatformError::InvalidCredentials);
            }
        };

        if !self.passwords.verify_password(password, &user.password_hash).await? {
            info!(user_id = %user.id, "Login failed: wrong password");
            return Err(PlatformError::InvalidCredentials);
        }

        let scope = TenantScope::new(&user.tenant_id);
        let now = Utc::now();
        self.users.record_login(&scope, &user.id, now).await?;
        let user = User {
            last_login_at: Some(now),
            ..user
        };
        let tenant = self.tenants.get(&scope).await?;

        self.activity.log_login(&user).await;
        info!(user_id = %user.id, tenant_id = %user.tenant_id, "User logged in");
        self.open_session(&scope, user, tenant).await
    }

    /// Verify an access token and resolve the caller.
    pub async fn verify(&self, token: &str) -> Result<AuthContext> {
        let claims = self.auth.validate_token(token)?;
        self.authz.build_context(&claims).await
    }

    /// Reissue an access token.
    ///
    /// A valid bearer token outside the refresh window comes back unchanged.
    /// Otherwise the refresh cookie is consumed and rotated.
    pub async fn refresh(&self, bearer: Option<&str>, refresh_cookie: Option<&str>) -> Result<RefreshOutcome> {
        if let Some(token) = bearer {
            if let Ok(claims) = self.auth.validate_token(token) {
                if !self.auth.needs_refresh(&claims, Utc::now())
                    && self.authz.build_context(&claims).await.is_ok()
                {
                    return Ok(RefreshOutcome {
                        access_token: token.to_string(),
                        expires_in: claims.exp - Utc::now().timestamp(),
                        refresh_token: None,
                    });
                }
            }
        }

        let raw = refresh_cookie
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PlatformError::unauthorized("Missing refresh token"))?;
        let token_hash = RefreshToken::hash_token(raw);

        let stored = self
            .refresh_tokens
            .find_valid_by_hash(&token_hash, Utc::now())
            .await?
            .ok_or_else(|| PlatformError::invalid_token("Invalid or expired refresh token"))?;

        // Lost race with a concurrent refresh of the same token
        if !self.refresh_tokens.revoke_by_hash(&token_hash).await? {
            warn!(user_id = %stored.user_id, "Refresh token reused");
            return Err(PlatformError::invalid_token("Invalid or expired refresh token"));
        }

        let scope = TenantScope::new(&stored.tenant_id);
        let user = self
            .users
            .find(&scope, &stored.user_id)
            .await?
            .ok_or_else(|| PlatformError::invalid_token("User no longer exists"))?;

        let (raw_token, entity) =
            RefreshToken::generate_token_pair(&user.id, &user.tenant_id, self.refresh_token_ttl_secs);
        self.refresh_tokens.insert(&scope, &entity).await?;

        Ok(RefreshOutcome {
            access_token: self.auth.generate_access_token(&user)?,
            expires_in: self.auth.expires_in(),
            refresh_token: Some(raw_token),
        })
    }

    /// End this session by revoking the refresh token from the cookie.
    pub async fn logout(&self, ctx: &AuthContext, refresh_cookie: Option<&str>) -> Result<()> {
        if let Some(raw) = refresh_cookie.filter(|t| !t.is_empty()) {
            self.refresh_tokens.revoke_by_hash(&RefreshToken::hash_token(raw)).await?;
        }
        self.activity.log_logout(ctx).await;
        Ok(())
    }

    /// End every session of the caller.
    pub async fn logout_all(&self, ctx: &AuthContext) -> Result<()> {
        let scope = ctx.scope();
        let version = self.users.increment_token_version(&scope, &ctx.user_id).await?;
        let revoked = self.refresh_tokens.revoke_all_for_user(&scope, &ctx.user_id).await?;
        info!(
            user_id = %ctx.user_id,
            token_version = version,
            refresh_tokens_revoked = revoked,
            "All sessions revoked"
        );
        self.activity.log_logout_all(ctx).await;
        Ok(())
    }

    /// The caller's user and tenant
    pub async fn me(&self, ctx: &AuthContext) -> Result<(User, Tenant)> {
        let scope = ctx.scope();
        let user = self.users.get(&scope, &ctx.user_id).await?;
        let tenant = self.tenants.get(&scope).await?;
        Ok((user, tenant))
    }

    async fn open_session(&self, scope: &TenantScope, user: User, tenant: Tenant) -> Result<Session> {
        let (raw_token, entity) =
            RefreshToken::generate_token_pair(&user.id, &user.tenant_id, self.refresh_token_ttl_secs);
        self.refresh_tokens.insert(scope, &entity).await?;

        Ok(Session {
            access_token: self.auth.generate_access_token(&user)?,
            expires_in: self.auth.expires_in(),
            refresh_token: raw_token,
            user,
            tenant,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{connect, init_schema, ActivityRepository};
    use crate::service::auth::AuthConfig;
    use crate::service::password::{Argon2Config, PasswordPolicy};

    async fn service() -> CredentialService {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        init_schema(&pool).await.unwrap();

        let users = Arc::new(UserRepository::new(&pool));
        let auth = Arc::new(AuthService::new(AuthConfig {
            secret: "0123456789abcdef0123456789abcdef".to_string(),
            issuer: "sigforge".to_string(),
            audience: "sigforge-api".to_string(),
            access_token_ttl_secs: 900,
            refresh_window_secs: 300,
        }));
        let passwords = Arc::new(
            PasswordService::new(
                Argon2Config { memory_kib: 64, iterations: 1, parallelism: 1 },
                PasswordPolicy::default(),
            )
            .unwrap(),
        );

        CredentialService::new(
            Arc::new(TenantRepository::new(&pool)),
            users.clone(),
            Arc::new(RefreshTokenRepository::new(&pool)),
            auth,
            Arc::new(AuthorizationService::new(users)),
            passwords,
            ActivityService::new(Arc::new(ActivityRepository::new(&pool))),
            3600,
        )
    }

    fn acme() -> RegisterInput {
        RegisterInput {
            organization_name: "Acme".to_string(),
            domain: "acme.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Admin".to_string(),
            email: "a@acme.com".to_string(),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let svc = service().await;
        let session = svc.register(acme()).await.unwrap();
        assert_eq!(session.user.role, UserRole::Admin);
        assert_eq!(session.tenant.domain, "acme.com");

        let ctx = svc.verify(&session.access_token).await.unwrap();
        assert_eq!(ctx.tenant_id, session.tenant.id);

        let login = svc.login("A@ACME.COM", "password123").await.unwrap();
        assert!(login.user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_register_validation() {
        let svc = service().await;
        let mut input = acme();
        input.email = "not-an-email".to_string();
        input.password = "short".to_string();

        match svc.register(input).await {
            Err(PlatformError::InvalidFields(fields)) => assert_eq!(fields.len(), 2),
            other => panic!("unexpected: {:?}", other.map(|s| s.user.email)),
        }
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let svc = service().await;
        svc.register(acme()).await.unwrap();

        let unknown = svc.login("nobody@acme.com", "password123").await.unwrap_err();
        let wrong = svc.login("a@acme.com", "wrong-password").await.unwrap_err();
        assert!(matches!(unknown, PlatformError::InvalidCredentials));
        assert!(matches!(wrong, PlatformError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_refresh_returns_fresh_bearer_unchanged() {
        let svc = service().await;
        let session = svc.register(acme()).await.unwrap();

        let outcome = svc.refresh(Some(&session.access_token), None).await.unwrap();
        assert_eq!(outcome.access_token, session.access_token);
        assert!(outcome.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rotates_cookie() {
        let svc = service().await;
        let session = svc.register(acme()).await.unwrap();

        let outcome = svc.refresh(None, Some(&session.refresh_token)).await.unwrap();
        let rotated = outcome.refresh_token.unwrap();
        assert_ne!(rotated, session.refresh_token);
        svc.verify(&outcome.access_token).await.unwrap();

        // The old cookie is spent
        assert!(svc.refresh(None, Some(&session.refresh_token)).await.is_err());
        assert!(svc.refresh(None, Some(&rotated)).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_without_credentials() {
        let svc = service().await;
        assert!(matches!(
            svc.refresh(None, None).await,
            Err(PlatformError::Unauthorized { .. })
        ));
        assert!(matches!(
            svc.refresh(Some("garbage"), Some("unknown")).await,
            Err(PlatformError::InvalidToken { .. })
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_cookie() {
        let svc = service().await;
        let session = svc.register(acme()).await.unwrap();
        let ctx = svc.verify(&session.access_token).await.unwrap();

        svc.logout(&ctx, Some(&session.refresh_token)).await.unwrap();
        assert!(svc.refresh(None, Some(&session.refresh_token)).await.is_err());
    }

    #[tokio::test]
    async fn test_logout_all_invalidates_tokens() {
        let svc = service().await;
        let first = svc.register(acme()).await.unwrap();
        let second = svc.login("a@acme.com", "password123").await.unwrap();
        let ctx = svc.verify(&first.access_token).await.unwrap();

        svc.logout_all(&ctx).await.unwrap();

        assert!(svc.verify(&first.access_token).await.is_err());
        assert!(svc.verify(&second.access_token).await.is_err());
        assert!(svc.refresh(None, Some(&second.refresh_token)).await.is_err());
        assert!(svc.refresh(Some(&first.access_token), None).await.is_err());

        let again = svc.login("a@acme.com", "password123").await.unwrap();
        assert_eq!(svc.verify(&again.access_token).await.unwrap().token_version, 1);
    }

    #[tokio::test]
    async fn test_me() {
        let svc = service().await;
        let session = svc.register(acme()).await.unwrap();
        let ctx = svc.verify(&session.access_token).await.unwrap();

        let (user, tenant) = svc.me(&ctx).await.unwrap();
        assert_eq!(user.email, "a@acme.com");
        assert_eq!(tenant.name, "Acme");
    }
}
