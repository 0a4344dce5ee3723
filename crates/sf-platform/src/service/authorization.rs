//! Authorization
//!
//! Turns verified token claims into an [`AuthContext`] and provides the
//! role and tenant checks used by the handlers.

use std::sync::Arc;
use tracing::debug;

use crate::domain::{TenantScope, User, UserRole};
use crate::error::{PlatformError, Result};
use crate::repository::UserRepository;
use crate::service::auth::AccessTokenClaims;

/// The authenticated caller.
///
/// The tenant comes from the verified token and the role from the user's
/// current row, never from client input.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub tenant_id: String,
    pub email: String,
    pub role: UserRole,
    pub token_version: i64,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            tenant_id: user.tenant_id.clone(),
            email: user.email.clone(),
            role: user.role,
            token_version: user.token_version,
        }
    }

    /// Scope for every persistence call made on behalf of this caller
    pub fn scope(&self) -> TenantScope {
        TenantScope::new(&self.tenant_id)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

pub struct AuthorizationService {
    users: Arc<UserRepository>,
}

impl AuthorizationService {
    pub fn new(users: Arc<UserRepository>) -> Self {
        Self { users }
    }

    /// Resolve claims against the user's stored state.
    ///
    /// Rejects tokens whose user is gone or whose token version has been
    /// bumped by a logout-all.
    pub async fn build_context(&self, claims: &AccessTokenClaims) -> Result<AuthContext> {
        let scope = TenantScope::new(&claims.tenant_id);
        let user = self
            .users
            .find(&scope, &claims.sub)
            .await?
            .ok_or_else(|| PlatformError::invalid_token("User no longer exists"))?;

        if user.token_version != claims.token_version {
            debug!(
                user_id = %user.id,
                token_version = claims.token_version,
                current_version = user.token_version,
                "Rejected revoked token"
            );
            return Err(PlatformError::invalid_token("Token has been revoked"));
        }

        Ok(AuthContext::from_user(&user))
    }
}

/// Authorization checks
pub mod checks {
    use super::*;

    /// Require the admin role
    pub fn require_admin(ctx: &AuthContext) -> Result<()> {
        if ctx.is_admin() {
            Ok(())
        } else {
            Err(PlatformError::forbidden("Admin role required"))
        }
    }

    /// Require that a tenant id named by the request is the caller's tenant
    pub fn require_tenant(ctx: &AuthContext, tenant_id: &str) -> Result<()> {
        if ctx.tenant_id == tenant_id {
            Ok(())
        } else {
            Err(PlatformError::forbidden("Access to this tenant is not allowed"))
        }
    }

    /// Same as [`require_tenant`], for an optional tenant id in a request body
    pub fn require_body_tenant(ctx: &AuthContext, tenant_id: Option<&str>) -> Result<()> {
        match tenant_id {
            Some(id) => require_tenant(ctx, id),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tenant;
    use crate::repository::{connect, init_schema, TenantRepository};

    fn claims_for(user: &User) -> AccessTokenClaims {
        AccessTokenClaims {
            sub: user.id.clone(),
            tenant_id: user.tenant_id.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            token_version: user.token_version,
            iat: 0,
            exp: 0,
            iss: "sigforge".to_string(),
            aud: "sigforge-api".to_string(),
        }
    }

    fn ctx(tenant_id: &str, role: UserRole) -> AuthContext {
        AuthContext {
            user_id: "u1".to_string(),
            tenant_id: tenant_id.to_string(),
            email: "u1@acme.com".to_string(),
            role,
            token_version: 0,
        }
    }

    #[tokio::test]
    async fn test_build_context_checks_token_version() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        init_schema(&pool).await.unwrap();
        let tenant = Tenant::new("Acme", "acme.com");
        let admin = User::new(&tenant.id, "a@acme.com", "h", "A", "A", UserRole::Admin);
        let scope = TenantRepository::new(&pool).insert_with_admin(&tenant, &admin).await.unwrap();

        let users = Arc::new(UserRepository::new(&pool));
        let authz = AuthorizationService::new(users.clone());
        let claims = claims_for(&admin);

        let ctx = authz.build_context(&claims).await.unwrap();
        assert!(ctx.is_admin());
        assert_eq!(ctx.scope(), scope);

        users.increment_token_version(&scope, &admin.id).await.unwrap();
        assert!(matches!(
            authz.build_context(&claims).await,
            Err(PlatformError::InvalidToken { .. })
        ));
    }

    #[tokio::test]
    async fn test_build_context_rejects_tenant_mismatch() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        init_schema(&pool).await.unwrap();
        let tenant = Tenant::new("Acme", "acme.com");
        let admin = User::new(&tenant.id, "a@acme.com", "h", "A", "A", UserRole::Admin);
        TenantRepository::new(&pool).insert_with_admin(&tenant, &admin).await.unwrap();

        let authz = AuthorizationService::new(Arc::new(UserRepository::new(&pool)));
        let mut claims = claims_for(&admin);
        claims.tenant_id = "another-tenant".to_string();
        assert!(authz.build_context(&claims).await.is_err());
    }

    #[test]
    fn test_require_admin() {
        assert!(checks::require_admin(&ctx("t1", UserRole::Admin)).is_ok());
        assert!(matches!(
            checks::require_admin(&ctx("t1", UserRole::Member)),
            Err(PlatformError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_require_tenant() {
        let ctx = ctx("t1", UserRole::Member);
        assert!(checks::require_tenant(&ctx, "t1").is_ok());
        assert!(checks::require_tenant(&ctx, "t2").is_err());
        assert!(checks::require_body_tenant(&ctx, None).is_ok());
        assert!(checks::require_body_tenant(&ctx, Some("t2")).is_err());
    }
}
