//! Tenant scope
//!
//! Every persistence call on tenant-owned data takes a [`TenantScope`].
//! A scope can only be minted inside this crate: from a verified token
//! (see `AuthContext::scope`) or from a tenant row created during
//! registration. Handlers therefore cannot reach tenant data without one.

use crate::error::{PlatformError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    tenant_id: String,
}

impl TenantScope {
    pub(crate) fn new(tenant_id: impl Into<String>) -> Self {
        Self { tenant_id: tenant_id.into() }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Fails with `Forbidden` unless `owner_tenant_id` is this scope's tenant.
    pub fn ensure_owns(&self, entity_type: &str, owner_tenant_id: &str) -> Result<()> {
        if self.tenant_id == owner_tenant_id {
            Ok(())
        } else {
            Err(PlatformError::forbidden(format!(
                "{} belongs to a different tenant",
                entity_type
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_owns() {
        let scope = TenantScope::new("tenant-a");
        assert!(scope.ensure_owns("Template", "tenant-a").is_ok());

        let err = scope.ensure_owns("Template", "tenant-b").unwrap_err();
        assert!(matches!(err, PlatformError::Forbidden { .. }));
    }
}
