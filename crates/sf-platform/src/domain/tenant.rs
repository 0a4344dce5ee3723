//! Tenant Entity
//!
//! An isolated organization owning its own users, templates and assets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Subscription plan of a tenant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TenantPlan {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl TenantPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "pro" => Some(Self::Pro),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    /// Organization domain, unique across tenants, stored lower-cased
    pub domain: String,
    pub plan: TenantPlan,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: impl Into<String>, domain: &str) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            name: name.into(),
            domain: normalize_domain(domain),
            plan: TenantPlan::Free,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_plan(mut self, plan: TenantPlan) -> Self {
        self.plan = plan;
        self
    }
}

pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_creation() {
        let tenant = Tenant::new("Acme", " Acme.COM ");
        assert_eq!(tenant.domain, "acme.com");
        assert_eq!(tenant.plan, TenantPlan::Free);
        assert_eq!(tenant.created_at, tenant.updated_at);
    }

    #[test]
    fn test_plan_parse() {
        assert_eq!(TenantPlan::parse("PRO"), Some(TenantPlan::Pro));
        assert_eq!(TenantPlan::parse("gold"), None);
        assert_eq!(TenantPlan::Enterprise.as_str(), "enterprise");
    }
}
