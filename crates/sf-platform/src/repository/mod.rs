//! Repository Layer
//!
//! SQLite repositories for all domain entities. Every method touching
//! tenant-owned rows takes a [`TenantScope`](crate::domain::TenantScope) and
//! filters on `tenant_id`.

pub mod schema;
pub mod tenant;
pub mod user;
pub mod template;
pub mod asset;
pub mod activity;
pub mod refresh_token;

pub use schema::{connect, init_schema};
pub use tenant::TenantRepository;
pub use user::UserRepository;
pub use template::{TemplateRepository, AssignmentRow};
pub use asset::AssetRepository;
pub use activity::ActivityRepository;
pub use refresh_token::RefreshTokenRepository;

use chrono::{DateTime, Utc};
use crate::error::{PlatformError, Result};

pub(crate) fn to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| PlatformError::internal(format!("Invalid timestamp: {}", ms)))
}

pub(crate) fn from_millis_opt(ms: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    ms.map(from_millis).transpose()
}
