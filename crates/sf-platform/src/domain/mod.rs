//! Domain Models
//!
//! Core entities of the signature platform. Every entity except [`Tenant`]
//! belongs to exactly one tenant, directly or through its parent row.
//! IDs are UUID v4 strings.

pub mod tenant;
pub mod scope;
pub mod user;
pub mod template;
pub mod asset;
pub mod activity;
pub mod refresh_token;

pub use tenant::*;
pub use scope::*;
pub use user::*;
pub use template::*;
pub use asset::*;
pub use activity::*;
pub use refresh_token::*;

/// Generate a new entity id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
