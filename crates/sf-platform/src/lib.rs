//! SigForge Platform
//!
//! Multi-tenant backend for email signature management:
//! - Tenant registration and settings
//! - Team management with admin/member roles
//! - Signature templates, a per-tenant default and user assignments
//! - Image asset uploads
//! - Session auth with short-lived access tokens and rotating refresh cookies
//! - Per-tenant activity feed
//!
//! All tenant-owned data is reached through a [`domain::TenantScope`], which
//! only a verified session (or registration) can produce.

pub mod domain;
pub mod repository;
pub mod service;
pub mod api;
pub mod error;
pub mod platform;

pub use domain::*;
pub use error::PlatformError;
pub use platform::Platform;
