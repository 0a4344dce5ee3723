//! API Layer
//!
//! REST endpoints for the platform. Every router except `auth` requires a
//! bearer token; the `Authenticated` extractor resolves it.

pub mod common;
pub mod middleware;
pub mod openapi;

pub mod auth;
pub mod tenants;
pub mod team;
pub mod templates;
pub mod assets;
pub mod dashboard;

pub use common::*;
pub use middleware::{AppState, Authenticated, OptionalBearer};
pub use openapi::PlatformApiDoc;

pub use auth::{AuthState, auth_router, REFRESH_COOKIE};
pub use tenants::{TenantsState, tenants_router};
pub use team::{TeamState, team_router};
pub use templates::{TemplatesState, templates_router};
pub use assets::{AssetsState, assets_router};
pub use dashboard::{DashboardState, dashboard_router};
