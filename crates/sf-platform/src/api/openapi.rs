//! OpenAPI Documentation
//!
//! Central OpenAPI specification for the platform API.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Platform API OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SigForge Platform API",
        version = "1.0.0",
        description = "REST APIs for tenants, users, signature templates and assets"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Registration and sessions"),
        (name = "tenants", description = "Tenant settings"),
        (name = "team", description = "Users of the tenant"),
        (name = "templates", description = "Signature templates and assignments"),
        (name = "assets", description = "Uploaded images"),
        (name = "dashboard", description = "Counters and activity feed")
    ),
    paths(
        // Auth API
        super::auth::register,
        super::auth::login,
        super::auth::refresh,
        super::auth::logout,
        super::auth::logout_all,
        super::auth::me,
        // Tenants API
        super::tenants::get_tenant,
        super::tenants::update_tenant,
        super::tenants::delete_tenant,
        // Team API
        super::team::list_users,
        super::team::invite_user,
        super::team::get_user,
        super::team::update_role,
        super::team::remove_user,
        // Templates API
        super::templates::list_templates,
        super::templates::create_template,
        super::templates::get_template,
        super::templates::update_template,
        super::templates::delete_template,
        super::templates::set_default_template,
        super::templates::list_assignments,
        super::templates::assign_template,
        super::templates::unassign_template,
        // Assets API
        super::assets::list_assets,
        super::assets::upload_asset,
        super::assets::get_asset,
        super::assets::delete_asset,
        // Dashboard API
        super::dashboard::stats,
        super::dashboard::recent_activity,
    ),
    components(
        schemas(
            super::auth::RegisterRequest,
            super::auth::LoginRequest,
            super::auth::AuthResponse,
            super::auth::RefreshResponse,
            super::auth::MeResponse,
            super::tenants::UpdateTenantRequest,
            super::team::InviteUserRequest,
            super::team::UpdateRoleRequest,
            super::templates::CreateTemplateRequest,
            super::templates::UpdateTemplateRequest,
            super::templates::AssignTemplateRequest,
            super::templates::TemplateResponse,
            super::templates::AssignmentResponse,
            super::assets::AssetResponse,
            super::assets::UploadForm,
            super::dashboard::DashboardStats,
            super::dashboard::ActivityResponse,
            // Common schemas
            super::common::ApiError,
            super::common::CreatedResponse,
            super::common::SuccessResponse,
            super::common::UserResponse,
            super::common::TenantResponse,
            crate::error::FieldError,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct PlatformApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = PlatformApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/auth/register",
            "/api/auth/logout-all",
            "/api/tenants/{tenant_id}",
            "/api/team/{id}/role",
            "/api/templates/{id}/assignments/{user_id}",
            "/api/assets",
            "/api/dashboard/activity",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {}", expected);
        }
    }
}
