//! Platform wiring
//!
//! Builds repositories and services from configuration and assembles the
//! HTTP router. The server binary and the integration tests share this.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use sf_config::PlatformConfig;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    AppState, PlatformApiDoc,
    AuthState, auth_router,
    TenantsState, tenants_router,
    TeamState, team_router,
    TemplatesState, templates_router,
    AssetsState, assets_router,
    DashboardState, dashboard_router,
};
use crate::error::Result;
use crate::repository::{
    connect, init_schema, ActivityRepository, AssetRepository, RefreshTokenRepository,
    TemplateRepository, TenantRepository, UserRepository,
};
use crate::service::{
    ActivityService, Argon2Config, AssetStorage, AuthConfig, AuthService, AuthorizationService,
    CredentialService, PasswordPolicy, PasswordService,
};

/// Fully wired platform
pub struct Platform {
    config: PlatformConfig,
    pool: SqlitePool,
    tenant_repo: Arc<TenantRepository>,
    user_repo: Arc<UserRepository>,
    template_repo: Arc<TemplateRepository>,
    asset_repo: Arc<AssetRepository>,
    refresh_token_repo: Arc<RefreshTokenRepository>,
    password_service: Arc<PasswordService>,
    credentials: Arc<CredentialService>,
    activity: ActivityService,
    storage: Arc<AssetStorage>,
}

impl Platform {
    /// Open the configured database, create the schema and wire services.
    pub async fn connect(config: PlatformConfig) -> Result<Self> {
        info!(url = %config.database.url, "Connecting to database");
        let pool = connect(&config.database.url, config.database.max_connections).await?;
        init_schema(&pool).await?;
        Self::new(pool, config)
    }

    /// Wire services on an existing pool whose schema is already initialized.
    pub fn new(pool: SqlitePool, config: PlatformConfig) -> Result<Self> {
        let tenant_repo = Arc::new(TenantRepository::new(&pool));
        let user_repo = Arc::new(UserRepository::new(&pool));
        let template_repo = Arc::new(TemplateRepository::new(&pool));
        let asset_repo = Arc::new(AssetRepository::new(&pool));
        let activity_repo = Arc::new(ActivityRepository::new(&pool));
        let refresh_token_repo = Arc::new(RefreshTokenRepository::new(&pool));

        let auth_service = Arc::new(AuthService::new(AuthConfig::from_settings(&config.auth)));
        let authz_service = Arc::new(AuthorizationService::new(user_repo.clone()));
        let password_service = Arc::new(PasswordService::new(
            Argon2Config::from_settings(&config.auth),
            PasswordPolicy::default(),
        )?);
        let activity = ActivityService::new(activity_repo);
        let storage = Arc::new(AssetStorage::new(&config.uploads));

        let credentials = Arc::new(CredentialService::new(
            tenant_repo.clone(),
            user_repo.clone(),
            refresh_token_repo.clone(),
            auth_service,
            authz_service,
            password_service.clone(),
            activity.clone(),
            config.auth.refresh_token_ttl_secs,
        ));

        Ok(Self {
            config,
            pool,
            tenant_repo,
            user_repo,
            template_repo,
            asset_repo,
            refresh_token_repo,
            password_service,
            credentials,
            activity,
            storage,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Drop refresh tokens that are expired or revoked
    pub async fn purge_stale_tokens(&self) -> Result<u64> {
        let purged = self.refresh_token_repo.purge_stale(chrono::Utc::now()).await?;
        if purged > 0 {
            info!(purged, "Purged stale refresh tokens");
        }
        Ok(purged)
    }

    /// Build the complete HTTP router
    pub fn router(&self) -> Router {
        let app_state = AppState {
            credentials: self.credentials.clone(),
        };

        let auth_state = AuthState {
            credentials: self.credentials.clone(),
            cookie_secure: self.config.auth.cookie_secure,
            refresh_token_ttl_secs: self.config.auth.refresh_token_ttl_secs,
        };
        let tenants_state = TenantsState {
            tenant_repo: self.tenant_repo.clone(),
            asset_repo: self.asset_repo.clone(),
            storage: self.storage.clone(),
            activity: self.activity.clone(),
        };
        let team_state = TeamState {
            user_repo: self.user_repo.clone(),
            passwords: self.password_service.clone(),
            activity: self.activity.clone(),
        };
        let templates_state = TemplatesState {
            template_repo: self.template_repo.clone(),
            user_repo: self.user_repo.clone(),
            activity: self.activity.clone(),
        };
        let assets_state = AssetsState {
            asset_repo: self.asset_repo.clone(),
            storage: self.storage.clone(),
            activity: self.activity.clone(),
        };
        let dashboard_state = DashboardState {
            template_repo: self.template_repo.clone(),
            user_repo: self.user_repo.clone(),
            asset_repo: self.asset_repo.clone(),
            activity: self.activity.clone(),
        };

        let health_routes = Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .with_state(self.pool.clone());

        Router::new()
            .nest("/api/auth", auth_router(auth_state))
            .nest("/api/tenants", tenants_router(tenants_state))
            .nest("/api/team", team_router(team_state))
            .nest("/api/templates", templates_router(templates_state))
            .nest("/api/assets", assets_router(assets_state))
            .nest("/api/dashboard", dashboard_router(dashboard_state))
            .nest_service("/uploads", ServeDir::new(self.storage.dir()))
            .merge(health_routes)
            // OpenAPI / Swagger UI
            .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", PlatformApiDoc::openapi()))
            .layer(Extension(app_state))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&self.config.server.cors_allowed_origins))
    }
}

/// CORS for an explicit origin list with credentials allowed
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ready_handler(State(pool): State<SqlitePool>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({ "status": "READY" }))),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "NOT_READY" })),
            )
        }
    }
}
