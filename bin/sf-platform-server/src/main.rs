//! SigForge Platform Server
//!
//! Serves the platform REST APIs:
//! - Auth: register, login, refresh, logout, me
//! - Tenant APIs: tenant settings, team, templates, assets, dashboard
//! - Monitoring: health, ready, OpenAPI
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SF_CONFIG` | - | Path to a TOML config file |
//! | `SF_API_PORT` | `8080` | HTTP API port |
//! | `SF_DATABASE_URL` | `sqlite://sigforge.db?mode=rwc` | SQLite connection URL |
//! | `SF_JWT_SECRET` | - | HS256 signing secret, at least 32 bytes |
//! | `SF_JWT_ISSUER` | `sigforge` | JWT issuer claim |
//! | `SF_ACCESS_TOKEN_TTL_SECS` | `900` | Access token lifetime |
//! | `SF_REFRESH_TOKEN_TTL_SECS` | `604800` | Refresh token lifetime |
//! | `SF_COOKIE_SECURE` | `true` | Mark the refresh cookie `Secure` |
//! | `SF_PASSWORD_MEMORY_KIB` | `19456` | Argon2 memory cost |
//! | `SF_PASSWORD_ITERATIONS` | `2` | Argon2 iterations |
//! | `SF_CORS_ALLOWED_ORIGINS` | `http://localhost:5173` | Comma-separated origin list |
//! | `SF_UPLOAD_DIR` | `uploads` | Directory for stored assets |
//! | `SF_MAX_UPLOAD_BYTES` | `5242880` | Upload size limit |
//! | `RUST_LOG` | `info` | Log level |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sf_config::PlatformConfig;
use sf_platform::Platform;

/// Refresh-token housekeeping interval
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Parser, Debug)]
#[command(name = "sf-platform-server")]
#[command(about = "SigForge Platform Server")]
struct Args {
    /// Optional TOML config file; SF_* variables override it
    #[arg(long, env = "SF_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    let args = Args::parse();
    info!("Starting SigForge Platform Server");

    let config = PlatformConfig::load(args.config.as_deref())?;
    tokio::fs::create_dir_all(&config.uploads.dir).await?;
    let port = config.server.port;

    let platform = Arc::new(Platform::connect(config).await?);
    let app = platform.router();

    let purge_platform = platform.clone();
    let purge_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = purge_platform.purge_stale_tokens().await {
                warn!(error = %e, "Refresh token purge failed");
            }
        }
    });

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge_task.abort();
    platform.pool().close().await;
    info!("SigForge Platform Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received...");
}
