//! SigForge Configuration
//!
//! Layered configuration for the platform server:
//! 1. Built-in defaults
//! 2. Optional TOML file
//! 3. `SF_*` environment variable overrides
//!
//! The result is validated before it is handed to the platform.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Minimum length of the token signing secret in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Origins allowed by CORS. Credentials are allowed, so `*` is not accepted.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://sigforge.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

/// Session token settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    /// Access tokens closer than this to expiry are reissued on refresh
    pub refresh_window_secs: i64,
    pub cookie_secure: bool,
    /// Argon2 memory cost in KiB
    pub password_memory_kib: u32,
    /// Argon2 time cost
    pub password_iterations: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "sigforge".to_string(),
            audience: "sigforge-api".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 86400 * 7,
            refresh_window_secs: 300,
            cookie_secure: true,
            password_memory_kib: 19 * 1024,
            password_iterations: 2,
        }
    }
}

/// Asset upload settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            max_bytes: 5 * 1024 * 1024,
            allowed_mime_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
        }
    }
}

/// Complete platform configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthSettings,
    pub uploads: UploadConfig,
}

impl PlatformConfig {
    /// Load configuration from an optional TOML file plus the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!(
            port = config.server.port,
            database = %config.database.url,
            upload_dir = %config.uploads.dir.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Parsing config file");
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `SF_*` overrides using the given lookup.
    ///
    /// Takes a lookup function rather than reading the environment directly so
    /// overrides can be exercised without touching process-global state.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SF_API_PORT") {
            self.server.port = parse_value("SF_API_PORT", &v)?;
        }
        if let Some(v) = lookup("SF_CORS_ALLOWED_ORIGINS") {
            self.server.cors_allowed_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("SF_DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = lookup("SF_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = lookup("SF_JWT_ISSUER") {
            self.auth.issuer = v;
        }
        if let Some(v) = lookup("SF_ACCESS_TOKEN_TTL_SECS") {
            self.auth.access_token_ttl_secs = parse_value("SF_ACCESS_TOKEN_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("SF_REFRESH_TOKEN_TTL_SECS") {
            self.auth.refresh_token_ttl_secs = parse_value("SF_REFRESH_TOKEN_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("SF_COOKIE_SECURE") {
            self.auth.cookie_secure = parse_bool("SF_COOKIE_SECURE", &v)?;
        }
        if let Some(v) = lookup("SF_PASSWORD_MEMORY_KIB") {
            self.auth.password_memory_kib = parse_value("SF_PASSWORD_MEMORY_KIB", &v)?;
        }
        if let Some(v) = lookup("SF_PASSWORD_ITERATIONS") {
            self.auth.password_iterations = parse_value("SF_PASSWORD_ITERATIONS", &v)?;
        }
        if let Some(v) = lookup("SF_UPLOAD_DIR") {
            self.uploads.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SF_MAX_UPLOAD_BYTES") {
            self.uploads.max_bytes = parse_value("SF_MAX_UPLOAD_BYTES", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret must be at least {} bytes (set SF_JWT_SECRET)",
                MIN_JWT_SECRET_LEN
            )));
        }
        if self.auth.access_token_ttl_secs <= 0 || self.auth.refresh_token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid("token lifetimes must be positive".to_string()));
        }
        if self.auth.refresh_window_secs >= self.auth.access_token_ttl_secs {
            return Err(ConfigError::Invalid(
                "auth.refresh_window_secs must be shorter than the access token lifetime".to_string(),
            ));
        }
        if self.server.cors_allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::Invalid(
                "wildcard CORS origin cannot be combined with credentialed requests".to_string(),
            ));
        }
        if self.auth.password_memory_kib < 8 || self.auth.password_iterations == 0 {
            return Err(ConfigError::Invalid("password hashing cost is too low".to_string()));
        }
        if self.uploads.max_bytes == 0 {
            return Err(ConfigError::Invalid("uploads.max_bytes must be non-zero".to_string()));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
