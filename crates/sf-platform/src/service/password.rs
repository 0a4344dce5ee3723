//! Password Service
//!
//! Argon2id hashing in PHC string format, plus the password policy.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;

use sf_config::AuthSettings;
use tokio::task;
use tracing::warn;

use crate::error::{PlatformError, Result};

/// Argon2 cost parameters
#[derive(Debug, Clone)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        // OWASP minimum for Argon2id
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Argon2Config {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self {
            memory_kib: settings.password_memory_kib,
            iterations: settings.password_iterations,
            parallelism: 1,
        }
    }
}

/// Password rules applied on registration and invite
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

impl PasswordPolicy {
    /// Returns a human-readable reason when the password is rejected.
    pub fn check(&self, password: &str) -> std::result::Result<(), String> {
        let len = password.chars().count();
        if len < self.min_length {
            return Err(format!("must be at least {} characters", self.min_length));
        }
        if len > self.max_length {
            return Err(format!("must be at most {} characters", self.max_length));
        }
        if password.trim().is_empty() {
            return Err("must not be blank".to_string());
        }
        Ok(())
    }
}

/// Argon2 work runs on the blocking pool so hashing never stalls the
/// async workers.
pub struct PasswordService {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
    /// Hash verified against when the account does not exist, so a missing
    /// user costs the same as a wrong password.
    dummy_hash: Arc<str>,
}

impl PasswordService {
    pub fn new(config: Argon2Config, policy: PasswordPolicy) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| PlatformError::Configuration {
                message: format!("Invalid Argon2 parameters: {}", e),
            })?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, "sigforge-dummy-password")?.into();

        Ok(Self {
            argon2,
            policy,
            dummy_hash,
        })
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();
        task::spawn_blocking(move || hash_with(&argon2, &password))
            .await
            .map_err(|e| PlatformError::internal(format!("Password hashing task failed: {}", e)))?
    }

    /// Check a password against a stored PHC hash. Malformed hashes never match.
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        task::spawn_blocking(move || verify_with(&argon2, &password, &hash))
            .await
            .map_err(|e| PlatformError::internal(format!("Password verification task failed: {}", e)))
    }

    /// Burn a verification against the dummy hash. Always false.
    pub async fn verify_dummy(&self, password: &str) -> Result<bool> {
        let hash = self.dummy_hash.clone();
        self.verify_password(password, &hash).await?;
        Ok(false)
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PlatformError::internal(format!("Failed to hash password: {}", e)))
}

fn verify_with(argon2: &Argon2<'_>, password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}
