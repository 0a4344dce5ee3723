//! Refresh Token Entity
//!
//! Long-lived refresh credential. The raw value lives only in the client's
//! httpOnly cookie; the database keeps its SHA-256 hash.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Generate a raw token and the entity to persist for it.
    pub fn generate_token_pair(
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        ttl_secs: i64,
    ) -> (String, Self) {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let raw = hex::encode(bytes);

        let now = Utc::now();
        let entity = Self {
            id: super::new_id(),
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            token_hash: Self::hash_token(&raw),
            expires_at: now + Duration::seconds(ttl_secs),
            revoked: false,
            created_at: now,
        };
        (raw, entity)
    }

    pub fn hash_token(raw: &str) -> String {
        hex::encode(Sha256::digest(raw.as_bytes()))
    }
}
