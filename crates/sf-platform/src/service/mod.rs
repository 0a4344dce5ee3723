//! Service Layer
//!
//! Business logic services for the platform: password hashing, session
//! tokens, tenant-scoped authorization, the credential lifecycle, activity
//! logging and asset storage.

pub mod audit;
pub mod auth;
pub mod authorization;
pub mod credentials;
pub mod password;
pub mod storage;
pub mod validation;

pub use audit::ActivityService;
pub use auth::{AuthService, AuthConfig, AccessTokenClaims, extract_bearer_token};
pub use authorization::{AuthorizationService, AuthContext, checks};
pub use credentials::{CredentialService, RegisterInput, Session, RefreshOutcome};
pub use password::{PasswordService, PasswordPolicy, Argon2Config};
pub use storage::{AssetStorage, StoredFile};
pub use validation::Validator;
