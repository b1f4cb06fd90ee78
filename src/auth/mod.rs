//! Authentication handling
//!
//! Supported schemes:
//! - API key (header, query or cookie)
//! - HTTP Basic
//! - HTTP Bearer
//! - OAuth 2.0 Client Credentials
//!
//! Other declared schemes are reported and skipped.

pub mod apply;
pub mod credentials;
pub mod oauth2;
pub mod security;

pub use apply::{AuthContext, AuthMaterial};
pub use credentials::{Credential, CredentialStore, SecretString};
pub use oauth2::{obtain_token, CachedToken, Clock, OAuth2Config, SystemClock, TokenCache};
pub use security::{resolve_requirement, Alternative, ResolvedSecurity, SchemeBinding};
