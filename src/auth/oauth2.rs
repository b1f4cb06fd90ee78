//! OAuth 2.0 Client Credentials Flow
//!
//! Tokens are obtained with a form-encoded `client_credentials` grant and
//! kept in a [`TokenCache`] owned by the run.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::credentials::SecretString;
use crate::errors::{error_chain, Result, SpecPulseError};

/// Tokens are considered expired this long before they actually are
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// OAuth 2.0 client credentials configuration
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub scopes: Vec<String>,
}

/// OAuth 2.0 token response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// OAuth 2.0 error response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenError {
    pub error: String,
    pub error_description: Option<String>,
}

/// Cached token with expiration tracking
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: String,
    pub token_type: String,
    pub obtained_at: Instant,
    pub expires_in: Option<Duration>,
}

impl CachedToken {
    pub fn from_response(response: TokenResponse, obtained_at: Instant) -> Self {
        let token_type = match response.token_type {
            Some(t) if !t.is_empty() && !t.eq_ignore_ascii_case("bearer") => t,
            _ => "Bearer".to_string(),
        };
        Self {
            access_token: response.access_token,
            token_type,
            obtained_at,
            expires_in: response.expires_in.map(Duration::from_secs),
        }
    }

    /// Tokens without `expires_in` stay valid for the whole run
    pub fn is_valid_at(&self, now: Instant) -> bool {
        match self.expires_in {
            Some(expires_in) => {
                now.saturating_duration_since(self.obtained_at) < expires_in.saturating_sub(EXPIRY_MARGIN)
            }
            None => true,
        }
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Source of the current time, replaceable in tests
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Run-scoped token cache keyed by (token URL, client id, secret hash, scopes)
pub struct TokenCache {
    tokens: HashMap<String, CachedToken>,
    clock: Box<dyn Clock>,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            tokens: HashMap::new(),
            clock: Box::new(clock),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Return a valid cached token or fetch (and cache) a new one
    pub fn get_or_fetch<F>(&mut self, config: &OAuth2Config, fetch: F) -> Result<CachedToken>
    where
        F: FnOnce(&OAuth2Config) -> Result<TokenResponse>,
    {
        let key = cache_key(config);
        let now = self.clock.now();

        if let Some(cached) = self.tokens.get(&key) {
            if cached.is_valid_at(now) {
                debug!(token_url = %config.token_url, "Reusing cached OAuth2 token");
                return Ok(cached.clone());
            }
            debug!(token_url = %config.token_url, "Cached OAuth2 token expired");
        }

        let response = fetch(config)?;
        let token = CachedToken::from_response(response, now);
        self.tokens.insert(key, token.clone());
        Ok(token)
    }
}

fn cache_key(config: &OAuth2Config) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config.client_secret.expose().as_bytes());
    let secret_hash = hex::encode(hasher.finalize());

    let mut scopes = config.scopes.clone();
    scopes.sort();
    scopes.dedup();

    format!(
        "{}:{}:{}:{}",
        config.token_url,
        config.client_id,
        secret_hash,
        scopes.join(",")
    )
}

/// Exchange client id/secret for an access token. One attempt, no retries.
pub fn obtain_token(client: &Client, config: &OAuth2Config) -> Result<TokenResponse> {
    let mut form = vec![
        ("grant_type", "client_credentials".to_string()),
        ("client_id", config.client_id.clone()),
        ("client_secret", config.client_secret.expose().to_string()),
    ];
    if !config.scopes.is_empty() {
        form.push(("scope", config.scopes.join(" ")));
    }

    info!(token_url = %config.token_url, client_id = %config.client_id, "Requesting OAuth2 token");

    let response = client
        .post(&config.token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&form)
        .send()
        .map_err(|e| SpecPulseError::Auth(format!("token request to {} failed: {}", config.token_url, error_chain(&e))))?;

    let status = response.status();
    let body = response
        .text()
        .map_err(|e| SpecPulseError::Auth(format!("cannot read token response: {}", e)))?;

    if !status.is_success() {
        if let Ok(error) = serde_json::from_str::<TokenError>(&body) {
            let msg = match error.error_description {
                Some(desc) => format!("{}: {}", error.error, desc),
                None => error.error,
            };
            return Err(SpecPulseError::Auth(format!("OAuth2 token request failed: {}", msg)));
        }
        return Err(SpecPulseError::Auth(format!(
            "OAuth2 token request failed with status {}: {}",
            status, body
        )));
    }

    serde_json::from_str::<TokenResponse>(&body)
        .map_err(|e| SpecPulseError::Auth(format!("failed to parse token response: {}", e)))
}
