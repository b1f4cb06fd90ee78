//! Turning resolved security into request material

use std::collections::HashMap;

use base64::Engine;
use reqwest::blocking::Client;
use tracing::{debug, warn};

use super::credentials::{Credential, CredentialStore};
use super::oauth2::{obtain_token, OAuth2Config, TokenCache};
use super::security::{choose_alternative, Alternative, ResolvedSecurity, SchemeBinding};
use crate::errors::{Result, SpecPulseError};
use crate::openapi::{ApiKeyLocation, SecurityScheme};
use crate::prompt::Prompter;

/// Headers, query pairs and cookies to add to a request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthMaterial {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    /// Scheme names that were applied
    pub applied: Vec<String>,
    /// Header, query and cookie names whose values must not be printed
    pub sensitive: Vec<String>,
}

impl AuthMaterial {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.query.is_empty() && self.cookies.is_empty()
    }

    fn header(&mut self, name: &str, value: String) {
        self.sensitive.push(name.to_ascii_lowercase());
        self.headers.push((name.to_string(), value));
    }
}

/// Run-wide authentication state: credentials, tokens, failures and choices
pub struct AuthContext {
    client: Client,
    credentials: CredentialStore,
    tokens: TokenCache,
    /// Schemes whose token exchange failed, with the reason
    failed: HashMap<String, String>,
    /// Alternative picked per requirement, so the user is asked once
    choices: HashMap<String, usize>,
}

impl AuthContext {
    pub fn new(client: Client) -> Self {
        Self::with_token_cache(client, TokenCache::new())
    }

    pub fn with_token_cache(client: Client, tokens: TokenCache) -> Self {
        Self {
            client,
            credentials: CredentialStore::new(),
            tokens,
            failed: HashMap::new(),
            choices: HashMap::new(),
        }
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    pub fn credentials_mut(&mut self) -> &mut CredentialStore {
        &mut self.credentials
    }

    /// Collect credentials as needed and produce the material for a request
    pub fn authorize(&mut self, security: &ResolvedSecurity, prompter: &mut dyn Prompter) -> Result<AuthMaterial> {
        match security {
            ResolvedSecurity::None => Ok(AuthMaterial::default()),
            ResolvedSecurity::Single(alt) => self.apply_alternative(alt, prompter),
            ResolvedSecurity::AnyOf(alternatives) => {
                let key = alternatives
                    .iter()
                    .map(Alternative::describe)
                    .collect::<Vec<_>>()
                    .join(" | ");
                let index = match self.choices.get(&key) {
                    Some(&i) => i,
                    None => {
                        let i = choose_alternative(alternatives, prompter)?;
                        self.choices.insert(key, i);
                        i
                    }
                };
                self.apply_alternative(&alternatives[index], prompter)
            }
        }
    }

    fn apply_alternative(&mut self, alt: &Alternative, prompter: &mut dyn Prompter) -> Result<AuthMaterial> {
        let mut material = AuthMaterial::default();

        for name in &alt.unresolved {
            prompter.warn(&format!(
                "Security scheme '{}' is not defined in the document; sending without it",
                name
            ));
        }

        for binding in &alt.bindings {
            self.apply_binding(binding, &mut material, prompter)?;
        }
        Ok(material)
    }

    fn apply_binding(
        &mut self,
        binding: &SchemeBinding,
        material: &mut AuthMaterial,
        prompter: &mut dyn Prompter,
    ) -> Result<()> {
        if let SecurityScheme::Unsupported { kind } = &binding.scheme {
            warn!(scheme = %binding.name, kind = %kind, "Unsupported security scheme");
            prompter.warn(&format!(
                "Security scheme '{}' ({}) is not supported; sending without it",
                binding.name, kind
            ));
            return Ok(());
        }

        if let Some(reason) = self.failed.get(&binding.name) {
            return Err(SpecPulseError::Auth(format!(
                "scheme '{}' failed earlier: {}",
                binding.name, reason
            )));
        }

        let Some(credential) = self.credentials.obtain(binding, prompter)? else {
            return Ok(());
        };

        match (&binding.scheme, credential) {
            (SecurityScheme::ApiKey { name, location }, Credential::ApiKey(key)) => {
                let value = key.expose().to_string();
                match location {
                    ApiKeyLocation::Header => material.header(name, value),
                    ApiKeyLocation::Query => {
                        material.sensitive.push(name.clone());
                        material.query.push((name.clone(), value));
                    }
                    ApiKeyLocation::Cookie => {
                        material.sensitive.push(name.clone());
                        material.cookies.push((name.clone(), value));
                    }
                }
            }
            (SecurityScheme::HttpBasic, Credential::Basic { username, password }) => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password.expose()));
                material.header("Authorization", format!("Basic {}", encoded));
            }
            (SecurityScheme::HttpBearer { .. }, Credential::Bearer(token)) => {
                material.header("Authorization", format!("Bearer {}", token.expose()));
            }
            (
                SecurityScheme::OAuth2ClientCredentials { .. },
                Credential::ClientCredentials { token_url, client_id, client_secret },
            ) => {
                let scopes = self.credentials.scopes_for(binding, prompter)?;
                let config = OAuth2Config { token_url, client_id, client_secret, scopes };
                let client = &self.client;
                match self.tokens.get_or_fetch(&config, |c| obtain_token(client, c)) {
                    Ok(token) => material.header("Authorization", token.authorization_header()),
                    Err(err) => {
                        self.failed.insert(binding.name.clone(), err.to_string());
                        return Err(err);
                    }
                }
            }
            (scheme, _) => {
                return Err(SpecPulseError::Auth(format!(
                    "stored credential does not match scheme '{}' ({})",
                    binding.name,
                    scheme.kind()
                )));
            }
        }

        debug!(scheme = %binding.name, "Applied security scheme");
        material.applied.push(binding.name.clone());
        Ok(())
    }
}
