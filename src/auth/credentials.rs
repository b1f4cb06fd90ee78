//! User-supplied credentials, kept in memory for the run only

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::security::SchemeBinding;
use crate::errors::Result;
use crate::openapi::{ApiKeyLocation, SecurityScheme};
use crate::prompt::Prompter;

/// A string that redacts its value in Debug and Display output
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "SecretString(\"\")")
        } else {
            write!(f, "SecretString(\"[REDACTED]\")")
        }
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, "[REDACTED]")
        }
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        SecretString(s.to_string())
    }
}

/// Credential material for one scheme
#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    ApiKey(SecretString),
    Basic {
        username: String,
        password: SecretString,
    },
    Bearer(SecretString),
    ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: SecretString,
    },
}

/// One value the user has to provide for a scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialField {
    pub label: String,
    pub secret: bool,
    pub default: Option<String>,
}

impl CredentialField {
    fn plain(label: impl Into<String>, default: Option<String>) -> Self {
        Self { label: label.into(), secret: false, default }
    }

    fn secret(label: impl Into<String>) -> Self {
        Self { label: label.into(), secret: true, default: None }
    }
}

/// What to ask for to satisfy `scheme`
pub fn credential_fields(scheme: &SecurityScheme, requested_scopes: &[String]) -> Vec<CredentialField> {
    match scheme {
        SecurityScheme::ApiKey { name, location } => {
            let place = match location {
                ApiKeyLocation::Header => "header",
                ApiKeyLocation::Query => "query",
                ApiKeyLocation::Cookie => "cookie",
            };
            vec![CredentialField::secret(format!("API key for '{}' (in {})", name, place))]
        }
        SecurityScheme::HttpBasic => vec![
            CredentialField::plain("Basic auth username", None),
            CredentialField::secret("Basic auth password"),
        ],
        SecurityScheme::HttpBearer { bearer_format } => {
            let label = match bearer_format {
                Some(format) => format!("Bearer token ({})", format),
                None => "Bearer token".to_string(),
            };
            vec![CredentialField::secret(label)]
        }
        SecurityScheme::OAuth2ClientCredentials { token_url, .. } => {
            let scope_default = (!requested_scopes.is_empty()).then(|| requested_scopes.join(" "));
            vec![
                CredentialField::plain("OAuth2 token URL", Some(token_url.clone())),
                CredentialField::plain("OAuth2 client ID", None),
                CredentialField::secret("OAuth2 client secret"),
                CredentialField::plain("OAuth2 scope (space-separated, optional)", scope_default),
            ]
        }
        SecurityScheme::Unsupported { .. } => Vec::new(),
    }
}

/// Credentials collected so far, one per scheme name.
///
/// Never written anywhere; dropped with the run.
#[derive(Debug, Default)]
pub struct CredentialStore {
    credentials: HashMap<String, Credential>,
    /// OAuth2 scope answers keyed by scheme name and the requested scope set
    scopes: HashMap<(String, Vec<String>), Vec<String>>,
}

fn scope_key(binding: &SchemeBinding) -> (String, Vec<String>) {
    let mut requested = binding.scopes.clone();
    requested.sort();
    requested.dedup();
    (binding.name.clone(), requested)
}

fn split_scopes(answer: &str) -> Vec<String> {
    answer.split_whitespace().map(|s| s.to_string()).collect()
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, scheme_name: &str) -> Option<&Credential> {
        self.credentials.get(scheme_name)
    }

    pub fn insert(&mut self, scheme_name: impl Into<String>, credential: Credential) {
        self.credentials.insert(scheme_name.into(), credential);
    }

    /// Return the stored credential for the binding, prompting on first use.
    /// `None` for schemes that take no credential.
    pub fn obtain(&mut self, binding: &SchemeBinding, prompter: &mut dyn Prompter) -> Result<Option<Credential>> {
        if let Some(existing) = self.credentials.get(&binding.name) {
            return Ok(Some(existing.clone()));
        }

        let fields = credential_fields(&binding.scheme, &binding.scopes);
        if fields.is_empty() {
            return Ok(None);
        }

        prompter.info(&format!(
            "--- Authentication: {} ({}) ---",
            binding.name,
            binding.scheme.kind()
        ));

        let mut answers = Vec::with_capacity(fields.len());
        for field in &fields {
            let answer = if field.secret {
                prompter.secret(&field.label)?
            } else {
                SecretString::from(prompter.text(&field.label, field.default.as_deref())?)
            };
            answers.push(answer);
        }

        if let SecurityScheme::OAuth2ClientCredentials { .. } = binding.scheme {
            if let Some(scope) = answers.pop() {
                self.scopes.insert(scope_key(binding), split_scopes(scope.expose()));
            }
        }

        let credential = build_credential(&binding.scheme, answers);
        debug!(scheme = %binding.name, "Credential collected");
        if let Some(ref c) = credential {
            self.credentials.insert(binding.name.clone(), c.clone());
        }
        Ok(credential)
    }

    /// Scopes to request for an OAuth2 binding.
    ///
    /// The scope is asked again whenever a requirement names a scope set not
    /// seen before for the scheme; the requirement's scopes are the default.
    pub fn scopes_for(&mut self, binding: &SchemeBinding, prompter: &mut dyn Prompter) -> Result<Vec<String>> {
        let key = scope_key(binding);
        if let Some(scopes) = self.scopes.get(&key) {
            return Ok(scopes.clone());
        }

        let default = (!binding.scopes.is_empty()).then(|| binding.scopes.join(" "));
        let answer = prompter.text(
            &format!("OAuth2 scope for '{}' (space-separated, optional)", binding.name),
            default.as_deref(),
        )?;
        let scopes = split_scopes(&answer);
        debug!(scheme = %binding.name, scopes = ?scopes, "Scope collected");
        self.scopes.insert(key, scopes.clone());
        Ok(scopes)
    }
}

fn build_credential(scheme: &SecurityScheme, answers: Vec<SecretString>) -> Option<Credential> {
    let mut it = answers.into_iter();
    let mut next = || it.next().unwrap_or_default();

    match scheme {
        SecurityScheme::ApiKey { .. } => Some(Credential::ApiKey(next())),
        SecurityScheme::HttpBasic => {
            let username = next().expose().to_string();
            Some(Credential::Basic { username, password: next() })
        }
        SecurityScheme::HttpBearer { .. } => Some(Credential::Bearer(next())),
        SecurityScheme::OAuth2ClientCredentials { .. } => {
            let token_url = next().expose().trim().to_string();
            let client_id = next().expose().trim().to_string();
            let client_secret = next();
            Some(Credential::ClientCredentials { token_url, client_id, client_secret })
        }
        SecurityScheme::Unsupported { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;

    fn binding(name: &str, scheme: SecurityScheme, scopes: &[&str]) -> SchemeBinding {
        SchemeBinding {
            name: name.to_string(),
            scheme,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = SecretString::from("hunter2");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(format!("{:?}", secret), "SecretString(\"[REDACTED]\")");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_prompts_once_per_scheme() {
        let mut store = CredentialStore::new();
        let mut prompter = ScriptedPrompter::new(["alice", "s3cret"]);
        let b = binding("basicAuth", SecurityScheme::HttpBasic, &[]);

        let first = store.obtain(&b, &mut prompter).unwrap().unwrap();
        let second = store.obtain(&b, &mut prompter).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(prompter.questions.len(), 2);
        match first {
            Credential::Basic { username, password } => {
                assert_eq!(username, "alice");
                assert_eq!(password.expose(), "s3cret");
            }
            other => panic!("unexpected credential {:?}", other),
        }
    }

    fn oauth_scheme() -> SecurityScheme {
        SecurityScheme::OAuth2ClientCredentials {
            token_url: "https://auth.example.com/token".to_string(),
            scopes: vec!["read".to_string(), "write".to_string()],
        }
    }

    #[test]
    fn test_oauth_defaults_come_from_spec() {
        let mut store = CredentialStore::new();
        let mut prompter = ScriptedPrompter::new(["", "client-1", "secret-1", ""]);
        let b = binding("oauth", oauth_scheme(), &["read"]);

        let credential = store.obtain(&b, &mut prompter).unwrap().unwrap();
        assert_eq!(
            credential,
            Credential::ClientCredentials {
                token_url: "https://auth.example.com/token".to_string(),
                client_id: "client-1".to_string(),
                client_secret: SecretString::from("secret-1"),
            }
        );
        assert_eq!(store.scopes_for(&b, &mut prompter).unwrap(), vec!["read"]);
        assert_eq!(prompter.questions.len(), 4);
    }

    #[test]
    fn test_scope_asked_again_for_new_scope_set() {
        let mut store = CredentialStore::new();
        let mut prompter = ScriptedPrompter::new(["", "client-1", "secret-1", "", ""]);
        let read = binding("oauth", oauth_scheme(), &["read"]);
        let write = binding("oauth", oauth_scheme(), &["write"]);

        store.obtain(&read, &mut prompter).unwrap();
        store.obtain(&write, &mut prompter).unwrap();
        assert_eq!(store.scopes_for(&write, &mut prompter).unwrap(), vec!["write"]);
        assert_eq!(store.scopes_for(&read, &mut prompter).unwrap(), vec!["read"]);
        assert_eq!(prompter.questions.len(), 5);
    }

    #[test]
    fn test_unsupported_scheme_asks_nothing() {
        let mut store = CredentialStore::new();
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());
        let b = binding("oidc", SecurityScheme::Unsupported { kind: "openIdConnect".to_string() }, &[]);
        assert!(store.obtain(&b, &mut prompter).unwrap().is_none());
        assert!(prompter.questions.is_empty());
    }
}
