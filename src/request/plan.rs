//! Request plans
//!
//! A [`RequestPlan`] is everything needed for one HTTP call, built from an
//! endpoint, the collected values and the authentication material.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::auth::AuthMaterial;
use crate::collect::{Body, ParameterValues, Payload};
use crate::errors::{Result, SpecPulseError};
use crate::openapi::Endpoint;

pub const USER_AGENT_STRING: &str = concat!("specpulse/", env!("CARGO_PKG_VERSION"));

/// RFC 3986 `pchar` minus what must be escaped inside a single segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

const REDACTED: &str = "[REDACTED]";

/// A fully specified request, built fresh for every call
#[derive(Debug, Clone)]
pub struct RequestPlan {
    pub method: String,
    /// Base URL joined with the substituted path, no query
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    /// Lower-cased header names and query names whose values are secret
    pub sensitive: Vec<String>,
}

impl RequestPlan {
    pub fn build(
        endpoint: &Endpoint,
        values: &ParameterValues,
        auth: &AuthMaterial,
        base_url: &str,
    ) -> Result<Self> {
        let path = substitute_path(&endpoint.path, values)?;
        let mut url = join_url(base_url, &path)?;

        // Keep whatever query the base URL already carries
        let mut query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        url.set_query(None);
        query.extend(values.query.iter().cloned());
        query.extend(auth.query.iter().cloned());

        let mut plan = RequestPlan {
            method: endpoint.method.to_ascii_uppercase(),
            url,
            query,
            headers: Vec::new(),
            body: values.body.clone(),
            sensitive: auth.sensitive.iter().map(|s| s.to_ascii_lowercase()).collect(),
        };

        plan.set_header("Accept", "application/json");
        plan.set_header("User-Agent", USER_AGENT_STRING);
        for (name, value) in &values.headers {
            plan.set_header(name, value);
        }
        for (name, value) in &auth.headers {
            plan.set_header(name, value);
        }

        let cookies: Vec<String> = values
            .cookies
            .iter()
            .chain(auth.cookies.iter())
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        if !cookies.is_empty() {
            plan.set_header("Cookie", &cookies.join("; "));
            if !auth.cookies.is_empty() {
                plan.sensitive.push("cookie".to_string());
            }
        }

        if let Some(body) = &plan.body {
            let content_type = body.content_type.clone();
            plan.set_header("Content-Type", &content_type);
        }

        Ok(plan)
    }

    /// Add headers that are not set yet
    pub fn with_default_headers<'a, I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, value) in headers {
            if self.header(name).is_none() {
                self.headers.push((name.clone(), value.clone()));
            }
        }
        self
    }

    /// Replace the value of a header, matching names case-insensitively
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(existing) => existing.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The URL with the query string appended
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        url
    }

    /// Serialize the body per its content type
    pub fn encode_body(&self) -> Result<Option<Vec<u8>>> {
        match &self.body {
            None => Ok(None),
            Some(Body { payload: Payload::Json(value), .. }) => serde_json::to_vec(value)
                .map(Some)
                .map_err(|e| SpecPulseError::Validation(format!("cannot encode JSON body: {}", e))),
            Some(Body { payload: Payload::Form(pairs), .. }) => serde_urlencoded::to_string(pairs)
                .map(|s| Some(s.into_bytes()))
                .map_err(|e| SpecPulseError::Validation(format!("cannot encode form body: {}", e))),
        }
    }

    fn is_sensitive(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        self.sensitive.iter().any(|s| *s == lower)
    }
}

/// Substitute every `{name}` placeholder, percent-encoding the value
pub fn substitute_path(template: &str, values: &ParameterValues) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        let value = values
            .path
            .get(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                SpecPulseError::Validation(format!(
                    "missing value for path parameter '{}' in {}",
                    name, template
                ))
            })?;
        out.push_str(&rest[..start]);
        out.extend(utf8_percent_encode(value, PATH_SEGMENT));
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Join a base URL and a path with exactly one slash between them
pub fn join_url(base_url: &str, path: &str) -> Result<Url> {
    let base_url = base_url.trim();
    let mut url = Url::parse(base_url)
        .map_err(|e| SpecPulseError::Validation(format!("invalid base URL '{}': {}", base_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(SpecPulseError::Validation(format!("invalid base URL '{}'", base_url)));
    }

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_fragment(None);
    Ok(url)
}

impl fmt::Display for RequestPlan {
    /// Request line, headers and body with secret values replaced
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                let shown = if self.is_sensitive(name) { REDACTED } else { value.as_str() };
                pairs.append_pair(name, shown);
            }
        }
        writeln!(f, "{} {}", self.method, url)?;

        for (name, value) in &self.headers {
            let shown = if self.is_sensitive(name) { REDACTED } else { value.as_str() };
            writeln!(f, "{}: {}", name, shown)?;
        }

        match &self.body {
            Some(Body { payload: Payload::Json(value), .. }) => {
                writeln!(f)?;
                writeln!(f, "{}", serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?)?;
            }
            Some(Body { payload: Payload::Form(pairs), .. }) => {
                writeln!(f)?;
                writeln!(f, "{}", serde_urlencoded::to_string(pairs).map_err(|_| fmt::Error)?)?;
            }
            None => {}
        }
        Ok(())
    }
}
