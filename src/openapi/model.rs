//! Normalized in-memory model of an OpenAPI/Swagger document

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

use crate::errors::RefResolutionWarning;

/// Security requirement: OR of ANDs.
///
/// Each entry is one alternative; each alternative maps scheme name to the
/// scopes it asks for. An empty alternative means anonymous access.
pub type SecurityRequirement = Vec<IndexMap<String, Vec<String>>>;

/// Which normalizer produced a [`Specification`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Enhanced,
    Minimal,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Enhanced => write!(f, "enhanced"),
            Capability::Minimal => write!(f, "minimal"),
        }
    }
}

/// Normalized specification
#[derive(Debug, Clone)]
pub struct Specification {
    pub title: String,
    pub version: String,
    /// Endpoints in document order (path, then method)
    pub endpoints: Vec<Endpoint>,
    pub security_schemes: IndexMap<String, SecurityScheme>,
    /// Candidate base URLs declared at document level
    pub base_urls: Vec<String>,
    /// Global security requirement
    pub security: SecurityRequirement,
    pub capability: Capability,
    pub warnings: Vec<RefResolutionWarning>,
}

/// One callable (method, path) operation
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Upper-case HTTP method
    pub method: String,
    /// Path template, e.g. `/users/{id}`
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBodySpec>,
    /// Operation-level requirement; `Some(vec![])` disables auth for this endpoint
    pub security: Option<SecurityRequirement>,
    /// Operation or path-item level servers
    pub servers: Vec<String>,
}

impl Endpoint {
    /// Placeholder names in the path template, in order of appearance
    pub fn path_placeholders(&self) -> Vec<&str> {
        path_placeholders(&self.path)
    }

    pub fn parameters_in(&self, location: ParamLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.location == location)
    }

    /// Short label used in listings and messages
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Extract `{name}` placeholders from a path template
pub fn path_placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if !name.is_empty() {
                    names.push(name);
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

/// Parameter location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort primitive type hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl TypeHint {
    /// Map a JSON schema `type`; anything unknown is treated as a string
    pub fn from_schema_type(value: Option<&str>) -> Self {
        match value {
            Some("integer") => TypeHint::Integer,
            Some("number") => TypeHint::Number,
            Some("boolean") => TypeHint::Boolean,
            Some("array") => TypeHint::Array,
            Some("object") => TypeHint::Object,
            _ => TypeHint::String,
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeHint::String => "string",
            TypeHint::Integer => "integer",
            TypeHint::Number => "number",
            TypeHint::Boolean => "boolean",
            TypeHint::Array => "array",
            TypeHint::Object => "object",
        };
        f.write_str(name)
    }
}

/// Parameter definition
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub type_hint: TypeHint,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub enum_values: Vec<Value>,
    /// Set when a `$ref` inside this parameter could not be followed
    pub partially_resolved: bool,
}

/// Request body definition
#[derive(Debug, Clone, Default)]
pub struct RequestBodySpec {
    pub description: Option<String>,
    pub required: bool,
    /// Content type to schema, in document order
    pub content: IndexMap<String, Value>,
    pub partially_resolved: bool,
}

/// Where an API key is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

/// Concrete authentication scheme
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityScheme {
    ApiKey {
        name: String,
        location: ApiKeyLocation,
    },
    HttpBasic,
    HttpBearer {
        bearer_format: Option<String>,
    },
    OAuth2ClientCredentials {
        token_url: String,
        scopes: Vec<String>,
    },
    /// Declared but not something this tool can satisfy
    Unsupported {
        kind: String,
    },
}

impl SecurityScheme {
    pub fn kind(&self) -> &str {
        match self {
            SecurityScheme::ApiKey { .. } => "apiKey",
            SecurityScheme::HttpBasic => "http-basic",
            SecurityScheme::HttpBearer { .. } => "http-bearer",
            SecurityScheme::OAuth2ClientCredentials { .. } => "oauth2-client-credentials",
            SecurityScheme::Unsupported { kind } => kind,
        }
    }
}
