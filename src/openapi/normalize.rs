//! Raw document → [`Specification`]
//!
//! Supports both OpenAPI 3.x and Swagger 2.0 layouts. The enhanced and
//! minimal normalizers differ only in how much `$ref` expansion happens
//! before the shared extraction below runs.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::loader::{is_url, RawDocument};
use super::model::*;
use super::refs::{as_ref, collect_refs, escape_token, lookup, ref_name};
use crate::errors::{RefResolutionWarning, Result, SpecPulseError};

/// Keys of a path item that are operations
const OPERATION_KEYS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Turns a raw document into a normalized [`Specification`]
pub trait Normalizer {
    fn capability(&self) -> Capability;

    fn normalize(&self, document: &RawDocument) -> Result<Specification>;
}

/// Pick the normalizer for this run.
///
/// Returns the normalizer and, when the enhanced one was wanted but is not
/// available, a message to show the user.
pub fn select_normalizer(force_minimal: bool) -> (Box<dyn Normalizer>, Option<String>) {
    if force_minimal {
        return (
            Box::new(super::minimal::MinimalNormalizer),
            Some("Using the minimal parser; nested $ref resolution is limited".to_string()),
        );
    }

    #[cfg(feature = "enhanced")]
    {
        (Box::new(super::enhanced::EnhancedNormalizer), None)
    }

    #[cfg(not(feature = "enhanced"))]
    {
        (
            Box::new(super::minimal::MinimalNormalizer),
            Some(
                "Enhanced parser not available in this build; using the minimal parser \
                 (nested $ref resolution is limited)"
                    .to_string(),
            ),
        )
    }
}

/// Structural checks shared by both normalizers
pub(crate) fn check_structure(root: &Value) -> Result<&Map<String, Value>> {
    let top = root
        .as_object()
        .ok_or_else(|| SpecPulseError::SpecParse("top-level document is not a mapping".to_string()))?;

    if !top.contains_key("info") {
        return Err(SpecPulseError::SpecParse("missing required 'info' section".to_string()));
    }

    match top.get("paths") {
        Some(Value::Object(_)) => Ok(top),
        Some(_) => Err(SpecPulseError::SpecParse("'paths' must be a mapping".to_string())),
        None => Err(SpecPulseError::SpecParse("missing required 'paths' section".to_string())),
    }
}

/// Shared extraction over a (possibly partially) dereferenced document.
pub(crate) struct Extractor<'a> {
    /// The original document, used to tell dangling references from cycles
    original: &'a Value,
    source: &'a str,
    capability: Capability,
    warnings: Vec<RefResolutionWarning>,
}

impl<'a> Extractor<'a> {
    pub(crate) fn new(document: &'a RawDocument, capability: Capability, warnings: Vec<RefResolutionWarning>) -> Self {
        Self {
            original: &document.value,
            source: &document.source,
            capability,
            warnings,
        }
    }

    /// A leftover reference counts as unresolved unless the enhanced walk
    /// deliberately left it in place to cut a cycle.
    fn is_dangling(&self, reference: &str) -> bool {
        match self.capability {
            Capability::Minimal => true,
            Capability::Enhanced => lookup(self.original, reference).is_none(),
        }
    }

    fn has_dangling_ref(&self, value: &Value) -> Option<String> {
        let mut found = Vec::new();
        collect_refs(value, &mut found);
        found.into_iter().find(|r| self.is_dangling(r))
    }

    fn warn(&mut self, location: String, reference: &str, reason: &str) {
        let warning = RefResolutionWarning::new(location, reference, reason);
        if !self.warnings.contains(&warning) {
            warn!(%warning, "Degraded $ref resolution");
            self.warnings.push(warning);
        }
    }

    fn unresolved_reason(&self) -> &'static str {
        match self.capability {
            Capability::Minimal => "not resolved by the minimal parser",
            Capability::Enhanced => "reference could not be resolved",
        }
    }

    /// Build the specification from `doc`, the tree after `$ref` expansion.
    ///
    /// `security_schemes` are passed in because each normalizer resolves
    /// them its own way.
    pub(crate) fn extract(
        mut self,
        doc: &Value,
        security_schemes: IndexMap<String, SecurityScheme>,
    ) -> Result<Specification> {
        let top = check_structure(doc)?;
        let swagger2 = top.contains_key("swagger");
        if !swagger2 && !top.contains_key("openapi") {
            debug!("No 'openapi' or 'swagger' version field; reading as OpenAPI 3");
        }

        let info = &top["info"];
        let title = info.get("title").and_then(|v| v.as_str()).unwrap_or("Untitled API").to_string();
        let version = info.get("version").and_then(|v| v.as_str()).unwrap_or("").to_string();

        let base_urls = if swagger2 {
            self.servers_v2(doc)
        } else {
            self.servers_v3(top.get("servers"))
        };

        let security = parse_security_requirements(top.get("security")).unwrap_or_default();
        let global_consumes = string_list(top.get("consumes"));

        let mut endpoints = Vec::new();
        if let Some(paths) = top.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                let Some(item) = path_item.as_object() else {
                    continue;
                };
                let item_location = format!("/paths/{}", escape_token(path));

                if let Some(reference) = as_ref(path_item) {
                    self.warn(item_location.clone(), reference, self.unresolved_reason());
                }

                let shared_params = item.get("parameters");
                let item_servers = self.servers_v3(item.get("servers"));

                for (method, operation) in item {
                    if !OPERATION_KEYS.contains(&method.as_str()) || !operation.is_object() {
                        continue;
                    }
                    let location = format!("{}/{}", item_location, method);
                    let endpoint = self.operation(
                        method,
                        path,
                        operation,
                        shared_params,
                        &item_servers,
                        swagger2,
                        &global_consumes,
                        &location,
                    );
                    endpoints.push(endpoint);
                }
            }
        }

        debug!(
            endpoints = endpoints.len(),
            schemes = security_schemes.len(),
            servers = base_urls.len(),
            capability = %self.capability,
            "Spec normalized"
        );

        Ok(Specification {
            title,
            version,
            endpoints,
            security_schemes,
            base_urls,
            security,
            capability: self.capability,
            warnings: self.warnings,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn operation(
        &mut self,
        method: &str,
        path: &str,
        operation: &Value,
        shared_params: Option<&Value>,
        item_servers: &[String],
        swagger2: bool,
        global_consumes: &[String],
        location: &str,
    ) -> Endpoint {
        let text = |key: &str| operation.get(key).and_then(|v| v.as_str()).map(|s| s.to_string());

        let tags = string_list(operation.get("tags"));
        let deprecated = operation.get("deprecated").and_then(|d| d.as_bool()).unwrap_or(false);

        // Path-item parameters first; operation entries override on (name, in)
        let mut raw_params: IndexMap<(String, String), (Value, String)> = IndexMap::new();
        let item_location = location.rsplit_once('/').map(|(item, _)| item).unwrap_or("");
        for (source, source_location) in [
            (shared_params, format!("{}/parameters", item_location)),
            (operation.get("parameters"), format!("{}/parameters", location)),
        ] {
            let Some(list) = source.and_then(|p| p.as_array()) else {
                continue;
            };
            for (i, param) in list.iter().enumerate() {
                let param_location = format!("{}/{}", source_location, i);
                // Unexpanded references are keyed by their target
                let key = match (param.get("name").and_then(|n| n.as_str()), param.get("in").and_then(|n| n.as_str())) {
                    (Some(name), Some(loc)) => (name.to_string(), loc.to_string()),
                    _ => (as_ref(param).unwrap_or_default().to_string(), "$ref".to_string()),
                };
                raw_params.insert(key, (param.clone(), param_location));
            }
        }

        let consumes = {
            let own = string_list(operation.get("consumes"));
            if own.is_empty() { global_consumes.to_vec() } else { own }
        };

        let mut parameters = Vec::new();
        let mut request_body = None;
        let mut form_fields: Vec<&Value> = Vec::new();

        for (param, param_location) in raw_params.values() {
            match param.get("in").and_then(|i| i.as_str()) {
                Some("body") if swagger2 => {
                    request_body = Some(self.body_param_v2(param, &consumes, param_location));
                }
                Some("formData") if swagger2 => form_fields.push(param),
                _ => {
                    if let Some(p) = self.parameter(param, path, param_location) {
                        parameters.push(p);
                    }
                }
            }
        }

        // Every placeholder needs a path parameter to be fillable
        for placeholder in path_placeholders(path) {
            let covered = parameters
                .iter()
                .any(|p| p.location == ParamLocation::Path && p.name == placeholder);
            if !covered {
                warn!(path = %path, placeholder = %placeholder, "Path placeholder has no declared parameter");
                parameters.push(Parameter {
                    name: placeholder.to_string(),
                    location: ParamLocation::Path,
                    required: true,
                    type_hint: TypeHint::String,
                    default: None,
                    description: None,
                    enum_values: Vec::new(),
                    partially_resolved: true,
                });
            }
        }

        if !form_fields.is_empty() && request_body.is_none() {
            request_body = Some(form_body_v2(&form_fields, &consumes));
        }

        if !swagger2 {
            if let Some(rb) = operation.get("requestBody") {
                request_body = Some(self.request_body_v3(rb, &format!("{}/requestBody", location)));
            }
        }

        let security = parse_security_requirements(operation.get("security"));
        let servers = {
            let own = self.servers_v3(operation.get("servers"));
            if own.is_empty() { item_servers.to_vec() } else { own }
        };

        Endpoint {
            method: method.to_uppercase(),
            path: path.to_string(),
            operation_id: text("operationId"),
            summary: text("summary").or_else(|| text("description")),
            tags,
            deprecated,
            parameters,
            request_body,
            security,
            servers,
        }
    }

    fn parameter(&mut self, param: &Value, path: &str, pointer: &str) -> Option<Parameter> {
        // A parameter that is itself a reference the walk could not expand
        if let Some(reference) = as_ref(param) {
            let reference = reference.to_string();
            self.warn(pointer.to_string(), &reference, self.unresolved_reason());
            let target = ref_name(&reference);
            let placeholder = path_placeholders(path)
                .into_iter()
                .find(|p| p.eq_ignore_ascii_case(target));
            let (name, location) = match placeholder {
                Some(p) => (p.to_string(), ParamLocation::Path),
                None => (target.to_string(), ParamLocation::Query),
            };
            return Some(Parameter {
                required: location == ParamLocation::Path,
                name,
                location,
                type_hint: TypeHint::String,
                default: None,
                description: None,
                enum_values: Vec::new(),
                partially_resolved: true,
            });
        }

        let name = param.get("name")?.as_str()?.to_string();
        let location = ParamLocation::parse(param.get("in")?.as_str()?)?;

        // v3 keeps type info under `schema`; v2 inlines it on the parameter
        let schema = param.get("schema").unwrap_or(param);

        let mut partially_resolved = false;
        if let Some(reference) = self.has_dangling_ref(schema) {
            self.warn(format!("{}/schema", pointer), &reference, self.unresolved_reason());
            partially_resolved = true;
        }

        let type_hint = TypeHint::from_schema_type(schema.get("type").and_then(|t| t.as_str()));
        let default = schema.get("default").or_else(|| param.get("default")).cloned();
        let enum_values = schema
            .get("enum")
            .and_then(|e| e.as_array())
            .cloned()
            .unwrap_or_default();

        Some(Parameter {
            // Path parameters are always required whatever the document says
            required: location == ParamLocation::Path
                || param.get("required").and_then(|r| r.as_bool()).unwrap_or(false),
            name,
            location,
            type_hint,
            default,
            description: param.get("description").and_then(|d| d.as_str()).map(|s| s.to_string()),
            enum_values,
            partially_resolved,
        })
    }

    fn request_body_v3(&mut self, body: &Value, location: &str) -> RequestBodySpec {
        if let Some(reference) = as_ref(body) {
            let reference = reference.to_string();
            self.warn(location.to_string(), &reference, self.unresolved_reason());
            return RequestBodySpec {
                description: None,
                required: false,
                content: IndexMap::new(),
                partially_resolved: true,
            };
        }

        let mut content = IndexMap::new();
        let mut partially_resolved = false;
        if let Some(media) = body.get("content").and_then(|c| c.as_object()) {
            for (content_type, media_obj) in media {
                let schema = media_obj.get("schema").cloned().unwrap_or(Value::Null);
                if let Some(reference) = self.has_dangling_ref(&schema) {
                    let schema_location = format!("{}/content/{}/schema", location, escape_token(content_type));
                    self.warn(schema_location, &reference, self.unresolved_reason());
                    partially_resolved = true;
                }
                content.insert(content_type.clone(), schema);
            }
        }

        RequestBodySpec {
            description: body.get("description").and_then(|d| d.as_str()).map(|s| s.to_string()),
            required: body.get("required").and_then(|r| r.as_bool()).unwrap_or(false),
            content,
            partially_resolved,
        }
    }

    fn body_param_v2(&mut self, param: &Value, consumes: &[String], location: &str) -> RequestBodySpec {
        let schema = param.get("schema").cloned().unwrap_or(Value::Null);
        let mut partially_resolved = false;
        if let Some(reference) = self.has_dangling_ref(&schema) {
            self.warn(format!("{}/schema", location), &reference, self.unresolved_reason());
            partially_resolved = true;
        }

        let types: Vec<String> = if consumes.is_empty() {
            vec!["application/json".to_string()]
        } else {
            consumes.to_vec()
        };

        RequestBodySpec {
            description: param.get("description").and_then(|d| d.as_str()).map(|s| s.to_string()),
            required: param.get("required").and_then(|r| r.as_bool()).unwrap_or(false),
            content: types.into_iter().map(|t| (t, schema.clone())).collect(),
            partially_resolved,
        }
    }

    fn servers_v3(&self, servers: Option<&Value>) -> Vec<String> {
        let Some(list) = servers.and_then(|s| s.as_array()) else {
            return Vec::new();
        };

        list.iter()
            .filter_map(|server| {
                let url = server.get("url")?.as_str()?;
                let url = substitute_server_variables(url, server.get("variables"));
                Some(self.absolutize(&url))
            })
            .filter(|url| !url.is_empty())
            .collect()
    }

    /// `scheme://host/basePath` for each declared scheme
    fn servers_v2(&self, doc: &Value) -> Vec<String> {
        let base_path = doc.get("basePath").and_then(|b| b.as_str()).unwrap_or("");
        let Some(host) = doc.get("host").and_then(|h| h.as_str()) else {
            // No host: relative to wherever the document was served from, if anywhere
            return if is_url(self.source) {
                vec![self.absolutize(if base_path.is_empty() { "/" } else { base_path })]
            } else {
                Vec::new()
            };
        };

        let mut schemes = string_list(doc.get("schemes"));
        if schemes.is_empty() {
            let from_source = url::Url::parse(self.source).ok().map(|u| u.scheme().to_string());
            schemes.push(from_source.unwrap_or_else(|| "https".to_string()));
        }

        schemes
            .into_iter()
            .map(|scheme| format!("{}://{}{}", scheme, host, base_path))
            .collect()
    }

    /// Relative server URLs are relative to the document URL
    fn absolutize(&self, url: &str) -> String {
        if url.contains("://") {
            return url.to_string();
        }
        if is_url(self.source) {
            if let Ok(joined) = url::Url::parse(self.source).and_then(|base| base.join(url)) {
                return joined.to_string();
            }
        }
        debug!(url, "Relative server URL without a remote spec location; ignored");
        String::new()
    }
}

/// Swagger 2.0 `formData` parameters become one form body
fn form_body_v2(fields: &[&Value], consumes: &[String]) -> RequestBodySpec {
    let has_file = fields.iter().any(|f| f.get("type").and_then(|t| t.as_str()) == Some("file"));
    let content_type = if has_file || consumes.iter().any(|c| c.starts_with("multipart/")) {
        "multipart/form-data"
    } else {
        "application/x-www-form-urlencoded"
    };

    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        let Some(name) = field.get("name").and_then(|n| n.as_str()) else {
            continue;
        };
        let mut prop = Map::new();
        for key in ["type", "format", "description", "enum", "default"] {
            if let Some(v) = field.get(key) {
                prop.insert(key.to_string(), v.clone());
            }
        }
        properties.insert(name.to_string(), Value::Object(prop));
        if field.get("required").and_then(|r| r.as_bool()).unwrap_or(false) {
            required.push(Value::String(name.to_string()));
        }
    }

    let any_required = !required.is_empty();
    let schema = json!({"type": "object", "properties": properties, "required": required});
    RequestBodySpec {
        description: None,
        required: any_required,
        content: IndexMap::from([(content_type.to_string(), schema)]),
        partially_resolved: false,
    }
}

/// Replace `{var}` in a server URL by the variable's default
pub(crate) fn substitute_server_variables(url: &str, variables: Option<&Value>) -> String {
    let Some(vars) = variables.and_then(|v| v.as_object()) else {
        return url.to_string();
    };
    let mut out = url.to_string();
    for (name, var) in vars {
        if let Some(default) = var.get("default").and_then(|d| d.as_str()) {
            out = out.replace(&format!("{{{}}}", name), default);
        }
    }
    out
}

/// `None` when the key is absent, so callers can tell "not declared" from "empty"
pub(crate) fn parse_security_requirements(security: Option<&Value>) -> Option<SecurityRequirement> {
    let list = security?.as_array()?;
    Some(
        list.iter()
            .filter_map(|req| {
                let obj = req.as_object()?;
                Some(
                    obj.iter()
                        .map(|(name, scopes)| (name.clone(), string_list(Some(scopes))))
                        .collect::<IndexMap<_, _>>(),
                )
            })
            .collect(),
    )
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
        .unwrap_or_default()
}

/// Security scheme definitions of either spec version, as raw JSON
pub(crate) fn raw_security_schemes(root: &Value) -> Option<(&Map<String, Value>, &'static str)> {
    if let Some(schemes) = root
        .get("components")
        .and_then(|c| c.get("securitySchemes"))
        .and_then(|s| s.as_object())
    {
        return Some((schemes, "/components/securitySchemes"));
    }
    root.get("securityDefinitions")
        .and_then(|s| s.as_object())
        .map(|s| (s, "/securityDefinitions"))
}

/// Interpret one (already dereferenced) scheme definition
pub(crate) fn parse_security_scheme(def: &Value) -> SecurityScheme {
    let scheme_type = def.get("type").and_then(|t| t.as_str()).unwrap_or("");

    match scheme_type {
        "apiKey" => {
            let name = def.get("name").and_then(|n| n.as_str());
            let location = match def.get("in").and_then(|i| i.as_str()) {
                Some("header") => Some(ApiKeyLocation::Header),
                Some("query") => Some(ApiKeyLocation::Query),
                Some("cookie") => Some(ApiKeyLocation::Cookie),
                _ => None,
            };
            match (name, location) {
                (Some(name), Some(location)) => SecurityScheme::ApiKey {
                    name: name.to_string(),
                    location,
                },
                _ => SecurityScheme::Unsupported {
                    kind: "apiKey (missing name or location)".to_string(),
                },
            }
        }
        // Swagger 2.0
        "basic" => SecurityScheme::HttpBasic,
        "http" => {
            let scheme = def.get("scheme").and_then(|s| s.as_str()).unwrap_or("").to_ascii_lowercase();
            match scheme.as_str() {
                "basic" => SecurityScheme::HttpBasic,
                "bearer" => SecurityScheme::HttpBearer {
                    bearer_format: def.get("bearerFormat").and_then(|b| b.as_str()).map(|s| s.to_string()),
                },
                other => SecurityScheme::Unsupported {
                    kind: format!("http-{}", other),
                },
            }
        }
        "oauth2" => {
            // v3: flows.clientCredentials; v2: flow = application
            let flow = def
                .get("flows")
                .and_then(|f| f.get("clientCredentials"))
                .or_else(|| (def.get("flow").and_then(|f| f.as_str()) == Some("application")).then_some(def));

            match flow.and_then(|f| f.get("tokenUrl").and_then(|t| t.as_str()).map(|t| (f, t))) {
                Some((flow, token_url)) => SecurityScheme::OAuth2ClientCredentials {
                    token_url: token_url.to_string(),
                    scopes: flow
                        .get("scopes")
                        .and_then(|s| s.as_object())
                        .map(|s| s.keys().cloned().collect())
                        .unwrap_or_default(),
                },
                None => SecurityScheme::Unsupported {
                    kind: "oauth2 (no client-credentials flow)".to_string(),
                },
            }
        }
        other => SecurityScheme::Unsupported {
            kind: if other.is_empty() { "unknown".to_string() } else { other.to_string() },
        },
    }
}
