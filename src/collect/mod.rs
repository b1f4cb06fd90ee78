//! Parameter collection
//!
//! Asks for every declared parameter of an endpoint, grouped by location
//! (path, query, header, cookie), then for the request body.

pub mod body;

pub use body::{collect_body, Body, BodyKind, Payload};

use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::Result;
use crate::openapi::{Endpoint, ParamLocation, Parameter, TypeHint};
use crate::prompt::Prompter;

const LOCATION_ORDER: [ParamLocation; 4] = [
    ParamLocation::Path,
    ParamLocation::Query,
    ParamLocation::Header,
    ParamLocation::Cookie,
];

/// Values collected for one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValues {
    pub path: IndexMap<String, String>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value for a parameter at its location
    pub fn insert(&mut self, param: &Parameter, value: String) {
        let name = param.name.clone();
        match param.location {
            ParamLocation::Path => {
                self.path.insert(name, value);
            }
            ParamLocation::Query => {
                if param.type_hint == TypeHint::Array {
                    for item in split_array(&value) {
                        self.query.push((name.clone(), item));
                    }
                } else {
                    self.query.push((name, value));
                }
            }
            ParamLocation::Header => self.headers.push((name, join_array(param, value))),
            ParamLocation::Cookie => self.cookies.push((name, join_array(param, value))),
        }
    }
}

fn split_array(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn join_array(param: &Parameter, value: String) -> String {
    if param.type_hint == TypeHint::Array {
        split_array(&value).join(",")
    } else {
        value
    }
}

/// Render a default or enum value the way a user would type it
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Check a value against its type hint.
///
/// Returns the value to send, normalized where that is unambiguous, or a
/// message describing why the hint was not met.
pub fn coerce(value: &str, hint: TypeHint) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    match hint {
        TypeHint::Integer => trimmed
            .parse::<i64>()
            .map(|n| n.to_string())
            .map_err(|_| format!("'{}' is not a valid integer", value)),
        TypeHint::Number => trimmed
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|_| trimmed.to_string())
            .ok_or_else(|| format!("'{}' is not a valid number", value)),
        TypeHint::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Ok("true".to_string()),
            "false" => Ok("false".to_string()),
            _ => Err(format!("'{}' is not true or false", value)),
        },
        TypeHint::String | TypeHint::Array | TypeHint::Object => Ok(value.to_string()),
    }
}

fn prompt_message(param: &Parameter) -> String {
    let mut message = format!(
        "Enter value for {} parameter '{}' ({})",
        param.location, param.name, param.type_hint
    );
    if let Some(description) = param.description.as_deref().filter(|d| !d.is_empty()) {
        message.push_str(&format!(" ({})", description));
    }
    if !param.enum_values.is_empty() {
        let choices: Vec<String> = param.enum_values.iter().map(display_value).collect();
        message.push_str(&format!(" [one of: {}]", choices.join(", ")));
    }
    if param.type_hint == TypeHint::Array {
        message.push_str(" (comma-separated)");
    }
    if param.required {
        message.push_str(" (required)");
    }
    message
}

/// Ask for a single parameter. `None` means omitted.
pub fn collect_parameter(param: &Parameter, prompter: &mut dyn Prompter) -> Result<Option<String>> {
    if param.partially_resolved {
        prompter.warn(&format!(
            "Parameter '{}' could not be fully resolved; its details may be incomplete.",
            param.name
        ));
    }

    let message = prompt_message(param);
    let default = param.default.as_ref().map(display_value);

    let raw = if param.required {
        prompter.required_text(&message, default.as_deref())?
    } else {
        let answer = prompter.text(&message, default.as_deref())?;
        if answer.trim().is_empty() {
            return Ok(None);
        }
        answer
    };

    match coerce(&raw, param.type_hint) {
        Ok(value) => Ok(Some(value)),
        Err(reason) => {
            prompter.warn(&format!("{} for '{}'; sending it as entered", reason, param.name));
            Ok(Some(raw))
        }
    }
}

/// Ask for every parameter of `endpoint` and its body
pub fn collect_values(endpoint: &Endpoint, prompter: &mut dyn Prompter) -> Result<ParameterValues> {
    let mut values = ParameterValues::new();

    // Fail before asking anything when the body cannot be sent
    if let Some(spec) = &endpoint.request_body {
        body::choose_media_type(spec)?;
    }

    for location in LOCATION_ORDER {
        for param in endpoint.parameters_in(location) {
            if let Some(value) = collect_parameter(param, prompter)? {
                values.insert(param, value);
            }
        }
    }

    if let Some(spec) = &endpoint.request_body {
        values.body = collect_body(spec, prompter)?;
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SpecPulseError;
    use crate::openapi::RequestBodySpec;
    use crate::prompt::ScriptedPrompter;
    use serde_json::json;

    fn param(name: &str, location: ParamLocation, required: bool, hint: TypeHint) -> Parameter {
        Parameter {
            name: name.to_string(),
            location,
            required,
            type_hint: hint,
            default: None,
            description: None,
            enum_values: Vec::new(),
            partially_resolved: false,
        }
    }

    fn endpoint(parameters: Vec<Parameter>, request_body: Option<RequestBodySpec>) -> Endpoint {
        Endpoint {
            method: "POST".to_string(),
            path: "/pets/{id}".to_string(),
            operation_id: None,
            summary: None,
            tags: Vec::new(),
            deprecated: false,
            parameters,
            request_body,
            security: None,
            servers: Vec::new(),
        }
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(" 42 ", TypeHint::Integer).unwrap(), "42");
        assert!(coerce("4.2", TypeHint::Integer).is_err());
        assert_eq!(coerce("4.2", TypeHint::Number).unwrap(), "4.2");
        assert!(coerce("NaN", TypeHint::Number).is_err());
        assert_eq!(coerce("TRUE", TypeHint::Boolean).unwrap(), "true");
        assert!(coerce("yes", TypeHint::Boolean).is_err());
        assert_eq!(coerce(" as is ", TypeHint::String).unwrap(), " as is ");
    }

    #[test]
    fn test_grouped_order_and_omission() {
        let ep = endpoint(
            vec![
                param("X-Trace", ParamLocation::Header, false, TypeHint::String),
                param("limit", ParamLocation::Query, false, TypeHint::Integer),
                param("id", ParamLocation::Path, true, TypeHint::Integer),
            ],
            None,
        );
        let mut prompter = ScriptedPrompter::new(["42", "", "abc"]);
        let values = collect_values(&ep, &mut prompter).unwrap();

        assert!(prompter.questions[0].contains("path parameter 'id'"));
        assert!(prompter.questions[1].contains("query parameter 'limit'"));
        assert!(prompter.questions[2].contains("header parameter 'X-Trace'"));
        assert_eq!(values.path.get("id").map(String::as_str), Some("42"));
        assert!(values.query.is_empty());
        assert_eq!(values.headers, vec![("X-Trace".to_string(), "abc".to_string())]);
    }

    #[test]
    fn test_required_blocks_until_given() {
        let ep = endpoint(vec![param("id", ParamLocation::Path, true, TypeHint::String)], None);
        let mut prompter = ScriptedPrompter::new(["", "7"]);
        let values = collect_values(&ep, &mut prompter).unwrap();
        assert_eq!(values.path["id"], "7");
        assert_eq!(prompter.warnings(), vec!["A value is required."]);
    }

    #[test]
    fn test_coercion_failure_keeps_raw_value() {
        let ep = endpoint(vec![param("limit", ParamLocation::Query, false, TypeHint::Integer)], None);
        let mut prompter = ScriptedPrompter::new(["ten"]);
        let values = collect_values(&ep, &mut prompter).unwrap();
        assert_eq!(values.query, vec![("limit".to_string(), "ten".to_string())]);
        assert_eq!(prompter.warnings().len(), 1);
    }

    #[test]
    fn test_array_query_repeats() {
        let ep = endpoint(vec![param("tag", ParamLocation::Query, false, TypeHint::Array)], None);
        let mut prompter = ScriptedPrompter::new(["a, b,,c"]);
        let values = collect_values(&ep, &mut prompter).unwrap();
        assert_eq!(
            values.query,
            vec![
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
                ("tag".to_string(), "c".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_and_enum_offered() {
        let mut p = param("status", ParamLocation::Query, false, TypeHint::String);
        p.default = Some(json!("available"));
        p.enum_values = vec![json!("available"), json!("sold")];
        let mut prompter = ScriptedPrompter::new([""]);
        let values = collect_values(&endpoint(vec![p], None), &mut prompter).unwrap();
        assert!(prompter.questions[0].contains("[one of: available, sold]"));
        assert_eq!(values.query, vec![("status".to_string(), "available".to_string())]);
    }

    #[test]
    fn test_partially_resolved_warns() {
        let mut p = param("limit", ParamLocation::Query, false, TypeHint::String);
        p.partially_resolved = true;
        let mut prompter = ScriptedPrompter::new([""]);
        collect_values(&endpoint(vec![p], None), &mut prompter).unwrap();
        assert_eq!(prompter.warnings().len(), 1);
    }

    #[test]
    fn test_unsupported_body_fails_before_prompting() {
        let mut content = indexmap::IndexMap::new();
        content.insert("multipart/form-data".to_string(), json!({}));
        let ep = endpoint(
            vec![param("id", ParamLocation::Path, true, TypeHint::String)],
            Some(RequestBodySpec { content, required: true, ..Default::default() }),
        );
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());
        let err = collect_values(&ep, &mut prompter).unwrap_err();
        assert!(matches!(err, SpecPulseError::UnsupportedContentType(_)));
        assert!(prompter.questions.is_empty());
    }
}
