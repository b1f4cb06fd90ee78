//! Request body entry

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SpecPulseError};
use crate::openapi::RequestBodySpec;
use crate::prompt::Prompter;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const APPLICATION_JSON: &str = "application/json";

/// Body payload as entered by the user
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// A payload together with the media type it is sent as
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub content_type: String,
    pub payload: Payload,
}

/// How a declared media type is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
}

/// Media type without parameters, lower-cased
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_json_media_type(media_type: &str) -> bool {
    match essence(media_type).parse::<mime::Mime>() {
        Ok(m) => m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON),
        Err(_) => false,
    }
}

pub fn is_form_media_type(media_type: &str) -> bool {
    essence(media_type) == FORM_URLENCODED
}

/// Pick the media type to send: JSON first, then url-encoded form.
///
/// A body whose content could not be resolved is entered as JSON.
pub fn choose_media_type(spec: &RequestBodySpec) -> Result<(String, BodyKind)> {
    if spec.content.is_empty() {
        return Ok((APPLICATION_JSON.to_string(), BodyKind::Json));
    }
    if let Some(media_type) = spec.content.keys().find(|m| is_json_media_type(m)) {
        return Ok((media_type.clone(), BodyKind::Json));
    }
    if let Some(media_type) = spec.content.keys().find(|m| is_form_media_type(m)) {
        return Ok((media_type.clone(), BodyKind::Form));
    }
    let declared: Vec<&str> = spec.content.keys().map(String::as_str).collect();
    Err(SpecPulseError::UnsupportedContentType(declared.join(", ")))
}

/// Parse raw JSON text entered by the user
pub fn parse_json_body(input: &str) -> Result<Value> {
    serde_json::from_str(input.trim()).map_err(SpecPulseError::BodyParse)
}

/// Parse one `key=value` form line
pub fn parse_form_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// Ask for the request body of an endpoint
pub fn collect_body(spec: &RequestBodySpec, prompter: &mut dyn Prompter) -> Result<Option<Body>> {
    let (media_type, kind) = choose_media_type(spec)?;
    debug!(media_type = %media_type, "Collecting request body");

    if spec.partially_resolved {
        prompter.warn("The request body definition could not be fully resolved; entering it as raw JSON.");
    }
    if let Some(description) = spec.description.as_deref().filter(|d| !d.is_empty()) {
        prompter.info(description);
    }

    let payload = match kind {
        BodyKind::Json => {
            if let Some(schema) = spec.content.get(&media_type).filter(|s| !is_empty_schema(s)) {
                if let Ok(pretty) = serde_json::to_string_pretty(schema) {
                    prompter.info(&format!("Schema hint:\n{}", pretty));
                }
            }
            json_payload(spec.required, prompter)?
        }
        BodyKind::Form => {
            prompter.info("This endpoint expects form data. Enter key=value pairs, one per line. End with an empty line.");
            form_payload(spec.required, prompter)?
        }
    };

    Ok(payload.map(|payload| Body { content_type: media_type, payload }))
}

fn is_empty_schema(schema: &Value) -> bool {
    match schema {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn json_payload(required: bool, prompter: &mut dyn Prompter) -> Result<Option<Payload>> {
    let message = if required {
        "Enter JSON body (required)"
    } else {
        "Enter JSON body (or leave empty)"
    };
    loop {
        let input = prompter.text(message, None)?;
        if input.trim().is_empty() {
            if required {
                prompter.warn("A request body is required.");
                continue;
            }
            return Ok(None);
        }
        match parse_json_body(&input) {
            Ok(value) => return Ok(Some(Payload::Json(value))),
            Err(err) => prompter.error(&err.to_string()),
        }
    }
}

fn form_payload(required: bool, prompter: &mut dyn Prompter) -> Result<Option<Payload>> {
    let mut pairs = Vec::new();
    loop {
        let line = prompter.text("key=value (or empty to finish)", None)?;
        if line.trim().is_empty() {
            if pairs.is_empty() && required {
                prompter.warn("A request body is required.");
                continue;
            }
            break;
        }
        match parse_form_line(&line) {
            Some(pair) => pairs.push(pair),
            None => prompter.error("Invalid format. Use key=value."),
        }
    }
    Ok((!pairs.is_empty()).then_some(Payload::Form(pairs)))
}
