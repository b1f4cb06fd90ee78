//! Fetch raw spec content from a file or URL and parse it into a JSON tree

use std::fs;
use std::io::Read;
use std::path::Path;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SpecPulseError};

/// Maximum spec size (16 MB)
const MAX_SPEC_SIZE: u64 = 16 * 1024 * 1024;

/// Serialization format of the source document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

/// A loaded, not yet normalized document
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Where the document came from (path or URL)
    pub source: String,
    pub format: SpecFormat,
    pub value: Value,
}

/// Whether the location should be fetched over HTTP
pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Load a spec from a file path or HTTP(S) URL. Single attempt, no retries.
pub fn load(location: &str, client: &Client) -> Result<RawDocument> {
    let (content, hint) = if is_url(location) {
        fetch_url(location, client)?
    } else {
        read_file(Path::new(location))?
    };

    let (format, value) = parse_content(&content, hint)?;
    debug!(source = %location, ?format, "Spec loaded");

    Ok(RawDocument {
        source: location.to_string(),
        format,
        value,
    })
}

fn read_file(path: &Path) -> Result<(String, Option<SpecFormat>)> {
    let metadata = fs::metadata(path)
        .map_err(|e| SpecPulseError::SpecLoad(format!("cannot read {}: {}", path.display(), e)))?;

    if metadata.len() > MAX_SPEC_SIZE {
        return Err(SpecPulseError::SpecLoad(format!(
            "spec file too large: {} bytes (max {} bytes)",
            metadata.len(),
            MAX_SPEC_SIZE
        )));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| SpecPulseError::SpecLoad(format!("cannot read {}: {}", path.display(), e)))?;

    let hint = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Some(SpecFormat::Json),
        Some("yaml") | Some("yml") => Some(SpecFormat::Yaml),
        _ => None,
    };

    Ok((content, hint))
}

fn fetch_url(url: &str, client: &Client) -> Result<(String, Option<SpecFormat>)> {
    let response = client
        .get(url)
        .send()
        .map_err(|e| SpecPulseError::SpecLoad(format!("cannot fetch {}: {}", url, crate::errors::error_chain(&e))))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SpecPulseError::SpecLoad(format!("cannot fetch {}: HTTP {}", url, status)));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_ascii_lowercase());

    let mut body = String::new();
    response
        .take(MAX_SPEC_SIZE + 1)
        .read_to_string(&mut body)
        .map_err(|e| SpecPulseError::SpecLoad(format!("cannot read response from {}: {}", url, e)))?;

    if body.len() as u64 > MAX_SPEC_SIZE {
        return Err(SpecPulseError::SpecLoad(format!(
            "spec at {} exceeds {} bytes",
            url, MAX_SPEC_SIZE
        )));
    }

    let hint = format_from_content_type(content_type.as_deref())
        .or_else(|| format_from_url_path(url));

    Ok((body, hint))
}

fn format_from_content_type(content_type: Option<&str>) -> Option<SpecFormat> {
    let ct = content_type?;
    if ct.contains("json") {
        Some(SpecFormat::Json)
    } else if ct.contains("yaml") || ct.contains("yml") {
        Some(SpecFormat::Yaml)
    } else {
        None
    }
}

fn format_from_url_path(url: &str) -> Option<SpecFormat> {
    let path = url::Url::parse(url).ok()?.path().to_ascii_lowercase();
    if path.ends_with(".json") {
        Some(SpecFormat::Json)
    } else if path.ends_with(".yaml") || path.ends_with(".yml") {
        Some(SpecFormat::Yaml)
    } else {
        None
    }
}

/// Parse content using the format hint, else JSON first then YAML
pub fn parse_content(content: &str, hint: Option<SpecFormat>) -> Result<(SpecFormat, Value)> {
    match hint {
        Some(SpecFormat::Json) => serde_json::from_str(content)
            .map(|v| (SpecFormat::Json, v))
            .map_err(|e| SpecPulseError::SpecParse(format!("invalid JSON: {}", e))),
        Some(SpecFormat::Yaml) => parse_yaml(content)
            .map(|v| (SpecFormat::Yaml, v))
            .map_err(|e| SpecPulseError::SpecParse(format!("invalid YAML: {}", e))),
        None => match serde_json::from_str(content) {
            Ok(v) => Ok((SpecFormat::Json, v)),
            Err(json_err) => parse_yaml(content)
                .map(|v| (SpecFormat::Yaml, v))
                .map_err(|yaml_err| {
                    SpecPulseError::SpecParse(format!(
                        "neither JSON ({}) nor YAML ({})",
                        json_err, yaml_err
                    ))
                }),
        },
    }
}

/// YAML mappings may have non-string keys (`200:`), so go through serde_yaml's tree
fn parse_yaml(content: &str) -> std::result::Result<Value, String> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    serde_json::to_value(yaml).map_err(|e| e.to_string())
}
