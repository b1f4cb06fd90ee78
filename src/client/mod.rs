//! HTTP client and request execution

use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use crate::collect::body::is_json_media_type;
use crate::errors::{Result, SpecPulseError};
use crate::request::{RequestPlan, USER_AGENT_STRING};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for the shared blocking client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub verify_ssl: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT_STRING.to_string(),
            verify_ssl: true,
        }
    }
}

/// Build the blocking client used for the document, tokens and calls
pub fn build_client(options: &ClientOptions) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(options.user_agent.as_str())
        .timeout(options.timeout)
        .referer(false);

    if !options.verify_ssl {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| SpecPulseError::Network(format!("cannot create HTTP client: {}", e)))
}

/// Parsed response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

/// What came back from one call
#[derive(Debug, Clone)]
pub struct ResponseResult {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
    pub elapsed: Duration,
}

impl ResponseResult {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// JSON when the content type says so and the text parses, otherwise text
pub fn parse_body(content_type: Option<&str>, text: String) -> ResponseBody {
    if text.is_empty() {
        return ResponseBody::Empty;
    }
    if content_type.is_some_and(is_json_media_type) {
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            return ResponseBody::Json(value);
        }
    }
    ResponseBody::Text(text)
}

/// Sends request plans, one HTTP call each, never retried
pub struct Executor {
    client: Client,
}

impl Executor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn execute(&self, plan: &RequestPlan) -> Result<ResponseResult> {
        let method = Method::from_bytes(plan.method.as_bytes())
            .map_err(|_| SpecPulseError::Validation(format!("invalid HTTP method '{}'", plan.method)))?;
        let url = plan.full_url();

        let mut request = self.client.request(method, url.clone());
        for (name, value) in &plan.headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|e| SpecPulseError::Validation(format!("invalid header name '{}': {}", name, e)))?;
            let header_value = HeaderValue::try_from(value.as_str())
                .map_err(|e| SpecPulseError::Validation(format!("invalid value for header '{}': {}", name, e)))?;
            request = request.header(header_name, header_value);
        }
        if let Some(bytes) = plan.encode_body()? {
            request = request.body(bytes);
        }

        info!(method = %plan.method, url = %plan.url, "Sending request");
        let started = Instant::now();
        let response = request.send().map_err(SpecPulseError::network)?;

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let text = response.text().map_err(SpecPulseError::network)?;
        let elapsed = started.elapsed();

        debug!(status = status.as_u16(), elapsed_ms = elapsed.as_millis() as u64, "Response received");

        Ok(ResponseResult {
            status: status.as_u16(),
            reason: status.canonical_reason().map(String::from),
            headers,
            body: parse_body(content_type.as_deref(), text),
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(
            parse_body(Some("application/json; charset=utf-8"), r#"{"ok":true}"#.to_string()),
            ResponseBody::Json(json!({"ok": true}))
        );
        assert_eq!(
            parse_body(Some("application/json"), "not json".to_string()),
            ResponseBody::Text("not json".to_string())
        );
        assert_eq!(
            parse_body(Some("text/plain"), r#"{"ok":true}"#.to_string()),
            ResponseBody::Text(r#"{"ok":true}"#.to_string())
        );
        assert_eq!(parse_body(None, String::new()), ResponseBody::Empty);
    }

    #[test]
    fn test_build_client_defaults() {
        assert!(build_client(&ClientOptions::default()).is_ok());
    }
}
