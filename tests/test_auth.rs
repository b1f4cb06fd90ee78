//! Authentication against mock servers
//!
//! The engine is blocking, so each test drives it from `spawn_blocking`
//! while wiremock runs on the test runtime.
mod common;

use std::path::Path;

use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{fixture_with_server, fixtures::fixture_arg, path_str, write_spec};
use specpulse::client::{build_client, ClientOptions};
use specpulse::core::Runner;
use specpulse::openapi::{load, select_normalizer, Specification};
use specpulse::prompt::ScriptedPrompter;

fn load_spec(location: &str) -> Specification {
    let client = build_client(&ClientOptions::default()).unwrap();
    let raw = load(location, &client).unwrap();
    let (normalizer, _) = select_normalizer(false);
    normalizer.normalize(&raw).unwrap()
}

fn path_arg(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_client_credentials_token_shared_between_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client-1"))
        .and(body_string_contains("scope=reports.read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    for endpoint in ["/reports", "/metrics"] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (_dir, spec_path) = fixture_with_server("oauth.yaml", &server.uri());
    let base = server.uri();

    let (outcomes, remaining, questions) = tokio::task::spawn_blocking(move || {
        let spec = load_spec(&path_arg(&spec_path));
        let client = build_client(&ClientOptions::default()).unwrap();
        // token URL and scope keep their defaults
        let mut prompter = ScriptedPrompter::new(["", "client-1", "secret-1", ""]);
        let mut out = Vec::new();

        let mut runner = Runner::new(&spec, base, client);
        let outcomes = runner.run_selection(&[0, 1], &mut prompter, &mut out).unwrap();
        assert_eq!(runner.auth().tokens().len(), 1);
        (outcomes, prompter.remaining(), prompter.questions.len())
    })
    .await
    .unwrap();

    assert_eq!(outcomes, vec![Ok(200), Ok(200)]);
    assert_eq!(remaining, 0);
    assert_eq!(questions, 4, "credentials are asked once for both endpoints");
}

fn scoped_spec(server_url: &str) -> String {
    json!({
        "openapi": "3.0.0",
        "info": {"title": "Scoped", "version": "1"},
        "servers": [{"url": server_url}],
        "components": {"securitySchemes": {"cc": {
            "type": "oauth2",
            "flows": {"clientCredentials": {
                "tokenUrl": format!("{}/oauth/token", server_url),
                "scopes": {"read": "", "write": ""}
            }}
        }}},
        "paths": {
            "/a": {"get": {"security": [{"cc": ["read"]}]}},
            "/b": {"get": {"security": [{"cc": ["write"]}]}}
        }
    })
    .to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_token_requested_per_scope_set() {
    let server = MockServer::start().await;

    for (scope, token) in [("read", "tok-read"), ("write", "tok-write")] {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains(format!("scope={}", scope)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    for (endpoint, token) in [("/a", "tok-read"), ("/b", "tok-write")] {
        let bearer = format!("Bearer {}", token);
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(header("authorization", bearer.as_str()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (_dir, spec_path) = write_spec("scoped.json", &scoped_spec(&server.uri()));
    let location = path_str(&spec_path).to_string();
    let base = server.uri();

    let (outcomes, tokens, questions) = tokio::task::spawn_blocking(move || {
        let spec = load_spec(&location);
        let client = build_client(&ClientOptions::default()).unwrap();
        // client credentials once, then the scope for each requirement
        let mut prompter = ScriptedPrompter::new(["", "client-1", "secret-1", "", ""]);
        let mut out = Vec::new();

        let mut runner = Runner::new(&spec, base, client);
        let outcomes = runner.run_selection(&[0, 1], &mut prompter, &mut out).unwrap();
        (outcomes, runner.auth().tokens().len(), prompter.questions.len())
    })
    .await
    .unwrap();

    assert_eq!(outcomes, vec![Ok(204), Ok(204)]);
    assert_eq!(tokens, 2);
    assert_eq!(questions, 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_token_exchange_skips_dependent_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "unknown client"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, spec_path) = fixture_with_server("oauth.yaml", &server.uri());
    let base = server.uri();

    let (outcomes, errors) = tokio::task::spawn_blocking(move || {
        let spec = load_spec(&path_arg(&spec_path));
        let client = build_client(&ClientOptions::default()).unwrap();
        let mut prompter = ScriptedPrompter::new(["", "nobody", "wrong", ""]);
        let mut out = Vec::new();

        let mut runner = Runner::new(&spec, base, client);
        let outcomes = runner.run_selection(&[0, 1], &mut prompter, &mut out).unwrap();
        let errors: Vec<String> = prompter.errors().into_iter().map(String::from).collect();
        (outcomes, errors)
    })
    .await
    .unwrap();

    assert_eq!(outcomes.len(), 2);
    let first = outcomes[0].as_ref().unwrap_err();
    assert!(first.contains("invalid_client"), "got {}", first);
    let second = outcomes[1].as_ref().unwrap_err();
    assert!(second.contains("failed earlier"), "got {}", second);
    assert_eq!(errors.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_key_header_reused_across_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pets"))
        .and(header("x-api-key", "k-1"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": "Rex"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 42, "name": "Rex"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pets/42"))
        .and(header("x-api-key", "k-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let base = server.uri();
    let (outcomes, output) = tokio::task::spawn_blocking(move || {
        let spec = load_spec(&fixture_arg("petstore.yaml"));
        let client = build_client(&ClientOptions::default()).unwrap();
        let mut prompter = ScriptedPrompter::new(["k-1", r#"{"name": "Rex"}"#, "42"]);
        let mut out = Vec::new();

        let mut runner = Runner::new(&spec, base, client).forced_base(true);
        let outcomes = runner.run_selection(&[1, 2], &mut prompter, &mut out).unwrap();
        assert_eq!(prompter.remaining(), 0);
        (outcomes, String::from_utf8(out).unwrap())
    })
    .await
    .unwrap();

    assert_eq!(outcomes, vec![Ok(201), Ok(200)]);
    assert!(output.contains("--- Calling: POST /pets ---"));
    assert!(output.contains("Response Status: 201 Created"));
    assert!(output.contains("\"name\": \"Rex\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_operation_without_security_sends_no_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let base = server.uri();
    let requests = tokio::task::spawn_blocking(move || {
        let spec = load_spec(&fixture_arg("petstore.yaml"));
        let client = build_client(&ClientOptions::default()).unwrap();
        // limit keeps its default, tags left empty
        let mut prompter = ScriptedPrompter::new(["", ""]);
        let mut out = Vec::new();

        let mut runner = Runner::new(&spec, base, client).forced_base(true);
        let outcomes = runner.run_selection(&[0], &mut prompter, &mut out).unwrap();
        assert_eq!(outcomes, vec![Ok(200)]);
        prompter.questions
    })
    .await
    .unwrap();

    assert!(requests.iter().all(|q| !q.contains("API key")));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("x-api-key").is_none());
    assert_eq!(received[0].url.query(), Some("limit=20"));
}
