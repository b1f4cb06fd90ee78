//! Building and sending request plans
mod common;

use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{fixtures::fixture_arg, CLOSED_URL};
use specpulse::auth::AuthMaterial;
use specpulse::client::{build_client, ClientOptions, Executor, ResponseBody};
use specpulse::collect::ParameterValues;
use specpulse::core::Runner;
use specpulse::errors::SpecPulseError;
use specpulse::openapi::{load, select_normalizer, Endpoint, ParamLocation, Parameter, TypeHint};
use specpulse::prompt::ScriptedPrompter;
use specpulse::request::RequestPlan;

fn param(name: &str, location: ParamLocation) -> Parameter {
    Parameter {
        name: name.to_string(),
        location,
        required: location == ParamLocation::Path,
        type_hint: TypeHint::String,
        default: None,
        description: None,
        enum_values: Vec::new(),
        partially_resolved: false,
    }
}

fn order_endpoint() -> Endpoint {
    Endpoint {
        method: "GET".to_string(),
        path: "/orders/{id}".to_string(),
        operation_id: Some("getOrder".to_string()),
        summary: None,
        tags: Vec::new(),
        deprecated: false,
        parameters: vec![
            param("id", ParamLocation::Path),
            param("expand", ParamLocation::Query),
            param("X-Trace", ParamLocation::Header),
            param("session", ParamLocation::Cookie),
        ],
        request_body: None,
        security: None,
        servers: Vec::new(),
    }
}

fn order_values() -> ParameterValues {
    let endpoint = order_endpoint();
    let mut values = ParameterValues::new();
    for (p, v) in endpoint.parameters.iter().zip(["42", "items", "t-1", "s-9"]) {
        values.insert(p, v.to_string());
    }
    values
}

#[tokio::test(flavor = "multi_thread")]
async fn test_plan_sent_with_every_location() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/orders/42"))
        .and(query_param("expand", "items"))
        .and(header("x-trace", "t-1"))
        .and(header("cookie", "session=s-9"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req-7")
                .set_body_json(json!({"id": 42, "status": "shipped"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/api/", server.uri());
    let response = tokio::task::spawn_blocking(move || {
        let plan = RequestPlan::build(&order_endpoint(), &order_values(), &AuthMaterial::default(), &base).unwrap();
        let executor = Executor::new(build_client(&ClientOptions::default()).unwrap());
        executor.execute(&plan).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert_eq!(response.header("X-Request-Id"), Some("req-7"));
    assert_eq!(response.body, ResponseBody::Json(json!({"id": 42, "status": "shipped"})));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_status_is_a_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/42"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such order"))
        .mount(&server)
        .await;

    let base = server.uri();
    let response = tokio::task::spawn_blocking(move || {
        let plan = RequestPlan::build(&order_endpoint(), &order_values(), &AuthMaterial::default(), &base).unwrap();
        Executor::new(build_client(&ClientOptions::default()).unwrap()).execute(&plan).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
    assert_eq!(response.body, ResponseBody::Text("no such order".to_string()));
}

#[test]
fn test_unreachable_host_is_network_error() {
    let plan = RequestPlan::build(&order_endpoint(), &order_values(), &AuthMaterial::default(), CLOSED_URL).unwrap();
    let executor = Executor::new(build_client(&ClientOptions::default()).unwrap());

    let err = executor.execute(&plan).unwrap_err();
    assert!(matches!(err, SpecPulseError::Network(_)), "got {:?}", err);
}

#[test]
fn test_missing_path_value_is_rejected_before_sending() {
    let mut values = order_values();
    values.path.clear();

    let err = RequestPlan::build(&order_endpoint(), &values, &AuthMaterial::default(), CLOSED_URL).unwrap_err();
    assert!(matches!(err, SpecPulseError::Validation(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_form_body_from_swagger_form_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("username=alice&password=p+w"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let base = server.uri();
    let outcomes = tokio::task::spawn_blocking(move || {
        let client = build_client(&ClientOptions::default()).unwrap();
        let raw = load(&fixture_arg("swagger2.json"), &client).unwrap();
        let (normalizer, _) = select_normalizer(false);
        let spec = normalizer.normalize(&raw).unwrap();
        let login = spec.endpoints.iter().position(|e| e.path == "/login").unwrap();

        let mut prompter = ScriptedPrompter::new(["username=alice", "password=p w", ""]);
        let mut out = Vec::new();
        let mut runner = Runner::new(&spec, base, client).forced_base(true);
        runner.run_selection(&[login], &mut prompter, &mut out).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(outcomes, vec![Ok(204)]);
}
