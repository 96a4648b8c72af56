use std::sync::Arc;

use runpad::playground::{PlaygroundClient, PlaygroundError};
use runpad::transport::{HttpRequest, HttpResponse, Method, RequestBody};
use runpad::types::{PlaygroundSettings, RustChannel, RustEdition, RustMode};
use serde_json::Value;

use super::{StubTransport, ok, test_config};

const BASE_URL: &str = "https://play.rust-lang.org/";

fn url(route: &str) -> String {
    format!("{BASE_URL}{route}")
}

fn client(transport: &Arc<StubTransport>) -> PlaygroundClient {
    PlaygroundClient::new(transport.clone(), &test_config().playground)
}

fn json_body(request: &HttpRequest) -> &Value {
    match &request.body {
        RequestBody::Json(body) => body,
        other => panic!("expected a JSON body, got {other:?}"),
    }
}

#[tokio::test]
async fn test_execute_bin() {
    let transport = StubTransport::new()
        .route(
            Method::Post,
            &url("execute"),
            ok(r#"{"success":true,"stdout":"hi\n","stderr":"   Compiling playground"}"#),
        )
        .into_arc();

    let settings = PlaygroundSettings {
        channel: RustChannel::Stable,
        edition: RustEdition::E2021,
        mode: RustMode::Release,
    };
    let response = client(&transport)
        .execute("fn main() { println!(\"hi\"); }", settings)
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.to_string(), "hi\n");

    let requests = transport.requests();
    let body = json_body(&requests[0]);
    assert_eq!(body["backtrace"], false);
    assert_eq!(body["channel"], "stable");
    assert_eq!(body["crateType"], "bin");
    assert_eq!(body["edition"], "2021");
    assert_eq!(body["mode"], "release");
    assert_eq!(body["tests"], false);
}

#[tokio::test]
async fn test_execute_defaults_and_lib_crate() {
    let transport = StubTransport::new()
        .route(
            Method::Post,
            &url("execute"),
            ok(r#"{"success":false,"stdout":"","stderr":"error: unused"}"#),
        )
        .into_arc();

    let response = client(&transport)
        .execute("pub fn f() {}", PlaygroundSettings::default())
        .await
        .unwrap();
    assert!(!response.success);
    assert_eq!(response.to_string(), "error: unused\n");

    let requests = transport.requests();
    let body = json_body(&requests[0]);
    assert_eq!(body["channel"], "nightly");
    assert_eq!(body["crateType"], "lib");
    assert_eq!(body["edition"], "2018");
    assert_eq!(body["mode"], "debug");
}

#[tokio::test]
async fn test_execute_500_is_timeout() {
    let transport = StubTransport::new()
        .route(
            Method::Post,
            &url("execute"),
            HttpResponse::new(500, "Internal Server Error", ""),
        )
        .into_arc();

    let response = client(&transport)
        .execute("fn main() { loop {} }", PlaygroundSettings::default())
        .await
        .unwrap();

    assert!(!response.success);
    assert_eq!(response.stderr, "Timed out.");
    assert!(response.stdout.is_empty());
}

#[tokio::test]
async fn test_execute_other_status_is_error() {
    let transport = StubTransport::new()
        .route(
            Method::Post,
            &url("execute"),
            HttpResponse::new(429, "Too Many Requests", ""),
        )
        .into_arc();

    let err = client(&transport)
        .execute("fn main() {}", PlaygroundSettings::default())
        .await
        .unwrap_err();
    match err {
        PlaygroundError::Http(message) => assert_eq!(message, "429 Too Many Requests"),
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_format() {
    let transport = StubTransport::new()
        .route(
            Method::Post,
            &url("format"),
            ok(r#"{"success":true,"code":"fn main() {}\n","stdout":"","stderr":""}"#),
        )
        .into_arc();

    let response = client(&transport)
        .format("fn main(){}", RustEdition::E2018)
        .await
        .unwrap();
    assert_eq!(response.to_string(), "fn main() {}\n");

    let requests = transport.requests();
    let body = json_body(&requests[0]);
    assert_eq!(body["code"], "fn main(){}");
    assert_eq!(body["edition"], "2018");
}

#[tokio::test]
async fn test_format_error_is_an_error_status() {
    let transport = StubTransport::new()
        .route(
            Method::Post,
            &url("format"),
            HttpResponse::new(502, "Bad Gateway", ""),
        )
        .into_arc();

    let err = client(&transport)
        .format("fn main(){}", RustEdition::E2018)
        .await
        .unwrap_err();
    assert!(matches!(err, PlaygroundError::Http(_)));
}

#[tokio::test]
async fn test_clippy_sends_crate_type() {
    let transport = StubTransport::new()
        .route(
            Method::Post,
            &url("clippy"),
            ok(r#"{"success":true,"stdout":"","stderr":"warning: unused variable"}"#),
        )
        .into_arc();

    let response = client(&transport)
        .clippy("fn main() { let x = 1; }", RustEdition::E2021)
        .await
        .unwrap();
    assert!(response.success);

    let requests = transport.requests();
    let body = json_body(&requests[0]);
    assert_eq!(body["crateType"], "bin");
    assert_eq!(body["edition"], "2021");
}

#[tokio::test]
async fn test_expand_macros_route() {
    let transport = StubTransport::new()
        .route(
            Method::Post,
            &url("macro-expansion"),
            ok(r#"{"success":true,"stdout":"expanded","stderr":""}"#),
        )
        .into_arc();

    let response = client(&transport)
        .expand_macros("fn main() { println!(); }", RustEdition::E2018)
        .await
        .unwrap();
    assert_eq!(response.to_string(), "expanded");
    assert_eq!(transport.count(Method::Post, &url("macro-expansion")), 1);
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let transport = StubTransport::new()
        .route(Method::Post, &url("clippy"), ok("not json"))
        .into_arc();

    let err = client(&transport)
        .clippy("fn main() {}", RustEdition::E2018)
        .await
        .unwrap_err();
    assert!(matches!(err, PlaygroundError::Decode(_)));
}
