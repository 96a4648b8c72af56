use std::sync::Arc;

use runpad::piston::{Outcome, PistonClient, PistonError, PistonFile};
use runpad::transport::{HttpResponse, Method, RequestBody};

use super::{StubTransport, fixture, ok, test_config};

const RUNTIMES_URL: &str = "https://emkc.org/api/v2/piston/runtimes";
const EXECUTE_URL: &str = "https://emkc.org/api/v2/piston/execute";

fn client(transport: &Arc<StubTransport>) -> PistonClient {
    PistonClient::new(transport.clone(), &test_config().piston)
}

fn with_runtimes(transport: StubTransport) -> StubTransport {
    transport.route(Method::Get, RUNTIMES_URL, ok(fixture("piston/runtimes.json")))
}

#[tokio::test]
async fn test_runtimes_are_cached() {
    let transport = with_runtimes(StubTransport::new()).into_arc();
    let client = client(&transport);

    assert_eq!(client.runtimes().await.unwrap().len(), 3);
    assert_eq!(client.runtimes().await.unwrap().len(), 3);
    assert_eq!(transport.count(Method::Get, RUNTIMES_URL), 1);
}

#[tokio::test]
async fn test_get_runtime_by_name_and_alias() {
    let transport = with_runtimes(StubTransport::new()).into_arc();
    let client = client(&transport);

    let rust = client.get_runtime("Rust").await.unwrap();
    assert_eq!(rust.version, "1.68.2");

    let python = client.get_runtime("py3").await.unwrap();
    assert_eq!(python.language, "python");

    let javascript = client.get_runtime("js").await.unwrap();
    assert_eq!(javascript.runtime.as_deref(), Some("node"));
}

#[tokio::test]
async fn test_get_runtime_prefers_last_listed_version() {
    let body = r#"[
        {"language": "python", "version": "2.7.18", "aliases": ["py2"]},
        {"language": "python", "version": "3.10.0", "aliases": ["py", "py3"]},
        {"language": "rust", "version": "1.68.2", "aliases": ["rs"]}
    ]"#;
    let transport = StubTransport::new()
        .route(Method::Get, RUNTIMES_URL, ok(body))
        .into_arc();
    let client = client(&transport);

    assert_eq!(client.get_runtime("python").await.unwrap().version, "3.10.0");
    assert_eq!(client.get_runtime("py").await.unwrap().version, "3.10.0");
    // Aliases of a shadowed version no longer resolve
    assert!(matches!(
        client.get_runtime("py2").await,
        Err(PistonError::RuntimeNotFound(_))
    ));
}

#[tokio::test]
async fn test_get_unknown_runtime() {
    let transport = with_runtimes(StubTransport::new()).into_arc();

    let err = client(&transport).get_runtime("cobol").await.unwrap_err();
    assert!(matches!(err, PistonError::RuntimeNotFound(_)));
    assert_eq!(err.to_string(), "Runtime 'cobol' not found.");
}

#[tokio::test]
async fn test_runtimes_http_error() {
    let transport = StubTransport::new()
        .route(
            Method::Get,
            RUNTIMES_URL,
            HttpResponse::new(503, "Service Unavailable", "maintenance"),
        )
        .into_arc();

    let err = client(&transport).runtimes().await.unwrap_err();
    match err {
        PistonError::Http(message) => assert_eq!(message, "503 Service Unavailable: maintenance"),
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_execute_sends_payload() {
    let transport = with_runtimes(StubTransport::new())
        .route(
            Method::Post,
            EXECUTE_URL,
            ok(fixture("piston/execute_compiled.json")),
        )
        .into_arc();
    let client = client(&transport);

    let runtime = client.get_runtime("rs").await.unwrap();
    let options = client
        .default_options()
        .with_stdin("input")
        .with_args(vec!["--flag".to_owned()]);
    let files = [PistonFile::new("main.rs", "fn main() {}")];
    let response = client.execute(&runtime, &files, &options).await.unwrap();

    assert_eq!(response.outcome(), Outcome::Success);
    assert_eq!(response.code(), Some(0));
    assert_eq!(response.run.stdout, "hello\n");
    // The empty compile output still leads the combined output
    assert_eq!(response.output(), "\nhello\n");

    let request = transport
        .requests()
        .into_iter()
        .find(|request| request.url == EXECUTE_URL)
        .unwrap();
    let RequestBody::Json(body) = request.body else {
        panic!("execute body is not JSON");
    };
    assert_eq!(body["language"], "rust");
    assert_eq!(body["version"], "1.68.2");
    assert_eq!(body["files"][0]["name"], "main.rs");
    assert_eq!(body["files"][0]["content"], "fn main() {}");
    assert_eq!(body["stdin"], "input");
    assert_eq!(body["args"][0], "--flag");
    assert_eq!(body["compile_timeout"], 10_000);
    assert_eq!(body["run_timeout"], 5_000);
    assert_eq!(body["compile_memory_limit"], -1);
    assert_eq!(body["run_memory_limit"], -1);
}

#[tokio::test]
async fn test_execute_killed() {
    let transport = with_runtimes(StubTransport::new())
        .route(
            Method::Post,
            EXECUTE_URL,
            ok(fixture("piston/execute_killed.json")),
        )
        .into_arc();
    let client = client(&transport);

    let runtime = client.get_runtime("python").await.unwrap();
    let files = [PistonFile::new("main.py", "while True: pass")];
    let response = client
        .execute(&runtime, &files, &client.default_options())
        .await
        .unwrap();

    assert_eq!(response.outcome(), Outcome::Killed);
    assert_eq!(response.code(), None);
}

#[tokio::test]
async fn test_execute_400_is_runtime_not_found() {
    let transport = with_runtimes(StubTransport::new())
        .route(
            Method::Post,
            EXECUTE_URL,
            HttpResponse::new(
                400,
                "Bad Request",
                r#"{"message":"python-9.9.9 runtime is unknown"}"#,
            ),
        )
        .into_arc();
    let client = client(&transport);

    let mut runtime = client.get_runtime("python").await.unwrap();
    runtime.version = "9.9.9".to_owned();
    let err = client
        .execute(&runtime, &[], &client.default_options())
        .await
        .unwrap_err();

    match err {
        PistonError::RuntimeNotFound(message) => {
            assert_eq!(message, "python-9.9.9 runtime is unknown");
        }
        other => panic!("expected RuntimeNotFound, got {other:?}"),
    }
}
