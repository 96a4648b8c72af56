use runpad::mystbin::MystBinClient;
use runpad::source::{SourceError, SourceInput};
use runpad::transport::{HttpResponse, Method};

use super::mystbin::API_URL;
use super::{StubTransport, fixture, ok, test_config};

#[tokio::test]
async fn test_resolve_paste_link() {
    let transport = StubTransport::new()
        .route(
            Method::Get,
            &format!("{API_URL}/AbcDefGhi"),
            ok(fixture("mystbin/paste.json")),
        )
        .into_arc();
    let mystbin = MystBinClient::new(transport.clone(), &test_config().mystbin);

    let source = SourceInput::parse("https://mystb.in/AbcDefGhi")
        .unwrap()
        .resolve(&mystbin)
        .await
        .unwrap();

    assert_eq!(source.language.as_deref(), Some("py"));
    assert_eq!(source.code, "def f():\n    return 1\n\nprint(f())\n");
}

#[tokio::test]
async fn test_link_syntax_overrides_paste_syntax() {
    let transport = StubTransport::new()
        .route(
            Method::Get,
            &format!("{API_URL}/AbcDefGhi"),
            ok(fixture("mystbin/paste.json")),
        )
        .into_arc();
    let mystbin = MystBinClient::new(transport.clone(), &test_config().mystbin);

    let source = SourceInput::parse("https://mystb.in/AbcDefGhi.python")
        .unwrap()
        .resolve(&mystbin)
        .await
        .unwrap();
    assert_eq!(source.language.as_deref(), Some("python"));
}

#[tokio::test]
async fn test_resolve_missing_paste() {
    let transport = StubTransport::new()
        .route(
            Method::Get,
            &format!("{API_URL}/GoneAway"),
            HttpResponse::new(404, "Not Found", ""),
        )
        .into_arc();
    let mystbin = MystBinClient::new(transport.clone(), &test_config().mystbin);

    let err = SourceInput::parse("https://mystb.in/GoneAway")
        .unwrap()
        .resolve(&mystbin)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Paste(_)));
}

#[tokio::test]
async fn test_resolve_codeblock_without_network() {
    let transport = StubTransport::new().into_arc();
    let mystbin = MystBinClient::new(transport.clone(), &test_config().mystbin);

    let source = SourceInput::parse("```rust\nfn main() {}\n```")
        .unwrap()
        .resolve(&mystbin)
        .await
        .unwrap();

    assert_eq!(source.language.as_deref(), Some("rust"));
    assert_eq!(source.code, "fn main() {}");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_resolve_empty_codeblock() {
    let transport = StubTransport::new().into_arc();
    let mystbin = MystBinClient::new(transport.clone(), &test_config().mystbin);

    let err = SourceInput::parse("```py\n\n```")
        .unwrap()
        .resolve(&mystbin)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Empty));
}
