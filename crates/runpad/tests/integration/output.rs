use runpad::mystbin::MystBinClient;
use runpad::output::{Rendered, render};
use runpad::transport::Method;

use super::mystbin::{API_URL, created};
use super::{StubTransport, test_config};

#[tokio::test]
async fn test_short_output_is_inline() {
    let transport = StubTransport::new().into_arc();
    let config = test_config();
    let mystbin = MystBinClient::new(transport.clone(), &config.mystbin);

    let rendered = render("hello ``` world", "txt", &config.output, &mystbin)
        .await
        .unwrap();

    assert_eq!(
        rendered,
        Rendered::Inline("```txt\nhello `\u{200b}`` world```".to_owned())
    );
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_long_output_is_pasted() {
    let transport = StubTransport::new()
        .route(Method::Post, API_URL, created("LongOne"))
        .into_arc();
    let config = test_config();
    let mystbin = MystBinClient::new(transport.clone(), &config.mystbin);

    let output = "line\n".repeat(51);
    let rendered = render(&output, "py", &config.output, &mystbin)
        .await
        .unwrap();

    assert_eq!(
        rendered,
        Rendered::Paste {
            url: "https://mystb.in/LongOne.py".to_owned()
        }
    );
    assert_eq!(
        rendered.to_string(),
        "Output can be viewed at <https://mystb.in/LongOne.py>"
    );
    assert_eq!(transport.count(Method::Post, API_URL), 1);
}

#[tokio::test]
async fn test_paste_failure_is_reported() {
    let transport = StubTransport::new().into_arc();
    let config = test_config();
    let mystbin = MystBinClient::new(transport.clone(), &config.mystbin);

    let output = "x".repeat(5000);
    let result = render(&output, "txt", &config.output, &mystbin).await;
    assert!(result.is_err());
}
