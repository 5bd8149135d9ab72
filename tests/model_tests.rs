//! Integration tests for the Gemini-backed image model: request composition,
//! response parsing, and error mapping.

use std::sync::Arc;
use std::time::Duration;

use gemini_image_broker::fixtures;
use gemini_image_broker::mocks::MockHttpTransport;
use gemini_image_broker::upstream::{GeminiImageModel, ImageModel};
use gemini_image_broker::{BrokerConfig, BrokerError, HttpMethod};
use pretty_assertions::assert_eq;
use secrecy::SecretString;

fn test_model(transport: Arc<MockHttpTransport>) -> GeminiImageModel {
    let config = BrokerConfig::builder()
        .api_key(SecretString::new("test-key".into()))
        .build();
    GeminiImageModel::new(&config, transport)
}

fn request_body_json(transport: &MockHttpTransport) -> serde_json::Value {
    let request = transport.last_request().expect("no request recorded");
    serde_json::from_slice(&request.body.expect("request had no body")).expect("body was not JSON")
}

#[tokio::test]
async fn generate_image_parses_inline_data() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json_response(200, &fixtures::inline_image_response("image/png", "QUJD"));

    let model = test_model(transport.clone());
    let image = model.generate_image("a sepia storm").await.unwrap();

    assert_eq!(image.mime_type, "image/png");
    assert_eq!(image.bytes.as_ref(), b"ABC");

    transport.verify_request_count(1);
    transport.verify_request(0, HttpMethod::Post, "gemini-2.5-flash-image:generateContent");
    transport.verify_header(0, "x-goog-api-key", "test-key");

    let body = request_body_json(&transport);
    assert_eq!(body["contents"]["parts"][0]["text"], "a sepia storm");
}

#[tokio::test]
async fn edit_image_sends_instruction_then_inline_payload() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json_response(200, &fixtures::inline_image_response("image/png", "QUJD"));

    let model = test_model(transport.clone());
    model.edit_image("AAAA", "Edit this image: add rain.").await.unwrap();

    let body = request_body_json(&transport);
    let parts = &body["contents"]["parts"];
    assert_eq!(parts[0]["text"], "Edit this image: add rain.");
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[1]["inlineData"]["data"], "AAAA");
}

#[tokio::test]
async fn text_only_response_is_no_image_produced() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json_response(200, &fixtures::text_only_response("words instead"));

    let model = test_model(transport);
    let result = model.generate_image("anything").await;

    assert!(matches!(result, Err(BrokerError::NoImageProduced)));
}

#[tokio::test]
async fn http_429_maps_to_rate_limited_with_retry_after() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json_response_with_headers(
        429,
        fixtures::rate_limit_error_body(),
        &[("retry-after", "7")],
    );

    let model = test_model(transport);
    let result = model.generate_image("anything").await;

    let err = result.unwrap_err();
    assert!(err.is_rate_limit());
    match err {
        BrokerError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn http_500_maps_to_upstream_error() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json_response(500, fixtures::server_error_body());

    let model = test_model(transport);
    let result = model.generate_image("anything").await;

    let err = result.unwrap_err();
    assert!(!err.is_rate_limit());
    match err {
        BrokerError::Upstream { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("Internal error"));
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_credential_fails_before_any_request() {
    let transport = Arc::new(MockHttpTransport::new());
    let config = BrokerConfig::builder().build();
    let model = GeminiImageModel::new(&config, transport.clone());

    let result = model.generate_image("anything").await;

    assert!(matches!(result, Err(BrokerError::MissingCredential)));
    transport.verify_request_count(0);
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json_response(200, "{not json");

    let model = test_model(transport);
    let result = model.generate_image("anything").await;

    assert!(matches!(result, Err(BrokerError::Decode { .. })));
}
