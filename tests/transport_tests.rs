//! Integration tests for the reqwest transport and request builder against a
//! local mock HTTP server.

use std::time::Duration;

use gemini_image_broker::{
    ApiKeyAuthManager, AuthMethod, BrokerConfig, HttpTransport, RequestBuilder, ReqwestTransport,
};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(Duration::from_secs(5), Duration::from_secs(5)).unwrap()
}

fn request_builder(server: &MockServer, auth_method: AuthMethod) -> RequestBuilder {
    let config = BrokerConfig::builder()
        .api_key(SecretString::new("test-key".into()))
        .auth_method(auth_method)
        .build();
    RequestBuilder::new(
        Url::parse(&server.uri()).unwrap(),
        config.api_version.clone(),
        Box::new(ApiKeyAuthManager::from_config(&config)),
    )
}

#[tokio::test]
async fn post_json_hits_versioned_endpoint_with_header_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "contents": {"parts": [{"text": "a quiet lake"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"candidates": []}"#))
        .expect(1)
        .mount(&server)
        .await;

    let builder = request_builder(&server, AuthMethod::Header);
    let request = builder
        .post_json(
            "/models/gemini-2.5-flash-image:generateContent",
            &serde_json::json!({"contents": {"parts": [{"text": "a quiet lake"}]}}),
        )
        .unwrap();

    let response = transport().send(request).await.unwrap();

    assert!(response.is_success());
    assert_eq!(response.body.as_ref(), br#"{"candidates": []}"#);
}

#[tokio::test]
async fn query_param_auth_lands_in_the_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/m:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let builder = request_builder(&server, AuthMethod::QueryParam);
    let request = builder
        .post_json("/models/m:generateContent", &serde_json::json!({}))
        .unwrap();

    let response = transport().send(request).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn retry_after_header_survives_the_transport() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "3")
                .set_body_string(r#"{"error":{"code":429,"message":"slow down","status":"RESOURCE_EXHAUSTED"}}"#),
        )
        .mount(&server)
        .await;

    let builder = request_builder(&server, AuthMethod::Header);
    let request = builder
        .post_json("/models/m:generateContent", &serde_json::json!({}))
        .unwrap();

    let response = transport().send(request).await.unwrap();

    assert_eq!(response.status, 429);
    assert_eq!(response.retry_after(), Some(Duration::from_secs(3)));
}
