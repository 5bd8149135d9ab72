//! Mock implementations for testing.
//!
//! Scripted doubles for the two seams of the crate: [`MockHttpTransport`] for
//! exercising the upstream client without a network, and
//! [`ScriptedImageModel`] for exercising the broker without the upstream
//! client. Compiled into the crate so integration tests can use them.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::auth::AuthManager;
use crate::error::{BrokerError, BrokerResult};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::types::ImageData;
use crate::upstream::ImageModel;

/// Mock HTTP transport with a scripted response queue and a request log.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Arc<Mutex<VecDeque<BrokerResult<HttpResponse>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockHttpTransport {
    /// Create a new mock HTTP transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a response to be returned by the next request.
    pub fn enqueue_response(&self, response: BrokerResult<HttpResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Enqueue a JSON response with the given status code and body.
    pub fn enqueue_json_response(&self, status: u16, body: &str) {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        self.enqueue_response(Ok(HttpResponse {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }));
    }

    /// Enqueue a JSON response carrying extra headers (e.g. `retry-after`).
    pub fn enqueue_json_response_with_headers(
        &self,
        status: u16,
        body: &str,
        extra_headers: &[(&str, &str)],
    ) {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        for (name, value) in extra_headers {
            headers.insert((*name).to_string(), (*value).to_string());
        }

        self.enqueue_response(Ok(HttpResponse {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }));
    }

    /// Get all requests that were made.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Get the last request that was made.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Verify that exactly `expected` requests were made.
    pub fn verify_request_count(&self, expected: usize) {
        let actual = self.requests.lock().unwrap().len();
        assert_eq!(
            actual, expected,
            "Expected {expected} requests, got {actual}"
        );
    }

    /// Verify a request's method and that its URL contains a fragment.
    pub fn verify_request(&self, index: usize, method: HttpMethod, url_contains: &str) {
        let requests = self.requests.lock().unwrap();
        assert!(index < requests.len(), "No request at index {index}");

        let request = &requests[index];
        assert_eq!(request.method, method);
        assert!(
            request.url.contains(url_contains),
            "Expected URL to contain '{}', got '{}'",
            url_contains,
            request.url
        );
    }

    /// Verify that a request carries a specific header.
    pub fn verify_header(&self, index: usize, header_name: &str, header_value: &str) {
        let requests = self.requests.lock().unwrap();
        assert!(index < requests.len(), "No request at index {index}");

        let actual = requests[index].headers.get(header_name);
        assert_eq!(
            actual,
            Some(&header_value.to_string()),
            "Expected header '{header_name}' to be '{header_value}', got {actual:?}"
        );
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> BrokerResult<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(BrokerError::Network {
                    message: "no scripted response".to_string(),
                })
            })
    }
}

/// Mock auth manager returning a fixed header credential.
pub struct MockAuthManager {
    api_key: String,
}

impl MockAuthManager {
    /// Create a mock auth manager with the given key.
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
        }
    }
}

impl AuthManager for MockAuthManager {
    fn auth_header(&self) -> BrokerResult<Option<(String, String)>> {
        Ok(Some(("x-goog-api-key".to_string(), self.api_key.clone())))
    }

    fn auth_query_param(&self) -> BrokerResult<Option<(String, String)>> {
        Ok(None)
    }

    fn clone_box(&self) -> Box<dyn AuthManager> {
        Box::new(Self {
            api_key: self.api_key.clone(),
        })
    }
}

/// Scripted [`ImageModel`] for broker tests.
///
/// Outcomes are popped from per-operation scripts; when a script runs dry the
/// configurable fallback is returned, which keeps always-failing scenarios
/// (e.g. retry exhaustion) one-liners. Every call is recorded with its start
/// instant, and an optional simulated latency holds each call open so tests
/// can observe overlap.
pub struct ScriptedImageModel {
    generate_script: Mutex<VecDeque<BrokerResult<ImageData>>>,
    edit_script: Mutex<VecDeque<BrokerResult<ImageData>>>,
    generate_fallback: Mutex<BrokerResult<ImageData>>,
    generate_calls: Mutex<Vec<(String, tokio::time::Instant)>>,
    edit_calls: Mutex<Vec<(String, String)>>,
    latency: Mutex<Duration>,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl Default for ScriptedImageModel {
    fn default() -> Self {
        Self {
            generate_script: Mutex::new(VecDeque::new()),
            edit_script: Mutex::new(VecDeque::new()),
            generate_fallback: Mutex::new(Ok(ImageData::new("image/png", &b"fallback"[..]))),
            generate_calls: Mutex::new(Vec::new()),
            edit_calls: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
        }
    }
}

impl ScriptedImageModel {
    /// Create a scripted model with an `Ok` fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `generate_image` outcome.
    pub fn push_generate(&self, outcome: BrokerResult<ImageData>) {
        self.generate_script.lock().unwrap().push_back(outcome);
    }

    /// Script a successful `generate_image` outcome.
    pub fn push_generate_ok(&self, image: ImageData) {
        self.push_generate(Ok(image));
    }

    /// Script the next `edit_image` outcome.
    pub fn push_edit(&self, outcome: BrokerResult<ImageData>) {
        self.edit_script.lock().unwrap().push_back(outcome);
    }

    /// Script a successful `edit_image` outcome.
    pub fn push_edit_ok(&self, image: ImageData) {
        self.push_edit(Ok(image));
    }

    /// Set the outcome returned once the generate script runs dry.
    pub fn set_generate_fallback(&self, outcome: BrokerResult<ImageData>) {
        *self.generate_fallback.lock().unwrap() = outcome;
    }

    /// Simulate per-call latency.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Prompts passed to `generate_image`, in call order.
    pub fn generate_prompts(&self) -> Vec<String> {
        self.generate_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(prompt, _)| prompt.clone())
            .collect()
    }

    /// Start instants of `generate_image` calls, in call order.
    pub fn generate_call_instants(&self) -> Vec<tokio::time::Instant> {
        self.generate_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    /// `(base64, instruction)` pairs passed to `edit_image`, in call order.
    pub fn edit_calls(&self) -> Vec<(String, String)> {
        self.edit_calls.lock().unwrap().clone()
    }

    /// Total upstream calls across both operations.
    pub fn call_count(&self) -> usize {
        self.generate_calls.lock().unwrap().len() + self.edit_calls.lock().unwrap().len()
    }

    /// The highest number of concurrently open calls observed.
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn track_call<T>(&self, work: impl std::future::Future<Output = T>) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap();
        if latency > Duration::ZERO {
            tokio::time::sleep(latency).await;
        }

        let result = work.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl ImageModel for ScriptedImageModel {
    async fn generate_image(&self, prompt: &str) -> BrokerResult<ImageData> {
        self.generate_calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), tokio::time::Instant::now()));

        self.track_call(async {
            self.generate_script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.generate_fallback.lock().unwrap().clone())
        })
        .await
    }

    async fn edit_image(&self, image_base64: &str, instruction: &str) -> BrokerResult<ImageData> {
        self.edit_calls
            .lock()
            .unwrap()
            .push((image_base64.to_string(), instruction.to_string()));

        self.track_call(async {
            self.edit_script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ImageData::new("image/png", &b"edited"[..])))
        })
        .await
    }
}
