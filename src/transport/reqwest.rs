//! Reqwest-based HTTP transport implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::error::{BrokerError, BrokerResult};

/// Reqwest-based HTTP transport.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a new reqwest transport with the given timeouts.
    pub fn new(timeout: Duration, connect_timeout: Duration) -> BrokerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| BrokerError::Configuration {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }

    fn convert_headers(headers: HashMap<String, String>) -> reqwest::header::HeaderMap {
        let mut header_map = reqwest::header::HeaderMap::new();
        for (key, value) in headers {
            if let (Ok(name), Ok(val)) = (
                reqwest::header::HeaderName::from_bytes(key.as_bytes()),
                reqwest::header::HeaderValue::from_str(&value),
            ) {
                header_map.insert(name, val);
            }
        }
        header_map
    }

    fn extract_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> BrokerResult<HttpResponse> {
        let method = Self::convert_method(request.method);
        let headers = Self::convert_headers(request.headers);

        let mut req_builder = self.client.request(method, &request.url).headers(headers);

        if let Some(body) = request.body {
            req_builder = req_builder.body(body.to_vec());
        }

        let response = req_builder.send().await?;

        let status = response.status().as_u16();
        let response_headers = Self::extract_headers(response.headers());
        let body = response.bytes().await.map_err(|e| BrokerError::Network {
            message: format!("failed to read response body: {e}"),
        })?;

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reqwest_transport_creation() {
        let transport = ReqwestTransport::new(Duration::from_secs(30), Duration::from_secs(10));
        assert!(transport.is_ok());
    }
}
