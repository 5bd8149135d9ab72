//! HTTP request builder for upstream calls.
//!
//! Handles URL construction with the API-version prefix, authentication via
//! the configured auth manager, and JSON body serialization. Because auth is
//! resolved here, a missing credential fails the first request rather than
//! client construction.

use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;
use url::Url;

use super::http::{HttpMethod, HttpRequest};
use crate::auth::AuthManager;
use crate::error::BrokerResult;

/// Builder for upstream HTTP requests.
pub struct RequestBuilder {
    base_url: Url,
    api_version: String,
    auth_manager: Box<dyn AuthManager>,
}

impl RequestBuilder {
    /// Creates a new request builder.
    pub fn new(base_url: Url, api_version: String, auth_manager: Box<dyn AuthManager>) -> Self {
        Self {
            base_url,
            api_version,
            auth_manager,
        }
    }

    /// Builds a complete URL for the given endpoint path, prepending the API
    /// version and appending the auth query parameter when that method is
    /// configured.
    pub fn build_url(&self, path: &str) -> BrokerResult<Url> {
        let path = path.trim_start_matches('/');
        let full_path = format!("{}/{}", self.api_version, path);

        let mut url = self.base_url.join(&full_path)?;

        if let Some((key, value)) = self.auth_manager.auth_query_param()? {
            url.query_pairs_mut().append_pair(&key, &value);
        }

        Ok(url)
    }

    /// Builds a POST request with a JSON body.
    pub fn post_json<T: Serialize>(&self, path: &str, body: &T) -> BrokerResult<HttpRequest> {
        let url = self.build_url(path)?;

        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        if let Some((name, value)) = self.auth_manager.auth_header()? {
            headers.insert(name, value);
        }

        let body = serde_json::to_vec(body)?;

        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            headers,
            body: Some(Bytes::from(body)),
        })
    }
}

impl Clone for RequestBuilder {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            api_version: self.api_version.clone(),
            auth_manager: self.auth_manager.clone_box(),
        }
    }
}
