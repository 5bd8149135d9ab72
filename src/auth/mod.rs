//! Authentication for upstream Gemini calls.
//!
//! A missing API key is not a construction-time error. The credential is
//! resolved when a request is built, so the failure surfaces on the first
//! upstream call as [`BrokerError::MissingCredential`].

use secrecy::{ExposeSecret, SecretString};

use crate::config::{AuthMethod, BrokerConfig};
use crate::error::{BrokerError, BrokerResult};

/// Authentication manager for upstream requests.
pub trait AuthManager: Send + Sync {
    /// Get the authentication header name and value, if header auth is in use.
    ///
    /// Returns `Ok(None)` when the configured method is query-parameter auth.
    fn auth_header(&self) -> BrokerResult<Option<(String, String)>>;

    /// Get the authentication query parameter, if query auth is in use.
    fn auth_query_param(&self) -> BrokerResult<Option<(String, String)>>;

    /// Clone the auth manager into a boxed trait object.
    fn clone_box(&self) -> Box<dyn AuthManager>;
}

/// API key authentication manager.
pub struct ApiKeyAuthManager {
    api_key: Option<SecretString>,
    auth_method: AuthMethod,
}

impl ApiKeyAuthManager {
    /// Create a new API key auth manager.
    pub fn new(api_key: Option<SecretString>, auth_method: AuthMethod) -> Self {
        Self {
            api_key,
            auth_method,
        }
    }

    /// Create from config.
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self::new(config.api_key.clone(), config.auth_method)
    }

    fn key(&self) -> BrokerResult<&SecretString> {
        self.api_key.as_ref().ok_or(BrokerError::MissingCredential)
    }
}

impl AuthManager for ApiKeyAuthManager {
    fn auth_header(&self) -> BrokerResult<Option<(String, String)>> {
        match self.auth_method {
            AuthMethod::Header => Ok(Some((
                "x-goog-api-key".to_string(),
                self.key()?.expose_secret().to_string(),
            ))),
            AuthMethod::QueryParam => Ok(None),
        }
    }

    fn auth_query_param(&self) -> BrokerResult<Option<(String, String)>> {
        match self.auth_method {
            AuthMethod::QueryParam => Ok(Some((
                "key".to_string(),
                self.key()?.expose_secret().to_string(),
            ))),
            AuthMethod::Header => Ok(None),
        }
    }

    fn clone_box(&self) -> Box<dyn AuthManager> {
        Box::new(Self {
            api_key: self.api_key.clone(),
            auth_method: self.auth_method,
        })
    }
}
