//! HTTP transport layer.
//!
//! The upstream service is reached through the [`HttpTransport`] trait so the
//! rest of the crate can be exercised against scripted transports in tests.

pub mod endpoints;
mod http;
mod request;
mod reqwest;

pub use self::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
pub use self::request::RequestBuilder;
pub use self::reqwest::ReqwestTransport;
