use std::sync::Arc;

use http::HeaderMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::error::TransportError;

/// A fully built outbound POST request.
///
/// Produced by [`RpcRequester::build_request`](crate::RpcRequester::build_request);
/// transports only read it.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Destination URL.
    pub url: Url,
    /// Headers to send, mandatory JSON headers included.
    pub headers: HeaderMap,
    /// JSON text of the payload.
    pub body: String,
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Numeric HTTP status code (e.g., `200`, `500`).
    pub status: u16,
    /// Response headers as a case-insensitive map.
    pub headers: HeaderMap,
    /// Response body decoded as text. May be empty.
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body. No validation beyond what `T` itself requires.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// Per-request hints handed to the transport.
///
/// What a transport does with them is up to the implementation; the requester
/// itself never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendOptions {
    /// Failures of critical requests are reported at error level.
    pub critical: bool,
    /// Extra attempts the transport may make on connection failure.
    pub retries: u32,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            critical: true,
            retries: 0,
        }
    }
}

/// Minimal blocking HTTP client trait that can be implemented with any HTTP library.
///
/// This allows consumers to bring their own HTTP client implementation, or to
/// share one process-wide client between several requesters through `Arc`.
/// Implementations must read the whole body before returning and must not turn
/// non-2xx status codes into errors.
pub trait HttpClient: Send + Sync {
    /// Perform a POST request with a JSON body.
    ///
    /// # Arguments
    /// * `request` - URL, headers and body to send
    /// * `options` - Transport hints (criticality, retry budget)
    ///
    /// # Returns
    /// The buffered response, whatever its status code
    fn post_json(
        &self,
        request: &HttpRequest,
        options: &SendOptions,
    ) -> Result<HttpResponse, TransportError>;
}

impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    fn post_json(
        &self,
        request: &HttpRequest,
        options: &SendOptions,
    ) -> Result<HttpResponse, TransportError> {
        (**self).post_json(request, options)
    }
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn post_json(
        &self,
        request: &HttpRequest,
        options: &SendOptions,
    ) -> Result<HttpResponse, TransportError> {
        (**self).post_json(request, options)
    }
}
