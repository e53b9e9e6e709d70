use thiserror::Error;

/// Failures raised by an [`HttpClient`](crate::HttpClient) implementation.
///
/// Connection failures, timeouts and unreadable bodies all end up here; the
/// requester does not distinguish between them beyond logging.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP POST failed: {0}")]
    HttpPost(String),
    #[error("failed to read response body: {0}")]
    ResponseBody(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Debug, Error)]
pub enum Error {
    // Request construction
    #[error("endpoint must not be empty")]
    EmptyEndpoint,
    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    // Wrapped external errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// True when the request was built and handed to the transport, but the
    /// round trip did not complete.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(e: http::header::InvalidHeaderName) -> Self {
        Error::InvalidHeader(e.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeader(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
