use std::time::Duration;

use log::{debug, warn};
use platform_rpc_core::{HttpClient, HttpRequest, HttpResponse, SendOptions, TransportError};

use crate::config::ClientConfig;

/// Blocking HTTP client implementation using `reqwest::blocking`.
///
/// reqwest runs its own runtime underneath and panics when driven from inside
/// another async runtime, so the same rule as for the requester applies: call
/// it from a thread that may block.
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Create a new reqwest HTTP client with default settings.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a new reqwest HTTP client with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, TransportError> {
        Self::with_config(&ClientConfig::with_timeout(timeout_secs))
    }

    pub fn with_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(config.max_idle_connections)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Create a new reqwest HTTP client with a custom client configuration.
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpClient for ReqwestClient {
    fn post_json(
        &self,
        request: &HttpRequest,
        options: &SendOptions,
    ) -> Result<HttpResponse, TransportError> {
        let mut attempt = 0;
        let response = loop {
            let result = self
                .client
                .post(request.url.as_str())
                .headers(request.headers.clone())
                .body(request.body.clone())
                .send();

            match result {
                Ok(response) => break response,
                // only failures to connect; a timed out POST may already have run
                Err(e) if attempt < options.retries && e.is_connect() => {
                    attempt += 1;
                    warn!(
                        "POST {} failed ({}), retry {}/{}",
                        request.url, e, attempt, options.retries
                    );
                }
                Err(e) => return Err(TransportError::HttpPost(e.to_string())),
            }
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .map_err(|e| TransportError::ResponseBody(e.to_string()))?;
        debug!("POST {} -> {}", request.url, status);

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
