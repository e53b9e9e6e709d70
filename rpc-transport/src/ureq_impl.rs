use std::{fmt, io, time::Duration};

use log::{debug, warn};
use platform_rpc_core::{HttpClient, HttpRequest, HttpResponse, SendOptions, TransportError};

use crate::config::ClientConfig;

/// Minimal blocking HTTP client implementation using ureq.
///
/// Status codes are passed through untouched: a `500` carrying a JSON-RPC
/// error object is a response, not a transport failure.
///
/// # Example
///
/// ```ignore
/// use platform_rpc_core::{CallContext, RpcRequester};
/// use platform_rpc_transport::UreqClient;
///
/// let requester = RpcRequester::new(UreqClient::new(), ());
/// let outcome = requester.send(CallContext::Blocking, "https://rpc.example.com", &payload)?;
/// ```
#[derive(Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqClient").finish_non_exhaustive()
    }
}

/// True when the request never reached the server, so sending it again cannot
/// run the call twice. Timeouts and protocol errors are not retried.
fn is_connect_failure(e: &ureq::Error) -> bool {
    match e {
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => true,
        ureq::Error::Io(err) => matches!(
            err.kind(),
            io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable
        ),
        _ => false,
    }
}

impl UreqClient {
    /// Create a new ureq HTTP client with default settings.
    pub fn new() -> Self {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a new ureq HTTP client with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self::with_config(&ClientConfig::with_timeout(timeout_secs))
    }

    pub fn with_config(config: &ClientConfig) -> Self {
        Self {
            agent: ureq::Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
                .timeout_connect(Some(Duration::from_secs(config.connect_timeout_secs)))
                .max_idle_connections(config.max_idle_connections)
                .max_idle_connections_per_host(config.max_idle_connections)
                .http_status_as_error(false)
                .build()
                .into(),
        }
    }

    /// Wrap an already configured agent. It should not turn status codes into
    /// errors.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqClient {
    fn post_json(
        &self,
        request: &HttpRequest,
        options: &SendOptions,
    ) -> Result<HttpResponse, TransportError> {
        let mut attempt = 0;
        let mut response = loop {
            let mut req = self.agent.post(request.url.as_str());
            for (name, value) in request.headers.iter() {
                req = req.header(name, value);
            }

            match req.send(request.body.as_str()) {
                Ok(response) => break response,
                Err(e) if attempt < options.retries && is_connect_failure(&e) => {
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
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::ResponseBody(e.to_string()))?;
        debug!("POST {} -> {}", request.url, status);

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
