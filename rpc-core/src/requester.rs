use std::sync::{Mutex, PoisonError};

use log::{debug, error, warn};
use serde::Serialize;
use url::Url;

use crate::{
    config::RequesterConfig,
    context::CallContext,
    error::{Error, Result},
    headers::{merge_headers, HeaderProvider},
    http_trait::{HttpClient, HttpRequest, HttpResponse},
};

/// Result of a completed round trip.
#[derive(Debug, Clone)]
pub enum RpcOutcome {
    /// The server answered with a non-blank body.
    Completed(HttpResponse),
    /// The server answered, but the body is empty or whitespace only. The
    /// body is kept as received.
    Empty(HttpResponse),
}

impl RpcOutcome {
    pub fn response(&self) -> &HttpResponse {
        match self {
            RpcOutcome::Completed(resp) | RpcOutcome::Empty(resp) => resp,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        match self {
            RpcOutcome::Completed(resp) | RpcOutcome::Empty(resp) => resp,
        }
    }

    /// The body as received. For [`RpcOutcome::Empty`] this is `""` or
    /// whitespace.
    pub fn body(&self) -> &str {
        &self.response().body
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RpcOutcome::Empty(_))
    }
}

/// Blocking JSON-RPC requester.
///
/// Generic over the transport and the header collaborator, allowing consumers
/// to inject a shared HTTP client and their own application headers.
///
/// Each call returns its own [`RpcOutcome`]. The body of the last successful
/// call is also cached and readable through [`last_response`](Self::last_response);
/// with concurrent calls on one instance the last writer wins there.
#[derive(Debug)]
pub struct RpcRequester<H: HttpClient, P: HeaderProvider> {
    http_client: H,
    header_provider: P,
    config: RequesterConfig,
    last_response: Mutex<Option<String>>,
}

impl<H: HttpClient, P: HeaderProvider> RpcRequester<H, P> {
    /// Create a requester with the default configuration.
    ///
    /// # Arguments
    /// * `http_client` - Transport used for every call
    /// * `header_provider` - Source of the extra headers merged into every request
    pub fn new(http_client: H, header_provider: P) -> Self {
        Self::with_config(http_client, header_provider, RequesterConfig::default())
    }

    pub fn with_config(http_client: H, header_provider: P, config: RequesterConfig) -> Self {
        Self {
            http_client,
            header_provider,
            config,
            last_response: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RequesterConfig {
        &self.config
    }

    /// Build the outbound request without sending it.
    pub fn build_request<T>(&self, endpoint: &str, payload: &T) -> Result<HttpRequest>
    where
        T: Serialize + ?Sized,
    {
        if endpoint.trim().is_empty() {
            return Err(Error::EmptyEndpoint);
        }
        let url = Url::parse(endpoint).map_err(|source| Error::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let body = serde_json::to_string(payload)?;
        let headers = merge_headers(self.header_provider.headers(), self.config.header_policy);

        Ok(HttpRequest { url, headers, body })
    }

    /// POST `payload` to `endpoint` and block for the response.
    ///
    /// # Panics
    /// If `ctx` is [`CallContext::Restricted`]. This happens before any
    /// network activity.
    pub fn send<T>(&self, ctx: CallContext, endpoint: &str, payload: &T) -> Result<RpcOutcome>
    where
        T: Serialize + ?Sized,
    {
        self.dispatch(ctx, endpoint, payload, None::<fn(&str)>)
    }

    /// Like [`send`](Self::send), additionally invoking `on_complete` once with
    /// the body of a successful round trip, empty bodies included.
    ///
    /// The callback is not invoked on failure.
    pub fn send_with<T, F>(
        &self,
        ctx: CallContext,
        endpoint: &str,
        payload: &T,
        on_complete: F,
    ) -> Result<RpcOutcome>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&str),
    {
        self.dispatch(ctx, endpoint, payload, Some(on_complete))
    }

    /// Body of the most recent successful call on this instance.
    pub fn last_response(&self) -> Option<String> {
        self.last_response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn dispatch<T, F>(
        &self,
        ctx: CallContext,
        endpoint: &str,
        payload: &T,
        on_complete: Option<F>,
    ) -> Result<RpcOutcome>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&str),
    {
        if !ctx.allows_blocking() {
            error!("blocking rpc call to {endpoint} on a restricted context");
            panic!("blocking rpc call on a restricted context");
        }

        let request = self.build_request(endpoint, payload)?;
        if self.config.log_payloads {
            debug!("JSON params -> {}", request.body);
        } else {
            debug!("posting {} bytes to {}", request.body.len(), request.url);
        }

        let options = self.config.send_options;
        let response = match self.http_client.post_json(&request, &options) {
            Ok(resp) => resp,
            Err(e) => {
                if options.critical {
                    error!("rpc request to {} failed: {}", request.url, e);
                } else {
                    warn!("rpc request to {} failed: {}", request.url, e);
                }
                return Err(e.into());
            }
        };

        if self.config.log_payloads {
            debug!("RPC response ({}) -> {}", response.status, response.body);
        } else {
            debug!(
                "RPC response ({}) with {} bytes from {}",
                response.status,
                response.body.len(),
                request.url
            );
        }

        self.store_last_response(response.body.clone());
        if let Some(on_complete) = on_complete {
            on_complete(&response.body);
        }

        if response.body.trim().is_empty() {
            warn!("rpc request to {} returned an empty body", request.url);
            return Ok(RpcOutcome::Empty(response));
        }
        Ok(RpcOutcome::Completed(response))
    }

    fn store_last_response(&self, body: String) {
        *self
            .last_response
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(body);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        panic::{self, AssertUnwindSafe},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        thread,
    };

    use http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderMap,
    };
    use serde_json::json;

    use super::*;
    use crate::{
        context::restrict_current_thread, error::TransportError, headers::StaticHeaders,
        http_trait::SendOptions, HeaderPolicy, JsonRpcCall,
    };

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    type Reply =
        Box<dyn Fn(&HttpRequest) -> std::result::Result<HttpResponse, TransportError> + Send + Sync>;

    /// Records every request and answers with a canned reply.
    struct SpyClient {
        calls: AtomicUsize,
        requests: Mutex<Vec<HttpRequest>>,
        reply: Reply,
    }

    impl SpyClient {
        fn new<F>(reply: F) -> Self
        where
            F: Fn(&HttpRequest) -> std::result::Result<HttpResponse, TransportError>
                + Send
                + Sync
                + 'static,
        {
            Self {
                calls: AtomicUsize::new(0),
                requests: Mutex::new(vec![]),
                reply: Box::new(reply),
            }
        }

        fn answering(body: &'static str) -> Self {
            Self::new(move |_| Ok(ok_response(body)))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpClient for SpyClient {
        fn post_json(
            &self,
            request: &HttpRequest,
            _options: &SendOptions,
        ) -> std::result::Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            (self.reply)(request)
        }
    }

    /// Replies with the request body, so each caller can recognise its own answer.
    struct EchoClient;

    impl HttpClient for EchoClient {
        fn post_json(
            &self,
            request: &HttpRequest,
            _options: &SendOptions,
        ) -> std::result::Result<HttpResponse, TransportError> {
            Ok(ok_response(&request.body))
        }
    }

    fn ok_response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    const ENDPOINT: &str = "https://rpc.example.com/v1";

    #[test]
    fn test_request_body_and_mandatory_headers() {
        init_logging();
        let requester = RpcRequester::new(SpyClient::answering(r#"{"result":42}"#), ());
        let payload = JsonRpcCall::new("getbalance", json!({"account": "main"}), 7);

        let request = requester.build_request(ENDPOINT, &payload).unwrap();

        assert_eq!(request.body, serde_json::to_string(&payload).unwrap());
        assert_eq!(request.url.as_str(), ENDPOINT);
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers[ACCEPT], "application/json");
    }

    #[test]
    fn test_collaborator_headers_merged() {
        init_logging();
        let headers =
            StaticHeaders::from_pairs([("X-App-Version", "4.2.0"), ("X-Testnet", "true")]).unwrap();
        let spy = SpyClient::answering(r#"{"result":42}"#);
        let requester = RpcRequester::new(&spy, headers);

        requester
            .send(CallContext::Blocking, ENDPOINT, &json!({"method": "ping"}))
            .unwrap();

        let requests = spy.requests.lock().unwrap();
        let sent = &requests[0].headers;
        assert_eq!(sent["x-app-version"], "4.2.0");
        assert_eq!(sent["x-testnet"], "true");
        assert_eq!(sent[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_colliding_content_type_mandatory_wins() {
        init_logging();
        let headers = StaticHeaders::from_pairs([("Content-Type", "text/plain")]).unwrap();
        let requester = RpcRequester::new(SpyClient::answering(r#"{"result":42}"#), headers);

        let request = requester.build_request(ENDPOINT, &json!({})).unwrap();
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_colliding_content_type_collaborator_wins() {
        init_logging();
        let headers = StaticHeaders::from_pairs([("Content-Type", "text/plain")]).unwrap();
        let config = RequesterConfig {
            header_policy: HeaderPolicy::CollaboratorWins,
            ..Default::default()
        };
        let requester =
            RpcRequester::with_config(SpyClient::answering(r#"{"result":42}"#), headers, config);

        let request = requester.build_request(ENDPOINT, &json!({})).unwrap();
        assert_eq!(request.headers[CONTENT_TYPE], "text/plain");
        assert_eq!(request.headers[ACCEPT], "application/json");
    }

    #[test]
    fn test_restricted_context_panics_before_network() {
        init_logging();
        let spy = SpyClient::answering(r#"{"result":42}"#);
        let requester = RpcRequester::new(&spy, ());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            requester.send(CallContext::Restricted, ENDPOINT, &json!({}))
        }));

        assert!(result.is_err());
        assert_eq!(spy.calls(), 0);
        assert!(requester.last_response().is_none());
    }

    #[test]
    fn test_restricted_thread_panics_before_network() {
        init_logging();
        let spy = SpyClient::answering(r#"{"result":42}"#);
        let requester = RpcRequester::new(&spy, ());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = restrict_current_thread();
            requester.send(CallContext::current(), ENDPOINT, &json!({}))
        }));

        assert!(result.is_err());
        assert_eq!(spy.calls(), 0);
    }

    #[test]
    fn test_success_invokes_callback_once() {
        init_logging();
        let spy = SpyClient::answering(r#"{"result":42}"#);
        let requester = RpcRequester::new(&spy, ());
        let mut received = vec![];

        let outcome = requester
            .send_with(CallContext::Blocking, ENDPOINT, &json!({"id": 1}), |body| {
                received.push(body.to_string())
            })
            .unwrap();

        assert_eq!(received, vec![r#"{"result":42}"#.to_string()]);
        assert_eq!(outcome.body(), r#"{"result":42}"#);
        assert_eq!(outcome.response().status, 200);
        assert_eq!(requester.last_response().as_deref(), Some(r#"{"result":42}"#));
        assert_eq!(spy.calls(), 1);

        let parsed: serde_json::Value = outcome.response().json().unwrap();
        assert_eq!(parsed["result"], 42);
    }

    #[test]
    fn test_transport_failure_skips_callback() {
        init_logging();
        let spy = SpyClient::new(|_| {
            Err(TransportError::HttpPost(
                "connection reset by peer".to_string(),
            ))
        });
        let requester = RpcRequester::new(&spy, ());
        let mut invoked = false;

        let result = requester.send_with(CallContext::Blocking, ENDPOINT, &json!({}), |_| {
            invoked = true
        });

        let err = result.unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(
            err,
            Error::Transport(TransportError::HttpPost(_))
        ));
        assert!(!invoked);
        assert!(requester.last_response().is_none());
        // single attempt from the requester
        assert_eq!(spy.calls(), 1);
    }

    #[test]
    fn test_unreadable_body_is_transport_failure() {
        init_logging();
        let spy = SpyClient::new(|_| Err(TransportError::ResponseBody("truncated".to_string())));
        let requester = RpcRequester::new(&spy, ());

        let err = requester
            .send(CallContext::Blocking, ENDPOINT, &json!({}))
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_empty_body_is_distinct_outcome() {
        init_logging();
        for body in ["", "   \n"] {
            let requester = RpcRequester::new(SpyClient::answering(body), ());
            let mut received = vec![];

            let outcome = requester
                .send_with(CallContext::Blocking, ENDPOINT, &json!({}), |body| {
                    received.push(body.to_string())
                })
                .unwrap();

            assert!(outcome.is_empty());
            assert_eq!(outcome.body(), body);
            // delivered and cached as received
            assert_eq!(received, vec![body.to_string()]);
            assert_eq!(requester.last_response().as_deref(), Some(body));
        }
    }

    #[test]
    fn test_error_status_still_delivers_body() {
        init_logging();
        let spy = SpyClient::new(|_| {
            Ok(HttpResponse {
                status: 500,
                headers: HeaderMap::new(),
                body: r#"{"error":{"code":-32601,"message":"Method not found"}}"#.to_string(),
            })
        });
        let requester = RpcRequester::new(&spy, ());

        let outcome = requester
            .send(CallContext::Blocking, ENDPOINT, &json!({}))
            .unwrap();
        assert!(!outcome.response().is_success());
        assert!(outcome.body().contains("Method not found"));
    }

    #[test]
    fn test_invalid_endpoints() {
        init_logging();
        let spy = SpyClient::answering(r#"{"result":42}"#);
        let requester = RpcRequester::new(&spy, ());

        let err = requester
            .send(CallContext::Blocking, "", &json!({}))
            .unwrap_err();
        assert!(matches!(err, Error::EmptyEndpoint));

        let err = requester
            .send(CallContext::Blocking, "not a url", &json!({}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }));
        assert!(!err.is_transport());
        assert_eq!(spy.calls(), 0);
    }

    #[test]
    fn test_independent_requesters_do_not_mix() {
        init_logging();
        let client = Arc::new(EchoClient);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let client = client.clone();
                thread::spawn(move || {
                    let requester = RpcRequester::new(client, ());
                    let payload = json!({"id": i});
                    let mut seen = vec![];
                    for _ in 0..20 {
                        requester
                            .send_with(CallContext::Blocking, ENDPOINT, &payload, |body| {
                                seen.push(body.to_string())
                            })
                            .unwrap();
                    }
                    (payload.to_string(), seen, requester.last_response())
                })
            })
            .collect();

        for handle in handles {
            let (expected, seen, last) = handle.join().unwrap();
            assert_eq!(seen.len(), 20);
            assert!(seen.iter().all(|body| *body == expected));
            assert_eq!(last, Some(expected));
        }
    }

    #[test]
    fn test_shared_requester_outcomes_are_per_call() {
        init_logging();
        let requester = Arc::new(RpcRequester::new(EchoClient, ()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let requester = requester.clone();
                thread::spawn(move || {
                    let payload = json!({"id": i});
                    let outcome = requester
                        .send(CallContext::Blocking, ENDPOINT, &payload)
                        .unwrap();
                    assert_eq!(outcome.body(), payload.to_string());
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(requester.last_response().is_some());
    }
}
