mod config;
pub mod context;
pub mod error;
pub mod headers;
mod http_trait;
pub mod payload;
mod requester;

pub use http;
pub use url;

pub use config::RequesterConfig;
pub use context::{restrict_current_thread, CallContext, RestrictedGuard};
pub use error::{Error, Result, TransportError};
pub use headers::{HeaderPolicy, HeaderProvider, StaticHeaders};
pub use http_trait::{HttpClient, HttpRequest, HttpResponse, SendOptions};
pub use payload::JsonRpcCall;
pub use requester::{RpcOutcome, RpcRequester};
