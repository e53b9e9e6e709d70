mod config;
#[cfg(feature = "reqwest-client")]
mod reqwest_impl;
#[cfg(feature = "ureq-client")]
mod ureq_impl;

pub use config::ClientConfig;

#[cfg(feature = "reqwest-client")]
pub use reqwest_impl::ReqwestClient;
#[cfg(feature = "ureq-client")]
pub use ureq_impl::UreqClient;

// Re-export core types for convenience
pub use platform_rpc_core::{
    CallContext, HeaderPolicy, HeaderProvider, HttpClient, HttpRequest, HttpResponse,
    JsonRpcCall, RequesterConfig, RpcOutcome, RpcRequester, SendOptions, StaticHeaders,
    TransportError,
};
