use serde::{Deserialize, Serialize};

use crate::{headers::HeaderPolicy, http_trait::SendOptions};

/// Behaviour knobs of an [`RpcRequester`](crate::RpcRequester).
///
/// Every field has a default, so a partial JSON document deserializes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequesterConfig {
    pub header_policy: HeaderPolicy,
    /// Log request and response bodies at debug level. Off by default since
    /// payloads may carry wallet data.
    pub log_payloads: bool,
    pub send_options: SendOptions,
}
