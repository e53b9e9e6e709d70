//! Header collaborators and merge rules.

use std::sync::Arc;

use http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderMap, HeaderName, HeaderValue,
};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const APPLICATION_JSON: &str = "application/json";

/// Supplies the extra headers merged into every request.
///
/// Typically application identity or authentication headers.
pub trait HeaderProvider: Send + Sync {
    fn headers(&self) -> HeaderMap;
}

impl HeaderProvider for () {
    fn headers(&self) -> HeaderMap {
        HeaderMap::new()
    }
}

impl HeaderProvider for HeaderMap {
    fn headers(&self) -> HeaderMap {
        self.clone()
    }
}

impl<T: HeaderProvider + ?Sized> HeaderProvider for Arc<T> {
    fn headers(&self) -> HeaderMap {
        (**self).headers()
    }
}

/// A fixed set of headers, validated once at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    headers: HeaderMap,
}

impl StaticHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header, replacing any previous value for the same name.
    pub fn with(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::try_from(name)?;
        let value = HeaderValue::try_from(value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .try_fold(Self::new(), |acc, (k, v)| acc.with(k.as_ref(), v.as_ref()))
    }
}

impl HeaderProvider for StaticHeaders {
    fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }
}

/// Resolution of collisions between the mandatory JSON headers and
/// collaborator headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// `Content-Type` and `Accept` always stay `application/json`; colliding
    /// collaborator entries are dropped with a warning.
    #[default]
    MandatoryWins,
    /// Collaborator entries replace the mandatory ones.
    CollaboratorWins,
}

fn is_mandatory(name: &HeaderName) -> bool {
    name == CONTENT_TYPE || name == ACCEPT
}

/// The base headers of every JSON-RPC request.
pub fn mandatory_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    headers
}

/// Merge collaborator headers on top of the mandatory ones.
///
/// A collaborator header replaces every base value of the same name; several
/// values supplied by the collaborator for one name are all kept.
pub fn merge_headers(extra: HeaderMap, policy: HeaderPolicy) -> HeaderMap {
    let mut accepted = HeaderMap::with_capacity(extra.len());
    for (name, value) in extra.iter() {
        if is_mandatory(name) && policy == HeaderPolicy::MandatoryWins {
            warn!("ignoring collaborator header {name}, it is fixed to {APPLICATION_JSON}");
            continue;
        }
        accepted.append(name.clone(), value.clone());
    }

    let mut merged = mandatory_headers();
    // HeaderMap::extend replaces existing entries of the same name
    merged.extend(accepted);
    merged
}
