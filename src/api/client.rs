//! Placeholder API client
//!
//! Builds `<base-url>/<kind>` URLs and fetches them over HTTP.

use super::http::HttpClient;
use super::Source;
use crate::error::{ClientError, FetchError};
use crate::resource::ResourceKind;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Host serving the `todos` and `posts` collections
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// HTTP-backed [`Source`]
#[derive(Debug, Clone)]
pub struct PlaceholderClient {
    base_url: String,
    http: HttpClient,
}

impl PlaceholderClient {
    /// Create a client for `base_url`; only http(s) URLs are accepted
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if parsed.cannot_be_a_base() || parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "must be a plain base URL without query or fragment".to_string(),
            });
        }

        let http = HttpClient::new(timeout)?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a collection endpoint
    pub fn collection_url(&self, kind: ResourceKind) -> String {
        format!("{}/{}", self.base_url, kind.as_str())
    }
}

impl Source for PlaceholderClient {
    fn get(&self, kind: ResourceKind) -> impl Future<Output = Result<Value, FetchError>> + Send {
        let url = self.collection_url(kind);
        async move { self.http.get_json(&url).await }
    }
}
