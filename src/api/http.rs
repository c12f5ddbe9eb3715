//! HTTP utilities for the collection endpoints

use crate::error::FetchError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body and strip control characters for logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Thin reqwest wrapper returning typed fetch errors
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client; `timeout` of `None` waits indefinitely
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(concat!("tfetch/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// GET a URL and parse the body as JSON
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Network(format!("request to {url} timed out"))
            } else {
                FetchError::Network(format!("failed to send request: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(FetchError::Network(format!("request failed with status {status}")));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!("unparseable body: {}", sanitize_for_log(&body));
            FetchError::Parse(format!("response is not valid JSON: {e}"))
        })
    }
}
