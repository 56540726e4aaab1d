//! Shared HTTP plumbing for the REST provider adapters
//!
//! `send_json` is a single attempt that maps statuses onto
//! `MarketDataError`; `fetch_json` wraps it in the retry policy, rebuilding
//! the request for every attempt.

use std::time::Duration;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::ports::MarketDataError;
use crate::resilience::{retry_with_backoff, RetryPolicy};

/// Longest error body kept in `MarketDataError::Status`
const MAX_ERROR_BODY: usize = 200;

pub const USER_AGENT: &str = concat!("embassy-market/", env!("CARGO_PKG_VERSION"));

/// Build the shared reqwest client
pub fn build_client(timeout: Duration) -> Result<Client, MarketDataError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| MarketDataError::Http(format!("Failed to create HTTP client: {}", e)))
}

/// Send one request and decode a JSON body
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, MarketDataError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MarketDataError::RateLimited);
    }

    if status == StatusCode::NOT_FOUND {
        return Err(MarketDataError::NotFound(response.url().path().to_string()));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MarketDataError::Status {
            status: status.as_u16(),
            body: truncate(&body, MAX_ERROR_BODY),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(MarketDataError::from)
}

/// `send_json` with retry and backoff; `build` is called once per attempt
pub async fn fetch_json<T, F>(policy: &RetryPolicy, label: &str, build: F) -> Result<T, MarketDataError>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    retry_with_backoff(policy, label, || send_json(build()), MarketDataError::is_retryable).await
}

pub(crate) fn truncate(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}

/// Parse a provider's stringified number
pub(crate) fn parse_f64(field: &str, value: &str) -> Result<f64, MarketDataError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| MarketDataError::Parse(format!("{} '{}': {}", field, value, e)))
}
