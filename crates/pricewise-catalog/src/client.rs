//! Shared HTTP client for the upstream catalog APIs.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::CatalogError;
use crate::retry::{retry_with_backoff, Backoff};

/// HTTP client shared by every catalog source.
///
/// Maps 429, 404 and other non-2xx responses to typed errors and retries
/// transient failures with exponential back-off up to `max_retries`
/// additional attempts. Cloning is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    backoff: Backoff,
}

impl CatalogClient {
    /// Creates a `CatalogClient` with configured timeout, `User-Agent`, and retry policy.
    ///
    /// `max_retries` is the number of additional attempts after the first
    /// failure for retriable errors. Set to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(5)))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            backoff: Backoff {
                max_retries,
                base_ms: backoff_base_ms,
            },
        })
    }

    /// Issues a `GET` against `base_url` + `path` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::RateLimited`]: HTTP 429 after all retries exhausted.
    /// - [`CatalogError::NotFound`]: HTTP 404 (not retried).
    /// - [`CatalogError::UnexpectedStatus`]: any other non-2xx status (5xx retried, 4xx not).
    /// - [`CatalogError::Http`]: network or TLS failure after all retries exhausted.
    /// - [`CatalogError::Deserialize`]: response body does not match `T` (not retried).
    /// - [`CatalogError::InvalidBaseUrl`]: `base_url` cannot be parsed.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        source_name: &str,
        base_url: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = endpoint_url(base_url, path, query)?;

        retry_with_backoff(self.backoff, &url, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(CatalogError::RateLimited {
                        source_name: source_name.to_owned(),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(CatalogError::NotFound { url });
                }

                if !status.is_success() {
                    return Err(CatalogError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<T>(&body).map_err(|e| CatalogError::Deserialize {
                    context: format!("{source_name} response from {url}"),
                    source: e,
                })
            }
        })
        .await
    }
}

/// Joins `base_url` and `path` and appends `query` as URL-encoded pairs.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidBaseUrl`] if the joined string is not a URL.
pub(crate) fn endpoint_url(
    base_url: &str,
    path: &str,
    query: &[(&str, String)],
) -> Result<String, CatalogError> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = reqwest::Url::parse(&joined).map_err(|e| CatalogError::InvalidBaseUrl {
        base_url: base_url.to_owned(),
        reason: e.to_string(),
    })?;

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url.to_string())
}
