//! Back-off policy for catalog requests.
//!
//! Transient failures (429, network errors, 5xx) are retried; anything that
//! would fail the same way again (404, 4xx, malformed JSON) is returned
//! immediately. The caller's per-fetcher timeout still bounds the total time
//! spent here.

use std::future::Future;
use std::time::Duration;

use crate::error::CatalogError;

/// Upper bound for a single back-off sleep, including server-requested waits.
const MAX_DELAY_MS: u64 = 10_000;

/// Retry budget and base delay shared by every request of one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Backoff {
    pub(crate) max_retries: u32,
    pub(crate) base_ms: u64,
}

impl Backoff {
    /// Sleep before retry number `retry` (1-based), before jitter.
    ///
    /// A `Retry-After` hint on a 429 wins over the exponential schedule when
    /// it asks for longer. Both are capped at [`MAX_DELAY_MS`].
    pub(crate) fn delay_ms(self, retry: u32, err: &CatalogError) -> u64 {
        let exponential = self
            .base_ms
            .saturating_mul(1u64 << retry.saturating_sub(1).min(10));
        let requested = match err {
            CatalogError::RateLimited {
                retry_after_secs, ..
            } => retry_after_secs.saturating_mul(1000),
            _ => 0,
        };
        exponential.max(requested).min(MAX_DELAY_MS)
    }
}

/// Returns `true` if `err` is worth another attempt.
pub(crate) fn is_retriable(err: &CatalogError) -> bool {
    match err {
        CatalogError::RateLimited { .. } | CatalogError::Http(_) => true,
        CatalogError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        CatalogError::Deserialize { .. }
        | CatalogError::NotFound { .. }
        | CatalogError::Timeout { .. }
        | CatalogError::Normalization { .. }
        | CatalogError::InvalidBaseUrl { .. } => false,
    }
}

/// Scales `delay_ms` by a random factor in `[0.75, 1.25)`.
fn jittered(delay_ms: u64) -> u64 {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let scaled = (delay_ms as f64 * (0.75 + rand::random::<f64>() * 0.5)) as u64;
    scaled
}

/// Calls `request` until it succeeds, fails permanently, or `policy` runs
/// out of retries. `url` only labels the log lines.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: Backoff,
    url: &str,
    mut request: F,
) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut retry = 0u32;
    loop {
        let err = match request().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if retry >= policy.max_retries || !is_retriable(&err) {
            return Err(err);
        }
        retry += 1;
        let delay_ms = jittered(policy.delay_ms(retry, &err));
        tracing::warn!(
            url,
            retry,
            max_retries = policy.max_retries,
            delay_ms,
            error = %err,
            "catalog request failed, backing off"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
