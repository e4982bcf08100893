//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the walker, including:
//! - Building HTTP clients with browser-like headers
//! - Randomized politeness delays before every outer attempt
//! - Inner retries with exponential backoff for transient failures
//! - A single unverified retry when certificate validation fails
//! - Classifying the outcome as a page, a missing page or a failure

use crate::config::FetchPolicy;
use crate::crawler::backoff::{politeness_delay, RetrySchedule};
use crate::crawler::document::Document;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, UPGRADE_INSECURE_REQUESTS,
};
use reqwest::{Client, Response, StatusCode};
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Statuses retried by the inner backoff loop
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Upper bound for a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// HTTP 200 with a parsed body
    Page(Document),

    /// HTTP 404, returned without further attempts
    NotFound,

    /// Every attempt was exhausted
    Failure(FetchError),
}

/// Why a fetch attempt did not produce a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    TransientNetwork { url: String, message: String },

    #[error("certificate validation failed for {url}: {message}")]
    TlsTrustFailure { url: String, message: String },

    #[error("unexpected HTTP {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `policy` - Timeout and user agent settings
/// * `verify_certificates` - False builds the fallback client that accepts
///   any certificate
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use threadwalk::config::FetchPolicy;
/// use threadwalk::crawler::build_http_client;
///
/// let client = build_http_client(&FetchPolicy::default(), true).unwrap();
/// ```
pub fn build_http_client(
    policy: &FetchPolicy,
    verify_certificates: bool,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    let timeout = policy.timeout();

    Client::builder()
        .user_agent(policy.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .danger_accept_invalid_certs(!verify_certificates)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages with politeness delays and layered retries
pub struct Fetcher {
    client: Client,
    insecure_client: Client,
    policy: FetchPolicy,
    backoff: RetrySchedule,
}

impl Fetcher {
    pub fn new(policy: FetchPolicy) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(&policy, true)?,
            insecure_client: build_http_client(&policy, false)?,
            backoff: RetrySchedule::new(policy.backoff_base(), MAX_BACKOFF)
                .jittered(policy.backoff_jitter_percent),
            policy,
        })
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetches a URL with full error handling and retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | Parse body → Page |
    /// | HTTP 404 | Immediate → NotFound |
    /// | 429, 500, 502, 503, 504 | Inner retry with exponential backoff |
    /// | Network error / timeout | Inner retry with exponential backoff |
    /// | Certificate error | One unverified attempt, then treated as network error |
    /// | Any other status | Next outer attempt |
    ///
    /// Every outer attempt waits a random politeness delay first, and a
    /// fixed pause separates consecutive outer attempts.
    ///
    /// # Returns
    ///
    /// A FetchResult indicating success or the type of failure
    pub async fn fetch(&self, url: &Url) -> FetchResult {
        let mut last_error = None;
        let mut tls_fallback_used = false;

        for attempt in 1..=self.policy.outer_attempts {
            self.politeness_pause().await;

            let outcome = match self.send_with_retry(url).await {
                Err(FetchError::TlsTrustFailure { message, .. }) if !tls_fallback_used => {
                    tls_fallback_used = true;
                    tracing::warn!(
                        "Certificate validation failed for {} ({}), retrying once without verification",
                        url,
                        message
                    );
                    self.politeness_pause().await;
                    self.insecure_client
                        .get(url.clone())
                        .send()
                        .await
                        .map_err(|e| transient(url, &e))
                }
                other => other,
            };

            match outcome {
                Ok(response) => match self.read_response(url, response).await {
                    Ok(result) => return result,
                    Err(error) => {
                        tracing::warn!("Attempt {} for {} failed: {}", attempt, url, error);
                        last_error = Some(error);
                    }
                },
                Err(error) => {
                    tracing::warn!("Attempt {} for {} failed: {}", attempt, url, error);
                    last_error = Some(error);
                }
            }

            if attempt < self.policy.outer_attempts {
                tokio::time::sleep(self.policy.retry_pause()).await;
            }
        }

        FetchResult::Failure(last_error.unwrap_or_else(|| FetchError::TransientNetwork {
            url: url.to_string(),
            message: "no attempts were made".to_string(),
        }))
    }

    /// Sends a GET with up to `inner_attempts` tries
    ///
    /// A retryable status on the final try is returned as a response so the
    /// caller can classify it. Certificate failures return immediately.
    async fn send_with_retry(&self, url: &Url) -> Result<Response, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let exhausted = attempt >= self.policy.inner_attempts;

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if exhausted || !RETRY_STATUSES.contains(&status) {
                        return Ok(response);
                    }
                    tracing::debug!("HTTP {} from {}, backing off (try {})", status, url, attempt);
                }
                Err(e) => {
                    let error = classify_error(url, &e);
                    if exhausted || matches!(error, FetchError::TlsTrustFailure { .. }) {
                        return Err(error);
                    }
                    tracing::debug!("{} (try {})", error, attempt);
                }
            }

            tokio::time::sleep(self.backoff.pause(attempt - 1)).await;
        }
    }

    /// Turns a response into a final result, or an error worth another
    /// outer attempt
    async fn read_response(&self, url: &Url, response: Response) -> Result<FetchResult, FetchError> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(FetchResult::NotFound);
        }

        if status != StatusCode::OK {
            return Err(FetchError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| transient(url, &e))?;

        Ok(FetchResult::Page(Document::parse(&body, final_url)))
    }

    async fn politeness_pause(&self) {
        let delay = politeness_delay(self.policy.politeness_range_ms());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn classify_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if is_certificate_error(error) {
        FetchError::TlsTrustFailure {
            url: url.to_string(),
            message: error_chain_message(error),
        }
    } else {
        transient(url, error)
    }
}

fn transient(url: &Url, error: &reqwest::Error) -> FetchError {
    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error_chain_message(error))
    } else {
        error_chain_message(error)
    };

    FetchError::TransientNetwork {
        url: url.to_string(),
        message,
    }
}

/// Returns true if any error in the source chain is a certificate
/// validation failure
pub fn is_certificate_error(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);

    while let Some(err) = current {
        let message = err.to_string().to_ascii_lowercase();
        if message.contains("certificate") || message.contains("unknownissuer") {
            return true;
        }
        current = err.source();
    }

    false
}

/// The innermost error message, which carries the useful detail
fn error_chain_message(error: &(dyn StdError + 'static)) -> String {
    let mut current = error;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
