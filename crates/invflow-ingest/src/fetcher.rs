//! HTTP retrieval with bounded retry
//!
//! [`RetryingFetcher`] issues GETs until one of three things happens:
//!
//! - a 2xx response arrives and its body is returned as text
//! - a non-retryable status or a request that cannot be built is hit
//! - the attempt budget runs out, giving `ConnectionExhausted`
//!
//! Retryable statuses and transport failures (refused connection, DNS,
//! timeout, a body that stalls or breaks off mid-transfer) draw from the
//! same budget.

use crate::config::RetryPolicy;
use invflow_common::{InvflowError, Result};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

/// Fetches a remote resource as text according to a [`RetryPolicy`]
pub struct RetryingFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        policy.validate()?;

        let client = Client::builder()
            .timeout(policy.timeout)
            .user_agent(concat!("invflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                InvflowError::invalid_argument(format!("cannot build HTTP client: {}", e))
            })?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` and return the full body.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let target = validate_url(url)?;
        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            debug!(url = %target, attempt, max_attempts, "Sending request");

            match self.client.get(target.as_str()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        // text() decodes lossily, so any error here is a broken transfer
                        match response.text().await {
                            Ok(body) => {
                                info!(url = %target, attempt, bytes = body.len(), "Fetched resource");
                                return Ok(body);
                            },
                            Err(e) => {
                                last_error = format!("response body interrupted: {}", e);
                            },
                        }
                    } else if self.policy.is_retryable(status.as_u16()) {
                        last_error = format!("HTTP {}", status);
                    } else {
                        return Err(InvflowError::HttpStatus {
                            url: target.to_string(),
                            status: status.as_u16(),
                        });
                    }
                },
                Err(e) if is_transient(&e) => {
                    last_error = e.to_string();
                },
                Err(e) => {
                    return Err(InvflowError::malformed(format!(
                        "request to {} failed: {}",
                        target, e
                    )));
                },
            }

            if attempt < max_attempts {
                let delay = self.policy.delay_after(attempt);
                warn!(
                    url = %target,
                    attempt,
                    max_attempts,
                    error = %last_error,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(InvflowError::ConnectionExhausted {
            url: target.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }
}

/// Transport-level failures worth another attempt
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

/// Parse `url` and require an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(InvflowError::invalid_argument("URL cannot be empty"));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| InvflowError::invalid_argument(format!("invalid URL '{}': {}", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(InvflowError::invalid_argument(format!(
            "unsupported URL scheme '{}' in '{}'",
            parsed.scheme(),
            trimmed
        )));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(InvflowError::invalid_argument(format!("URL '{}' has no host", trimmed)));
    }

    Ok(parsed)
}
