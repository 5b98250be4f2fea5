//! Blocking HTTP client with timeouts and bounded retries
//!
//! Both requests the updater makes (version check, archive download) are
//! idempotent GETs, so transient failures are retried with exponential
//! backoff and jitter. Anything that will not get better by waiting (404,
//! a full disk) fails immediately.

use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use std::time::Duration;

use crate::config::UpdaterConfig;
use crate::error::{BoxError, Result, UpdaterError};

/// Upper bound for a single backoff delay, jitter included
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before attempt number `attempt` (0-based), with +/- 25% jitter,
    /// never more than [`MAX_RETRY_DELAY_MS`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let delay = base
            .saturating_mul(1u64 << (attempt - 1).min(16))
            .min(MAX_RETRY_DELAY_MS);
        let jitter = delay / 4;
        let delay = (delay - jitter).saturating_add(fastrand::u64(0..=jitter.saturating_mul(2)));
        Duration::from_millis(delay.min(MAX_RETRY_DELAY_MS))
    }
}

/// A failed attempt, classified for the retry loop.
#[derive(Debug)]
pub struct RequestFailure {
    pub message: String,
    pub source: Option<BoxError>,
    /// Worth another attempt
    pub transient: bool,
}

impl RequestFailure {
    pub fn transient(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self {
            message: message.into(),
            source,
            transient: true,
        }
    }

    pub fn fatal(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self {
            message: message.into(),
            source,
            transient: false,
        }
    }

    pub fn into_network_error(self) -> UpdaterError {
        UpdaterError::network(self.message, self.source)
    }

    pub fn into_download_error(self) -> UpdaterError {
        UpdaterError::download(self.message, self.source)
    }
}

/// Statuses that a later attempt may not see again
fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT
}

fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

/// Shared client for the version endpoint and the archive host.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                UpdaterError::config(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            retry: config.retry_policy(),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send one GET and require a 2xx status.
    pub fn get(&self, url: &str) -> Result<Response, RequestFailure> {
        debug!("GET {url}");
        let response = self.client.get(url).send().map_err(|e| {
            let transient = is_transient_error(&e);
            RequestFailure {
                message: format!("Failed to connect to {url}: {e}"),
                source: Some(Box::new(e)),
                transient,
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = format!("HTTP {status} from {url}");
        if is_transient_status(status) {
            Err(RequestFailure::transient(message, None))
        } else {
            Err(RequestFailure::fatal(message, None))
        }
    }

    /// Run `op` until it succeeds, fails fatally or the attempts run out.
    ///
    /// `op` receives the 0-based attempt number. The last failure is
    /// returned unchanged.
    pub fn with_retry<T>(
        &self,
        what: &str,
        mut op: impl FnMut(u32) -> Result<T, RequestFailure>,
    ) -> Result<T, RequestFailure> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(failure) if failure.transient && attempt + 1 < attempts => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "{what} failed ({}), retrying in {} ms (attempt {}/{attempts})",
                        failure.message,
                        delay.as_millis(),
                        attempt + 1,
                    );
                    std::thread::sleep(delay);
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}
