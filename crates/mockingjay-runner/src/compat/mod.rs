//! Compatibility checker
//!
//! Replays every endpoint of an expectation set against a real service and
//! compares what comes back. Checks fan out as one task per endpoint and are
//! joined before returning, so a run takes as long as its slowest check.

mod compare;

use std::collections::HashMap;
use std::error::Error as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use mockingjay_core::{CheckResult, CompatibilityReport, Config, Endpoint};

use compare::compare;

/// Per-request timeout when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Replays endpoints against a real service
#[derive(Debug, Clone)]
pub struct CompatibilityChecker {
    client: reqwest::Client,
    timeout: Duration,
    /// Max in-flight checks (`None` = one task per endpoint, all at once)
    concurrency: Option<usize>,
}

impl CompatibilityChecker {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built (e.g. TLS backend
    /// initialisation fails).
    pub fn new() -> Result<Self, CheckerError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CheckerError::Http(e.to_string()))?;
        Ok(Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            concurrency: None,
        })
    }

    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_config(config: &Config) -> Result<Self, CheckerError> {
        Ok(Self::new()?
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_concurrency(config.concurrency))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: Option<usize>) -> Self {
        self.concurrency = concurrency.map(|n| n.max(1));
        self
    }

    /// Check every endpoint against `base_url`.
    ///
    /// Returns exactly one result per endpoint, in completion order.
    /// Transport failures become failed results; nothing here aborts the run.
    /// Must be called from within a tokio runtime.
    pub async fn check(&self, endpoints: &[Endpoint], base_url: &str) -> Vec<CheckResult> {
        let base_url = base_url.trim_end_matches('/');
        let limiter = self.concurrency.map(|n| Arc::new(Semaphore::new(n)));

        let mut tasks = JoinSet::new();
        let mut names = HashMap::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let client = self.client.clone();
            let endpoint = endpoint.clone();
            let url = format!("{base_url}{}", endpoint.request.uri);
            let timeout = self.timeout;
            let limiter = limiter.clone();
            let name = endpoint.name.clone();

            let handle = tasks.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                check_one(&client, &endpoint, &url, timeout).await
            });
            names.insert(handle.id(), name);
        }

        let mut results = Vec::with_capacity(endpoints.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, result)) => results.push(result),
                Err(e) => {
                    let name = names.remove(&e.id()).unwrap_or_default();
                    warn!(endpoint = %name, "compatibility check aborted: {e}");
                    results.push(CheckResult::transport_error(
                        name,
                        format!("check aborted: {e}"),
                        Duration::ZERO,
                    ));
                }
            }
        }
        results
    }

    /// [`Self::check`] plus run timing, packaged as a report.
    pub async fn check_report(&self, endpoints: &[Endpoint], base_url: &str) -> CompatibilityReport {
        info!(
            endpoints = endpoints.len(),
            base_url,
            "checking compatibility"
        );
        let started = Instant::now();
        let results = self.check(endpoints, base_url).await;
        let report = CompatibilityReport::new(base_url, results, started.elapsed());
        info!(
            passed = report.passed(),
            failed = report.total() - report.passed(),
            duration_ms = report.duration_ms,
            "compatibility check finished"
        );
        report
    }
}

async fn check_one(
    client: &reqwest::Client,
    endpoint: &Endpoint,
    url: &str,
    timeout: Duration,
) -> CheckResult {
    let started = Instant::now();
    let label = endpoint.request.label();

    let method = endpoint.request.method.to_ascii_uppercase();
    let Ok(method) = reqwest::Method::from_bytes(method.as_bytes()) else {
        return CheckResult::transport_error(
            &endpoint.name,
            format!("invalid HTTP method '{}'", endpoint.request.method),
            started.elapsed(),
        );
    };

    let mut request = client.request(method, url).timeout(timeout);
    for (name, value) in &endpoint.request.headers {
        request = request.header(name, value);
    }
    if let Some(body) = &endpoint.request.body {
        request = request.body(body.clone());
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            let message = describe(&e, timeout);
            debug!(endpoint = %endpoint.name, %label, "transport error: {message}");
            return CheckResult::transport_error(&endpoint.name, message, started.elapsed());
        }
    };

    let status = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            let message = describe(&e, timeout);
            debug!(endpoint = %endpoint.name, %label, status, "body read failed: {message}");
            return CheckResult::transport_error(&endpoint.name, message, started.elapsed());
        }
    };

    let result = compare(endpoint, status, &body, started.elapsed());
    debug!(
        endpoint = %endpoint.name,
        %label,
        status,
        success = result.success,
        elapsed_ms = result.elapsed_ms,
        "checked"
    );
    result
}

/// Flatten a reqwest error and its causes into one line.
fn describe(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        return format!("timed out after {}ms", timeout.as_millis());
    }
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    #[error("HTTP error: {0}")]
    Http(String),
}
