//! Compatibility results and the report built from them

mod verdict;

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use verdict::{
    EXIT_MISMATCH, EXIT_PASS, EXIT_TOOL_ERROR, EXIT_TRANSPORT, Verdict, VerdictStatus,
};

/// Bodies longer than this are truncated in results (comparison uses the full body)
pub const MAX_BODY_PREVIEW: usize = 4096;

/// Status and body, as expected or as observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Observation {
    pub status: u16,
    /// Preview, see [`body_preview`]
    pub body: String,
    /// Length of the full body
    pub bytes: usize,
}

impl Observation {
    /// Status plus a preview of `body`
    #[must_use]
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body_preview(body),
            bytes: body.len(),
        }
    }
}

/// How one endpoint fared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckOutcome {
    Compatible,
    /// Reachable, valid response, wrong status or body
    Mismatch {
        expected: Observation,
        observed: Observation,
        /// Full bodies were byte-equal (previews can collide)
        body_matches: bool,
    },
    /// Refused, timed out, malformed response
    TransportError { message: String },
}

/// One outcome per endpoint per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CheckResult {
    pub endpoint: String,
    pub success: bool,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
    pub elapsed_ms: u64,
}

impl CheckResult {
    #[must_use]
    pub fn compatible(endpoint: impl Into<String>, elapsed: Duration) -> Self {
        Self::new(endpoint.into(), CheckOutcome::Compatible, elapsed)
    }

    #[must_use]
    pub fn mismatch(
        endpoint: impl Into<String>,
        expected: Observation,
        observed: Observation,
        body_matches: bool,
        elapsed: Duration,
    ) -> Self {
        Self::new(
            endpoint.into(),
            CheckOutcome::Mismatch {
                expected,
                observed,
                body_matches,
            },
            elapsed,
        )
    }

    #[must_use]
    pub fn transport_error(
        endpoint: impl Into<String>,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self::new(
            endpoint.into(),
            CheckOutcome::TransportError {
                message: message.into(),
            },
            elapsed,
        )
    }

    fn new(endpoint: String, outcome: CheckOutcome, elapsed: Duration) -> Self {
        Self {
            endpoint,
            success: outcome == CheckOutcome::Compatible,
            outcome,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self.outcome, CheckOutcome::TransportError { .. })
    }

    #[must_use]
    pub const fn is_mismatch(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Mismatch { .. })
    }

    /// What went wrong, e.g. "expected 200, got 404". `None` on success.
    #[must_use]
    pub fn diagnostic(&self) -> Option<String> {
        match &self.outcome {
            CheckOutcome::Compatible => None,
            CheckOutcome::Mismatch {
                expected,
                observed,
                body_matches,
            } => {
                let mut parts = Vec::new();
                if expected.status != observed.status {
                    parts.push(format!(
                        "expected {}, got {}",
                        expected.status, observed.status
                    ));
                }
                if !body_matches {
                    if expected.body == observed.body {
                        parts.push(format!(
                            "body differs ({} bytes expected, {} bytes observed)",
                            expected.bytes, observed.bytes
                        ));
                    } else {
                        parts.push(format!(
                            "expected body {:?}, got {:?}",
                            expected.body, observed.body
                        ));
                    }
                }
                Some(parts.join("; "))
            }
            CheckOutcome::TransportError { message } => Some(format!("transport error: {message}")),
        }
    }
}

/// Truncate a body for display, on a char boundary.
#[must_use]
pub fn body_preview(body: &str) -> String {
    if body.len() <= MAX_BODY_PREVIEW {
        return body.to_string();
    }
    let mut end = MAX_BODY_PREVIEW;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…({} bytes total)", &body[..end], body.len())
}

/// Aggregate of one checker run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompatibilityReport {
    /// Real service the endpoints were replayed against
    pub base_url: String,
    /// Wall-clock time of the whole run
    pub duration_ms: u64,
    /// Sorted by endpoint name
    pub results: Vec<CheckResult>,
}

impl CompatibilityReport {
    #[must_use]
    pub fn new(base_url: impl Into<String>, mut results: Vec<CheckResult>, duration: Duration) -> Self {
        results.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        Self {
            base_url: base_url.into(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            results,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    #[must_use]
    pub fn mismatches(&self) -> usize {
        self.results.iter().filter(|r| r.is_mismatch()).count()
    }

    #[must_use]
    pub fn transport_errors(&self) -> usize {
        self.results.iter().filter(|r| r.is_transport_error()).count()
    }

    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.total() > 0 && self.passed() == self.total()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.success)
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        Verdict::from_counts(self.total(), self.mismatches(), self.transport_errors())
    }

    /// Human-readable summary for the terminal
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let verdict = self.verdict();
        let mut lines = vec![
            format!("{}: {}", verdict.status, verdict.reason),
            format!("  Target: {}", self.base_url),
            format!(
                "  Endpoints: {} total, {} passed, {} failed ({}ms)",
                self.total(),
                self.passed(),
                self.total() - self.passed(),
                self.duration_ms
            ),
        ];

        let failures: Vec<&CheckResult> = self.failures().collect();
        if !failures.is_empty() {
            lines.push(String::new());
            lines.push(format!("Failures ({}):", failures.len()));
            for f in failures {
                let kind = if f.is_transport_error() {
                    "transport"
                } else {
                    "mismatch"
                };
                lines.push(format!(
                    "  [{kind}] {}: {}",
                    f.endpoint,
                    f.diagnostic().unwrap_or_default()
                ));
            }
        }
        lines.join("\n")
    }
}
