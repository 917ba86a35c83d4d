//! Verdict: the single pass/fail answer for a compatibility run

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Exit code when every endpoint is compatible
pub const EXIT_PASS: i32 = 0;
/// Exit code when at least one endpoint answered with the wrong status or body
pub const EXIT_MISMATCH: i32 = 1;
/// Exit code when at least one endpoint could not be reached
pub const EXIT_TRANSPORT: i32 = 2;
/// Exit code for tool errors (bad config, nothing checked)
pub const EXIT_TOOL_ERROR: i32 = 3;

/// Final verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub exit_code: i32,
    pub reason: String,
}

/// Pass or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl Verdict {
    /// Judge a run from its counts.
    ///
    /// PASS requires at least one endpoint and **all** of them compatible.
    /// Transport errors outrank mismatches: an unreachable service says
    /// nothing about its contract.
    #[must_use]
    pub fn from_counts(total: usize, mismatches: usize, transport_errors: usize) -> Self {
        if total == 0 {
            return Self {
                status: VerdictStatus::Fail,
                exit_code: EXIT_TOOL_ERROR,
                reason: "No endpoints were checked".to_string(),
            };
        }

        let failed = mismatches + transport_errors;
        if failed == 0 {
            return Self {
                status: VerdictStatus::Pass,
                exit_code: EXIT_PASS,
                reason: format!("All {total} endpoints compatible"),
            };
        }

        let exit_code = if transport_errors > 0 {
            EXIT_TRANSPORT
        } else {
            EXIT_MISMATCH
        };
        Self {
            status: VerdictStatus::Fail,
            exit_code,
            reason: format!(
                "{failed} of {total} endpoints incompatible ({mismatches} mismatch, {transport_errors} transport error)"
            ),
        }
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}
