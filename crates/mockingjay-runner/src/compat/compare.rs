//! Response comparison
//!
//! No I/O. Takes what the real service answered and decides whether it
//! honours the endpoint's contract.

use std::time::Duration;

use mockingjay_core::report::Observation;
use mockingjay_core::{CheckResult, Endpoint};

/// Compare an observed response against the endpoint's expectation.
///
/// Compatible iff the status codes are equal and the body bytes are equal.
/// No whitespace or encoding normalisation.
pub(super) fn compare(
    endpoint: &Endpoint,
    status: u16,
    body: &[u8],
    elapsed: Duration,
) -> CheckResult {
    let expected = &endpoint.response;
    let body_matches = body == expected.body.as_bytes();
    if status == expected.code && body_matches {
        return CheckResult::compatible(&endpoint.name, elapsed);
    }

    CheckResult::mismatch(
        &endpoint.name,
        Observation::new(expected.code, &expected.body),
        Observation {
            bytes: body.len(),
            ..Observation::new(status, &String::from_utf8_lossy(body))
        },
        body_matches,
        elapsed,
    )
}
