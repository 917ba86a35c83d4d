//! Weighted selection over a behavior table
//!
//! Pure function of (table, draw). The caller owns the randomness.

use super::{Behavior, FREQUENCY_EPSILON};

/// Pick the behavior whose interval contains `draw`.
///
/// Behaviors occupy consecutive half-open intervals
/// `[boundary, boundary + frequency)` starting at 0, in table order.
/// A draw past the last interval lands in the residual mass and selects
/// nothing. Zero-frequency behaviors are skipped and can never be chosen.
/// When the table covers all of `[0, 1)` the last live interval is closed
/// at 1 so rounding in the running sum cannot open a gap below 1.
///
/// `draw` must be in `[0, 1)`; anything else (including NaN) selects nothing.
#[must_use]
pub fn select(behaviors: &[Behavior], draw: f64) -> Option<&Behavior> {
    if !(0.0..1.0).contains(&draw) {
        return None;
    }

    let mut boundary = 0.0;
    let mut last_live = None;
    for behavior in behaviors {
        let frequency = behavior.frequency();
        if frequency <= 0.0 {
            continue;
        }
        // draw >= boundary holds: every earlier interval rejected it
        let upper = boundary + frequency;
        if draw < upper {
            return Some(behavior);
        }
        boundary = upper;
        last_live = Some(behavior);
    }

    if boundary >= 1.0 - FREQUENCY_EPSILON {
        return last_live;
    }
    None
}
