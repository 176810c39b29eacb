use std::time::{Duration, Instant};

/// Instant at which `timeout` from now expires.
///
/// Returns `None` when the sum does not fit in an [`Instant`]; callers treat
/// that as "no deadline" and wait without a bound.
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

