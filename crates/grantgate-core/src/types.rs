//! Strong type definitions for Grantgate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a persisted grant.
///
/// Assigned by the store at creation and never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(pub i64);

impl GrantId {
    /// Create from a raw store id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GrantId({})", self.0)
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GrantId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Milliseconds in one hour.
pub const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Get current time in Unix milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Compute an absolute expiry `hours` after `now`.
///
/// Fractional hours are honoured to the millisecond.
pub fn expiry_after_hours(now: i64, hours: f32) -> i64 {
    let duration_ms = (f64::from(hours) * MILLIS_PER_HOUR) as i64;
    now.saturating_add(duration_ms)
}
