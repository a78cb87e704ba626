//! Small shared utilities.

pub mod fs;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as unix seconds.
///
/// Falls back to 0 if the clock reads before the epoch.
#[must_use]
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
