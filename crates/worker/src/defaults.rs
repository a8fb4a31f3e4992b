#![forbid(unsafe_code)]

use std::time::Duration;

/// Claims older than this may be reclaimed by any worker.
pub const CLAIM_TIMEOUT: Duration = Duration::from_secs(60);

/// Sleep between consecutive empty claim attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A single empty claim ends the run. Raise this when several workers share
/// a store and jobs may still come back via reclaim after a peer crashes.
pub const MAX_EMPTY_POLLS: u32 = 1;
