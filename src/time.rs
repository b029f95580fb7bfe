/// Time utilities shared by session expiry and cache bookkeeping.

use chrono::{DateTime, Utc};

/// Returns the current UTC time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
