//! UTC timestamp helpers.
//!
//! The store and every workflow state record timestamps in UTC only —
//! there is no notion of a local timezone anywhere in this system
//! (the sandbox's host-timezone mount in §4.4 is about the *container's*
//! clock display, not about how we timestamp records).

use chrono::{DateTime, Utc};

/// The current instant, in UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for use in a deterministic, sortable filename
/// suffix, e.g. `20260728T193000Z`.
pub fn stamp_for_filename(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_filename_stamp() {
        let at = Utc.with_ymd_and_hms(2026, 7, 28, 19, 30, 0).unwrap();
        assert_eq!(stamp_for_filename(at), "20260728T193000Z");
    }
}
