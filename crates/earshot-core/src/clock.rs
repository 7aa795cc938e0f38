// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Civil-time clock abstraction.
//!
//! All "current time" reads and due-date comparisons go through [`Clock`] so
//! tests can pin the clock instead of racing the wall. The deployment's chat
//! traffic lives in one fixed civil timezone (UTC+8); every timestamp the
//! daemon renders or compares uses that offset.

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone, Utc};

/// The fixed civil offset all rendered and compared times use.
pub const CIVIL_OFFSET_HOURS: i32 = 8;

/// Returns the fixed civil offset (UTC+8).
pub fn civil_offset() -> FixedOffset {
    // Statically valid: 8 hours east is within chrono's accepted range.
    FixedOffset::east_opt(CIVIL_OFFSET_HOURS * 3600).unwrap()
}

/// Source of "now" in the fixed civil offset.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Production clock: wall time shifted to the civil offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&civil_offset())
    }
}

/// A clock pinned to one instant, for tests and deterministic sweeps.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Canonical storage rendering: RFC 3339, whole seconds, fixed offset.
///
/// Every due date and sweep cutoff is written through here, so the strings
/// compare lexicographically in SQL.
pub fn storage_string(dt: &DateTime<FixedOffset>) -> String {
    dt.with_timezone(&civil_offset())
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Convert gateway unix seconds into the civil offset.
pub fn from_unix(secs: i64) -> DateTime<FixedOffset> {
    civil_offset()
        .timestamp_opt(secs, 0)
        .single()
        .unwrap_or_else(|| civil_offset().timestamp_opt(0, 0).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_returns_pinned_instant() {
        let instant = civil_offset().with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clock = FixedClock(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.now(), instant);
    }

    #[test]
    fn storage_string_is_whole_seconds_with_offset() {
        let dt = civil_offset().with_ymd_and_hms(2026, 3, 1, 9, 30, 5).unwrap();
        assert_eq!(storage_string(&dt), "2026-03-01T09:30:05+08:00");
    }

    #[test]
    fn storage_strings_compare_lexicographically() {
        let earlier = civil_offset().with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let later = civil_offset().with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        assert!(storage_string(&earlier) < storage_string(&later));
    }

    #[test]
    fn from_unix_lands_in_civil_offset() {
        // 2026-03-01T04:00:00Z is noon in UTC+8.
        let dt = from_unix(1772337600);
        assert_eq!(dt.offset(), &civil_offset());
        assert_eq!(storage_string(&dt), "2026-03-01T12:00:00+08:00");
    }
}
