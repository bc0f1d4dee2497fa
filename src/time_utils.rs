// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Shared helpers for date/time formatting.
//!
//! Stored timestamps are fixed-width RFC3339 strings, so comparing them as
//! strings orders them in time.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with millisecond precision and a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC3339 timestamp into UTC.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
