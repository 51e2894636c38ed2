// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and query windows.

use chrono::{DateTime, LocalResult, SecondsFormat, TimeZone, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A `[start, end]` window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start_millis: i64,
    pub end_millis: i64,
}

impl QueryWindow {
    /// From local midnight of `now`'s day up to `now`.
    ///
    /// On days where midnight does not exist (DST gap) the window starts at
    /// the first valid instant of the day.
    pub fn since_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let date = now.date_naive();
        let end_millis = now.timestamp_millis();

        let start_millis = (0..24)
            .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
            .find_map(|naive| match tz.from_local_datetime(&naive) {
                LocalResult::Single(dt) => Some(dt.timestamp_millis()),
                LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp_millis()),
                LocalResult::None => None,
            })
            .unwrap_or(end_millis);

        Self {
            start_millis: start_millis.min(end_millis),
            end_millis,
        }
    }
}
