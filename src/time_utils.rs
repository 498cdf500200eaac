// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and parsing.

use chrono::{DateTime, NaiveDate, Utc};

/// Human-readable date for notification bodies, e.g. "April 23, 2025".
pub fn format_long_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Parse a stored event date.
///
/// Accepts a bare `YYYY-MM-DD` date or a full RFC3339 timestamp, which is
/// reduced to its UTC calendar date.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Earliest parseable date in `dates`, with the entries that did not parse.
///
/// Ties keep the first occurrence.
pub fn earliest_date(dates: &[String]) -> (Option<NaiveDate>, Vec<&str>) {
    let mut earliest: Option<NaiveDate> = None;
    let mut unparseable = Vec::new();

    for raw in dates {
        match parse_event_date(raw) {
            Some(date) if earliest.map_or(true, |e| date < e) => earliest = Some(date),
            Some(_) => {}
            None => unparseable.push(raw.as_str()),
        }
    }

    (earliest, unparseable)
}
