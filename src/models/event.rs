// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Event header record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an event takes place. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Location {
    /// One-line description for notifications: city, address, country and
    /// postcode joined with ", ", or "TBA" when none are set.
    pub fn describe(&self) -> String {
        let parts: Vec<&str> = [&self.city, &self.address, &self.country, &self.postcode]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            "TBA".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Event header stored at `events/{id}`.
///
/// Written once at creation. Its presence is what makes an event exist;
/// the mutable parts live in their own documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Location,
    /// Earliest candidate date (YYYY-MM-DD)
    pub earliest_date: Option<String>,
    /// Latest candidate date (YYYY-MM-DD)
    pub latest_date: Option<String>,
    /// Duration in days
    pub duration_days: Option<u32>,
    pub organiser_id: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when creating an event.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    /// Explicit key; a fresh UUID is generated when absent.
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,
    pub duration_days: Option<u32>,
    pub organiser_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_describe() {
        let location = Location {
            address: Some("1 Main St".to_string()),
            city: Some("Leeds".to_string()),
            country: Some("UK".to_string()),
            postcode: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(location.describe(), "Leeds, 1 Main St, UK");
        assert_eq!(Location::default().describe(), "TBA");
    }
}
