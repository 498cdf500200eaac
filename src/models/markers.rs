// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-path timestamp markers.
//!
//! Used for both an event's "last updated" markers and a user's
//! "last opened" markers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMarker {
    pub path: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMarkers(pub Vec<PathMarker>);

impl PathMarkers {
    /// Set the timestamp for `path`, appending a marker if none exists.
    pub fn upsert(&mut self, path: &str, timestamp: DateTime<Utc>) {
        match self.0.iter_mut().find(|m| m.path == path) {
            Some(marker) => marker.timestamp = timestamp,
            None => self.0.push(PathMarker {
                path: path.to_string(),
                timestamp,
            }),
        }
    }

    pub fn get(&self, path: &str) -> Option<DateTime<Utc>> {
        self.0.iter().find(|m| m.path == path).map(|m| m.timestamp)
    }
}
