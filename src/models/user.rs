// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User model and per-user availability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organiser,
    Admin,
    Attendee,
}

impl Role {
    /// Parse a requested role. Anything unrecognised becomes `Attendee`.
    pub fn parse_or_attendee(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("organiser") => Role::Organiser,
            Some("admin") => Role::Admin,
            _ => Role::Attendee,
        }
    }
}

/// User profile stored at `users/{id}`.
///
/// A user belongs to a single event; the organiser's record is created
/// before the event exists, so `event_id` may be unset for a short while.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub event_id: Option<String>,
    pub email: String,
    pub username: String,
    /// Browser/device fingerprint used by the session layer
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub profile_pic: Option<String>,
    /// Tristate: yes, no, or not answered
    #[serde(default)]
    pub is_coming: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// First word of the username, used in greetings.
    pub fn first_name(&self) -> &str {
        first_name(&self.username)
    }
}

pub fn first_name(username: &str) -> &str {
    username.split_whitespace().next().unwrap_or(username)
}

/// Caller-supplied profile for a new user.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub fingerprint: Option<String>,
    pub role: Option<String>,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityStatus {
    #[serde(rename = "available")]
    Available,
    #[serde(rename = "not available")]
    Unavailable,
    #[serde(rename = "tentative")]
    Tentative,
}

impl AvailabilityStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "available" => Some(AvailabilityStatus::Available),
            "not available" => Some(AvailabilityStatus::Unavailable),
            "tentative" => Some(AvailabilityStatus::Tentative),
            _ => None,
        }
    }
}

/// Date (YYYY-MM-DD) to availability, stored at `user_availability/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Availability(pub BTreeMap<String, AvailabilityStatus>);

impl Availability {
    /// Apply a batch of updates. `None` removes the date; unknown statuses
    /// are skipped. Returns the number of skipped updates.
    pub fn apply(&mut self, updates: &[(String, Option<String>)]) -> usize {
        let mut skipped = 0;
        for (date, status) in updates {
            match status.as_deref() {
                None => {
                    self.0.remove(date);
                }
                Some(raw) => match AvailabilityStatus::parse(raw) {
                    Some(status) => {
                        self.0.insert(date.clone(), status);
                    }
                    None => skipped += 1,
                },
            }
        }
        skipped
    }
}
