// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Attendee list and join requests.

use crate::error::MutationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attendee user ids in join order. Never contains the organiser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attendees(pub Vec<String>);

impl Attendees {
    pub fn contains(&self, user_id: &str) -> bool {
        self.0.iter().any(|id| id == user_id)
    }

    pub fn add(&mut self, user_id: &str) -> Result<(), MutationError> {
        if self.contains(user_id) {
            return Err(MutationError::AlreadyMember(user_id.to_string()));
        }
        self.0.push(user_id.to_string());
        Ok(())
    }

    pub fn remove(&mut self, user_id: &str) -> Result<(), MutationError> {
        let before = self.0.len();
        self.0.retain(|id| id != user_id);
        if self.0.len() == before {
            return Err(MutationError::NotMember(user_id.to_string()));
        }
        Ok(())
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub profile_pic: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub status: RequestStatus,
}

/// Join requests in arrival order.
///
/// Duplicate requests from one email are kept; nothing here deduplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requests(pub Vec<JoinRequest>);

impl Requests {
    /// Append a new pending request.
    pub fn append(
        &mut self,
        email: &str,
        username: &str,
        profile_pic: Option<String>,
        requested_at: DateTime<Utc>,
    ) {
        self.0.push(JoinRequest {
            email: email.to_string(),
            username: username.to_string(),
            profile_pic,
            requested_at,
            status: RequestStatus::Pending,
        });
    }

    /// Set the status of the first request from `email`.
    pub fn set_status(&mut self, email: &str, status: RequestStatus) -> Result<(), MutationError> {
        let request = self
            .0
            .iter_mut()
            .find(|r| r.email == email)
            .ok_or_else(|| MutationError::RequestNotFound(email.to_string()))?;
        request.status = status;
        Ok(())
    }
}
