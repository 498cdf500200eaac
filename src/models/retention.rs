// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Inactivity retention state for an event.

use crate::config::RetentionPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored at `event_retention/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionState {
    /// Last genuine activity on the event
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_warning_sent: bool,
    /// When the warning went out; the deletion clock starts here
    #[serde(default)]
    pub warned_at: Option<DateTime<Utc>>,
}

/// What the reaper should do with an event right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionStage {
    Active,
    /// Warn the organiser that the event goes away on `deletion_date`.
    Warn { deletion_date: DateTime<Utc> },
    /// Warned and still idle past the deletion threshold.
    Delete,
}

impl RetentionState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            updated_at: now,
            deleted_warning_sent: false,
            warned_at: None,
        }
    }

    /// Record activity. Returns `true` if a pending warning was cleared.
    pub fn touch(&mut self, now: DateTime<Utc>) -> bool {
        let was_warned = self.deleted_warning_sent;
        if now > self.updated_at {
            self.updated_at = now;
        }
        self.deleted_warning_sent = false;
        self.warned_at = None;
        was_warned
    }

    pub fn mark_warned(&mut self, now: DateTime<Utc>) {
        self.deleted_warning_sent = true;
        self.warned_at = Some(now);
    }

    /// Decide the retention stage at `now`.
    ///
    /// An event whose last activity is within `warn_after` is always
    /// `Active`, whatever its warning flag says.
    pub fn stage(&self, now: DateTime<Utc>, policy: &RetentionPolicy) -> RetentionStage {
        let idle = now - self.updated_at;
        if idle <= policy.warn_after {
            return RetentionStage::Active;
        }

        if !self.deleted_warning_sent {
            return RetentionStage::Warn {
                deletion_date: now + policy.delete_after,
            };
        }

        let warned_at = self.warned_at.unwrap_or(self.updated_at);
        if now - warned_at > policy.delete_after {
            RetentionStage::Delete
        } else {
            RetentionStage::Active
        }
    }
}
