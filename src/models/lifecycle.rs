// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Event status state machine.
//!
//! The lifecycle document holds the status together with every field whose
//! validity is scoped to a status, plus the two reminder idempotency flags,
//! so that a transition rewrites all of them in one compare-and-swap.

use crate::error::{AppError, MutationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Confirmed,
    Canceled,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventStatus::Pending => "pending",
            EventStatus::Confirmed => "confirmed",
            EventStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// Stored at `event_lifecycle/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub status: EventStatus,
    /// Locked-in dates. Set on confirm and kept through cancel.
    #[serde(default)]
    pub chosen_dates: Option<Vec<String>>,
    /// When the "upcoming" reminder fires. Only set while confirmed.
    #[serde(default)]
    pub reminder_time: Option<DateTime<Utc>>,
    /// Only set while canceled.
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub reminder_sent: bool,
    #[serde(default)]
    pub daily_reminder_sent: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            status: EventStatus::Pending,
            chosen_dates: None,
            reminder_time: None,
            cancellation_reason: None,
            reminder_sent: false,
            daily_reminder_sent: false,
        }
    }
}

/// A requested status change.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Confirm {
        chosen_dates: Vec<String>,
        reminder_time: Option<DateTime<Utc>>,
    },
    Cancel {
        reason: Option<String>,
    },
    Reopen,
}

impl Transition {
    pub fn target(&self) -> EventStatus {
        match self {
            Transition::Confirm { .. } => EventStatus::Confirmed,
            Transition::Cancel { .. } => EventStatus::Canceled,
            Transition::Reopen => EventStatus::Pending,
        }
    }

    fn allowed_from(&self, status: EventStatus) -> bool {
        matches!(
            (self, status),
            (Transition::Confirm { .. }, EventStatus::Pending)
                | (Transition::Cancel { .. }, EventStatus::Pending)
                | (Transition::Cancel { .. }, EventStatus::Confirmed)
                | (Transition::Reopen, EventStatus::Confirmed)
                | (Transition::Reopen, EventStatus::Canceled)
        )
    }
}

impl Lifecycle {
    /// Apply a transition, returning the next lifecycle.
    ///
    /// Transitions into the current state, or from a state the transition
    /// does not leave, are rejected with `InvalidState`.
    pub fn apply(&self, transition: &Transition) -> Result<Lifecycle, AppError> {
        let target = transition.target();
        if self.status == target {
            return Err(AppError::InvalidState(format!("event is already {}", target)));
        }
        if !transition.allowed_from(self.status) {
            return Err(AppError::InvalidState(format!(
                "cannot move event from {} to {}",
                self.status, target
            )));
        }

        let next = match transition {
            Transition::Confirm {
                chosen_dates,
                reminder_time,
            } => {
                let dates = dedup_preserving_order(chosen_dates);
                if dates.is_empty() {
                    return Err(MutationError::EmptyChosenDates.into());
                }
                Lifecycle {
                    status: EventStatus::Confirmed,
                    chosen_dates: Some(dates),
                    reminder_time: *reminder_time,
                    cancellation_reason: None,
                    reminder_sent: self.reminder_sent,
                    daily_reminder_sent: self.daily_reminder_sent,
                }
            }
            Transition::Cancel { reason } => Lifecycle {
                status: EventStatus::Canceled,
                chosen_dates: self.chosen_dates.clone(),
                reminder_time: None,
                cancellation_reason: Some(reason.clone().unwrap_or_default()),
                reminder_sent: self.reminder_sent,
                daily_reminder_sent: self.daily_reminder_sent,
            },
            Transition::Reopen => Lifecycle::default(),
        };

        Ok(next)
    }

    /// Toggle each date in or out of the chosen set.
    ///
    /// Only a confirmed event has chosen dates to edit, and the result must
    /// keep at least one date.
    pub fn toggle_chosen_dates(&mut self, dates: &[String]) -> Result<(), AppError> {
        if self.status != EventStatus::Confirmed {
            return Err(AppError::InvalidState(format!(
                "chosen dates can only change while confirmed, event is {}",
                self.status
            )));
        }

        let mut chosen = self.chosen_dates.clone().unwrap_or_default();
        for date in dates {
            if let Some(pos) = chosen.iter().position(|d| d == date) {
                chosen.remove(pos);
            } else {
                chosen.push(date.clone());
            }
        }

        if chosen.is_empty() {
            return Err(MutationError::EmptyChosenDates.into());
        }
        self.chosen_dates = Some(chosen);
        Ok(())
    }

    /// Date on which the "upcoming" reminder is due, if any.
    pub fn reminder_date(&self) -> Option<NaiveDate> {
        self.reminder_time.map(|t| t.date_naive())
    }
}

fn dedup_preserving_order(dates: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(dates.len());
    for date in dates {
        if !out.contains(date) {
            out.push(date.clone());
        }
    }
    out
}
