// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event activity tracking.
//!
//! Every change to an event refreshes its retention clock before it is
//! applied. If the organiser had already been warned about deletion, the
//! warning is withdrawn and they get a "rescue" email.

use crate::db::{collections, DocumentKey, Documents};
use crate::error::Result;
use crate::models::{EventRecord, RetentionState, User};
use crate::services::email;
use crate::services::fanout;
use crate::services::notifier::Notifier;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct ActivityTracker {
    docs: Documents,
    notifier: Arc<dyn Notifier>,
}

impl ActivityTracker {
    pub fn new(docs: Documents, notifier: Arc<dyn Notifier>) -> Self {
        Self { docs, notifier }
    }

    /// Refresh `updated_at` and clear any deletion warning.
    ///
    /// Returns `true` if a warning was withdrawn.
    pub async fn touch(&self, event_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let key = DocumentKey::new(collections::EVENT_RETENTION, event_id);
        let rescued = self
            .docs
            .mutate(&key, |mut state: RetentionState| {
                let was_warned = state.touch(now);
                Ok((state, was_warned))
            })
            .await?;

        if rescued {
            tracing::info!(event_id, "Deletion warning withdrawn after activity");
            self.send_rescue_email(event_id).await;
        }

        Ok(rescued)
    }

    /// Record activity ahead of a change to the event.
    ///
    /// Callers run this before applying the change. A reaper claim taken on
    /// the old retention version then fails and the event survives. If the
    /// reaper already claimed the event this fails with `NotFound` and the
    /// change must not be applied.
    pub async fn record(&self, event_id: &str) -> Result<()> {
        self.touch(event_id, Utc::now()).await.map(|_| ())
    }

    async fn send_rescue_email(&self, event_id: &str) {
        let organiser = async {
            let header: EventRecord = self
                .docs
                .get(&DocumentKey::new(collections::EVENTS, event_id))
                .await?;
            let organiser: User = self
                .docs
                .get(&DocumentKey::new(collections::USERS, header.organiser_id.clone()))
                .await?;
            Ok::<_, crate::error::AppError>((header, organiser))
        }
        .await;

        match organiser {
            Ok((header, organiser)) => {
                fanout::send_one(
                    self.notifier.as_ref(),
                    event_id,
                    &organiser,
                    email::deletion_cancelled(&header.title),
                )
                .await;
            }
            Err(e) => {
                tracing::warn!(event_id, error = %e, "Cannot send rescue email, organiser not found");
            }
        }
    }
}
