// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Retention reaper.
//!
//! Every event moves through two inactivity stages. Once it has been idle
//! longer than the warning threshold the organiser is told when it will be
//! deleted. If it is still idle the deletion threshold after that warning,
//! the event and all of its users are removed.

use crate::config::Config;
use crate::db::{collections, CasOutcome, DocumentKey, Documents, Version};
use crate::error::{AppError, Result};
use crate::models::{Attendees, EventRecord, RetentionStage, RetentionState, User};
use crate::services::email;
use crate::services::events::purge_event;
use crate::services::fanout;
use crate::services::notifier::Notifier;
use crate::time_utils::format_long_date;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_EVENTS: usize = 16;

/// Summary of one reaper pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub warned: usize,
    pub deleted: usize,
    pub failed: usize,
    /// User records left behind by a partially failed cascade
    pub orphaned_users: usize,
}

impl RetentionReport {
    fn merge(mut self, other: RetentionReport) -> Self {
        self.warned += other.warned;
        self.deleted += other.deleted;
        self.failed += other.failed;
        self.orphaned_users += other.orphaned_users;
        self
    }
}

#[derive(Clone)]
pub struct RetentionReaper {
    docs: Documents,
    notifier: Arc<dyn Notifier>,
    config: Arc<Config>,
}

impl RetentionReaper {
    pub fn new(docs: Documents, notifier: Arc<dyn Notifier>, config: Arc<Config>) -> Self {
        Self {
            docs,
            notifier,
            config,
        }
    }

    /// Run one pass at `now` over every event, whatever its status.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RetentionReport> {
        let states = self
            .docs
            .list::<RetentionState>(collections::EVENT_RETENTION)
            .await?;

        tracing::debug!(count = states.len(), "Retention pass started");

        let report = stream::iter(states)
            .map(|(event_id, state, version)| async move {
                match self.process_event(&event_id, &state, version, now).await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(event_id = %event_id, error = %e, "Retention processing failed");
                        RetentionReport {
                            failed: 1,
                            ..Default::default()
                        }
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_EVENTS)
            .fold(RetentionReport::default(), |acc, r| async move { acc.merge(r) })
            .await;

        tracing::info!(
            warned = report.warned,
            deleted = report.deleted,
            failed = report.failed,
            orphaned_users = report.orphaned_users,
            "Retention pass complete"
        );
        Ok(report)
    }

    async fn process_event(
        &self,
        event_id: &str,
        state: &RetentionState,
        version: Version,
        now: DateTime<Utc>,
    ) -> Result<RetentionReport> {
        match state.stage(now, &self.config.retention) {
            RetentionStage::Active => {
                tracing::debug!(event_id, updated_at = %state.updated_at, "Event active");
                Ok(RetentionReport::default())
            }
            RetentionStage::Warn { deletion_date } => {
                self.warn(event_id, deletion_date, now).await
            }
            RetentionStage::Delete => self.delete(event_id, state, version).await,
        }
    }

    /// Email the organiser, then record the warning if the event is still
    /// idle.
    async fn warn(
        &self,
        event_id: &str,
        deletion_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<RetentionReport> {
        let mut report = RetentionReport::default();
        let Some(header) = self.header(event_id).await? else {
            tracing::debug!(event_id, "No event header, skipping warning");
            return Ok(report);
        };

        match self.organiser(&header).await? {
            Some(organiser) => {
                let message = email::deletion_warning(
                    &header.title,
                    &format_long_date(deletion_date),
                    &self.config.event_url(event_id),
                );
                if !fanout::send_one(self.notifier.as_ref(), event_id, &organiser, message).await {
                    report.failed = 1;
                    return Ok(report);
                }
            }
            None => {
                tracing::warn!(event_id, organiser_id = %header.organiser_id, "Organiser missing, recording warning without email");
            }
        }

        let policy = self.config.retention;
        let key = DocumentKey::new(collections::EVENT_RETENTION, event_id);
        let marked = self
            .docs
            .mutate(&key, |mut state: RetentionState| {
                if !matches!(state.stage(now, &policy), RetentionStage::Warn { .. }) {
                    return Ok((state, false));
                }
                state.mark_warned(now);
                Ok((state, true))
            })
            .await;

        match marked {
            Ok(true) => {
                tracing::info!(event_id, deletion_date = %deletion_date, "Deletion warning sent");
                report.warned = 1;
            }
            Ok(false) => {
                tracing::info!(event_id, "Event became active during warning, not recorded");
            }
            Err(AppError::NotFound(_)) => {
                tracing::info!(event_id, "Event deleted during warning");
            }
            Err(e) => return Err(e),
        }
        Ok(report)
    }

    /// Delete the event and its users.
    ///
    /// Removing the retention document at the version the scan saw is the
    /// commit point. If any activity touched the event since, that fails
    /// and the event survives. If the event header then cannot be removed
    /// the retention document is put back so the next pass retries.
    async fn delete(
        &self,
        event_id: &str,
        state: &RetentionState,
        version: Version,
    ) -> Result<RetentionReport> {
        let mut report = RetentionReport::default();
        let header = self.header(event_id).await?;
        let organiser = match &header {
            Some(header) => self.organiser(header).await?,
            None => None,
        };
        let attendees: Attendees = self
            .docs
            .load(&DocumentKey::new(collections::EVENT_ATTENDEES, event_id))
            .await?
            .map(|(a, _)| a)
            .unwrap_or_default();

        let key = DocumentKey::new(collections::EVENT_RETENTION, event_id);
        match self.docs.compare_and_delete(&key, version).await? {
            CasOutcome::Swapped(_) => {}
            CasOutcome::Conflict => {
                tracing::info!(event_id, "Event touched since scan, deletion skipped");
                return Ok(report);
            }
            CasOutcome::NotFound => {
                tracing::debug!(event_id, "Retention record already gone");
                return Ok(report);
            }
        }

        let Some(header) = header else {
            // Leftover retention record without an event.
            tracing::warn!(event_id, "Removed retention record of missing event");
            return Ok(report);
        };

        let members = fanout::recipient_ids(&header.organiser_id, attendees.ids());
        let purge = match purge_event(&self.docs, event_id, &members).await {
            Ok(purge) => purge,
            Err(e) => {
                self.restore(&key, state).await;
                return Err(e);
            }
        };

        if let Some(organiser) = &organiser {
            fanout::send_one(
                self.notifier.as_ref(),
                event_id,
                organiser,
                email::event_deleted(&header.title),
            )
            .await;
        }

        tracing::info!(
            event_id,
            title = %header.title,
            users_deleted = purge.users_deleted,
            orphaned_users = purge.orphaned_users,
            "Deleted inactive event"
        );
        report.deleted = 1;
        report.orphaned_users = purge.orphaned_users;
        Ok(report)
    }

    async fn restore(&self, key: &DocumentKey, state: &RetentionState) {
        match self.docs.insert(key, state).await {
            Ok(_) => tracing::warn!(document = %key, "Event deletion failed, retention record restored"),
            Err(e) => tracing::error!(
                document = %key,
                error = %e,
                "Event deletion failed and retention record could not be restored"
            ),
        }
    }

    async fn header(&self, event_id: &str) -> Result<Option<EventRecord>> {
        Ok(self
            .docs
            .load(&DocumentKey::new(collections::EVENTS, event_id))
            .await?
            .map(|(header, _)| header))
    }

    async fn organiser(&self, header: &EventRecord) -> Result<Option<User>> {
        Ok(self
            .docs
            .load(&DocumentKey::new(collections::USERS, header.organiser_id.clone()))
            .await?
            .map(|(user, _)| user))
    }
}
