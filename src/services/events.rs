// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event creation, status transitions and deletion.

use crate::config::Config;
use crate::db::{collections, DocumentKey, Documents};
use crate::error::{AppError, Result};
use crate::models::{
    Attendees, Comments, EventRecord, EventStatus, Lifecycle, Links, NewEvent, NewUser,
    PathMarkers, Polls, Requests, RetentionState, Role, TodoList, Transition, User,
};
use crate::services::activity::ActivityTracker;
use crate::services::email::{self, Message};
use crate::services::fanout::{self, FanoutResult};
use crate::services::notifier::Notifier;
use crate::services::users;
use crate::time_utils::format_long_date;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What a cascading delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub users_deleted: usize,
    /// Users whose records could not be deleted after the event was gone
    pub orphaned_users: usize,
}

#[derive(Clone)]
pub struct EventService {
    docs: Documents,
    notifier: Arc<dyn Notifier>,
    config: Arc<Config>,
    activity: ActivityTracker,
}

impl EventService {
    pub fn new(
        docs: Documents,
        notifier: Arc<dyn Notifier>,
        config: Arc<Config>,
        activity: ActivityTracker,
    ) -> Self {
        Self {
            docs,
            notifier,
            config,
            activity,
        }
    }

    /// Create the organiser's user record ahead of the event.
    pub async fn register_organiser(&self, profile: NewUser) -> Result<User> {
        let user = users::build_user(profile, Role::Organiser, None, Utc::now());
        users::insert_user(&self.docs, &user).await?;
        tracing::info!(user_id = %user.id, "Organiser registered");
        Ok(user)
    }

    /// Create an event in `pending` with empty collections.
    pub async fn create_event(&self, new: NewEvent) -> Result<EventRecord> {
        self.create_event_at(new, Utc::now()).await
    }

    pub async fn create_event_at(&self, new: NewEvent, now: DateTime<Utc>) -> Result<EventRecord> {
        if new.title.trim().is_empty() {
            return Err(AppError::BadRequest("event title is required".to_string()));
        }

        let id = new
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let header_key = DocumentKey::new(collections::EVENTS, id.clone());
        if self.docs.load::<EventRecord>(&header_key).await?.is_some() {
            return Err(AppError::Conflict(format!("event {} already exists", id)));
        }

        let organiser = self.claim_organiser(&new.organiser_id, &id).await?;

        let record = EventRecord {
            id: id.clone(),
            title: new.title,
            description: new.description,
            location: new.location,
            earliest_date: new.earliest_date,
            latest_date: new.latest_date,
            duration_days: new.duration_days,
            organiser_id: new.organiser_id,
            created_at: now,
        };

        if let Err(e) = self.insert_event_documents(&record, now).await {
            self.release_organiser(&organiser.id, &id).await;
            return Err(e);
        }

        tracing::info!(event_id = %id, organiser_id = %organiser.id, "Event created");

        fanout::send_one(
            self.notifier.as_ref(),
            &id,
            &organiser,
            email::event_created(&record.title, &self.config.event_url(&id)),
        )
        .await;

        Ok(record)
    }

    /// Bind an unattached organiser record to `event_id`.
    async fn claim_organiser(&self, organiser_id: &str, event_id: &str) -> Result<User> {
        self.docs
            .mutate(
                &DocumentKey::new(collections::USERS, organiser_id),
                |mut user: User| {
                    if user.role != Role::Organiser {
                        return Err(AppError::InvalidState(format!(
                            "user {} is not an organiser",
                            user.id
                        )));
                    }
                    if let Some(existing) = &user.event_id {
                        return Err(AppError::InvalidState(format!(
                            "user {} already organises event {}",
                            user.id, existing
                        )));
                    }
                    user.event_id = Some(event_id.to_string());
                    Ok((user.clone(), user))
                },
            )
            .await
    }

    /// Undo [`Self::claim_organiser`] after event creation failed.
    async fn release_organiser(&self, organiser_id: &str, event_id: &str) {
        let released = self
            .docs
            .mutate(
                &DocumentKey::new(collections::USERS, organiser_id),
                |mut user: User| {
                    if user.event_id.as_deref() == Some(event_id) {
                        user.event_id = None;
                    }
                    Ok((user, ()))
                },
            )
            .await;
        if let Err(e) = released {
            tracing::error!(event_id, organiser_id, error = %e, "Failed to release organiser");
        }
    }

    /// Insert every event document. The header goes in last: until it
    /// exists the event is invisible.
    async fn insert_event_documents(&self, record: &EventRecord, now: DateTime<Utc>) -> Result<()> {
        let key = |collection: &'static str| DocumentKey::new(collection, record.id.clone());
        self.docs
            .insert(&key(collections::EVENT_LIFECYCLE), &Lifecycle::default())
            .await?;
        self.docs
            .insert(&key(collections::EVENT_RETENTION), &RetentionState::new(now))
            .await?;
        self.docs
            .insert(&key(collections::EVENT_ATTENDEES), &Attendees::default())
            .await?;
        self.docs
            .insert(&key(collections::EVENT_REQUESTS), &Requests::default())
            .await?;
        self.docs
            .insert(&key(collections::EVENT_POLLS), &Polls::default())
            .await?;
        self.docs
            .insert(&key(collections::EVENT_COMMENTS), &Comments::default())
            .await?;
        self.docs
            .insert(&key(collections::EVENT_LINKS), &Links::default())
            .await?;
        self.docs
            .insert(&key(collections::EVENT_TODO), &TodoList::default())
            .await?;
        self.docs
            .insert(&key(collections::EVENT_LAST_UPDATED), &PathMarkers::default())
            .await?;
        self.docs
            .insert(&key(collections::EVENTS), record)
            .await?;
        Ok(())
    }

    pub async fn get_event(&self, event_id: &str) -> Result<EventRecord> {
        self.docs
            .get(&DocumentKey::new(collections::EVENTS, event_id))
            .await
    }

    pub async fn lifecycle(&self, event_id: &str) -> Result<Lifecycle> {
        self.docs
            .get(&DocumentKey::new(collections::EVENT_LIFECYCLE, event_id))
            .await
    }

    pub async fn confirm(
        &self,
        event_id: &str,
        chosen_dates: Vec<String>,
        reminder_time: Option<DateTime<Utc>>,
    ) -> Result<Lifecycle> {
        self.transition(
            event_id,
            Transition::Confirm {
                chosen_dates,
                reminder_time,
            },
        )
        .await
    }

    pub async fn cancel(&self, event_id: &str, reason: Option<String>) -> Result<Lifecycle> {
        self.transition(event_id, Transition::Cancel { reason }).await
    }

    pub async fn reopen(&self, event_id: &str) -> Result<Lifecycle> {
        self.transition(event_id, Transition::Reopen).await
    }

    /// Apply a status transition, then notify organiser and attendees.
    ///
    /// Notification failures do not undo the transition.
    pub async fn transition(&self, event_id: &str, transition: Transition) -> Result<Lifecycle> {
        let header = self.get_event(event_id).await?;
        self.activity.record(event_id).await?;

        let key = DocumentKey::new(collections::EVENT_LIFECYCLE, event_id);
        let next = self
            .docs
            .mutate(&key, |current: Lifecycle| {
                let next = current.apply(&transition)?;
                Ok((next.clone(), next))
            })
            .await?;

        tracing::info!(event_id, status = %next.status, "Event status changed");

        let message = self.transition_message(&header, &next);
        let result = self.notify_members(&header, &message).await;
        if !result.all_delivered() {
            tracing::warn!(
                event_id,
                sent = result.sent,
                failed = result.failed,
                "Some transition notifications failed"
            );
        }

        Ok(next)
    }

    /// Toggle dates in or out of a confirmed event's chosen set.
    pub async fn toggle_chosen_dates(&self, event_id: &str, dates: &[String]) -> Result<Vec<String>> {
        self.activity.record(event_id).await?;
        let key = DocumentKey::new(collections::EVENT_LIFECYCLE, event_id);
        let chosen = self
            .docs
            .mutate(&key, |mut lifecycle: Lifecycle| {
                lifecycle.toggle_chosen_dates(dates)?;
                let chosen = lifecycle.chosen_dates.clone().unwrap_or_default();
                Ok((lifecycle, chosen))
            })
            .await?;

        Ok(chosen)
    }

    /// Delete an event on the organiser's request, cascading to its users.
    pub async fn delete_event(&self, event_id: &str) -> Result<PurgeReport> {
        let header = self.get_event(event_id).await?;
        let attendees: Attendees = self
            .docs
            .load(&DocumentKey::new(collections::EVENT_ATTENDEES, event_id))
            .await?
            .map(|(a, _)| a)
            .unwrap_or_default();

        let members = fanout::recipient_ids(&header.organiser_id, attendees.ids());
        let report = purge_event(&self.docs, event_id, &members).await?;
        tracing::info!(
            event_id,
            users_deleted = report.users_deleted,
            orphaned_users = report.orphaned_users,
            "Event deleted by organiser"
        );
        Ok(report)
    }

    fn transition_message(&self, header: &EventRecord, lifecycle: &Lifecycle) -> Message {
        let url = self.config.event_url(&header.id);
        match lifecycle.status {
            EventStatus::Confirmed => email::event_confirmed(
                &header.title,
                lifecycle.chosen_dates.as_deref().unwrap_or_default(),
                lifecycle
                    .reminder_time
                    .map(format_long_date)
                    .as_deref(),
            ),
            EventStatus::Canceled => email::event_cancelled(
                &header.title,
                lifecycle.cancellation_reason.as_deref().unwrap_or_default(),
            ),
            EventStatus::Pending => email::event_reopened(&header.title, &url),
        }
    }

    async fn notify_members(&self, header: &EventRecord, message: &Message) -> FanoutResult {
        let recipients = async {
            let attendees: Attendees = self
                .docs
                .load(&DocumentKey::new(collections::EVENT_ATTENDEES, header.id.clone()))
                .await?
                .map(|(a, _)| a)
                .unwrap_or_default();
            let ids = fanout::recipient_ids(&header.organiser_id, attendees.ids());
            fanout::load_users(&self.docs, &header.id, &ids).await
        }
        .await;

        match recipients {
            Ok(users) => fanout::send_all(self.notifier.as_ref(), &header.id, &users, message).await,
            Err(e) => {
                tracing::warn!(event_id = %header.id, error = %e, "Cannot resolve notification recipients");
                FanoutResult::default()
            }
        }
    }
}

/// Delete every document of an event, then every listed member's user
/// records.
///
/// The header goes first, so the event stops existing before any user is
/// removed. Failures after that point are logged and counted, never
/// retried.
pub async fn purge_event(docs: &Documents, event_id: &str, member_ids: &[String]) -> Result<PurgeReport> {
    docs.delete(&DocumentKey::new(collections::EVENTS, event_id))
        .await?;

    for collection in collections::EVENT_SCOPED.into_iter().skip(1) {
        let key = DocumentKey::new(collection, event_id);
        if let Err(e) = docs.delete(&key).await {
            tracing::error!(event_id, document = %key, error = %e, "Failed to delete event document");
        }
    }

    let mut report = PurgeReport::default();
    for user_id in member_ids {
        match users::delete_user(docs, user_id).await {
            Ok(()) => report.users_deleted += 1,
            Err(e) => {
                report.orphaned_users += 1;
                tracing::error!(
                    event_id,
                    user_id = %user_id,
                    error = %e,
                    "Orphaned user record after event deletion"
                );
            }
        }
    }

    Ok(report)
}
