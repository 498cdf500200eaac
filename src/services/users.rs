// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event membership and per-user records.

use crate::config::Config;
use crate::db::{collections, CasOutcome, DocumentKey, Documents};
use crate::error::{AppError, MutationError, Result};
use crate::models::{Attendees, Availability, EventRecord, NewUser, PathMarkers, Role, User};
use crate::services::activity::ActivityTracker;
use crate::services::email;
use crate::services::fanout;
use crate::services::notifier::Notifier;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub(crate) fn build_user(
    profile: NewUser,
    role: Role,
    event_id: Option<String>,
    now: DateTime<Utc>,
) -> User {
    User {
        id: uuid::Uuid::new_v4().to_string(),
        event_id,
        email: profile.email.trim().to_string(),
        username: profile.username.trim().to_string(),
        fingerprint: profile.fingerprint,
        role,
        profile_pic: profile.profile_pic,
        is_coming: None,
        created_at: now,
    }
}

/// Create a user's profile, availability and last-opened documents.
pub(crate) async fn insert_user(docs: &Documents, user: &User) -> Result<()> {
    if user.email.is_empty() || user.username.is_empty() {
        return Err(AppError::BadRequest(
            "email and username are required".to_string(),
        ));
    }
    let key = |collection: &'static str| DocumentKey::new(collection, user.id.clone());
    docs.insert(&key(collections::USER_AVAILABILITY), &Availability::default())
        .await?;
    docs.insert(&key(collections::USER_LAST_OPENED), &PathMarkers::default())
        .await?;
    docs.insert(&key(collections::USERS), user).await?;
    Ok(())
}

/// Delete all of a user's documents, profile last.
pub(crate) async fn delete_user(docs: &Documents, user_id: &str) -> Result<()> {
    for collection in collections::USER_SCOPED.into_iter().rev() {
        docs.delete(&DocumentKey::new(collection, user_id)).await?;
    }
    Ok(())
}

fn user_key(user_id: &str) -> DocumentKey {
    DocumentKey::new(collections::USERS, user_id)
}

/// Joining, leaving and editing the people on an event.
#[derive(Clone)]
pub struct MembershipService {
    docs: Documents,
    notifier: Arc<dyn Notifier>,
    config: Arc<Config>,
    activity: ActivityTracker,
}

impl MembershipService {
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

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.docs.get(&user_key(user_id)).await
    }

    pub async fn attendees(&self, event_id: &str) -> Result<Attendees> {
        self.docs
            .get(&DocumentKey::new(collections::EVENT_ATTENDEES, event_id))
            .await
    }

    /// Create a user for `event_id` and add them to its attendees.
    ///
    /// The email must not already be used by the organiser or another
    /// attendee. If the attendee add fails the new user record is removed.
    pub async fn join_event(&self, event_id: &str, profile: NewUser) -> Result<User> {
        let header: EventRecord = self
            .docs
            .get(&DocumentKey::new(collections::EVENTS, event_id))
            .await?;

        // Early rejection only; the check that counts runs against the
        // attendee list the add is written over.
        let attendees = self.attendees(event_id).await?;
        self.ensure_email_free(&header, &attendees, &profile.email, None)
            .await?;

        self.activity.record(event_id).await?;

        let role = match Role::parse_or_attendee(profile.role.as_deref()) {
            // There is only one organiser per event.
            Role::Organiser => Role::Attendee,
            other => other,
        };
        let user = build_user(profile, role, Some(event_id.to_string()), Utc::now());
        insert_user(&self.docs, &user).await?;

        if let Err(e) = self.add_attendee(&header, &user).await {
            if let Err(cleanup) = delete_user(&self.docs, &user.id).await {
                tracing::error!(
                    event_id,
                    user_id = %user.id,
                    error = %cleanup,
                    "Failed to remove user after join failed"
                );
            }
            return Err(e);
        }

        tracing::info!(event_id, user_id = %user.id, role = ?user.role, "User joined event");

        fanout::send_one(
            self.notifier.as_ref(),
            event_id,
            &user,
            email::event_joined(&header.title, &self.config.event_url(event_id)),
        )
        .await;

        Ok(user)
    }

    /// Add `user` to the attendee list if no member uses their email.
    ///
    /// The email check and the add are tied to one attendee-list version,
    /// so two joins with the same email cannot both land: the second write
    /// conflicts, reloads and then sees the first joiner.
    async fn add_attendee(&self, header: &EventRecord, user: &User) -> Result<()> {
        let key = DocumentKey::new(collections::EVENT_ATTENDEES, header.id.clone());
        for attempt in 1..=self.docs.max_attempts() {
            let (mut attendees, version) = self
                .docs
                .load::<Attendees>(&key)
                .await?
                .ok_or_else(|| AppError::NotFound(key.to_string()))?;

            self.ensure_email_free(header, &attendees, &user.email, None)
                .await?;
            attendees.add(&user.id)?;

            match self.docs.swap(&key, version, &attendees).await? {
                CasOutcome::Swapped(_) => return Ok(()),
                CasOutcome::NotFound => return Err(AppError::NotFound(key.to_string())),
                CasOutcome::Conflict => self.docs.backoff(&key, attempt).await,
            }
        }

        Err(self.docs.exhausted(&key))
    }

    /// Remove an attendee from the event and delete their user record.
    pub async fn leave_event(&self, event_id: &str, user_id: &str) -> Result<()> {
        self.activity.record(event_id).await?;
        self.docs
            .mutate(
                &DocumentKey::new(collections::EVENT_ATTENDEES, event_id),
                |mut attendees: Attendees| {
                    attendees.remove(user_id)?;
                    Ok((attendees, ()))
                },
            )
            .await?;

        // Not referenced by the event any more, safe to delete.
        if let Err(e) = delete_user(&self.docs, user_id).await {
            tracing::error!(event_id, user_id, error = %e, "Orphaned user record after leave");
        }

        tracing::info!(event_id, user_id, "User left event");
        Ok(())
    }

    /// Organiser-initiated removal. Same effect as leaving.
    pub async fn kick_user(&self, event_id: &str, user_id: &str) -> Result<()> {
        tracing::info!(event_id, user_id, "Kicking user");
        self.leave_event(event_id, user_id).await
    }

    /// Promote an attendee to admin or demote back to attendee.
    pub async fn set_role(&self, event_id: &str, user_id: &str, role: Role) -> Result<User> {
        if role == Role::Organiser {
            return Err(AppError::BadRequest(
                "organiser role cannot be assigned".to_string(),
            ));
        }
        if !self.attendees(event_id).await?.contains(user_id) {
            return Err(MutationError::NotMember(user_id.to_string()).into());
        }
        self.activity.record(event_id).await?;

        let user = self
            .docs
            .mutate(&user_key(user_id), |mut user: User| {
                user.role = role;
                Ok((user.clone(), user))
            })
            .await?;

        tracing::info!(event_id, user_id, role = ?role, "User role changed");
        Ok(user)
    }

    /// Update a member's name, email and picture.
    pub async fn update_profile(
        &self,
        event_id: &str,
        user_id: &str,
        username: &str,
        email: &str,
        profile_pic: Option<String>,
    ) -> Result<User> {
        let header: EventRecord = self
            .docs
            .get(&DocumentKey::new(collections::EVENTS, event_id))
            .await?;
        let attendees = self.attendees(event_id).await?;
        if header.organiser_id != user_id && !attendees.contains(user_id) {
            return Err(MutationError::NotMember(user_id.to_string()).into());
        }

        self.ensure_email_free(&header, &attendees, email, Some(user_id))
            .await?;
        self.activity.record(event_id).await?;

        let user = self
            .docs
            .mutate(&user_key(user_id), |mut user: User| {
                user.username = username.trim().to_string();
                user.email = email.trim().to_string();
                user.profile_pic = profile_pic.clone();
                Ok((user.clone(), user))
            })
            .await?;

        Ok(user)
    }

    pub async fn set_is_coming(&self, user_id: &str, is_coming: Option<bool>) -> Result<User> {
        self.record_for_user(&self.get_user(user_id).await?).await?;
        self.docs
            .mutate(&user_key(user_id), |mut user: User| {
                user.is_coming = is_coming;
                Ok((user.clone(), user))
            })
            .await
    }

    /// Apply availability updates; `None` clears a date.
    pub async fn set_availability(
        &self,
        user_id: &str,
        updates: &[(String, Option<String>)],
    ) -> Result<Availability> {
        self.record_for_user(&self.get_user(user_id).await?).await?;
        let (availability, skipped) = self
            .docs
            .mutate(
                &DocumentKey::new(collections::USER_AVAILABILITY, user_id),
                |mut availability: Availability| {
                    let skipped = availability.apply(updates);
                    Ok((availability.clone(), (availability, skipped)))
                },
            )
            .await?;

        if skipped > 0 {
            tracing::debug!(user_id, skipped, "Skipped invalid availability statuses");
        }
        Ok(availability)
    }

    pub async fn clear_availability(&self, user_id: &str) -> Result<()> {
        self.record_for_user(&self.get_user(user_id).await?).await?;
        self.docs
            .mutate(
                &DocumentKey::new(collections::USER_AVAILABILITY, user_id),
                |_: Availability| Ok((Availability::default(), ())),
            )
            .await
    }

    pub async fn availability(&self, user_id: &str) -> Result<Availability> {
        self.docs
            .get(&DocumentKey::new(collections::USER_AVAILABILITY, user_id))
            .await
    }

    /// Record that the user opened `path`. Opening the event counts as
    /// activity on it.
    pub async fn record_last_opened(
        &self,
        user_id: &str,
        path: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<PathMarkers> {
        self.record_for_user(&self.get_user(user_id).await?).await?;
        self.docs
            .mutate(
                &DocumentKey::new(collections::USER_LAST_OPENED, user_id),
                |mut markers: PathMarkers| {
                    markers.upsert(path, timestamp);
                    Ok((markers.clone(), markers))
                },
            )
            .await
    }

    async fn record_for_user(&self, user: &User) -> Result<()> {
        match &user.event_id {
            Some(event_id) => self.activity.record(event_id).await,
            None => Ok(()),
        }
    }

    /// Fail with `DuplicateEmail` if the organiser or one of `attendees`
    /// uses `email`. Comparison ignores case.
    async fn ensure_email_free(
        &self,
        header: &EventRecord,
        attendees: &Attendees,
        email: &str,
        except_user: Option<&str>,
    ) -> Result<()> {
        let email = email.trim();
        let ids = fanout::recipient_ids(&header.organiser_id, attendees.ids());
        let members = fanout::load_users(&self.docs, &header.id, &ids).await?;

        let taken = members
            .iter()
            .filter(|m| Some(m.id.as_str()) != except_user)
            .any(|m| m.email.eq_ignore_ascii_case(email));
        if taken {
            return Err(MutationError::DuplicateEmail(email.to_string()).into());
        }
        Ok(())
    }
}
