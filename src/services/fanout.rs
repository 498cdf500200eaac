// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recipient resolution and one-message-to-many delivery.

use crate::db::{collections, DocumentKey, Documents};
use crate::error::Result;
use crate::models::User;
use crate::services::email::Message;
use crate::services::notifier::{Notification, Notifier};

/// Outcome of sending one message to a recipient list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutResult {
    pub sent: usize,
    pub failed: usize,
}

impl FanoutResult {
    pub fn all_delivered(&self) -> bool {
        self.failed == 0
    }
}

/// Organiser followed by attendees, without duplicates or the organiser
/// repeated.
pub fn recipient_ids(organiser_id: &str, attendees: &[String]) -> Vec<String> {
    let mut ids = vec![organiser_id.to_string()];
    for id in attendees {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }
    ids
}

/// Load user records for `ids` in order. Missing users are skipped.
///
/// Loads run one after another so recipients are collected before any
/// notification for the event goes out.
pub async fn load_users(docs: &Documents, event_id: &str, ids: &[String]) -> Result<Vec<User>> {
    let mut users = Vec::with_capacity(ids.len());
    for id in ids {
        match docs
            .load::<User>(&DocumentKey::new(collections::USERS, id.clone()))
            .await?
        {
            Some((user, _)) => users.push(user),
            None => tracing::warn!(event_id, user_id = %id, "Recipient has no user record, skipping"),
        }
    }
    Ok(users)
}

/// Send `message` to every user, continuing past failures.
pub async fn send_all(
    notifier: &dyn Notifier,
    event_id: &str,
    users: &[User],
    message: &Message,
) -> FanoutResult {
    let mut result = FanoutResult::default();
    for user in users {
        let notification = Notification::new(&user.email, user.first_name(), message.clone());
        match notifier.send(&notification).await {
            Ok(()) => result.sent += 1,
            Err(e) => {
                result.failed += 1;
                tracing::warn!(
                    event_id,
                    user_id = %user.id,
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
    }
    result
}

/// Best-effort delivery to one user. Failures are logged and reported.
pub async fn send_one(notifier: &dyn Notifier, event_id: &str, user: &User, message: Message) -> bool {
    send_all(notifier, event_id, std::slice::from_ref(user), &message)
        .await
        .all_delivered()
}
