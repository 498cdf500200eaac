// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Compare-and-swap wrappers around the event collection mutators.
//!
//! Each operation reloads the collection document, applies the pure
//! mutator from `models` and writes back under the loaded version. Every
//! attempted change counts as activity on the event.

use crate::db::{collections, DocumentKey, Documents};
use crate::error::{AppError, Result};
use crate::models::{
    Comment, Comments, Links, NewPoll, PathMarkers, Poll, Polls, RequestStatus, Requests, Task,
    TodoList,
};
use crate::services::activity::ActivityTracker;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashSet;

#[derive(Clone)]
pub struct CollectionService {
    docs: Documents,
    activity: ActivityTracker,
}

impl CollectionService {
    pub fn new(docs: Documents, activity: ActivityTracker) -> Self {
        Self { docs, activity }
    }

    /// Record activity, then mutate one collection document of an event.
    async fn update<T, R, F>(&self, collection: &'static str, event_id: &str, mutator: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + PartialEq + Clone + Send,
        R: Send,
        F: FnMut(T) -> Result<(T, R)> + Send,
    {
        self.activity.record(event_id).await?;
        self.docs
            .mutate(&DocumentKey::new(collection, event_id), mutator)
            .await
    }

    async fn read<T: DeserializeOwned>(&self, collection: &'static str, event_id: &str) -> Result<T> {
        self.docs.get(&DocumentKey::new(collection, event_id)).await
    }

    // ─── Join requests ───────────────────────────────────────────

    pub async fn requests(&self, event_id: &str) -> Result<Requests> {
        self.read(collections::EVENT_REQUESTS, event_id).await
    }

    pub async fn request_access(
        &self,
        event_id: &str,
        email: &str,
        username: &str,
        profile_pic: Option<String>,
    ) -> Result<()> {
        let now = Utc::now();
        self.update(collections::EVENT_REQUESTS, event_id, |mut requests: Requests| {
            requests.append(email, username, profile_pic.clone(), now);
            Ok((requests, ()))
        })
        .await?;
        tracing::info!(event_id, "Join request added");
        Ok(())
    }

    pub async fn set_request_status(
        &self,
        event_id: &str,
        email: &str,
        status: RequestStatus,
    ) -> Result<()> {
        self.update(collections::EVENT_REQUESTS, event_id, |mut requests: Requests| {
            requests.set_status(email, status)?;
            Ok((requests, ()))
        })
        .await
    }

    // ─── Polls ───────────────────────────────────────────────────

    pub async fn polls(&self, event_id: &str) -> Result<Polls> {
        self.read(collections::EVENT_POLLS, event_id).await
    }

    /// Create a poll and return its id.
    pub async fn create_poll(&self, event_id: &str, poll: NewPoll) -> Result<String> {
        let poll_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        self.update(collections::EVENT_POLLS, event_id, |mut polls: Polls| {
            polls.create(&poll_id, poll.clone(), now)?;
            Ok((polls, ()))
        })
        .await?;
        tracing::debug!(event_id, poll_id = %poll_id, "Poll created");
        Ok(poll_id)
    }

    /// Toggle a vote. Returns the poll after the change and whether the
    /// user now holds a vote.
    pub async fn cast_vote(
        &self,
        event_id: &str,
        poll_id: &str,
        option: &str,
        user_id: &str,
    ) -> Result<(Poll, bool)> {
        self.update(collections::EVENT_POLLS, event_id, |mut polls: Polls| {
            let voted = polls.vote(poll_id, option, user_id)?;
            let poll = polls.get(poll_id).cloned();
            Ok((polls, (poll, voted)))
        })
        .await
        .and_then(|(poll, voted)| {
            poll.map(|p| (p, voted))
                .ok_or_else(|| AppError::NotFound(poll_id.to_string()))
        })
    }

    pub async fn remove_vote(
        &self,
        event_id: &str,
        poll_id: &str,
        option: &str,
        user_id: &str,
    ) -> Result<()> {
        self.update(collections::EVENT_POLLS, event_id, |mut polls: Polls| {
            polls.remove_vote(poll_id, option, user_id)?;
            Ok((polls, ()))
        })
        .await
    }

    pub async fn delete_poll(&self, event_id: &str, poll_id: &str, user_id: &str) -> Result<()> {
        self.update(collections::EVENT_POLLS, event_id, |mut polls: Polls| {
            polls.delete(poll_id, user_id)?;
            Ok((polls, ()))
        })
        .await
    }

    // ─── Comments ────────────────────────────────────────────────

    pub async fn comments(&self, event_id: &str) -> Result<Comments> {
        self.read(collections::EVENT_COMMENTS, event_id).await
    }

    pub async fn add_comment(
        &self,
        event_id: &str,
        user_id: &str,
        message: &str,
        reply_to: Option<String>,
    ) -> Result<Comment> {
        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            message: message.to_string(),
            reply_to,
            created_at: Utc::now(),
        };
        self.update(collections::EVENT_COMMENTS, event_id, |mut comments: Comments| {
            comments.add(comment.clone());
            Ok((comments, ()))
        })
        .await?;
        Ok(comment)
    }

    /// Delete comments by id. Returns how many were removed.
    pub async fn delete_comments(&self, event_id: &str, ids: &HashSet<String>) -> Result<usize> {
        self.update(collections::EVENT_COMMENTS, event_id, |mut comments: Comments| {
            let removed = comments.delete(ids);
            Ok((comments, removed))
        })
        .await
    }

    // ─── Links ───────────────────────────────────────────────────

    pub async fn links(&self, event_id: &str) -> Result<Links> {
        self.read(collections::EVENT_LINKS, event_id).await
    }

    pub async fn add_link(&self, event_id: &str, url: &str, added_by: &str) -> Result<()> {
        let now = Utc::now();
        self.update(collections::EVENT_LINKS, event_id, |mut links: Links| {
            links.add(url, added_by, now);
            Ok((links, ()))
        })
        .await
    }

    pub async fn delete_link(&self, event_id: &str, url: &str) -> Result<()> {
        self.update(collections::EVENT_LINKS, event_id, |mut links: Links| {
            links.delete(url)?;
            Ok((links, ()))
        })
        .await
    }

    // ─── To-do ───────────────────────────────────────────────────

    pub async fn todo(&self, event_id: &str) -> Result<TodoList> {
        self.read(collections::EVENT_TODO, event_id).await
    }

    pub async fn add_task(&self, event_id: &str, creator_id: &str, text: &str) -> Result<Task> {
        let task = Task {
            task_id: uuid::Uuid::new_v4().to_string(),
            creator_id: creator_id.to_string(),
            task: text.to_string(),
            created_at: Utc::now().date_naive(),
        };
        self.update(collections::EVENT_TODO, event_id, |mut list: TodoList| {
            list.add(task.clone());
            Ok((list, ()))
        })
        .await?;
        Ok(task)
    }

    pub async fn move_to_done(&self, event_id: &str, task_id: &str) -> Result<Task> {
        self.update(collections::EVENT_TODO, event_id, |mut list: TodoList| {
            let task = list.move_to_done(task_id)?;
            Ok((list, task))
        })
        .await
    }

    pub async fn move_to_do(&self, event_id: &str, task_id: &str) -> Result<Task> {
        self.update(collections::EVENT_TODO, event_id, |mut list: TodoList| {
            let task = list.move_to_do(task_id)?;
            Ok((list, task))
        })
        .await
    }

    pub async fn delete_task(&self, event_id: &str, task_id: &str) -> Result<()> {
        self.update(collections::EVENT_TODO, event_id, |mut list: TodoList| {
            list.delete(task_id)?;
            Ok((list, ()))
        })
        .await
    }

    // ─── Last-updated markers ────────────────────────────────────

    pub async fn last_updated(&self, event_id: &str) -> Result<PathMarkers> {
        self.read(collections::EVENT_LAST_UPDATED, event_id).await
    }

    pub async fn mark_updated(
        &self,
        event_id: &str,
        path: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.update(collections::EVENT_LAST_UPDATED, event_id, |mut markers: PathMarkers| {
            markers.upsert(path, timestamp);
            Ok((markers, ()))
        })
        .await
    }
}
