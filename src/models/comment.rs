// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Event comment thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub message: String,
    /// Id of the comment this replies to
    #[serde(default)]
    pub reply_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Comments(pub Vec<Comment>);

impl Comments {
    pub fn add(&mut self, comment: Comment) {
        self.0.push(comment);
    }

    /// Remove every comment whose id is in `ids`. Replies to a removed
    /// comment stay. Returns how many were removed.
    pub fn delete(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.0.len();
        self.0.retain(|c| !ids.contains(&c.id));
        before - self.0.len()
    }
}
