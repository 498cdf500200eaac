// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Every mutable piece of an event or user lives in its own document, and
//! every write to a document goes through compare-and-swap against the
//! version token returned by the last load.

pub mod documents;
pub mod firestore;
pub mod memory;

pub use documents::Documents;
pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Event header (title, organiser, ...); its presence defines the event.
    pub const EVENTS: &str = "events";
    pub const EVENT_LIFECYCLE: &str = "event_lifecycle";
    pub const EVENT_RETENTION: &str = "event_retention";
    pub const EVENT_ATTENDEES: &str = "event_attendees";
    pub const EVENT_REQUESTS: &str = "event_requests";
    pub const EVENT_POLLS: &str = "event_polls";
    pub const EVENT_COMMENTS: &str = "event_comments";
    pub const EVENT_LINKS: &str = "event_links";
    pub const EVENT_TODO: &str = "event_todo";
    pub const EVENT_LAST_UPDATED: &str = "event_last_updated";

    pub const USERS: &str = "users";
    pub const USER_AVAILABILITY: &str = "user_availability";
    pub const USER_LAST_OPENED: &str = "user_last_opened";

    /// Every per-event collection, header first.
    pub const EVENT_SCOPED: [&str; 10] = [
        EVENTS,
        EVENT_LIFECYCLE,
        EVENT_RETENTION,
        EVENT_ATTENDEES,
        EVENT_REQUESTS,
        EVENT_POLLS,
        EVENT_COMMENTS,
        EVENT_LINKS,
        EVENT_TODO,
        EVENT_LAST_UPDATED,
    ];

    /// Every per-user collection, profile first.
    pub const USER_SCOPED: [&str; 3] = [USERS, USER_AVAILABILITY, USER_LAST_OPENED];
}

/// Address of one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub collection: &'static str,
    pub id: String,
}

impl DocumentKey {
    pub fn new(collection: &'static str, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Opaque version token. Two writes expecting the same token cannot both
/// succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version(pub i64);

/// A document payload (JSON text) together with its version token.
#[derive(Debug, Clone)]
pub struct Versioned {
    pub payload: String,
    pub version: Version,
}

/// Result of a compare-and-swap write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Swapped(Version),
    Conflict,
    NotFound,
}

/// Storage backend for versioned JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document, `None` if absent.
    async fn load(&self, key: &DocumentKey) -> Result<Option<Versioned>>;

    /// Load every document of a collection as `(id, document)` pairs.
    async fn list(&self, collection: &'static str) -> Result<Vec<(String, Versioned)>>;

    /// Create a document. Fails with `Conflict` if it already exists.
    async fn insert(&self, key: &DocumentKey, payload: String) -> Result<Version>;

    /// Replace a document only if its version still equals `expected`.
    async fn compare_and_swap(
        &self,
        key: &DocumentKey,
        expected: Version,
        payload: String,
    ) -> Result<CasOutcome>;

    /// Delete a document only if its version still equals `expected`.
    async fn compare_and_delete(&self, key: &DocumentKey, expected: Version)
        -> Result<CasOutcome>;

    /// Delete a document unconditionally. Deleting an absent document is not
    /// an error.
    async fn delete(&self, key: &DocumentKey) -> Result<()>;
}
