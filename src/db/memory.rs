// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local [`DocumentStore`] for development and tests.

use crate::db::{CasOutcome, DocumentKey, DocumentStore, Version, Versioned};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory store. Versions come from a single counter, so a token is
/// never reused even after a document is deleted and recreated.
#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<(&'static str, String), Versioned>,
    next_version: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> Version {
        Version(self.next_version.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn slot(key: &DocumentKey) -> (&'static str, String) {
        (key.collection, key.id.clone())
    }

    /// Number of documents currently stored in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.docs.iter().filter(|e| e.key().0 == collection).count()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, key: &DocumentKey) -> Result<Option<Versioned>> {
        Ok(self.docs.get(&Self::slot(key)).map(|doc| doc.clone()))
    }

    async fn list(&self, collection: &'static str) -> Result<Vec<(String, Versioned)>> {
        let mut listed: Vec<(String, Versioned)> = self
            .docs
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect();
        listed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(listed)
    }

    async fn insert(&self, key: &DocumentKey, payload: String) -> Result<Version> {
        match self.docs.entry(Self::slot(key)) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!("{} already exists", key))),
            Entry::Vacant(slot) => {
                let version = self.bump();
                slot.insert(Versioned { payload, version });
                Ok(version)
            }
        }
    }

    async fn compare_and_swap(
        &self,
        key: &DocumentKey,
        expected: Version,
        payload: String,
    ) -> Result<CasOutcome> {
        // The entry guard holds the shard lock across check and write.
        match self.docs.entry(Self::slot(key)) {
            Entry::Vacant(_) => Ok(CasOutcome::NotFound),
            Entry::Occupied(mut slot) => {
                if slot.get().version != expected {
                    return Ok(CasOutcome::Conflict);
                }
                let version = self.bump();
                slot.insert(Versioned { payload, version });
                Ok(CasOutcome::Swapped(version))
            }
        }
    }

    async fn compare_and_delete(&self, key: &DocumentKey, expected: Version) -> Result<CasOutcome> {
        match self.docs.entry(Self::slot(key)) {
            Entry::Vacant(_) => Ok(CasOutcome::NotFound),
            Entry::Occupied(slot) => {
                if slot.get().version != expected {
                    return Ok(CasOutcome::Conflict);
                }
                slot.remove();
                Ok(CasOutcome::Swapped(expected))
            }
        }
    }

    async fn delete(&self, key: &DocumentKey) -> Result<()> {
        self.docs.remove(&Self::slot(key));
        Ok(())
    }
}
