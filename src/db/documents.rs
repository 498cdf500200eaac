// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed access to the document store.
//!
//! `mutate` is the only write path for existing documents: it reloads the
//! document, applies a pure mutator and compare-and-swaps the result,
//! retrying a bounded number of times when another writer got there first.

use crate::db::{CasOutcome, DocumentKey, DocumentStore, Version};
use crate::error::{AppError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

const RETRY_BACKOFF_MS: u64 = 5;

/// Typed wrapper over a [`DocumentStore`].
#[derive(Clone)]
pub struct Documents {
    store: Arc<dyn DocumentStore>,
    max_attempts: u32,
}

impl Documents {
    pub fn new(store: Arc<dyn DocumentStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Load and decode a document with its version token.
    pub async fn load<T: DeserializeOwned>(&self, key: &DocumentKey) -> Result<Option<(T, Version)>> {
        match self.store.load(key).await? {
            Some(doc) => Ok(Some((decode(key, &doc.payload)?, doc.version))),
            None => Ok(None),
        }
    }

    /// Load a document that must exist.
    pub async fn get<T: DeserializeOwned>(&self, key: &DocumentKey) -> Result<T> {
        self.load(key)
            .await?
            .map(|(value, _)| value)
            .ok_or_else(|| AppError::NotFound(key.to_string()))
    }

    /// Load every decodable document of a collection.
    ///
    /// Documents that fail to decode are logged and skipped so that one
    /// corrupt record cannot stall a scan.
    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: &'static str,
    ) -> Result<Vec<(String, T, Version)>> {
        let docs = self.store.list(collection).await?;
        let mut decoded = Vec::with_capacity(docs.len());

        for (id, doc) in docs {
            let key = DocumentKey::new(collection, id.clone());
            match decode(&key, &doc.payload) {
                Ok(value) => decoded.push((id, value, doc.version)),
                Err(e) => tracing::warn!(document = %key, error = %e, "Skipping undecodable document"),
            }
        }

        Ok(decoded)
    }

    pub async fn insert<T: Serialize>(&self, key: &DocumentKey, value: &T) -> Result<Version> {
        self.store.insert(key, encode(key, value)?).await
    }

    /// Read-modify-write a document under compare-and-swap.
    ///
    /// The mutator receives the current value and returns the next value
    /// plus a result for the caller. If the next value equals the current
    /// one nothing is written. Mutator errors abort without retrying.
    pub async fn mutate<T, R, F>(&self, key: &DocumentKey, mut mutator: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + PartialEq + Clone + Send,
        R: Send,
        F: FnMut(T) -> Result<(T, R)> + Send,
    {
        for attempt in 1..=self.max_attempts {
            let (current, version) = self
                .load::<T>(key)
                .await?
                .ok_or_else(|| AppError::NotFound(key.to_string()))?;

            let (next, result) = mutator(current.clone())?;
            if next == current {
                return Ok(result);
            }

            match self.swap(key, version, &next).await? {
                CasOutcome::Swapped(_) => return Ok(result),
                CasOutcome::NotFound => return Err(AppError::NotFound(key.to_string())),
                CasOutcome::Conflict => self.backoff(key, attempt).await,
            }
        }

        Err(self.exhausted(key))
    }

    /// Write `value` only if the document is still at `expected`.
    ///
    /// For callers that must check other documents between load and write
    /// and so cannot use [`Documents::mutate`].
    pub async fn swap<T: Serialize>(
        &self,
        key: &DocumentKey,
        expected: Version,
        value: &T,
    ) -> Result<CasOutcome> {
        self.store
            .compare_and_swap(key, expected, encode(key, value)?)
            .await
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep before retry `attempt` after a CAS conflict.
    pub async fn backoff(&self, key: &DocumentKey, attempt: u32) {
        tracing::debug!(document = %key, attempt, "CAS conflict, retrying");
        tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64)).await;
    }

    /// Error for a document that kept changing under every attempt.
    pub fn exhausted(&self, key: &DocumentKey) -> AppError {
        tracing::warn!(
            document = %key,
            attempts = self.max_attempts,
            "CAS retries exhausted"
        );
        AppError::Conflict(format!(
            "{} changed concurrently {} times",
            key, self.max_attempts
        ))
    }

    /// Delete a document only if it is still at `expected`.
    pub async fn compare_and_delete(&self, key: &DocumentKey, expected: Version) -> Result<CasOutcome> {
        self.store.compare_and_delete(key, expected).await
    }

    pub async fn delete(&self, key: &DocumentKey) -> Result<()> {
        self.store.delete(key).await
    }
}

fn encode<T: Serialize>(key: &DocumentKey, value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode {}: {}", key, e)))
}

fn decode<T: DeserializeOwned>(key: &DocumentKey, payload: &str) -> Result<T> {
    serde_json::from_str(payload)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt document {}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn docs() -> Documents {
        Documents::new(Arc::new(MemoryStore::new()), 3)
    }

    #[tokio::test]
    async fn mutate_applies_and_returns_result() {
        let docs = docs();
        let key = DocumentKey::new("counters", "a");
        docs.insert(&key, &1u32).await.unwrap();

        let seen = docs
            .mutate(&key, |n: u32| Ok((n + 1, n)))
            .await
            .unwrap();

        assert_eq!(seen, 1);
        assert_eq!(docs.get::<u32>(&key).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn mutate_missing_document_is_not_found() {
        let docs = docs();
        let key = DocumentKey::new("counters", "missing");

        let err = docs
            .mutate(&key, |n: u32| Ok((n + 1, ())))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn mutate_unchanged_value_skips_write() {
        let docs = docs();
        let key = DocumentKey::new("counters", "b");
        let version = docs.insert(&key, &7u32).await.unwrap();

        docs.mutate(&key, |n: u32| Ok((n, ()))).await.unwrap();

        let (_, after) = docs.load::<u32>(&key).await.unwrap().unwrap();
        assert_eq!(after, version);
    }

    #[tokio::test]
    async fn mutator_error_is_not_retried() {
        let docs = docs();
        let key = DocumentKey::new("counters", "c");
        docs.insert(&key, &0u32).await.unwrap();

        let mut calls = 0;
        let err = docs
            .mutate(&key, |_: u32| {
                calls += 1;
                Err::<(u32, ()), _>(AppError::InvalidState("nope".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn list_skips_corrupt_documents() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(&DocumentKey::new("counters", "good"), "5".to_string())
            .await
            .unwrap();
        store
            .insert(&DocumentKey::new("counters", "bad"), "not json".to_string())
            .await
            .unwrap();
        let docs = Documents::new(store, 3);

        let listed = docs.list::<u32>("counters").await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "good");
        assert_eq!(listed[0].1, 5);
    }
}
