// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed [`DocumentStore`].
//!
//! Each document is stored as `{ payload }` where `payload` is the JSON
//! text of the typed value. The version token is the document's Firestore
//! update time in nanoseconds, and conditional writes use an
//! `UpdateTime` precondition against it.

use crate::db::{CasOutcome, DocumentKey, DocumentStore, Version, Versioned};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::DateTime;
use firestore::{FirestoreTimestamp, FirestoreWritePrecondition};
use serde::{Deserialize, Serialize};

/// Stored document shape. Metadata fields are filled in by the client on
/// read and never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    id: Option<String>,
    payload: String,
    #[serde(alias = "_firestore_updated", default, skip_serializing)]
    updated: Option<FirestoreTimestamp>,
}

impl StoredDocument {
    fn new(payload: String) -> Self {
        Self {
            id: None,
            payload,
            updated: None,
        }
    }

    fn version(&self) -> Result<Version, AppError> {
        self.updated
            .as_ref()
            .and_then(|ts| ts.0.timestamp_nanos_opt())
            .map(Version)
            .ok_or_else(|| AppError::StoreUnavailable("document has no update time".to_string()))
    }
}

fn precondition_for(version: Version) -> FirestoreWritePrecondition {
    FirestoreWritePrecondition::UpdateTime(DateTime::from_timestamp_nanos(version.0))
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // Emulator gets an unauthenticated connection so local runs never
        // pick up real credentials.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All operations fail with `StoreUnavailable`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::StoreUnavailable("Database not connected (offline mode)".to_string())
        })
    }

    async fn read(&self, key: &DocumentKey) -> Result<Option<StoredDocument>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(key.collection)
            .obj()
            .one(&key.id)
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }

    /// Work out why a conditional write failed.
    ///
    /// Firestore reports a failed precondition as an error, so re-read the
    /// document: if it is gone or has moved on, the write lost a race.
    async fn classify_write_error(
        &self,
        key: &DocumentKey,
        expected: Version,
        err: firestore::errors::FirestoreError,
    ) -> Result<CasOutcome, AppError> {
        match self.read(key).await? {
            None => Ok(CasOutcome::NotFound),
            Some(doc) if doc.version()? != expected => Ok(CasOutcome::Conflict),
            Some(_) => Err(AppError::StoreUnavailable(err.to_string())),
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn load(&self, key: &DocumentKey) -> Result<Option<Versioned>, AppError> {
        match self.read(key).await? {
            Some(doc) => {
                let version = doc.version()?;
                Ok(Some(Versioned {
                    payload: doc.payload,
                    version,
                }))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, collection: &'static str) -> Result<Vec<(String, Versioned)>, AppError> {
        let docs: Vec<StoredDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        let mut listed = Vec::with_capacity(docs.len());
        for doc in docs {
            let Some(id) = doc.id.clone() else {
                tracing::warn!(collection, "Document without id in listing");
                continue;
            };
            let version = doc.version()?;
            listed.push((
                id,
                Versioned {
                    payload: doc.payload,
                    version,
                },
            ));
        }

        Ok(listed)
    }

    async fn insert(&self, key: &DocumentKey, payload: String) -> Result<Version, AppError> {
        let written: Result<StoredDocument, _> = self
            .get_client()?
            .fluent()
            .update()
            .in_col(key.collection)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&key.id)
            .object(&StoredDocument::new(payload))
            .execute()
            .await;

        match written {
            Ok(doc) => doc.version(),
            Err(e) => match self.read(key).await? {
                Some(_) => Err(AppError::Conflict(format!("{} already exists", key))),
                None => Err(AppError::StoreUnavailable(e.to_string())),
            },
        }
    }

    async fn compare_and_swap(
        &self,
        key: &DocumentKey,
        expected: Version,
        payload: String,
    ) -> Result<CasOutcome, AppError> {
        let written: Result<StoredDocument, _> = self
            .get_client()?
            .fluent()
            .update()
            .in_col(key.collection)
            .precondition(precondition_for(expected))
            .document_id(&key.id)
            .object(&StoredDocument::new(payload))
            .execute()
            .await;

        match written {
            Ok(doc) => Ok(CasOutcome::Swapped(doc.version()?)),
            Err(e) => self.classify_write_error(key, expected, e).await,
        }
    }

    async fn compare_and_delete(
        &self,
        key: &DocumentKey,
        expected: Version,
    ) -> Result<CasOutcome, AppError> {
        let deleted = self
            .get_client()?
            .fluent()
            .delete()
            .from(key.collection)
            .document_id(&key.id)
            .precondition(precondition_for(expected))
            .execute()
            .await;

        match deleted {
            Ok(()) => Ok(CasOutcome::Swapped(expected)),
            Err(e) => self.classify_write_error(key, expected, e).await,
        }
    }

    async fn delete(&self, key: &DocumentKey) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(key.collection)
            .document_id(&key.id)
            .execute()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }
}
