// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use trip_planner::config::Config;
use trip_planner::db::{CasOutcome, DocumentKey, DocumentStore, FirestoreDb, MemoryStore, Version, Versioned};
use trip_planner::error::AppError;
use trip_planner::models::{EventRecord, Location, NewEvent, NewUser, User};
use trip_planner::routes::create_router;
use trip_planner::services::{DeliveryError, Notification, Notifier};
use trip_planner::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Notifier that keeps every message and fails for chosen addresses.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<HashSet<String>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn fail_for(&self, email: &str) {
        self.failing.lock().unwrap().insert(email.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Recipients of every delivered message whose subject contains
    /// `needle`.
    pub fn recipients_of(&self, needle: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|n| n.subject.contains(needle))
            .map(|n| n.to)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        if self.failing.lock().unwrap().contains(&notification.to) {
            return Err(DeliveryError::Rejected {
                status: 500,
                body: "mailbox unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

type Hook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// In-memory store that can fail deletes and run code just before a
/// compare-and-swap lands.
#[allow(dead_code)]
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    failing_deletes: Mutex<HashMap<&'static str, usize>>,
    before_swap: Mutex<Option<(&'static str, Hook)>>,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing_deletes: Mutex::new(HashMap::new()),
            before_swap: Mutex::new(None),
        }
    }

    /// Fail the next `times` deletes in `collection`.
    pub fn fail_deletes(&self, collection: &'static str, times: usize) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(collection, times);
    }

    /// Run `f` once, before the next compare-and-swap in `collection`
    /// reaches the store.
    pub fn before_swap<F, Fut>(&self, collection: &'static str, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: Hook = Box::new(move || Box::pin(f()));
        *self.before_swap.lock().unwrap() = Some((collection, hook));
    }

    fn take_hook(&self, collection: &str) -> Option<Hook> {
        let mut slot = self.before_swap.lock().unwrap();
        let armed = matches!(slot.as_ref(), Some((armed, _)) if *armed == collection);
        if armed {
            slot.take().map(|(_, hook)| hook)
        } else {
            None
        }
    }

    fn should_fail_delete(&self, collection: &str) -> bool {
        let mut failing = self.failing_deletes.lock().unwrap();
        match failing.get_mut(collection) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn load(&self, key: &DocumentKey) -> Result<Option<Versioned>, AppError> {
        self.inner.load(key).await
    }

    async fn list(&self, collection: &'static str) -> Result<Vec<(String, Versioned)>, AppError> {
        self.inner.list(collection).await
    }

    async fn insert(&self, key: &DocumentKey, payload: String) -> Result<Version, AppError> {
        self.inner.insert(key, payload).await
    }

    async fn compare_and_swap(
        &self,
        key: &DocumentKey,
        expected: Version,
        payload: String,
    ) -> Result<CasOutcome, AppError> {
        let hook = self.take_hook(key.collection);
        if let Some(hook) = hook {
            hook().await;
        }
        self.inner.compare_and_swap(key, expected, payload).await
    }

    async fn compare_and_delete(&self, key: &DocumentKey, expected: Version) -> Result<CasOutcome, AppError> {
        self.inner.compare_and_delete(key, expected).await
    }

    async fn delete(&self, key: &DocumentKey) -> Result<(), AppError> {
        if self.should_fail_delete(key.collection) {
            return Err(AppError::StoreUnavailable(format!(
                "injected failure deleting {}",
                key
            )));
        }
        self.inner.delete(key).await
    }
}

/// App state over an in-memory store and a recording notifier.
#[allow(dead_code)]
pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub faults: Arc<FaultyStore>,
    pub notifier: Arc<RecordingNotifier>,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let faults = Arc::new(FaultyStore::new(store.clone()));
        let notifier = Arc::new(RecordingNotifier::default());
        let state = Arc::new(AppState::new(
            Config::test_default(),
            faults.clone(),
            notifier.clone(),
        ));
        Self {
            state,
            store,
            faults,
            notifier,
        }
    }

    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }

    pub async fn organiser(&self, email: &str) -> User {
        self.state
            .events
            .register_organiser(profile(email))
            .await
            .expect("register organiser")
    }

    pub async fn event(&self, organiser: &User, title: &str) -> EventRecord {
        self.state
            .events
            .create_event(new_event(organiser, title))
            .await
            .expect("create event")
    }

    pub async fn join(&self, event_id: &str, email: &str) -> User {
        self.state
            .members
            .join_event(event_id, profile(email))
            .await
            .expect("join event")
    }
}

#[allow(dead_code)]
pub fn profile(email: &str) -> NewUser {
    let name = email.split('@').next().unwrap_or(email);
    NewUser {
        email: email.to_string(),
        username: format!("{} Tester", name),
        fingerprint: None,
        role: None,
        profile_pic: None,
    }
}

#[allow(dead_code)]
pub fn new_event(organiser: &User, title: &str) -> NewEvent {
    NewEvent {
        id: None,
        title: title.to_string(),
        description: "Weekend away".to_string(),
        location: Location {
            city: Some("Lisbon".to_string()),
            country: Some("Portugal".to_string()),
            ..Default::default()
        },
        earliest_date: Some("2026-07-01".to_string()),
        latest_date: Some("2026-07-31".to_string()),
        duration_days: Some(3),
        organiser_id: organiser.id.clone(),
    }
}
