// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Trip-Planner: group trip planning backend
//!
//! This crate provides the event lifecycle, membership and collaboration
//! services for group trips, plus the scheduled reminder and inactivity
//! retention passes.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{DocumentStore, Documents};
use services::{
    ActivityTracker, CollectionService, EventService, MembershipService, Notifier,
    ReminderDispatcher, RetentionReaper, Scheduler,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Arc<Config>,
    pub docs: Documents,
    pub events: EventService,
    pub members: MembershipService,
    pub collections: CollectionService,
    pub reminders: ReminderDispatcher,
    pub retention: RetentionReaper,
}

impl AppState {
    /// Wire every service onto one store and one notifier.
    pub fn new(config: Config, store: Arc<dyn DocumentStore>, notifier: Arc<dyn Notifier>) -> Self {
        let config = Arc::new(config);
        let docs = Documents::new(store, config.cas_max_attempts);
        let activity = ActivityTracker::new(docs.clone(), notifier.clone());

        Self {
            events: EventService::new(
                docs.clone(),
                notifier.clone(),
                config.clone(),
                activity.clone(),
            ),
            members: MembershipService::new(
                docs.clone(),
                notifier.clone(),
                config.clone(),
                activity.clone(),
            ),
            collections: CollectionService::new(docs.clone(), activity),
            reminders: ReminderDispatcher::new(docs.clone(), notifier.clone(), config.clone()),
            retention: RetentionReaper::new(docs.clone(), notifier, config.clone()),
            docs,
            config,
        }
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.reminders.clone(),
            self.retention.clone(),
            self.config.scheduler_period,
        )
    }
}
