// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod collections;
pub mod email;
pub mod events;
pub mod fanout;
pub mod notifier;
pub mod reminders;
pub mod retention;
pub mod scheduler;
pub mod users;

pub use activity::ActivityTracker;
pub use collections::CollectionService;
pub use events::{EventService, PurgeReport};
pub use notifier::{DeliveryError, LogNotifier, Notification, Notifier, SendGridNotifier};
pub use reminders::{ReminderDispatcher, ReminderReport};
pub use retention::{RetentionReaper, RetentionReport};
pub use scheduler::Scheduler;
pub use users::MembershipService;
