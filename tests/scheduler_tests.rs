// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reminder and retention passes driven with explicit clocks.

use chrono::{DateTime, Duration, Utc};
use trip_planner::db::{collections, DocumentKey};
use trip_planner::error::AppError;
use trip_planner::models::{EventRecord, RetentionState, User};
use std::sync::{Arc, Mutex};
use trip_planner::services::{ReminderReport, RetentionReport};
use tokio_util::sync::CancellationToken;

mod common;
use common::TestApp;

const UPCOMING: &str = "is coming up!";
const DAY_OF: &str = "is Today!";
const WARNING: &str = "is going to be Deleted!";

async fn confirmed_event(app: &TestApp, now: DateTime<Utc>) -> (User, EventRecord, User) {
    let organiser = app.organiser("org@example.com").await;
    let event = app.event(&organiser, "Lisbon").await;
    let guest = app.join(&event.id, "guest@example.com").await;
    let trip_day = (now + Duration::days(3)).date_naive().to_string();
    app.state
        .events
        .confirm(&event.id, vec![trip_day], Some(now))
        .await
        .unwrap();
    (organiser, event, guest)
}

fn trip_day_noon(now: DateTime<Utc>) -> DateTime<Utc> {
    (now + Duration::days(3))
        .date_naive()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
}

async fn retention_state(app: &TestApp, event_id: &str) -> RetentionState {
    app.state
        .docs
        .get(&DocumentKey::new(collections::EVENT_RETENTION, event_id))
        .await
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// REMINDERS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_reminders_send_once_per_trigger() {
    let app = TestApp::new();
    let now = Utc::now();
    confirmed_event(&app, now).await;

    let first = app.state.reminders.run(now).await.unwrap();
    assert_eq!(first.upcoming_sent, 1);
    assert_eq!(first.day_of_sent, 0);
    assert_eq!(
        app.notifier.recipients_of(UPCOMING),
        vec!["org@example.com", "guest@example.com"]
    );

    let again = app.state.reminders.run(now).await.unwrap();
    assert_eq!(again.upcoming_sent, 0);
    assert_eq!(again.skipped, 1);
    assert_eq!(app.notifier.recipients_of(UPCOMING).len(), 2);

    let trip_day = trip_day_noon(now);
    let day_of = app.state.reminders.run(trip_day).await.unwrap();
    assert_eq!(day_of.day_of_sent, 1);
    assert_eq!(day_of.upcoming_sent, 0);
    assert_eq!(app.notifier.recipients_of(DAY_OF).len(), 2);

    app.state.reminders.run(trip_day).await.unwrap();
    assert_eq!(app.notifier.recipients_of(DAY_OF).len(), 2);
}

#[tokio::test]
async fn test_failed_delivery_retries_whole_list() {
    let app = TestApp::new();
    let now = Utc::now();
    confirmed_event(&app, now).await;
    app.notifier.fail_for("guest@example.com");

    let failed = app.state.reminders.run(now).await.unwrap();
    assert_eq!(failed.upcoming_sent, 0);
    assert_eq!(failed.failed, 1);
    assert_eq!(app.notifier.recipients_of(UPCOMING), vec!["org@example.com"]);

    app.notifier.heal();
    let retried = app.state.reminders.run(now).await.unwrap();
    assert_eq!(retried.upcoming_sent, 1);
    assert_eq!(
        app.notifier.recipients_of(UPCOMING),
        vec!["org@example.com", "org@example.com", "guest@example.com"]
    );

    let done = app.state.reminders.run(now).await.unwrap();
    assert_eq!(done.upcoming_sent, 0);
}

#[tokio::test]
async fn test_reopen_and_reconfirm_rearms_reminder() {
    let app = TestApp::new();
    let now = Utc::now();
    let (_, event, _) = confirmed_event(&app, now).await;
    app.state.reminders.run(now).await.unwrap();

    app.state.events.reopen(&event.id).await.unwrap();
    let skipped = app.state.reminders.run(now).await.unwrap();
    assert_eq!(skipped, ReminderReport::default());

    app.state
        .events
        .confirm(&event.id, vec!["2030-01-01".to_string()], Some(now))
        .await
        .unwrap();
    let report = app.state.reminders.run(now).await.unwrap();
    assert_eq!(report.upcoming_sent, 1);
    assert_eq!(app.notifier.recipients_of(UPCOMING).len(), 4);
}

#[tokio::test]
async fn test_canceled_event_gets_no_reminders() {
    let app = TestApp::new();
    let now = Utc::now();
    let (_, event, _) = confirmed_event(&app, now).await;
    app.state.events.cancel(&event.id, None).await.unwrap();

    let report = app.state.reminders.run(now).await.unwrap();
    assert_eq!(report, ReminderReport::default());
    assert!(app.notifier.recipients_of(UPCOMING).is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// RETENTION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_inactive_event_is_warned_then_deleted() {
    let app = TestApp::new();
    let organiser = app.organiser("org@example.com").await;
    let event = app.event(&organiser, "Lisbon").await;
    let a = app.join(&event.id, "a@example.com").await;
    let b = app.join(&event.id, "b@example.com").await;

    let day_100 = Utc::now() + Duration::days(100);
    let report = app.state.retention.run(day_100).await.unwrap();
    assert_eq!(report.warned, 1);
    assert_eq!(app.notifier.recipients_of(WARNING), vec!["org@example.com"]);
    assert!(retention_state(&app, &event.id).await.deleted_warning_sent);

    let repeat = app.state.retention.run(day_100).await.unwrap();
    assert_eq!(repeat, RetentionReport::default());
    assert_eq!(app.notifier.recipients_of(WARNING).len(), 1);

    let report = app
        .state
        .retention
        .run(day_100 + Duration::days(8))
        .await
        .unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.orphaned_users, 0);
    assert_eq!(app.notifier.recipients_of("Event Deleted"), vec!["org@example.com"]);

    assert!(matches!(
        app.state.events.get_event(&event.id).await,
        Err(AppError::NotFound(_))
    ));
    for user_id in [&organiser.id, &a.id, &b.id] {
        assert!(app.state.members.get_user(user_id).await.is_err());
    }
    for collection in collections::EVENT_SCOPED {
        assert_eq!(app.store.count(collection), 0, "{}", collection);
    }
}

#[tokio::test]
async fn test_activity_after_warning_rescues_event() {
    let app = TestApp::new();
    let organiser = app.organiser("org@example.com").await;
    let event = app.event(&organiser, "Lisbon").await;

    let day_100 = Utc::now() + Duration::days(100);
    app.state.retention.run(day_100).await.unwrap();

    app.state
        .collections
        .add_link(&event.id, "https://example.com/villa", &organiser.id)
        .await
        .unwrap();

    assert_eq!(
        app.notifier.recipients_of("Event Will Not Be Deleted"),
        vec!["org@example.com"]
    );
    let state = retention_state(&app, &event.id).await;
    assert!(!state.deleted_warning_sent);
    assert!(state.warned_at.is_none());

    // Still idle from the reaper's point of view, so it warns again
    // instead of deleting.
    let report = app
        .state
        .retention
        .run(day_100 + Duration::days(8))
        .await
        .unwrap();
    assert_eq!(report.deleted, 0);
    assert_eq!(report.warned, 1);
    assert!(app.state.events.get_event(&event.id).await.is_ok());
}

#[tokio::test]
async fn test_warning_not_recorded_when_email_fails() {
    let app = TestApp::new();
    let organiser = app.organiser("org@example.com").await;
    let event = app.event(&organiser, "Lisbon").await;
    app.notifier.fail_for("org@example.com");

    let day_100 = Utc::now() + Duration::days(100);
    let report = app.state.retention.run(day_100).await.unwrap();
    assert_eq!(report.failed, 1);
    assert!(!retention_state(&app, &event.id).await.deleted_warning_sent);

    app.notifier.heal();
    let report = app.state.retention.run(day_100).await.unwrap();
    assert_eq!(report.warned, 1);
}

#[tokio::test]
async fn test_failed_deletion_is_retried_next_pass() {
    let app = TestApp::new();
    let organiser = app.organiser("org@example.com").await;
    let event = app.event(&organiser, "Lisbon").await;
    let guest = app.join(&event.id, "guest@example.com").await;

    let day_100 = Utc::now() + Duration::days(100);
    app.state.retention.run(day_100).await.unwrap();

    app.faults.fail_deletes(collections::EVENTS, 1);
    let day_108 = day_100 + Duration::days(8);
    let report = app.state.retention.run(day_108).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.deleted, 0);
    assert!(app.notifier.recipients_of("Event Deleted").is_empty());
    assert!(app.state.events.get_event(&event.id).await.is_ok());
    assert!(retention_state(&app, &event.id).await.deleted_warning_sent);

    let report = app.state.retention.run(day_108).await.unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(app.notifier.recipients_of("Event Deleted"), vec!["org@example.com"]);
    assert!(matches!(
        app.state.events.get_event(&event.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(app.state.members.get_user(&guest.id).await.is_err());
}

#[tokio::test]
async fn test_reaper_reports_orphaned_users() {
    let app = TestApp::new();
    let organiser = app.organiser("org@example.com").await;
    let event = app.event(&organiser, "Lisbon").await;
    app.join(&event.id, "guest@example.com").await;

    let day_100 = Utc::now() + Duration::days(100);
    app.state.retention.run(day_100).await.unwrap();

    app.faults.fail_deletes(collections::USERS, 1);
    let report = app
        .state
        .retention
        .run(day_100 + Duration::days(8))
        .await
        .unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.orphaned_users, 1);
    assert_eq!(app.store.count(collections::EVENTS), 0);
    assert_eq!(app.store.count(collections::USERS), 1);
}

#[tokio::test]
async fn test_activity_racing_reaper_keeps_event() {
    let app = TestApp::new();
    let organiser = app.organiser("org@example.com").await;
    let event = app.event(&organiser, "Lisbon").await;

    let day_100 = Utc::now() + Duration::days(100);
    app.state.retention.run(day_100).await.unwrap();

    // The reaper runs after the link write has loaded its document but
    // before that write lands.
    let reaped = Arc::new(Mutex::new(None));
    let state = app.state.clone();
    let seen = reaped.clone();
    app.faults.before_swap(collections::EVENT_LINKS, move || async move {
        let report = state.retention.run(day_100 + Duration::days(8)).await.unwrap();
        *seen.lock().unwrap() = Some(report);
    });

    app.state
        .collections
        .add_link(&event.id, "https://example.com/villa", &organiser.id)
        .await
        .unwrap();

    let report = reaped.lock().unwrap().take().expect("reaper should have run");
    assert_eq!(report.deleted, 0);
    assert!(app.state.events.get_event(&event.id).await.is_ok());
    let links = app.state.collections.links(&event.id).await.unwrap();
    assert_eq!(links.0.len(), 1);
}

#[tokio::test]
async fn test_recent_event_is_left_alone() {
    let app = TestApp::new();
    let organiser = app.organiser("org@example.com").await;
    app.event(&organiser, "Lisbon").await;

    let report = app
        .state
        .retention
        .run(Utc::now() + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(report, RetentionReport::default());
}

// ═══════════════════════════════════════════════════════════════════════════
// SCHEDULER
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_run_once_runs_both_passes() {
    let app = TestApp::new();
    let now = Utc::now();
    confirmed_event(&app, now).await;

    let (reminders, retention) = app.state.scheduler().run_once(now).await;
    assert_eq!(reminders.upcoming_sent, 1);
    assert_eq!(retention, RetentionReport::default());
}

#[tokio::test]
async fn test_scheduler_stops_on_cancel() {
    let app = TestApp::new();
    let cancel = CancellationToken::new();

    let handle = app.state.scheduler().spawn(cancel.clone());
    cancel.cancel();

    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop")
        .unwrap();
}
