// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic background passes.
//!
//! Each tick runs the reminder dispatcher and then the retention reaper.
//! A slow pass delays the next tick instead of overlapping it.

use crate::services::reminders::{ReminderDispatcher, ReminderReport};
use crate::services::retention::{RetentionReaper, RetentionReport};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct Scheduler {
    reminders: ReminderDispatcher,
    retention: RetentionReaper,
    period: Duration,
}

impl Scheduler {
    pub fn new(reminders: ReminderDispatcher, retention: RetentionReaper, period: Duration) -> Self {
        Self {
            reminders,
            retention,
            period,
        }
    }

    /// Run both passes once at `now`. A failed pass is logged and reported
    /// as empty.
    pub async fn run_once(&self, now: DateTime<Utc>) -> (ReminderReport, RetentionReport) {
        let reminders = match self.reminders.run(now).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Reminder pass failed");
                ReminderReport::default()
            }
        };

        let retention = match self.retention.run(now).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Retention pass failed");
                RetentionReport::default()
            }
        };

        (reminders, retention)
    }

    /// Tick until `cancel` fires. The first pass runs immediately.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(period_secs = self.period.as_secs(), "Scheduler started");

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.run_once(Utc::now()).await;
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
