// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reminder dispatcher.
//!
//! Once per scheduling period, every confirmed event with a reminder time
//! is checked against two independent triggers:
//! - "upcoming": today is the reminder date and `reminder_sent` is unset
//! - "day-of": today is the earliest chosen date and `daily_reminder_sent`
//!   is unset
//!
//! A flag is only set after every recipient got the email. Any delivery
//! failure leaves it unset, so the next pass retries the whole list.

use crate::config::Config;
use crate::db::{collections, DocumentKey, Documents};
use crate::error::{AppError, Result};
use crate::models::{Attendees, EventRecord, EventStatus, Lifecycle, User};
use crate::services::email::{self, Message};
use crate::services::fanout;
use crate::services::notifier::Notifier;
use crate::time_utils::earliest_date;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;

/// Events processed at once within a pass.
const MAX_CONCURRENT_EVENTS: usize = 16;

/// Summary of one dispatcher pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub upcoming_sent: usize,
    pub day_of_sent: usize,
    /// Triggers that were due but not completed (delivery or store errors)
    pub failed: usize,
    /// Events with nothing due
    pub skipped: usize,
}

impl ReminderReport {
    fn merge(mut self, other: ReminderReport) -> Self {
        self.upcoming_sent += other.upcoming_sent;
        self.day_of_sent += other.day_of_sent;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Upcoming,
    DayOf,
}

impl Trigger {
    fn is_sent(self, lifecycle: &Lifecycle) -> bool {
        match self {
            Trigger::Upcoming => lifecycle.reminder_sent,
            Trigger::DayOf => lifecycle.daily_reminder_sent,
        }
    }

    fn mark_sent(self, lifecycle: &mut Lifecycle) {
        match self {
            Trigger::Upcoming => lifecycle.reminder_sent = true,
            Trigger::DayOf => lifecycle.daily_reminder_sent = true,
        }
    }
}

#[derive(Clone)]
pub struct ReminderDispatcher {
    docs: Documents,
    notifier: Arc<dyn Notifier>,
    config: Arc<Config>,
}

impl ReminderDispatcher {
    pub fn new(docs: Documents, notifier: Arc<dyn Notifier>, config: Arc<Config>) -> Self {
        Self {
            docs,
            notifier,
            config,
        }
    }

    /// Run one pass at `now`.
    ///
    /// Only the initial scan can fail the pass; per-event errors are
    /// logged and counted.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ReminderReport> {
        let today = now.date_naive();
        let candidates: Vec<(String, Lifecycle)> = self
            .docs
            .list::<Lifecycle>(collections::EVENT_LIFECYCLE)
            .await?
            .into_iter()
            .filter(|(_, lifecycle, _)| {
                lifecycle.status == EventStatus::Confirmed && lifecycle.reminder_time.is_some()
            })
            .map(|(id, lifecycle, _)| (id, lifecycle))
            .collect();

        tracing::debug!(count = candidates.len(), %today, "Reminder pass started");

        let report = stream::iter(candidates)
            .map(|(event_id, lifecycle)| async move {
                match self.process_event(&event_id, &lifecycle, today).await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(event_id = %event_id, error = %e, "Reminder processing failed");
                        ReminderReport {
                            failed: 1,
                            ..Default::default()
                        }
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_EVENTS)
            .fold(ReminderReport::default(), |acc, r| async move { acc.merge(r) })
            .await;

        tracing::info!(
            upcoming_sent = report.upcoming_sent,
            day_of_sent = report.day_of_sent,
            failed = report.failed,
            skipped = report.skipped,
            "Reminder pass complete"
        );
        Ok(report)
    }

    async fn process_event(
        &self,
        event_id: &str,
        lifecycle: &Lifecycle,
        today: NaiveDate,
    ) -> Result<ReminderReport> {
        let mut report = ReminderReport::default();

        let upcoming_due =
            lifecycle.reminder_date() == Some(today) && !Trigger::Upcoming.is_sent(lifecycle);

        let chosen = lifecycle.chosen_dates.as_deref().unwrap_or_default();
        let (earliest, unparseable) = earliest_date(chosen);
        if !unparseable.is_empty() {
            tracing::warn!(event_id, dates = ?unparseable, "Ignoring unparseable chosen dates");
        }
        if earliest.is_none() {
            tracing::debug!(event_id, "No usable chosen date, skipping day-of reminder");
        }
        let day_of_due = earliest == Some(today) && !Trigger::DayOf.is_sent(lifecycle);

        if !upcoming_due && !day_of_due {
            report.skipped = 1;
            return Ok(report);
        }

        let header: EventRecord = match self
            .docs
            .load(&DocumentKey::new(collections::EVENTS, event_id))
            .await?
        {
            Some((header, _)) => header,
            None => {
                tracing::debug!(event_id, "Event header gone, skipping reminders");
                report.skipped = 1;
                return Ok(report);
            }
        };

        let attendees: Attendees = self
            .docs
            .load(&DocumentKey::new(collections::EVENT_ATTENDEES, event_id))
            .await?
            .map(|(a, _)| a)
            .unwrap_or_default();
        let ids = fanout::recipient_ids(&header.organiser_id, attendees.ids());
        let recipients = fanout::load_users(&self.docs, event_id, &ids).await?;
        if recipients.is_empty() {
            tracing::warn!(event_id, "No recipients for reminder, skipping");
            report.skipped = 1;
            return Ok(report);
        }

        let url = self.config.event_url(event_id);
        let location = header.location.describe();

        if upcoming_due {
            let date = earliest
                .map(|d| d.to_string())
                .unwrap_or_else(|| "the chosen date".to_string());
            let message = email::upcoming_reminder(&header.title, &date, &location, &url);
            if self
                .deliver_and_mark(event_id, Trigger::Upcoming, &recipients, &message, today)
                .await?
            {
                report.upcoming_sent += 1;
            } else {
                report.failed += 1;
            }
        }

        if day_of_due {
            let message = email::day_of_reminder(&header.title, &location, &url);
            if self
                .deliver_and_mark(event_id, Trigger::DayOf, &recipients, &message, today)
                .await?
            {
                report.day_of_sent += 1;
            } else {
                report.failed += 1;
            }
        }

        Ok(report)
    }

    /// Send to every recipient, then set the trigger's flag if all went out.
    async fn deliver_and_mark(
        &self,
        event_id: &str,
        trigger: Trigger,
        recipients: &[User],
        message: &Message,
        today: NaiveDate,
    ) -> Result<bool> {
        let result = fanout::send_all(self.notifier.as_ref(), event_id, recipients, message).await;
        if !result.all_delivered() {
            tracing::warn!(
                event_id,
                trigger = ?trigger,
                sent = result.sent,
                failed = result.failed,
                "Reminder delivery incomplete, will retry next pass"
            );
            return Ok(false);
        }

        let key = DocumentKey::new(collections::EVENT_LIFECYCLE, event_id);
        let marked = self
            .docs
            .mutate(&key, |mut lifecycle: Lifecycle| {
                // A reopen or date change since the scan means this
                // reminder no longer belongs to the current cycle.
                let still_due = lifecycle.status == EventStatus::Confirmed
                    && match trigger {
                        Trigger::Upcoming => lifecycle.reminder_date() == Some(today),
                        Trigger::DayOf => {
                            earliest_date(lifecycle.chosen_dates.as_deref().unwrap_or_default()).0
                                == Some(today)
                        }
                    };
                if !still_due {
                    return Ok((lifecycle, false));
                }
                trigger.mark_sent(&mut lifecycle);
                Ok((lifecycle, true))
            })
            .await;

        match marked {
            Ok(true) => {
                tracing::info!(event_id, trigger = ?trigger, recipients = result.sent, "Reminder sent");
                Ok(true)
            }
            Ok(false) => {
                tracing::info!(event_id, trigger = ?trigger, "Event changed during send, flag left unset");
                Ok(false)
            }
            Err(AppError::NotFound(_)) => {
                tracing::info!(event_id, "Event deleted during reminder send");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
