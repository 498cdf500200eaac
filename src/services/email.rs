// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email texts and the branded HTML wrapper.

use crate::services::notifier::{EmailLink, Notification};

/// Subject, body and optional button of an email, before addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body_html: String,
    pub link: Option<EmailLink>,
}

impl Message {
    fn new(subject: String, body_html: String) -> Self {
        Self {
            subject,
            body_html,
            link: None,
        }
    }

    fn with_link(mut self, url: &str, label: &str) -> Self {
        self.link = Some(EmailLink {
            url: url.to_string(),
            label: label.to_string(),
        });
        self
    }
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const FONT: &str = "'Arial', sans-serif";

/// Wrap a notification body in the branded email layout.
pub fn render_html(notification: &Notification, year: i32) -> String {
    let button = notification
        .link
        .as_ref()
        .map(|link| {
            format!(
                r#"<tr><td style="text-align: center;"><a href="{url}" style="display: inline-block; padding: 10px 20px; margin-top: 20px; background-color: rgb(0, 0, 0); color: white; font-size: 16px; text-decoration: none; border-radius: 4px;">{label}</a></td></tr>"#,
                url = escape_html(&link.url),
                label = escape_html(&link.label),
            )
        })
        .unwrap_or_default();

    format!(
        r#"<table role="presentation" style="width: 100%; max-width: 600px; margin: auto; padding: 20px; background-color: #f9f9f9; border: 3px solid black; font-family: {FONT};">
<tr><td style="font-family: {FONT}; text-align: center; padding-bottom: 20px;"><strong>Hi {first_name},</strong></td></tr>
<tr><td style="font-family: {FONT}; text-align: center; padding-bottom: 10px;">{body}</td></tr>
{button}
<tr><td style="font-family: {FONT}; text-align: center; padding-top: 20px;"><strong>Best regards,</strong><br/>Easy Trip Planner Team</td></tr>
<tr><td style="font-family: {FONT}; font-size: 12px; text-align: center; color: rgb(0, 0, 0); padding-top: 20px;">This is an automated email. Please do not reply.<br/>&copy; {year} Easy Trip Planner.</td></tr>
</table>"#,
        first_name = escape_html(&notification.first_name),
        body = notification.body_html,
    )
}

// ─── Message texts ───────────────────────────────────────────

pub fn event_created(title: &str, event_url: &str) -> Message {
    Message::new(
        "Trip Created".to_string(),
        format!(
            "Hello, your event \"{}\" has been created successfully.",
            escape_html(title)
        ),
    )
    .with_link(event_url, "View Event")
}

pub fn event_confirmed(title: &str, chosen_dates: &[String], reminder: Option<&str>) -> Message {
    let mut body = format!(
        "The event \"{}\" has been confirmed.<br/>Selected Dates: {}",
        escape_html(title),
        escape_html(&chosen_dates.join(", "))
    );
    if let Some(reminder) = reminder {
        body.push_str(&format!("<br/>Reminder Date: {}", escape_html(reminder)));
    }
    Message::new("Event Confirmed".to_string(), body)
}

pub fn event_cancelled(title: &str, reason: &str) -> Message {
    Message::new(
        "Event Cancelled".to_string(),
        format!(
            "The event \"{}\" has been cancelled. Reason: {}",
            escape_html(title),
            escape_html(reason)
        ),
    )
}

pub fn event_reopened(title: &str, event_url: &str) -> Message {
    Message::new(
        "Event Reopened".to_string(),
        format!(
            "The event \"{}\" has been reopened and is back in planning.",
            escape_html(title)
        ),
    )
    .with_link(event_url, "View Event")
}

pub fn event_joined(title: &str, event_url: &str) -> Message {
    Message::new(
        "Event Joined".to_string(),
        format!(
            "You've successfully joined the event \"{}\".",
            escape_html(title)
        ),
    )
    .with_link(event_url, "See Event")
}

pub fn upcoming_reminder(title: &str, date: &str, location: &str, event_url: &str) -> Message {
    Message::new(
        format!("Reminder: {} is coming up!", title),
        format!(
            "Just a reminder that the event \"{}\" is happening soon on {} at {}!",
            escape_html(title),
            escape_html(date),
            escape_html(location)
        ),
    )
    .with_link(event_url, "View Event")
}

pub fn day_of_reminder(title: &str, location: &str, event_url: &str) -> Message {
    Message::new(
        format!("Reminder: {} is Today!", title),
        format!(
            "Just a reminder that the event \"{}\" is happening Today at {}!",
            escape_html(title),
            escape_html(location)
        ),
    )
    .with_link(event_url, "View Event")
}

pub fn deletion_warning(title: &str, deletion_date: &str, event_url: &str) -> Message {
    Message::new(
        format!("Reminder: {} is going to be Deleted!", title),
        format!(
            "Your event \"{}\" is scheduled to be deleted on {} due to inactivity. \
             Please Log In to the event to stop this from happening. \
             Click below to review or update it.",
            escape_html(title),
            escape_html(deletion_date)
        ),
    )
    .with_link(event_url, "Save Event")
}

pub fn event_deleted(title: &str) -> Message {
    Message::new(
        "Event Deleted".to_string(),
        format!(
            "Your event \"{}\" has been automatically deleted due to inactivity.",
            escape_html(title)
        ),
    )
}

pub fn deletion_cancelled(title: &str) -> Message {
    Message::new(
        "Event Will Not Be Deleted".to_string(),
        format!(
            "We wanted to let you know that your event \"{}\" is no longer going to be \
             deleted as it has been updated recently. You can continue managing your event.",
            escape_html(title)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_render_includes_greeting_button_and_year() {
        let notification = Notification::new(
            "ada@example.com",
            "Ada",
            deletion_warning("Lakes", "April 23, 2025", "https://trips.example.com/event/e1"),
        );

        let html = render_html(&notification, 2025);

        assert!(html.contains("Hi Ada,"));
        assert!(html.contains("deleted on April 23, 2025"));
        assert!(html.contains(r#"href="https://trips.example.com/event/e1""#));
        assert!(html.contains(">Save Event</a>"));
        assert!(html.contains("&copy; 2025 Easy Trip Planner."));
    }

    #[test]
    fn test_render_without_link_has_no_button() {
        let notification = Notification::new("ada@example.com", "Ada", event_deleted("Lakes"));
        let html = render_html(&notification, 2025);
        assert!(!html.contains("<a href"));
    }

    #[test]
    fn test_reminder_subjects() {
        assert_eq!(
            upcoming_reminder("Lakes", "2025-06-10", "TBA", "u").subject,
            "Reminder: Lakes is coming up!"
        );
        assert_eq!(
            day_of_reminder("Lakes", "TBA", "u").subject,
            "Reminder: Lakes is Today!"
        );
    }
}
