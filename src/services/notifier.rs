// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification delivery.
//!
//! The core only needs `send`; callers decide whether a failure matters.
//! - `SendGridNotifier` posts to the SendGrid mail API
//! - `LogNotifier` logs the message instead, for local runs without a key

use crate::error::AppError;
use crate::services::email::{render_html, Message};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::Serialize;

/// Optional call-to-action button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailLink {
    pub url: String,
    pub label: String,
}

/// One email to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub first_name: String,
    pub subject: String,
    pub body_html: String,
    pub link: Option<EmailLink>,
}

impl Notification {
    pub fn new(to: &str, first_name: &str, message: Message) -> Self {
        Self {
            to: to.to_string(),
            first_name: first_name.to_string(),
            subject: message.subject,
            body_html: message.body_html,
            link: message.link,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("provider rejected message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        AppError::DeliveryFailure(err.to_string())
    }
}

/// Notification delivery collaborator.
///
/// Sending the same notification twice must be harmless; at-most-once is
/// enforced by the callers' flags, not here.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

// ─── SendGrid ────────────────────────────────────────────────

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Serialize)]
struct SendGridAddress<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct SendGridPersonalization<'a> {
    to: [SendGridAddress<'a>; 1],
}

#[derive(Serialize)]
struct SendGridContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct SendGridMail<'a> {
    personalizations: [SendGridPersonalization<'a>; 1],
    from: SendGridAddress<'a>,
    subject: &'a str,
    content: [SendGridContent<'a>; 1],
}

/// SendGrid v3 mail client.
#[derive(Clone)]
pub struct SendGridNotifier {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl SendGridNotifier {
    pub fn new(api_key: String, sender: String) -> Self {
        Self::with_url(SENDGRID_URL.to_string(), api_key, sender)
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_url(api_url: String, api_key: String, sender: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            sender,
        }
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let html = render_html(notification, Utc::now().year());
        let mail = SendGridMail {
            personalizations: [SendGridPersonalization {
                to: [SendGridAddress {
                    email: &notification.to,
                }],
            }],
            from: SendGridAddress {
                email: &self.sender,
            },
            subject: &notification.subject,
            content: [SendGridContent {
                content_type: "text/html",
                value: &html,
            }],
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&mail)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, to = %notification.to, "SendGrid rejected email");
            return Err(DeliveryError::Rejected { status, body });
        }

        tracing::debug!(to = %notification.to, subject = %notification.subject, "Email sent");
        Ok(())
    }
}

/// Logs notifications instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            link = notification.link.as_ref().map(|l| l.url.as_str()),
            "Notification (not delivered, no provider configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sendgrid_payload_shape() {
        let mail = SendGridMail {
            personalizations: [SendGridPersonalization {
                to: [SendGridAddress {
                    email: "a@example.com",
                }],
            }],
            from: SendGridAddress {
                email: "noreply@example.com",
            },
            subject: "Hello",
            content: [SendGridContent {
                content_type: "text/html",
                value: "<p>hi</p>",
            }],
        };

        let json = serde_json::to_value(&mail).unwrap();
        assert_eq!(json["personalizations"][0]["to"][0]["email"], "a@example.com");
        assert_eq!(json["from"]["email"], "noreply@example.com");
        assert_eq!(json["content"][0]["type"], "text/html");
    }

    #[test]
    fn test_delivery_error_maps_to_delivery_failure() {
        let err: AppError = DeliveryError::Transport("timeout".to_string()).into();
        assert!(matches!(err, AppError::DeliveryFailure(_)));
        assert!(!err.is_retryable());
    }
}
