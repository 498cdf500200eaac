// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use chrono::Duration;
use std::env;

/// Default number of compare-and-swap attempts before a conflict surfaces.
pub const DEFAULT_CAS_MAX_ATTEMPTS: u32 = 8;

/// Which document store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store, for development and tests.
    Memory,
}

/// Inactivity retention thresholds.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Inactivity after which the organiser is warned.
    pub warn_after: Duration,
    /// Time after the warning at which the event is purged.
    pub delete_after: Duration,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Health server port
    pub port: u16,
    /// Frontend URL used to build links in notifications
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    pub store_backend: StoreBackend,
    /// Scheduling period of the reminder and retention passes
    pub scheduler_period: std::time::Duration,
    pub retention: RetentionPolicy,
    /// Bounded retry count for compare-and-swap conflicts
    pub cas_max_attempts: u32,

    // --- Secrets ---
    /// SendGrid API key; notifications are only logged when absent
    pub sendgrid_api_key: Option<String>,
    /// Verified SendGrid sender address
    pub sendgrid_sender: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let sendgrid_api_key = env::var("SENDGRID_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let sendgrid_sender = env::var("SENDGRID_SENDER").ok();
        if sendgrid_api_key.is_some() && sendgrid_sender.is_none() {
            return Err(ConfigError::Missing("SENDGRID_SENDER"));
        }

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("FRONTEND_URL"))?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            store_backend: parse_backend(
                &env::var("STORE_BACKEND").unwrap_or_else(|_| "firestore".to_string()),
            )?,
            scheduler_period: parse_period(
                &env::var("SCHEDULER_PERIOD_SECS")
                    .map_err(|_| ConfigError::Missing("SCHEDULER_PERIOD_SECS"))?,
            )?,
            retention: RetentionPolicy {
                warn_after: Duration::days(required_number("RETENTION_WARN_DAYS")? as i64),
                delete_after: Duration::days(required_number("RETENTION_DELETE_DAYS")? as i64),
            },
            cas_max_attempts: match env::var("CAS_MAX_ATTEMPTS") {
                Ok(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::Invalid("CAS_MAX_ATTEMPTS", raw))?,
                Err(_) => DEFAULT_CAS_MAX_ATTEMPTS,
            },
            sendgrid_api_key,
            sendgrid_sender,
        })
    }

    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            store_backend: StoreBackend::Memory,
            scheduler_period: std::time::Duration::from_secs(24 * 60 * 60),
            retention: RetentionPolicy {
                warn_after: Duration::days(90),
                delete_after: Duration::days(7),
            },
            cas_max_attempts: DEFAULT_CAS_MAX_ATTEMPTS,
            sendgrid_api_key: None,
            sendgrid_sender: None,
        }
    }

    /// Link to an event page on the frontend.
    pub fn event_url(&self, event_id: &str) -> String {
        format!("{}/event/{}", self.frontend_url, event_id)
    }
}

fn parse_backend(raw: &str) -> Result<StoreBackend, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "firestore" => Ok(StoreBackend::Firestore),
        "memory" => Ok(StoreBackend::Memory),
        _ => Err(ConfigError::Invalid("STORE_BACKEND", raw.to_string())),
    }
}

fn required_number(name: &'static str) -> Result<u64, ConfigError> {
    let raw = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(name, raw))
}

/// Scheduler period in seconds. Must be positive.
fn parse_period(raw: &str) -> Result<std::time::Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(std::time::Duration::from_secs(secs)),
        _ => Err(ConfigError::Invalid("SCHEDULER_PERIOD_SECS", raw.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
