// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! External links shared on an event.

use crate::error::MutationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub added_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Links(pub Vec<Link>);

impl Links {
    pub fn add(&mut self, url: &str, added_by: &str, now: DateTime<Utc>) {
        self.0.push(Link {
            url: url.to_string(),
            added_by: added_by.to_string(),
            created_at: now,
        });
    }

    /// Remove every entry for `url`.
    pub fn delete(&mut self, url: &str) -> Result<(), MutationError> {
        let before = self.0.len();
        self.0.retain(|l| l.url != url);
        if self.0.len() == before {
            return Err(MutationError::LinkNotFound(url.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_by_url() {
        let mut links = Links::default();
        links.add("https://a.example", "u1", Utc::now());
        links.add("https://b.example", "u2", Utc::now());

        links.delete("https://a.example").unwrap();

        assert_eq!(links.0.len(), 1);
        assert_eq!(
            links.delete("https://a.example"),
            Err(MutationError::LinkNotFound("https://a.example".to_string()))
        );
    }
}
