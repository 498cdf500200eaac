// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Event polls with single-choice voting.

use crate::error::MutationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "level-1")]
    Level1,
    #[serde(rename = "level-2")]
    Level2,
    #[serde(rename = "level-3")]
    Level3,
}

impl FromStr for Priority {
    type Err = MutationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "level-1" => Ok(Priority::Level1),
            "level-2" => Ok(Priority::Level2),
            "level-3" => Ok(Priority::Level3),
            other => Err(MutationError::InvalidPriority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub priority: Priority,
    /// Option label to voter user ids.
    pub options: BTreeMap<String, Vec<String>>,
}

/// Every poll of an event, keyed by poll id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polls(pub BTreeMap<String, Poll>);

/// Fields for a new poll.
#[derive(Debug, Clone)]
pub struct NewPoll {
    pub title: String,
    pub description: String,
    pub created_by: String,
    pub priority: String,
    pub options: Vec<String>,
}

impl Polls {
    pub fn get(&self, poll_id: &str) -> Option<&Poll> {
        self.0.get(poll_id)
    }

    /// Add a poll with an empty voter list for every declared option.
    pub fn create(
        &mut self,
        poll_id: &str,
        new: NewPoll,
        now: DateTime<Utc>,
    ) -> Result<(), MutationError> {
        let priority: Priority = new.priority.parse()?;
        let options = new
            .options
            .into_iter()
            .map(|option| (option, Vec::new()))
            .collect();

        self.0.insert(
            poll_id.to_string(),
            Poll {
                title: new.title,
                description: new.description,
                created_by: new.created_by,
                created_at: now,
                priority,
                options,
            },
        );
        Ok(())
    }

    /// Toggle `user_id`'s vote for `option`.
    ///
    /// Voting for the option the user already holds removes the vote.
    /// Otherwise the user is moved off every other option first. Returns
    /// whether the user now holds a vote.
    pub fn vote(&mut self, poll_id: &str, option: &str, user_id: &str) -> Result<bool, MutationError> {
        let poll = self.poll_with_option(poll_id, option)?;

        if poll.options[option].iter().any(|v| v == user_id) {
            if let Some(voters) = poll.options.get_mut(option) {
                voters.retain(|v| v != user_id);
            }
            return Ok(false);
        }

        for voters in poll.options.values_mut() {
            voters.retain(|v| v != user_id);
        }
        if let Some(voters) = poll.options.get_mut(option) {
            voters.push(user_id.to_string());
        }
        Ok(true)
    }

    /// Remove `user_id`'s vote for `option`.
    pub fn remove_vote(&mut self, poll_id: &str, option: &str, user_id: &str) -> Result<(), MutationError> {
        let poll = self.poll_with_option(poll_id, option)?;
        let voters = poll
            .options
            .get_mut(option)
            .ok_or_else(|| option_not_found(poll_id, option))?;

        if !voters.iter().any(|v| v == user_id) {
            return Err(MutationError::NotVoted {
                user_id: user_id.to_string(),
                option: option.to_string(),
            });
        }
        voters.retain(|v| v != user_id);
        Ok(())
    }

    /// Delete a poll. Only its creator may do so.
    pub fn delete(&mut self, poll_id: &str, user_id: &str) -> Result<(), MutationError> {
        let poll = self
            .0
            .get(poll_id)
            .ok_or_else(|| MutationError::PollNotFound(poll_id.to_string()))?;
        if poll.created_by != user_id {
            return Err(MutationError::NotPollCreator(poll_id.to_string()));
        }
        self.0.remove(poll_id);
        Ok(())
    }

    fn poll_with_option(&mut self, poll_id: &str, option: &str) -> Result<&mut Poll, MutationError> {
        match self.0.get_mut(poll_id) {
            Some(poll) if poll.options.contains_key(option) => Ok(poll),
            _ => Err(option_not_found(poll_id, option)),
        }
    }
}

fn option_not_found(poll_id: &str, option: &str) -> MutationError {
    MutationError::OptionNotFound {
        poll_id: poll_id.to_string(),
        option: option.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polls_with_days() -> Polls {
        let mut polls = Polls::default();
        polls
            .create(
                "p1",
                NewPoll {
                    title: "Which day?".to_string(),
                    description: String::new(),
                    created_by: "org".to_string(),
                    priority: "level-2".to_string(),
                    options: vec!["Mon".to_string(), "Tue".to_string()],
                },
                Utc::now(),
            )
            .unwrap();
        polls
    }

    fn voters<'a>(polls: &'a Polls, option: &str) -> &'a [String] {
        &polls.get("p1").unwrap().options[option]
    }

    #[test]
    fn test_create_rejects_bad_priority() {
        let mut polls = Polls::default();
        let err = polls
            .create(
                "p1",
                NewPoll {
                    title: "t".to_string(),
                    description: String::new(),
                    created_by: "org".to_string(),
                    priority: "urgent".to_string(),
                    options: vec!["a".to_string()],
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err, MutationError::InvalidPriority("urgent".to_string()));
        assert!(polls.0.is_empty());
    }

    #[test]
    fn test_switching_vote_moves_voter() {
        let mut polls = polls_with_days();

        assert!(polls.vote("p1", "Mon", "u").unwrap());
        assert!(polls.vote("p1", "Tue", "u").unwrap());

        assert!(voters(&polls, "Mon").is_empty());
        assert_eq!(voters(&polls, "Tue"), ["u".to_string()]);
    }

    #[test]
    fn test_double_vote_toggles_off() {
        let mut polls = polls_with_days();

        assert!(polls.vote("p1", "Mon", "u").unwrap());
        assert!(!polls.vote("p1", "Mon", "u").unwrap());

        assert!(voters(&polls, "Mon").is_empty());
    }

    #[test]
    fn test_vote_on_missing_option() {
        let mut polls = polls_with_days();
        assert!(matches!(
            polls.vote("p1", "Wed", "u"),
            Err(MutationError::OptionNotFound { .. })
        ));
        assert!(matches!(
            polls.vote("nope", "Mon", "u"),
            Err(MutationError::OptionNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_vote() {
        let mut polls = polls_with_days();
        polls.vote("p1", "Mon", "u").unwrap();

        polls.remove_vote("p1", "Mon", "u").unwrap();
        assert!(matches!(
            polls.remove_vote("p1", "Mon", "u"),
            Err(MutationError::NotVoted { .. })
        ));
    }

    #[test]
    fn test_only_creator_deletes() {
        let mut polls = polls_with_days();

        assert_eq!(
            polls.delete("p1", "someone"),
            Err(MutationError::NotPollCreator("p1".to_string()))
        );
        polls.delete("p1", "org").unwrap();
        assert_eq!(
            polls.delete("p1", "org"),
            Err(MutationError::PollNotFound("p1".to_string()))
        );
    }
}
