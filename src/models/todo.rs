// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Shared to-do list with pending and done columns.

use crate::error::MutationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub creator_id: String,
    pub task: String,
    pub created_at: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    #[serde(default)]
    pub to_do: Vec<Task>,
    #[serde(default)]
    pub done: Vec<Task>,
}

impl TodoList {
    pub fn add(&mut self, task: Task) {
        self.to_do.push(task);
    }

    /// Move a task from pending to done.
    pub fn move_to_done(&mut self, task_id: &str) -> Result<Task, MutationError> {
        let task = take(&mut self.to_do, task_id)?;
        self.done.push(task.clone());
        Ok(task)
    }

    /// Move a task from done back to pending.
    pub fn move_to_do(&mut self, task_id: &str) -> Result<Task, MutationError> {
        let task = take(&mut self.done, task_id)?;
        self.to_do.push(task.clone());
        Ok(task)
    }

    /// Remove a task from whichever list holds it.
    pub fn delete(&mut self, task_id: &str) -> Result<(), MutationError> {
        let before = self.to_do.len() + self.done.len();
        self.to_do.retain(|t| t.task_id != task_id);
        self.done.retain(|t| t.task_id != task_id);
        if self.to_do.len() + self.done.len() == before {
            return Err(MutationError::TaskNotFound(task_id.to_string()));
        }
        Ok(())
    }
}

fn take(list: &mut Vec<Task>, task_id: &str) -> Result<Task, MutationError> {
    let index = list
        .iter()
        .position(|t| t.task_id == task_id)
        .ok_or_else(|| MutationError::TaskNotFound(task_id.to_string()))?;
    Ok(list.remove(index))
}
