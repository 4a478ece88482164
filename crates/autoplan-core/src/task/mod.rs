//! Task records as handed over by the host application.
//!
//! The host owns persistence; this crate only reads snapshots. Field names
//! follow the host's camelCase JSON so a record can be deserialized as-is.

pub mod splitter;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

pub use splitter::{
    base_title, block_count, is_already_processed, process_all_tasks, processed_note, split_task,
    ClassificationResult, SplitUnit, MAX_SPLITS_PER_TASK,
};

/// A point in time as the host stores it.
///
/// Depending on where a record came from, `created` and due fields are
/// either epoch milliseconds or a date string. Parsing is deferred to
/// [`crate::time::parse_timestamp`] so an unreadable value degrades to
/// "absent" instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Milliseconds since the Unix epoch
    Millis(i64),
    /// Date or date-time string
    Text(String),
}

impl From<i64> for Timestamp {
    fn from(ms: i64) -> Self {
        Timestamp::Millis(ms)
    }
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Timestamp::Text(s.to_string())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Timestamp {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Timestamp::Millis(dt.timestamp_millis())
    }
}

/// A task snapshot.
///
/// Durations (`time_estimate`, `time_spent`) are milliseconds. `null` and a
/// missing field are treated the same everywhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub time_estimate: Option<i64>,
    #[serde(default)]
    pub time_spent: Option<i64>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Weak link to the parent task, if any.
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub created: Option<Timestamp>,
    #[serde(default)]
    pub is_done: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub due_with_time: Option<Timestamp>,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
    /// Recurrence descriptor. Only its presence matters here.
    #[serde(default)]
    pub repeat_cfg: Option<serde_json::Value>,
}

impl Task {
    /// Create a bare task with an id and a title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_estimate_ms(mut self, ms: i64) -> Self {
        self.time_estimate = Some(ms);
        self
    }

    pub fn with_spent_ms(mut self, ms: i64) -> Self {
        self.time_spent = Some(ms);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_ids = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_created(mut self, created: impl Into<Timestamp>) -> Self {
        self.created = Some(created.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_due_with_time(mut self, due: impl Into<Timestamp>) -> Self {
        self.due_with_time = Some(due.into());
        self
    }

    pub fn with_due_date(mut self, due: impl Into<Timestamp>) -> Self {
        self.due_date = Some(due.into());
        self
    }

    pub fn with_repeat(mut self, cfg: serde_json::Value) -> Self {
        self.repeat_cfg = Some(cfg);
        self
    }

    pub fn done(mut self) -> Self {
        self.is_done = true;
        self
    }

    /// Planned effort in milliseconds, 0 when absent
    pub fn estimate_ms(&self) -> i64 {
        self.time_estimate.unwrap_or(0)
    }

    /// Consumed effort in milliseconds, 0 when absent
    pub fn spent_ms(&self) -> i64 {
        self.time_spent.unwrap_or(0)
    }

    /// Remaining effort in milliseconds, floored at zero
    pub fn remaining_ms(&self) -> i64 {
        self.estimate_ms().saturating_sub(self.spent_ms()).max(0)
    }

    pub fn is_recurring(&self) -> bool {
        self.repeat_cfg.as_ref().is_some_and(|cfg| !cfg.is_null())
    }

    /// Check the minimal input contract for a record at `index` in a batch.
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingId { index });
        }
        Ok(())
    }
}

/// Parse a batch of host records from a JSON array.
///
/// # Errors
///
/// Returns [`crate::CoreError::Json`] if the text is not an array of task records.
pub fn tasks_from_json(json: &str) -> Result<Vec<Task>> {
    Ok(serde_json::from_str(json)?)
}

/// Read a batch of host records from a JSON file.
///
/// # Errors
///
/// Returns [`crate::CoreError::Io`] if the file cannot be read, or
/// [`crate::CoreError::Json`] if it does not hold an array of task records.
pub fn load_tasks(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let content = std::fs::read_to_string(path)?;
    tasks_from_json(&content)
}

/// Validate a whole batch: every task needs an id, and ids must be unique.
pub fn validate_batch(tasks: &[Task]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for (index, task) in tasks.iter().enumerate() {
        task.validate(index)?;
        if !seen.insert(task.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: task.id.clone(),
            });
        }
    }
    Ok(())
}
