//! One scheduling pass over a task snapshot.
//!
//! Validation, calendar-import filtering, urgency scoring, splitting and
//! placement, in that order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::partition_calendar_imports;
use crate::config::Config;
use crate::error::Result;
use crate::scheduler::{AutoScheduler, BusyInterval, ScheduledBlock, ScoredUnit};
use crate::task::{process_all_tasks, validate_batch, Task};
use crate::urgency::{ScoredTask, UrgencyScorer};

/// Everything one pass produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePlan {
    /// Placed blocks in timeline order
    pub blocks: Vec<ScheduledBlock>,
    /// Blocks no slot within the horizon could hold
    pub unplaced: Vec<ScoredUnit>,
    /// Urgency of every plannable task, highest first
    pub scores: Vec<ScoredTask>,
    pub calendar_imports: Vec<Task>,
    pub skipped_parents: Vec<Task>,
    pub already_processed: Vec<Task>,
    /// Done or unestimated tasks, and tasks that yielded no blocks
    pub excluded: Vec<Task>,
}

impl SchedulePlan {
    /// Serialize to pretty camelCase JSON for the host.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Ids of tasks that got at least one block, placed or not, in first-seen order
    pub fn split_task_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        let units = self
            .blocks
            .iter()
            .map(|b| &b.unit)
            .chain(self.unplaced.iter().map(|u| &u.unit));
        for unit in units {
            if !ids.contains(&unit.original_task_id.as_str()) {
                ids.push(&unit.original_task_id);
            }
        }
        ids
    }
}

/// Run a full pass.
///
/// # Errors
///
/// Fails when a task has a blank or duplicate id, or when the placement
/// config cannot be read.
pub fn plan(
    tasks: &[Task],
    busy: &[BusyInterval],
    config: &Config,
    now: DateTime<Utc>,
) -> Result<SchedulePlan> {
    validate_batch(tasks)?;

    let (imports, plannable) = partition_calendar_imports(tasks, config, now);

    let scores = UrgencyScorer::new(&config.urgency, now).rank(plannable.iter().copied());
    let urgency_by_id: HashMap<&str, f64> = scores
        .iter()
        .map(|s| (s.task_id.as_str(), s.urgency))
        .collect();
    tracing::debug!(scored = scores.len(), "scored plannable tasks");

    let classified = process_all_tasks(plannable.iter().copied(), config.block_size_minutes, config);
    tracing::debug!(
        splits = classified.splits.len(),
        skipped_parents = classified.skipped_parents.len(),
        already_processed = classified.already_processed.len(),
        excluded = classified.excluded.len(),
        "classified tasks"
    );

    let units = classified
        .splits
        .into_iter()
        .map(|unit| {
            let urgency = urgency_by_id
                .get(unit.original_task_id.as_str())
                .copied()
                .unwrap_or(0.0);
            ScoredUnit::new(unit, urgency)
        })
        .collect();

    let placement = AutoScheduler::with_config(config.placement.clone()).place(units, busy, now)?;

    tracing::info!(
        tasks = tasks.len(),
        calendar_imports = imports.len(),
        placed = placement.blocks.len(),
        unplaced = placement.unplaced.len(),
        "schedule pass finished"
    );

    Ok(SchedulePlan {
        blocks: placement.blocks,
        unplaced: placement.unplaced,
        scores,
        calendar_imports: imports.into_iter().cloned().collect(),
        skipped_parents: classified.skipped_parents,
        already_processed: classified.already_processed,
        excluded: classified.excluded,
    })
}
