//! Task urgency calculation.
//!
//! Urgency is a weighted sum of four factors:
//! - Base priority from the task's position in the input list (earlier = higher)
//! - Tag boost from the configured tag table
//! - Remaining duration (direction set by [`DurationPreference`])
//! - Age since creation, saturating at `age_horizon_days`
//!
//! Higher urgency schedules earlier. Equal scores keep input order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DurationPreference, TagAggregate, UrgencyConfig};
use crate::task::Task;
use crate::time::{remaining_hours, task_age_in_days};

/// One weighted factor of an urgency score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyTerm {
    /// Factor name
    pub name: String,
    /// Configured weight
    pub weight: f64,
    /// Raw factor value
    pub factor: f64,
    /// `weight * factor`
    pub contribution: f64,
}

impl UrgencyTerm {
    pub fn new(name: impl Into<String>, weight: f64, factor: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            factor,
            contribution: weight * factor,
        }
    }
}

/// Breakdown of an urgency score for explainability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrgencyBreakdown {
    pub terms: Vec<UrgencyTerm>,
    pub total: f64,
}

impl UrgencyBreakdown {
    /// Add a term to the breakdown
    pub fn add_term(&mut self, term: UrgencyTerm) {
        self.total += term.contribution;
        self.terms.push(term);
    }

    /// Term with the largest contribution
    pub fn top_term(&self) -> Option<&UrgencyTerm> {
        self.terms
            .iter()
            .max_by(|a, b| a.contribution.total_cmp(&b.contribution))
    }
}

/// Urgency of one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredTask {
    pub task_id: String,
    /// Index in the scored list
    pub position: usize,
    pub urgency: f64,
    pub breakdown: UrgencyBreakdown,
}

/// Urgency calculator for a batch of tasks
pub struct UrgencyScorer<'a> {
    config: &'a UrgencyConfig,
    now: DateTime<Utc>,
}

impl<'a> UrgencyScorer<'a> {
    pub fn new(config: &'a UrgencyConfig, now: DateTime<Utc>) -> Self {
        Self { config, now }
    }

    /// Score one task at `position` of a list with `total` entries.
    pub fn score(&self, task: &Task, position: usize, total: usize) -> ScoredTask {
        let weights = &self.config.weights;
        let mut breakdown = UrgencyBreakdown::default();

        breakdown.add_term(UrgencyTerm::new(
            "base",
            weights.base,
            self.base_factor(position, total),
        ));
        breakdown.add_term(UrgencyTerm::new("tag", weights.tag, self.tag_factor(task)));
        breakdown.add_term(UrgencyTerm::new(
            "duration",
            weights.duration,
            self.duration_factor(task),
        ));
        breakdown.add_term(UrgencyTerm::new("age", weights.age, self.age_factor(task)));

        ScoredTask {
            task_id: task.id.clone(),
            position,
            urgency: breakdown.total,
            breakdown,
        }
    }

    /// Score every task, in input order.
    pub fn score_all<'t, I>(&self, tasks: I) -> Vec<ScoredTask>
    where
        I: IntoIterator<Item = &'t Task>,
    {
        let tasks: Vec<&Task> = tasks.into_iter().collect();
        let total = tasks.len();
        tasks
            .iter()
            .enumerate()
            .map(|(position, task)| self.score(task, position, total))
            .collect()
    }

    /// Score every task and sort by descending urgency; ties keep input order.
    pub fn rank<'t, I>(&self, tasks: I) -> Vec<ScoredTask>
    where
        I: IntoIterator<Item = &'t Task>,
    {
        let mut scored = self.score_all(tasks);
        sort_by_urgency(&mut scored, |s| s.urgency);
        scored
    }

    /// `(total - position) / total`: 1.0 for the first task, falling linearly.
    fn base_factor(&self, position: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        total.saturating_sub(position) as f64 / total as f64
    }

    fn tag_factor(&self, task: &Task) -> f64 {
        let boosts = task
            .tag_ids
            .iter()
            .filter_map(|tag| self.config.tag_priorities.get(tag).copied());

        match self.config.tag_aggregate {
            TagAggregate::Max => boosts.reduce(f64::max).unwrap_or(0.0),
            TagAggregate::Sum => boosts.sum(),
        }
    }

    /// Bounded to [0, 1) and monotonic in remaining hours.
    fn duration_factor(&self, task: &Task) -> f64 {
        let hours = remaining_hours(task);
        match self.config.duration_preference {
            DurationPreference::PreferShort => 1.0 / (1.0 + hours),
            DurationPreference::PreferLong => hours / (1.0 + hours),
        }
    }

    fn age_factor(&self, task: &Task) -> f64 {
        let horizon = self.config.age_horizon_days;
        if horizon <= 0.0 {
            return 0.0;
        }
        task_age_in_days(task, self.now).min(horizon) / horizon
    }
}

/// Stable sort, highest urgency first.
pub fn sort_by_urgency<T>(items: &mut [T], urgency: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| urgency(b).total_cmp(&urgency(a)));
}
