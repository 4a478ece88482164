//! Calendar-import detection.
//!
//! Calendar sync creates task records for every event it imports. Those are
//! appointments, not plannable work, so they must stay out of scoring and
//! splitting. The records carry no explicit origin flag; this module tells
//! them apart heuristically:
//!
//! | Recurring | Created within window | Estimate | Scheduled | Import? |
//! |-----------|-----------------------|----------|-----------|---------|
//! | yes       | any                   | any      | yes       | yes     |
//! | no        | yes (inclusive)       | 0        | yes       | yes     |
//! | any       | any                   | any      | no        | no      |
//! | otherwise |                       |          |           | no      |

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::task::Task;
use crate::time::{parse_timestamp, task_due_date};

/// Whether `task` looks like an event synced in from an external calendar.
pub fn looks_like_calendar_import(task: &Task, config: &Config, now: DateTime<Utc>) -> bool {
    if task_due_date(task).is_none() {
        return false;
    }

    if task.is_recurring() {
        return true;
    }

    task.estimate_ms() == 0 && created_recently(task, config, now)
}

fn created_recently(task: &Task, config: &Config, now: DateTime<Utc>) -> bool {
    let Some(created) = task.created.as_ref().and_then(parse_timestamp) else {
        return false;
    };
    now - created <= config.detection_window()
}

/// Split a batch into `(imports, plannable)`, keeping input order in both.
pub fn partition_calendar_imports<'a>(
    tasks: &'a [Task],
    config: &Config,
    now: DateTime<Utc>,
) -> (Vec<&'a Task>, Vec<&'a Task>) {
    let (imports, plannable): (Vec<&Task>, Vec<&Task>) = tasks
        .iter()
        .partition(|task| looks_like_calendar_import(task, config, now));

    if !imports.is_empty() {
        tracing::debug!(
            imports = imports.len(),
            plannable = plannable.len(),
            "excluded calendar imports"
        );
    }
    (imports, plannable)
}
