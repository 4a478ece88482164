//! Splitting tasks into bounded time blocks.
//!
//! A task's remaining effort is cut into consecutive blocks of the configured
//! size; the last block holds the remainder. Blocks of one task form a
//! doubly-linked sequence through `prev_split_index` / `next_split_index`,
//! which are plain indices into the returned `Vec`.
//!
//! Re-running a pass must not split the same task twice. The host marks
//! accepted tasks by writing [`processed_note`] into their notes, and
//! [`is_already_processed`] recognises that marker on the next pass.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::task::Task;
use crate::time::{escape_regex, ms_to_hours, to_roman};

/// One block of a split task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitUnit {
    pub original_task_id: String,
    pub title: String,
    pub estimated_hours: f64,
    /// Exact block length in milliseconds
    pub estimated_ms: i64,
    pub split_index: usize,
    pub total_splits: usize,
    pub prev_split_index: Option<usize>,
    pub next_split_index: Option<usize>,
    pub tag_ids: Vec<String>,
    pub project_id: Option<String>,
    pub parent_id: Option<String>,
}

impl SplitUnit {
    pub fn is_first(&self) -> bool {
        self.prev_split_index.is_none()
    }

    pub fn is_last(&self) -> bool {
        self.next_split_index.is_none()
    }
}

/// Outcome of classifying a batch. No task appears in more than one list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Blocks of every eligible task, in input order
    pub splits: Vec<SplitUnit>,
    /// Tasks that other tasks in the batch name as parent
    pub skipped_parents: Vec<Task>,
    /// Tasks carrying the processed marker
    pub already_processed: Vec<Task>,
    /// Done tasks, tasks without an estimate, and tasks that produced no
    /// blocks (effort fully spent, or too many blocks to place)
    pub excluded: Vec<Task>,
}

/// Most blocks a single task is cut into; larger tasks are not split.
pub const MAX_SPLITS_PER_TASK: i64 = 10_000;

/// Suffix numeral: canonical Roman up to 3999, then plain decimal.
const SUFFIX_PATTERN: &str =
    r" <(M{0,3}(?:CM|CD|D?C{0,3})(?:XC|XL|L?X{0,3})(?:IX|IV|V?I{0,3})|\d+)>";

/// Whether a previous pass already split `task`.
pub fn is_already_processed(task: &Task, marker: &str) -> bool {
    task.notes
        .as_deref()
        .is_some_and(|notes| notes.contains(marker))
}

/// Notes text to write back once the splits of a task were accepted.
///
/// Existing notes are kept; the marker line is appended only once.
pub fn processed_note(existing: Option<&str>, total_splits: usize, marker: &str) -> String {
    let line = format!("{marker} Split into {total_splits} blocks.");
    match existing.map(str::trim_end) {
        Some(notes) if notes.contains(marker) => notes.to_string(),
        Some(notes) if !notes.is_empty() => format!("{notes}\n\n{line}"),
        _ => line,
    }
}

/// Strip the decoration [`split_task`] adds under `config` from a title.
///
/// Only a title carrying the full decoration (configured prefix and, when
/// `split_suffix` is on, a ` <N>` numeral `to_roman` can produce) is
/// stripped. Any other title is returned unchanged.
pub fn base_title(title: &str, config: &Config) -> String {
    if config.split_prefix.is_empty() && !config.split_suffix {
        return title.to_string();
    }

    let suffix = if config.split_suffix { SUFFIX_PATTERN } else { "" };
    let pattern = format!(r"(?s)^{}(.*?){suffix}$", escape_regex(&config.split_prefix));
    let Ok(re) = Regex::new(&pattern) else {
        return title.to_string();
    };
    let Some(caps) = re.captures(title) else {
        return title.to_string();
    };
    if caps.get(2).is_some_and(|numeral| !is_suffix_numeral(numeral.as_str())) {
        return title.to_string();
    }
    caps.get(1)
        .map_or_else(|| title.to_string(), |m| m.as_str().to_string())
}

fn is_suffix_numeral(numeral: &str) -> bool {
    match numeral.parse::<u64>() {
        Ok(n) => n > 3999,
        Err(_) => !numeral.is_empty(),
    }
}

/// Number of blocks of at most `block_ms` covering `remaining_ms`.
///
/// Both arguments must be positive.
pub fn block_count(remaining_ms: i64, block_ms: i64) -> i64 {
    (remaining_ms - 1) / block_ms + 1
}

fn split_title(base: &str, index: usize, config: &Config) -> String {
    let mut title = format!("{}{}", config.split_prefix, base);
    if config.split_suffix {
        title.push_str(&format!(" <{}>", to_roman(index as i64 + 1)));
    }
    title
}

/// Cut the remaining effort of `task` into blocks.
///
/// A non-positive `block_size_minutes` falls back to the configured default.
/// Returns an empty `Vec` when nothing is left to do, or when the task would
/// need more than [`MAX_SPLITS_PER_TASK`] blocks.
pub fn split_task(task: &Task, block_size_minutes: i64, config: &Config) -> Vec<SplitUnit> {
    let remaining_ms = task.remaining_ms();
    if remaining_ms == 0 {
        return Vec::new();
    }

    let block_ms = config.effective_block_minutes(block_size_minutes) * 60_000;
    let count = block_count(remaining_ms, block_ms);
    if count > MAX_SPLITS_PER_TASK {
        tracing::warn!(task_id = %task.id, blocks = count, "too many blocks, not splitting");
        return Vec::new();
    }
    let total = count as usize;
    let base = base_title(&task.title, config);

    (0..total)
        .map(|index| {
            let offset = index as i64 * block_ms;
            let length = block_ms.min(remaining_ms - offset);
            SplitUnit {
                original_task_id: task.id.clone(),
                title: split_title(&base, index, config),
                estimated_hours: ms_to_hours(length),
                estimated_ms: length,
                split_index: index,
                total_splits: total,
                prev_split_index: index.checked_sub(1),
                next_split_index: (index + 1 < total).then_some(index + 1),
                tag_ids: task.tag_ids.clone(),
                project_id: task.project_id.clone(),
                parent_id: task.parent_id.clone(),
            }
        })
        .collect()
}

/// Classify a batch and split every eligible task.
///
/// Checks run in order: parent of another task in the batch, already
/// processed, done or unestimated. The first match decides. A task that
/// passes every check but yields no blocks is reported as excluded.
pub fn process_all_tasks<'t, I>(tasks: I, block_size_minutes: i64, config: &Config) -> ClassificationResult
where
    I: IntoIterator<Item = &'t Task>,
{
    let tasks: Vec<&Task> = tasks.into_iter().collect();
    let parent_ids: HashSet<&str> = tasks
        .iter()
        .filter_map(|task| task.parent_id.as_deref())
        .collect();

    let mut result = ClassificationResult::default();
    for task in tasks {
        if parent_ids.contains(task.id.as_str()) {
            tracing::debug!(task_id = %task.id, "skipping parent task");
            result.skipped_parents.push(task.clone());
        } else if is_already_processed(task, &config.processed_marker) {
            tracing::debug!(task_id = %task.id, "skipping already processed task");
            result.already_processed.push(task.clone());
        } else if task.is_done || task.estimate_ms() <= 0 {
            result.excluded.push(task.clone());
        } else {
            let splits = split_task(task, block_size_minutes, config);
            tracing::debug!(task_id = %task.id, blocks = splits.len(), "split task");
            if splits.is_empty() {
                result.excluded.push(task.clone());
            } else {
                result.splits.extend(splits);
            }
        }
    }
    result
}
