//! Automatic placement of split blocks on a timeline.
//!
//! - Builds working windows from the placement config (day window, weekdays, horizon)
//! - Subtracts busy intervals to get free slots
//! - Sorts units by urgency (stable) and places them greedily, in order
//!
//! Placement is forward-only: a unit that does not fit the current slot moves
//! to the next slot that can hold it, and the time it skipped is never handed
//! to a later unit.

pub mod gap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PlacementConfig;
use crate::error::ConfigError;
use crate::task::SplitUnit;
use crate::urgency::sort_by_urgency;

pub use gap::{BusyInterval, FreeSlot, FreeSlotFinder};

/// A split block with the urgency of its source task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredUnit {
    pub unit: SplitUnit,
    pub urgency: f64,
}

impl ScoredUnit {
    pub fn new(unit: SplitUnit, urgency: f64) -> Self {
        Self { unit, urgency }
    }

    fn length(&self) -> Duration {
        Duration::milliseconds(self.unit.estimated_ms.max(0))
    }
}

/// A block placed on the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledBlock {
    /// `"{task id}#{split index}"`, stable across passes
    pub id: String,
    #[serde(flatten)]
    pub unit: SplitUnit,
    pub urgency: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScheduledBlock {
    fn new(scored: ScoredUnit, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: format!("{}#{}", scored.unit.original_task_id, scored.unit.split_index),
            unit: scored.unit,
            urgency: scored.urgency,
            start,
            end,
        }
    }

    /// Get total duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Result of a placement run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Placed blocks in timeline order
    pub blocks: Vec<ScheduledBlock>,
    /// Units no slot within the horizon could hold, in urgency order
    pub unplaced: Vec<ScoredUnit>,
}

/// Automatic placer for split blocks
pub struct AutoScheduler {
    config: PlacementConfig,
}

impl AutoScheduler {
    /// Create a new scheduler with default config
    pub fn new() -> Self {
        Self {
            config: PlacementConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(config: PlacementConfig) -> Self {
        Self { config }
    }

    /// Place `units` into the free time between `now` and the horizon.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured day window is not valid `HH:MM`.
    pub fn place(
        &self,
        mut units: Vec<ScoredUnit>,
        busy: &[BusyInterval],
        now: DateTime<Utc>,
    ) -> Result<Placement, ConfigError> {
        sort_by_urgency(&mut units, |u| u.urgency);

        let slots: Vec<FreeSlot> = self
            .working_windows(now)?
            .into_iter()
            .flat_map(|(start, end)| FreeSlotFinder::new().find_slots(busy, start, end))
            .collect();

        let pause = self.config.pause();
        let mut placement = Placement::default();
        let mut slot_index = 0;
        let mut cursor = slots.first().map_or(now, |s| s.start);

        for scored in units {
            let length = scored.length();
            let target = slots
                .iter()
                .enumerate()
                .skip(slot_index)
                .find_map(|(i, slot)| {
                    let from = cursor.max(slot.start);
                    slot.end_if_fits(from, length).map(|end| (i, from, end))
                });

            match target {
                Some((i, start, end)) => {
                    slot_index = i;
                    cursor = end.checked_add_signed(pause).unwrap_or(end);
                    placement.blocks.push(ScheduledBlock::new(scored, start, end));
                }
                None => {
                    tracing::debug!(
                        task_id = %scored.unit.original_task_id,
                        split_index = scored.unit.split_index,
                        "no slot within horizon"
                    );
                    placement.unplaced.push(scored);
                }
            }
        }

        tracing::debug!(
            placed = placement.blocks.len(),
            unplaced = placement.unplaced.len(),
            slots = slots.len(),
            "placement finished"
        );
        Ok(placement)
    }

    /// Working windows from `now` to `now + horizon_days`, clipped to both ends.
    pub fn working_windows(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, ConfigError> {
        let (day_start, day_end) = self.config.day_window()?;
        let horizon = self.config.horizon();
        let horizon_end = now.checked_add_signed(horizon).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let today = now.date_naive();

        // Start one day back so an overnight window that began yesterday is included.
        let windows = (-1..=horizon.num_days())
            .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
            .filter(|day| self.is_workday(*day))
            .filter_map(|day| window_for_day(day, day_start, day_end))
            .map(|(start, end)| (start.max(now), end.min(horizon_end)))
            .filter(|(start, end)| start < end)
            .collect();
        Ok(windows)
    }

    fn is_workday(&self, day: NaiveDate) -> bool {
        let weekday = day.weekday().num_days_from_monday() as u8; // 0=Mon ... 6=Sun
        self.config.workdays.contains(&weekday)
    }
}

impl Default for AutoScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Window of one day; an end at or before the start rolls over midnight.
fn window_for_day(
    day: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let window_start = day.and_time(start).and_utc();
    let mut window_end = day.and_time(end).and_utc();
    if end <= start {
        window_end = window_end.checked_add_signed(Duration::days(1))?;
    }
    Some((window_start, window_end))
}
