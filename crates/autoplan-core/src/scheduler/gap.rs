//! Free slot detection inside working windows.
//!
//! Finds the intervals of a working window that no busy interval covers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Time the placer must not use (meetings, imported calendar events, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Check if this interval overlaps with a time range
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}

/// A free interval blocks can be placed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FreeSlot {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Check if a block of `length` starting at `from` ends inside this slot
    pub fn can_fit_from(&self, from: DateTime<Utc>, length: Duration) -> bool {
        self.end_if_fits(from, length).is_some()
    }

    /// End of a block of `length` starting at `from`, if it stays inside this slot
    pub fn end_if_fits(&self, from: DateTime<Utc>, length: Duration) -> Option<DateTime<Utc>> {
        if from < self.start {
            return None;
        }
        from.checked_add_signed(length).filter(|end| *end <= self.end)
    }
}

/// Finder for free slots in a window
pub struct FreeSlotFinder {
    /// Slots shorter than this are dropped
    min_slot: Duration,
}

impl FreeSlotFinder {
    /// Create a finder that keeps slots of one minute or more
    pub fn new() -> Self {
        Self {
            min_slot: Duration::minutes(1),
        }
    }

    /// Set the minimum slot length
    pub fn with_min_slot(mut self, minutes: i64) -> Self {
        self.min_slot = Duration::minutes(minutes);
        self
    }

    /// Find free slots between busy intervals in `[window_start, window_end)`.
    ///
    /// Busy intervals may overlap each other and need not be sorted.
    /// Returned slots are sorted by start time.
    pub fn find_slots(
        &self,
        busy: &[BusyInterval],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Vec<FreeSlot> {
        let mut slots = Vec::new();

        let mut sorted: Vec<&BusyInterval> = busy
            .iter()
            .filter(|b| b.overlaps(window_start, window_end))
            .collect();
        sorted.sort_by_key(|b| b.start);

        let mut last_end = window_start;
        for interval in sorted {
            if interval.start > last_end {
                self.push_slot(&mut slots, last_end, interval.start.min(window_end));
            }
            if interval.end > last_end {
                last_end = interval.end.min(window_end);
            }
        }

        if last_end < window_end {
            self.push_slot(&mut slots, last_end, window_end);
        }
        slots
    }

    fn push_slot(&self, slots: &mut Vec<FreeSlot>, start: DateTime<Utc>, end: DateTime<Utc>) {
        if end - start >= self.min_slot {
            slots.push(FreeSlot { start, end });
        }
    }
}

impl Default for FreeSlotFinder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn empty_window_is_one_slot() {
        let slots = FreeSlotFinder::new().find_slots(&[], at(9, 0), at(17, 0));
        assert_eq!(slots, [FreeSlot { start: at(9, 0), end: at(17, 0) }]);
    }

    #[test]
    fn busy_intervals_carve_slots() {
        let busy = vec![
            BusyInterval::new(at(11, 0), at(12, 0)),
            BusyInterval::new(at(9, 30), at(10, 0)),
        ];
        let slots = FreeSlotFinder::new().find_slots(&busy, at(9, 0), at(17, 0));
        assert_eq!(
            slots,
            [
                FreeSlot { start: at(9, 0), end: at(9, 30) },
                FreeSlot { start: at(10, 0), end: at(11, 0) },
                FreeSlot { start: at(12, 0), end: at(17, 0) },
            ]
        );
    }

    #[test]
    fn overlapping_and_outside_intervals() {
        let busy = vec![
            BusyInterval::new(at(7, 0), at(9, 30)),
            BusyInterval::new(at(13, 0), at(15, 0)),
            BusyInterval::new(at(14, 0), at(14, 30)),
            BusyInterval::new(at(16, 30), at(20, 0)),
            BusyInterval::new(at(18, 0), at(19, 0)),
        ];
        let slots = FreeSlotFinder::new().find_slots(&busy, at(9, 0), at(17, 0));
        assert_eq!(
            slots,
            [
                FreeSlot { start: at(9, 30), end: at(13, 0) },
                FreeSlot { start: at(15, 0), end: at(16, 30) },
            ]
        );
    }

    #[test]
    fn fully_covered_window_has_no_slots() {
        let busy = vec![BusyInterval::new(at(8, 0), at(18, 0))];
        assert!(FreeSlotFinder::new().find_slots(&busy, at(9, 0), at(17, 0)).is_empty());
    }

    #[test]
    fn min_slot_drops_short_gaps() {
        let busy = vec![BusyInterval::new(at(9, 10), at(17, 0))];
        let finder = FreeSlotFinder::new().with_min_slot(15);
        assert!(finder.find_slots(&busy, at(9, 0), at(17, 0)).is_empty());
    }

    #[test]
    fn can_fit_from_checks_both_ends() {
        let slot = FreeSlot { start: at(9, 0), end: at(10, 0) };
        assert!(slot.can_fit_from(at(9, 0), Duration::hours(1)));
        assert!(!slot.can_fit_from(at(9, 1), Duration::hours(1)));
        assert!(!slot.can_fit_from(at(8, 59), Duration::minutes(10)));
        assert_eq!(slot.duration(), Duration::hours(1));
    }

    #[test]
    fn end_if_fits_handles_huge_lengths() {
        let slot = FreeSlot { start: at(9, 0), end: at(10, 0) };
        assert_eq!(slot.end_if_fits(at(9, 15), Duration::minutes(30)), Some(at(9, 45)));
        assert_eq!(slot.end_if_fits(at(9, 0), Duration::MAX), None);
    }
}
