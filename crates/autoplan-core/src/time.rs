//! Date and duration helpers shared by every scheduling stage.
//!
//! All functions are pure and total: absent or unreadable inputs fall back to
//! zero / `None` instead of failing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::task::{Task, Timestamp};

const MS_PER_HOUR: f64 = 60.0 * 60.0 * 1000.0;
const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;

const ROMAN_TABLE: [(i64, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Convert milliseconds to fractional hours.
pub fn ms_to_hours(ms: i64) -> f64 {
    ms as f64 / MS_PER_HOUR
}

/// Absolute distance between two instants in fractional hours.
pub fn hours_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    (a - b).num_milliseconds().abs() as f64 / MS_PER_HOUR
}

/// Absolute distance between two instants in fractional days.
pub fn days_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    (a - b).num_milliseconds().abs() as f64 / MS_PER_DAY
}

/// Resolve a host timestamp to an instant.
///
/// Strings are tried as RFC 3339, then as a naive date-time or a bare date
/// (both read as UTC), then as decimal epoch milliseconds.
pub fn parse_timestamp(ts: &Timestamp) -> Option<DateTime<Utc>> {
    match ts {
        Timestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
        Timestamp::Text(raw) => {
            let s = raw.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(naive.and_utc());
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
            }
            s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
        }
    }
}

/// Age of a task in fractional days, 0 without a readable `created`.
pub fn task_age_in_days(task: &Task, now: DateTime<Utc>) -> f64 {
    task.created
        .as_ref()
        .and_then(parse_timestamp)
        .map(|created| days_between(created, now))
        .unwrap_or(0.0)
}

/// Planned effort in hours, never negative.
pub fn estimated_hours(task: &Task) -> f64 {
    ms_to_hours(task.estimate_ms().max(0))
}

/// Effort still to do in hours, never negative.
pub fn remaining_hours(task: &Task) -> f64 {
    ms_to_hours(task.remaining_ms())
}

/// Scheduled instant of a task: `due_with_time` wins over `due_date`.
pub fn task_due_date(task: &Task) -> Option<DateTime<Utc>> {
    match (&task.due_with_time, &task.due_date) {
        (Some(ts), _) => parse_timestamp(ts),
        (None, Some(ts)) => parse_timestamp(ts),
        (None, None) => None,
    }
}

/// Uppercase Roman numeral for `n`.
///
/// Values below 1 render as `"I"`; values above 3999 have no numeral and are
/// returned as decimal. Split titles depend on these exact strings.
pub fn to_roman(n: i64) -> String {
    if n <= 0 {
        return "I".to_string();
    }
    if n > 3999 {
        return n.to_string();
    }

    let mut rest = n;
    let mut out = String::new();
    for (value, numeral) in ROMAN_TABLE {
        while rest >= value {
            out.push_str(numeral);
            rest -= value;
        }
    }
    out
}

/// Escape `s` so it matches literally when embedded in a regex.
pub fn escape_regex(s: &str) -> String {
    regex::escape(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn to_roman_basic() {
        let expected = [
            (1, "I"),
            (2, "II"),
            (3, "III"),
            (4, "IV"),
            (5, "V"),
            (9, "IX"),
            (10, "X"),
            (50, "L"),
            (100, "C"),
            (500, "D"),
            (1000, "M"),
            (1994, "MCMXCIV"),
            (2024, "MMXXIV"),
            (3999, "MMMCMXCIX"),
        ];
        for (n, numeral) in expected {
            assert_eq!(to_roman(n), numeral, "to_roman({n})");
        }
    }

    #[test]
    fn to_roman_fallbacks() {
        assert_eq!(to_roman(0), "I");
        assert_eq!(to_roman(-5), "I");
        assert_eq!(to_roman(4000), "4000");
        assert_eq!(to_roman(5000), "5000");
    }

    #[test]
    fn hours_between_is_absolute_and_fractional() {
        let a = at(2024, 1, 1, 0, 0);
        assert_eq!(hours_between(a, at(2024, 1, 1, 2, 0)), 2.0);
        assert_eq!(hours_between(at(2024, 1, 1, 2, 0), a), 2.0);
        assert_eq!(hours_between(a, at(2024, 1, 1, 1, 30)), 1.5);
        assert_eq!(hours_between(a, a), 0.0);
    }

    #[test]
    fn days_between_is_absolute_and_fractional() {
        assert_eq!(days_between(at(2024, 1, 1, 0, 0), at(2024, 1, 8, 0, 0)), 7.0);
        assert_eq!(days_between(at(2024, 1, 8, 0, 0), at(2024, 1, 1, 0, 0)), 7.0);
        assert_eq!(days_between(at(2024, 1, 1, 0, 0), at(2024, 1, 1, 12, 0)), 0.5);
    }

    #[test]
    fn task_age_from_millis_and_strings() {
        let now = at(2024, 1, 15, 0, 0);

        let task = Task::new("a", "A").with_created(at(2024, 1, 10, 0, 0));
        assert_eq!(task_age_in_days(&task, now), 5.0);

        let task = Task::new("b", "B").with_created("2024-01-10T00:00:00");
        assert_eq!(task_age_in_days(&task, now), 5.0);

        let task = Task::new("c", "C").with_created("2024-01-10");
        assert_eq!(task_age_in_days(&task, now), 5.0);

        let task = Task::new("d", "D").with_created("2024-01-10T00:00:00Z");
        assert_eq!(task_age_in_days(&task, now), 5.0);
    }

    #[test]
    fn task_age_defaults_to_zero() {
        let now = at(2024, 1, 15, 0, 0);
        assert_eq!(task_age_in_days(&Task::new("a", "A"), now), 0.0);

        let garbage = Task::new("b", "B").with_created("last tuesday");
        assert_eq!(task_age_in_days(&garbage, now), 0.0);
    }

    #[test]
    fn estimated_hours_converts_and_clamps() {
        assert_eq!(estimated_hours(&Task::new("a", "A").with_estimate_ms(7_200_000)), 2.0);
        assert_eq!(estimated_hours(&Task::new("b", "B").with_estimate_ms(5_400_000)), 1.5);
        assert_eq!(estimated_hours(&Task::new("c", "C")), 0.0);
        assert_eq!(estimated_hours(&Task::new("d", "D").with_estimate_ms(0)), 0.0);
        assert_eq!(estimated_hours(&Task::new("e", "E").with_estimate_ms(-100)), 0.0);
    }

    #[test]
    fn remaining_hours_cases() {
        let task = Task::new("a", "A")
            .with_estimate_ms(4 * 3_600_000)
            .with_spent_ms(3_600_000);
        assert_eq!(remaining_hours(&task), 3.0);

        let overdue = Task::new("b", "B")
            .with_estimate_ms(3_600_000)
            .with_spent_ms(2 * 3_600_000);
        assert_eq!(remaining_hours(&overdue), 0.0);

        let fresh = Task::new("c", "C").with_estimate_ms(2 * 3_600_000);
        assert_eq!(remaining_hours(&fresh), 2.0);

        let no_estimate = Task::new("d", "D").with_spent_ms(3_600_000);
        assert_eq!(remaining_hours(&no_estimate), 0.0);
    }

    #[test]
    fn due_date_precedence() {
        let with_time = at(2024, 1, 20, 15, 0);
        let day = at(2024, 1, 21, 0, 0);

        let task = Task::new("a", "A").with_due_with_time(with_time);
        assert_eq!(task_due_date(&task), Some(with_time));

        let task = Task::new("b", "B").with_due_date(day);
        assert_eq!(task_due_date(&task), Some(day));

        let task = Task::new("c", "C").with_due_with_time(with_time).with_due_date(day);
        assert_eq!(task_due_date(&task), Some(with_time));

        let task = Task::new("d", "D").with_due_date("2024-01-21");
        assert_eq!(task_due_date(&task), Some(day));

        assert_eq!(task_due_date(&Task::new("e", "E")), None);
    }

    #[test]
    fn escape_regex_escapes_metacharacters() {
        assert_eq!(escape_regex("hello.world"), "hello\\.world");
        assert_eq!(escape_regex("test*"), "test\\*");
        assert_eq!(escape_regex("a+b"), "a\\+b");
        assert_eq!(escape_regex("what?"), "what\\?");
        assert_eq!(escape_regex("(test)[1]"), "\\(test\\)\\[1\\]");
        assert_eq!(escape_regex("hello world"), "hello world");
    }
}
