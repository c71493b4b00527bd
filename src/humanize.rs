//! Human-readable durations for lock messages.

use chrono::{DateTime, Duration, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

const UNITS: &[(i64, &str, &str)] = &[
    (YEAR, "year", "years"),
    (MONTH, "month", "months"),
    (WEEK, "week", "weeks"),
    (DAY, "day", "days"),
    (HOUR, "hour", "hours"),
    (MINUTE, "minute", "minutes"),
];

/// Time from `now` until `then`, e.g. `"9 minutes"` or `"1 hour, 5 minutes"`.
///
/// Uses the largest non-zero unit plus the next smaller unit when that is
/// non-zero too. Anything under a minute, including the past, is
/// `"0 minutes"`.
pub fn time_until(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    duration(then - now)
}

/// Format a duration the same way as [`time_until`].
pub fn duration(delta: Duration) -> String {
    let seconds = delta.num_seconds();
    if seconds < MINUTE {
        return plural(0, "minute", "minutes");
    }

    for (i, &(size, singular, plural_name)) in UNITS.iter().enumerate() {
        let count = seconds / size;
        if count == 0 {
            continue;
        }

        let mut text = plural(count, singular, plural_name);
        if let Some(&(next_size, next_singular, next_plural)) = UNITS.get(i + 1) {
            let next_count = (seconds - count * size) / next_size;
            if next_count != 0 {
                text.push_str(", ");
                text.push_str(&plural(next_count, next_singular, next_plural));
            }
        }
        return text;
    }

    plural(0, "minute", "minutes")
}

fn plural(count: i64, singular: &str, plural: &str) -> String {
    format!("{} {}", count, if count == 1 { singular } else { plural })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_a_minute_is_zero_minutes() {
        assert_eq!(duration(Duration::seconds(0)), "0 minutes");
        assert_eq!(duration(Duration::seconds(59)), "0 minutes");
        assert_eq!(duration(Duration::seconds(-300)), "0 minutes");
    }

    #[test]
    fn single_unit() {
        assert_eq!(duration(Duration::seconds(60)), "1 minute");
        assert_eq!(duration(Duration::minutes(9) + Duration::seconds(59)), "9 minutes");
        assert_eq!(duration(Duration::hours(2)), "2 hours");
        assert_eq!(duration(Duration::days(1)), "1 day");
    }

    #[test]
    fn two_adjacent_units() {
        assert_eq!(duration(Duration::minutes(65)), "1 hour, 5 minutes");
        assert_eq!(duration(Duration::days(8)), "1 week, 1 day");
        assert_eq!(duration(Duration::days(400)), "1 year, 1 month");
    }

    #[test]
    fn non_adjacent_remainder_is_dropped() {
        // 1 day and 5 minutes: the hour slot is empty, so minutes are not shown.
        assert_eq!(duration(Duration::days(1) + Duration::minutes(5)), "1 day");
    }

    #[test]
    fn time_until_measures_from_now() {
        let now = Utc::now();
        assert_eq!(time_until(now, now + Duration::minutes(10)), "10 minutes");
        assert_eq!(time_until(now, now - Duration::minutes(10)), "0 minutes");
    }
}
