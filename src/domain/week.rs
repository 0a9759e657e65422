use crate::domain::ActivityLog;
use std::cmp::Ordering;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

pub const DAYS_PER_WEEK: usize = 7;

/// A Monday-through-Sunday calendar week.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Week {
    start: Date,
}

impl Week {
    pub fn containing(date: Date) -> Self {
        let back = i64::from(date.weekday().number_days_from_monday());
        Self {
            start: date - Duration::days(back),
        }
    }

    pub fn start(self) -> Date {
        self.start
    }

    pub fn end(self) -> Date {
        self.start + Duration::days(6)
    }

    pub fn day(self, index: usize) -> Date {
        self.start + Duration::days(index.min(DAYS_PER_WEEK - 1) as i64)
    }

    pub fn days(self) -> [Date; DAYS_PER_WEEK] {
        std::array::from_fn(|index| self.day(index))
    }

    pub fn shift(self, weeks: i64) -> Self {
        Self {
            start: self.start + Duration::weeks(weeks),
        }
    }

    pub fn contains(self, date: Date) -> bool {
        date >= self.start && date <= self.end()
    }

    /// Whether an instant falls inside the week once viewed in `offset`.
    pub fn contains_instant(self, instant: OffsetDateTime, offset: UtcOffset) -> bool {
        self.contains(instant.to_offset(offset).date())
    }

    pub fn day_index(self, date: Date) -> Option<usize> {
        if !self.contains(date) {
            return None;
        }
        Some((date - self.start).whole_days() as usize)
    }

    pub fn label(self) -> String {
        format!("{} - {}", format_date(self.start), format_date(self.end()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DayBucket {
    pub date: Date,
    pub logs: Vec<ActivityLog>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeekBuckets {
    pub week: Week,
    pub days: [DayBucket; DAYS_PER_WEEK],
}

impl WeekBuckets {
    pub fn total_logs(&self) -> usize {
        self.days.iter().map(|day| day.logs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_logs() == 0
    }

    /// Logs in display order: Monday first, newest first within a day.
    pub fn iter_logs(&self) -> impl Iterator<Item = &ActivityLog> {
        self.days.iter().flat_map(|day| day.logs.iter())
    }
}

/// Groups `logs` into the seven local days of the week containing
/// `reference`. Logs outside that week are dropped.
pub fn aggregate_week(logs: &[ActivityLog], reference: Date, offset: UtcOffset) -> WeekBuckets {
    let week = Week::containing(reference);
    let mut days: [DayBucket; DAYS_PER_WEEK] = std::array::from_fn(|index| DayBucket {
        date: week.day(index),
        logs: Vec::new(),
    });

    for log in logs.iter().filter(|log| week.contains_instant(log.created_at, offset)) {
        if let Some(index) = week.day_index(log.local_date(offset)) {
            days[index].logs.push(log.clone());
        }
    }

    for day in &mut days {
        sort_by_recency(&mut day.logs);
    }

    WeekBuckets { week, days }
}

/// Newest first; equal timestamps fall back to the larger id first.
pub fn sort_by_recency(logs: &mut [ActivityLog]) {
    logs.sort_by(compare_recency);
}

fn compare_recency(a: &ActivityLog, b: &ActivityLog) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn weekday_short(date: Date) -> &'static str {
    match date.weekday() {
        time::Weekday::Monday => "Mon",
        time::Weekday::Tuesday => "Tue",
        time::Weekday::Wednesday => "Wed",
        time::Weekday::Thursday => "Thu",
        time::Weekday::Friday => "Fri",
        time::Weekday::Saturday => "Sat",
        time::Weekday::Sunday => "Sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActivityLogId, LifeData, LogEntry};
    use time::macros::{date, datetime, offset};

    fn life_log(id: i64, created_at: OffsetDateTime) -> ActivityLog {
        ActivityLog {
            id: ActivityLogId::new(id),
            user_id: 1,
            created_at,
            entry: LogEntry::Life(LifeData::default()),
        }
    }

    #[test]
    fn week_starts_on_monday_for_every_weekday() {
        let monday = date!(2025-07-07);
        for offset in 0..7 {
            let day = monday + Duration::days(offset);
            assert_eq!(Week::containing(day).start(), monday, "day {day}");
        }
        assert_eq!(Week::containing(date!(2025-07-13)).end(), date!(2025-07-13));
    }

    #[test]
    fn week_start_crosses_month_and_year() {
        assert_eq!(Week::containing(date!(2025-01-01)).start(), date!(2024-12-30));
        assert_eq!(Week::containing(date!(2025-03-02)).start(), date!(2025-02-24));
    }

    #[test]
    fn shift_moves_by_whole_weeks() {
        let week = Week::containing(date!(2025-07-09));
        assert_eq!(week.shift(-1).start(), date!(2025-06-30));
        assert_eq!(week.shift(1).start(), date!(2025-07-14));
        assert_eq!(week.shift(0), week);
    }

    #[test]
    fn contains_instant_respects_day_boundaries() {
        let week = Week::containing(date!(2025-07-09));
        assert!(week.contains_instant(datetime!(2025-07-07 00:00:00 UTC), UtcOffset::UTC));
        assert!(week.contains_instant(datetime!(2025-07-13 23:59:59.999 UTC), UtcOffset::UTC));
        assert!(!week.contains_instant(datetime!(2025-07-14 00:00:00 UTC), UtcOffset::UTC));
        assert!(!week.contains_instant(datetime!(2025-07-06 23:59:59.999 UTC), UtcOffset::UTC));
    }

    #[test]
    fn aggregate_produces_seven_ordered_buckets() {
        let logs = vec![
            life_log(1, datetime!(2025-07-08 09:00:00 UTC)),
            life_log(2, datetime!(2025-07-08 18:00:00 UTC)),
            life_log(3, datetime!(2025-07-08 18:00:00 UTC)),
            life_log(4, datetime!(2025-07-13 23:59:59.999 UTC)),
            life_log(5, datetime!(2025-07-14 00:00:00 UTC)),
            life_log(6, datetime!(2025-07-06 12:00:00 UTC)),
        ];
        let buckets = aggregate_week(&logs, date!(2025-07-10), UtcOffset::UTC);

        assert_eq!(buckets.days.len(), 7);
        assert_eq!(buckets.days[0].date, date!(2025-07-07));
        assert_eq!(buckets.days[6].date, date!(2025-07-13));
        assert!(buckets.days[0].logs.is_empty());

        let tuesday: Vec<i64> = buckets.days[1].logs.iter().map(|log| log.id.get()).collect();
        assert_eq!(tuesday, vec![3, 2, 1]);

        let sunday: Vec<i64> = buckets.days[6].logs.iter().map(|log| log.id.get()).collect();
        assert_eq!(sunday, vec![4]);
        assert_eq!(buckets.total_logs(), 4);
    }

    #[test]
    fn aggregate_groups_by_local_date() {
        // 20:00 UTC Sunday is Monday morning in +09:00.
        let logs = vec![life_log(1, datetime!(2025-07-06 20:00:00 UTC))];

        let utc = aggregate_week(&logs, date!(2025-07-07), UtcOffset::UTC);
        assert!(utc.is_empty());

        let tokyo = aggregate_week(&logs, date!(2025-07-07), offset!(+9));
        assert_eq!(tokyo.days[0].logs.len(), 1);
    }

    #[test]
    fn sort_by_recency_breaks_ties_by_id() {
        let mut logs = vec![
            life_log(10, datetime!(2025-07-08 10:00:00 UTC)),
            life_log(12, datetime!(2025-07-08 10:00:00 UTC)),
            life_log(11, datetime!(2025-07-09 10:00:00 UTC)),
        ];
        sort_by_recency(&mut logs);
        let ids: Vec<i64> = logs.iter().map(|log| log.id.get()).collect();
        assert_eq!(ids, vec![11, 12, 10]);
    }

    #[test]
    fn date_round_trips_through_text() {
        assert_eq!(parse_date("2025-07-07"), Some(date!(2025-07-07)));
        assert_eq!(format_date(date!(2025-07-07)), "2025-07-07");
        assert_eq!(parse_date("07/07/2025"), None);
    }
}
