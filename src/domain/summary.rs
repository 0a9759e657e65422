use crate::domain::week::{DAYS_PER_WEEK, Week, parse_date};
use serde::Deserialize;
use time::Date;

/// One row of the dashboard endpoint's `chart_data`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ChartRow {
    pub date: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub sleep_hours: Option<f64>,
    #[serde(default)]
    pub screen_time: Option<f64>,
    #[serde(default)]
    pub mood: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DailyMetrics {
    pub date: Date,
    pub score: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub screen_time: Option<f64>,
    pub mood: Option<f64>,
}

impl DailyMetrics {
    pub fn empty(date: Date) -> Self {
        Self {
            date,
            score: None,
            sleep_hours: None,
            screen_time: None,
            mood: None,
        }
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Score => self.score,
            Metric::Sleep => self.sleep_hours,
            Metric::ScreenTime => self.screen_time,
            Metric::Mood => self.mood,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Metric {
    Score,
    Sleep,
    ScreenTime,
    Mood,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Score, Metric::Sleep, Metric::ScreenTime, Metric::Mood];

    pub fn label(self) -> &'static str {
        match self {
            Self::Score => "Focus score",
            Self::Sleep => "Sleep",
            Self::ScreenTime => "Screen time",
            Self::Mood => "Mood",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Score => "pts",
            Self::Sleep => "h",
            Self::ScreenTime => "min",
            Self::Mood => "/5",
        }
    }

    /// Fixed axis maximum used when drawing bars.
    pub fn scale_max(self) -> f64 {
        match self {
            Self::Score => 100.0,
            Self::Sleep => 12.0,
            Self::ScreenTime => 180.0,
            Self::Mood => 5.0,
        }
    }
}

/// Lines dashboard rows up against the seven days of `week`; days without a
/// row keep every metric empty. Rows outside the week are ignored.
pub fn summarize_week(rows: &[ChartRow], week: Week) -> [DailyMetrics; DAYS_PER_WEEK] {
    let mut days: [DailyMetrics; DAYS_PER_WEEK] =
        std::array::from_fn(|index| DailyMetrics::empty(week.day(index)));

    for row in rows {
        let Some(date) = parse_date(&row.date) else {
            tracing::debug!(target: "prodigyhabit::app", date = %row.date, "skipping chart row with unparsable date");
            continue;
        };
        let Some(index) = week.day_index(date) else {
            continue;
        };
        days[index] = DailyMetrics {
            date,
            score: row.score,
            sleep_hours: row.sleep_hours,
            screen_time: row.screen_time,
            mood: row.mood,
        };
    }

    days
}

/// Mean over the days that have a value.
pub fn weekly_average(days: &[DailyMetrics], metric: Metric) -> Option<f64> {
    let values: Vec<f64> = days.iter().filter_map(|day| day.value(metric)).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn row(date: &str, score: Option<f64>, mood: Option<f64>) -> ChartRow {
        ChartRow {
            date: date.to_string(),
            score,
            mood,
            ..ChartRow::default()
        }
    }

    #[test]
    fn summarize_fills_missing_days_with_none() {
        let week = Week::containing(date!(2025-07-09));
        let rows = vec![
            row("2025-07-08", Some(72.0), Some(4.0)),
            row("2025-07-13", None, Some(2.0)),
        ];
        let days = summarize_week(&rows, week);

        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, date!(2025-07-07));
        assert_eq!(days[0].score, None);
        assert_eq!(days[1].score, Some(72.0));
        assert_eq!(days[6].mood, Some(2.0));
        assert_eq!(days[6].score, None);
    }

    #[test]
    fn summarize_ignores_rows_outside_the_week() {
        let week = Week::containing(date!(2025-07-09));
        let rows = vec![row("2025-07-14", Some(90.0), None), row("garbage", Some(1.0), None)];
        let days = summarize_week(&rows, week);
        assert!(days.iter().all(|day| day.score.is_none()));
    }

    #[test]
    fn weekly_average_skips_gaps() {
        let week = Week::containing(date!(2025-07-09));
        let rows = vec![
            row("2025-07-07", Some(60.0), None),
            row("2025-07-08", Some(80.0), None),
        ];
        let days = summarize_week(&rows, week);
        assert_eq!(weekly_average(&days, Metric::Score), Some(70.0));
        assert_eq!(weekly_average(&days, Metric::Mood), None);
    }

    #[test]
    fn dashboard_row_decodes_with_missing_fields() {
        let row: ChartRow = serde_json::from_str(r#"{"date": "2025-07-07", "score": 55}"#).expect("decode");
        assert_eq!(row.score, Some(55.0));
        assert_eq!(row.sleep_hours, None);
    }
}
