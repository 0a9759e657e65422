use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLogId(i64);

impl ActivityLogId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ActivityLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Focus,
    Life,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Life => "life",
        }
    }
}

/// A recorded focus session. The backend has used both `duration`/`title`
/// and `duration_minutes`/`task_content` for the same fields, and stores the
/// AI's output verbatim, so every field tolerates `null` and loose numbers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FocusData {
    #[serde(default, alias = "duration_minutes", deserialize_with = "loose_u32")]
    pub duration: u32,
    #[serde(default, deserialize_with = "loose_opt_u32")]
    pub score: Option<u32>,
    #[serde(default, alias = "task_content", deserialize_with = "loose_string")]
    pub title: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub icon_emoji: String,
    #[serde(default, deserialize_with = "loose_strings")]
    pub key_results: Vec<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub ai_feedback: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LifeData {
    #[serde(default, deserialize_with = "loose_f64")]
    pub sleep_hours: f64,
    /// Minutes.
    #[serde(default, deserialize_with = "loose_u32")]
    pub screen_time: u32,
    #[serde(default, deserialize_with = "loose_u8")]
    pub mood: u8,
    #[serde(default, deserialize_with = "loose_string")]
    pub ai_advice: String,
}

/// Reads an int, float or numeric string. Anything else is `None`.
fn loose_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn loose_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(loose_number(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn loose_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(loose_opt_u32(deserializer)?.unwrap_or_default())
}

fn loose_opt_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(loose_number(&value).map(|number| number.round().clamp(0.0, f64::from(u32::MAX)) as u32))
}

fn loose_u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(loose_number(&value)
        .map(|number| number.round().clamp(0.0, f64::from(u8::MAX)) as u8)
        .unwrap_or_default())
}

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

fn loose_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        Value::String(text) => vec![text],
        _ => Vec::new(),
    })
}

#[derive(Clone, Debug, PartialEq)]
pub enum LogEntry {
    Focus(FocusData),
    Life(LifeData),
}

impl LogEntry {
    pub fn kind(&self) -> LogKind {
        match self {
            Self::Focus(_) => LogKind::Focus,
            Self::Life(_) => LogKind::Life,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawActivityLog")]
pub struct ActivityLog {
    pub id: ActivityLogId,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub entry: LogEntry,
}

impl ActivityLog {
    pub fn kind(&self) -> LogKind {
        self.entry.kind()
    }

    pub fn local_date(&self, offset: UtcOffset) -> Date {
        self.created_at.to_offset(offset).date()
    }

    pub fn local_time(&self, offset: UtcOffset) -> OffsetDateTime {
        self.created_at.to_offset(offset)
    }

    /// One-line summary for lists.
    pub fn describe(&self) -> String {
        match &self.entry {
            LogEntry::Focus(data) => {
                let title = data.title.trim();
                let title = if title.is_empty() { "Focus session" } else { title };
                format!("{title} ({} min)", data.duration)
            }
            LogEntry::Life(data) => format!(
                "Sleep {:.1}h, screen {} min, mood {}/5",
                data.sleep_hours, data.screen_time, data.mood
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum ActivityLogDecodeError {
    #[error("unrecognized created_at timestamp: {0}")]
    Timestamp(String),
    #[error("invalid {kind} payload: {message}")]
    Payload { kind: &'static str, message: String },
}

#[derive(Deserialize)]
struct RawActivityLog {
    id: ActivityLogId,
    #[serde(default)]
    user_id: i64,
    created_at: String,
    log_type: LogKind,
    #[serde(default)]
    data: Value,
}

impl TryFrom<RawActivityLog> for ActivityLog {
    type Error = ActivityLogDecodeError;

    fn try_from(raw: RawActivityLog) -> Result<Self, Self::Error> {
        let created_at = parse_timestamp(&raw.created_at)
            .ok_or_else(|| ActivityLogDecodeError::Timestamp(raw.created_at.clone()))?;
        let payload_error = |kind: LogKind, err: serde_json::Error| ActivityLogDecodeError::Payload {
            kind: kind.as_str(),
            message: err.to_string(),
        };
        let entry = match raw.log_type {
            LogKind::Focus => LogEntry::Focus(
                serde_json::from_value(raw.data).map_err(|err| payload_error(LogKind::Focus, err))?,
            ),
            LogKind::Life => LogEntry::Life(
                serde_json::from_value(raw.data).map_err(|err| payload_error(LogKind::Life, err))?,
            ),
        };

        Ok(Self {
            id: raw.id,
            user_id: raw.user_id,
            created_at,
            entry,
        })
    }
}

/// Parses a backend timestamp. RFC 3339 values keep their offset; naive
/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` values are treated as UTC.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339) {
        return Some(parsed);
    }

    let with_fraction = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
    let without_fraction = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let with_space = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    PrimitiveDateTime::parse(raw, with_fraction)
        .or_else(|_| PrimitiveDateTime::parse(raw, without_fraction))
        .or_else(|_| PrimitiveDateTime::parse(raw, with_space))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn decodes_focus_log_with_backend_field_names() {
        let json = r#"{
            "id": 7,
            "user_id": 1,
            "created_at": "2025-07-08T09:30:00.123456",
            "log_type": "focus",
            "data": {"task_content": "Write report", "duration_minutes": 25, "score": 80, "ai_feedback": "Nice"}
        }"#;
        let log: ActivityLog = serde_json::from_str(json).expect("decode");
        assert_eq!(log.id, ActivityLogId::new(7));
        assert_eq!(log.kind(), LogKind::Focus);
        assert_eq!(log.created_at, datetime!(2025-07-08 09:30:00.123456 UTC));
        let LogEntry::Focus(data) = log.entry else {
            panic!("expected focus entry");
        };
        assert_eq!(data.title, "Write report");
        assert_eq!(data.duration, 25);
        assert_eq!(data.score, Some(80));
    }

    #[test]
    fn decodes_life_log() {
        let json = r#"{
            "id": 3,
            "user_id": 1,
            "created_at": "2025-07-08T22:00:00+09:00",
            "log_type": "life",
            "data": {"sleep_hours": 6.5, "screen_time": 120, "mood": 4, "ai_advice": "Rest"}
        }"#;
        let log: ActivityLog = serde_json::from_str(json).expect("decode");
        assert_eq!(log.created_at, datetime!(2025-07-08 13:00:00 UTC));
        let LogEntry::Life(data) = log.entry else {
            panic!("expected life entry");
        };
        assert_eq!(data.sleep_hours, 6.5);
        assert_eq!(data.mood, 4);
    }

    #[test]
    fn tolerates_null_and_loosely_typed_payload_fields() {
        let focus = r#"{
            "id": 8,
            "created_at": "2025-07-08T09:30:00",
            "log_type": "focus",
            "data": {"title": "Deep work", "duration": "45", "score": 72.6, "ai_feedback": null, "key_results": null, "icon_emoji": null}
        }"#;
        let log: ActivityLog = serde_json::from_str(focus).expect("decode focus");
        let LogEntry::Focus(data) = log.entry else {
            panic!("expected focus entry");
        };
        assert_eq!(data.duration, 45);
        assert_eq!(data.score, Some(73));
        assert_eq!(data.ai_feedback, "");
        assert!(data.key_results.is_empty());

        let life = r#"{
            "id": 9,
            "created_at": "2025-07-08T22:00:00",
            "log_type": "life",
            "data": {"sleep_hours": "7.5", "screen_time": 90.0, "mood": 4.0, "ai_advice": null}
        }"#;
        let log: ActivityLog = serde_json::from_str(life).expect("decode life");
        let LogEntry::Life(data) = log.entry else {
            panic!("expected life entry");
        };
        assert_eq!(data.sleep_hours, 7.5);
        assert_eq!(data.screen_time, 90);
        assert_eq!(data.mood, 4);
        assert_eq!(data.ai_advice, "");
    }

    #[test]
    fn unusable_numbers_fall_back_to_defaults() {
        let data: LifeData =
            serde_json::from_str(r#"{"sleep_hours": "lots", "screen_time": -20, "mood": {"x": 1}}"#).expect("decode");
        assert_eq!(data, LifeData::default());

        let data: FocusData = serde_json::from_str(r#"{"score": null, "duration": null}"#).expect("decode");
        assert_eq!(data.score, None);
        assert_eq!(data.duration, 0);
    }

    #[test]
    fn rejects_unknown_log_type_and_bad_timestamp() {
        let unknown = r#"{"id": 1, "created_at": "2025-07-08T00:00:00", "log_type": "sleep", "data": {}}"#;
        assert!(serde_json::from_str::<ActivityLog>(unknown).is_err());

        let bad_time = r#"{"id": 1, "created_at": "yesterday", "log_type": "life", "data": {}}"#;
        assert!(serde_json::from_str::<ActivityLog>(bad_time).is_err());
    }

    #[test]
    fn local_date_follows_offset() {
        let log = ActivityLog {
            id: ActivityLogId::new(1),
            user_id: 1,
            created_at: datetime!(2025-07-06 20:00:00 UTC),
            entry: LogEntry::Life(LifeData::default()),
        };
        assert_eq!(log.local_date(offset!(+9)), time::macros::date!(2025-07-07));
        assert_eq!(log.local_date(UtcOffset::UTC), time::macros::date!(2025-07-06));
    }

    #[test]
    fn describe_falls_back_for_untitled_focus() {
        let log = ActivityLog {
            id: ActivityLogId::new(1),
            user_id: 1,
            created_at: datetime!(2025-07-08 09:00:00 UTC),
            entry: LogEntry::Focus(FocusData {
                duration: 30,
                ..FocusData::default()
            }),
        };
        assert_eq!(log.describe(), "Focus session (30 min)");
    }
}
