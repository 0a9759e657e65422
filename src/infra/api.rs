use crate::domain::{
    ActivityLog, ActivityLogId, ChartRow, ChatMessage, FailureKind, FocusSubmission, InlineError, LifeData,
    LifeSubmission, LogKind, Week, format_date,
};
use serde::{Deserialize, Deserializer};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const SESSION_COOKIE_NAME: &str = "session";

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    #[error("not logged in")]
    Unauthorized,
    #[error("{message}")]
    RateLimited { message: String, remaining_seconds: Option<u64> },
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Unauthorized => FailureKind::AuthRequired,
            Self::RateLimited { message, .. } => FailureKind::RateLimited(message.clone()),
            _ => FailureKind::Generic,
        }
    }

    /// Widget-facing error; `fallback` is shown for generic failures.
    pub fn inline(&self, fallback: &str) -> InlineError {
        InlineError::new(self.failure_kind(), fallback)
    }
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    cooldown: bool,
    #[serde(default)]
    remaining_cooldown_seconds: Option<u64>,
}

/// Maps a non-success status and its body to an [`ApiError`].
pub fn classify_failure(status: u16, body: &str) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    match status {
        401 => ApiError::Unauthorized,
        429 if parsed.cooldown => ApiError::RateLimited {
            message: parsed
                .error
                .unwrap_or_else(|| "Please wait before trying again.".to_string()),
            remaining_seconds: parsed.remaining_cooldown_seconds,
        },
        _ => ApiError::Status {
            status,
            message: parsed.error.unwrap_or_else(|| fallback_message(status, body)),
        },
    }
}

fn fallback_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() || body.starts_with('<') {
        return format!("HTTP {status}");
    }
    body.chars().take(200).collect()
}

pub fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    if !(200..300).contains(&status) {
        return Err(classify_failure(status, body));
    }
    serde_json::from_str(body).map_err(|error| ApiError::Decode(error.to_string()))
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct QuickFocusResult {
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub ai_feedback: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct QuickLifeResult {
    #[serde(default)]
    pub ai_advice: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FocusChatReply {
    pub reply: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LoungeChatReply {
    pub reply: String,
    #[serde(default)]
    pub life_log_saved: bool,
    #[serde(default, deserialize_with = "optional_life_data")]
    pub life_log_data: Option<LifeData>,
}

/// The saved life log is the AI's raw JSON; a shape that does not fit is
/// treated as absent instead of failing the whole reply.
fn optional_life_data<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<LifeData>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// Decodes history rows one at a time so a single malformed row cannot hide
/// the rest of the list.
pub fn decode_history_rows(rows: Vec<serde_json::Value>) -> Vec<ActivityLog> {
    let total = rows.len();
    let logs: Vec<ActivityLog> = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned();
            match serde_json::from_value::<ActivityLog>(row) {
                Ok(log) => Some(log),
                Err(error) => {
                    tracing::warn!(target: "prodigyhabit::api", ?id, error = %error, "skipping undecodable history row");
                    None
                }
            }
        })
        .collect();
    if logs.len() < total {
        tracing::info!(target: "prodigyhabit::api", kept = logs.len(), total, "history decoded with skipped rows");
    }
    logs
}

impl LoungeChatReply {
    pub fn saved_life_log(&self) -> Option<&LifeData> {
        if self.life_log_saved {
            self.life_log_data.as_ref()
        } else {
            None
        }
    }
}

#[derive(Deserialize)]
struct DashboardBody {
    #[serde(default)]
    chart_data: Vec<ChartRow>,
}

#[derive(Deserialize)]
struct FeedbackBody {
    #[serde(default)]
    feedback: String,
}

#[derive(Deserialize)]
struct SavedLogBody {
    #[serde(default)]
    log_id: Option<i64>,
}

/// A request the UI can hand to a worker thread.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiCall {
    CheckSession,
    History,
    DeleteLog(ActivityLogId),
    SaveFocusLog(serde_json::Value),
    QuickFocus(FocusSubmission),
    QuickLife(LifeSubmission),
    FocusChat {
        message: String,
        history: Vec<ChatMessage>,
        known_duration: Option<u32>,
    },
    LoungeChat {
        message: String,
        history: Vec<ChatMessage>,
    },
    Dashboard(Week),
    Feedback,
    Logout,
}

impl ApiCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckSession => "check_session",
            Self::History => "history",
            Self::DeleteLog(_) => "delete_log",
            Self::SaveFocusLog(_) => "save_focus_log",
            Self::QuickFocus(_) => "quick_focus",
            Self::QuickLife(_) => "quick_life",
            Self::FocusChat { .. } => "focus_chat",
            Self::LoungeChat { .. } => "lounge_chat",
            Self::Dashboard(_) => "dashboard",
            Self::Feedback => "feedback",
            Self::Logout => "logout",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ApiOutcome {
    SessionChecked(Result<(), ApiError>),
    History(Result<Vec<ActivityLog>, ApiError>),
    LogDeleted {
        id: ActivityLogId,
        result: Result<(), ApiError>,
    },
    FocusLogSaved(Result<Option<ActivityLogId>, ApiError>),
    QuickFocus(Result<QuickFocusResult, ApiError>),
    QuickLife(Result<QuickLifeResult, ApiError>),
    FocusChat(Result<FocusChatReply, ApiError>),
    LoungeChat(Result<LoungeChatReply, ApiError>),
    Dashboard {
        week: Week,
        result: Result<Vec<ChartRow>, ApiError>,
    },
    Feedback(Result<String, ApiError>),
    LoggedOut(Result<(), ApiError>),
}

impl ApiOutcome {
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Self::SessionChecked(Err(error))
            | Self::History(Err(error))
            | Self::LogDeleted { result: Err(error), .. }
            | Self::FocusLogSaved(Err(error))
            | Self::QuickFocus(Err(error))
            | Self::QuickLife(Err(error))
            | Self::FocusChat(Err(error))
            | Self::LoungeChat(Err(error))
            | Self::Dashboard { result: Err(error), .. }
            | Self::Feedback(Err(error))
            | Self::LoggedOut(Err(error)) => Some(error),
            _ => None,
        }
    }
}

/// Blocking client for the habit-tracking backend. Cheap to clone; the
/// underlying agent shares its connection pool.
#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
    session_cookie: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, session_cookie: Option<&str>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_cookie: session_cookie
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(cookie_header),
        }
    }

    pub fn has_session(&self) -> bool {
        self.session_cookie.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut request = self.agent.get(&url).header("User-Agent", &user_agent());
        if let Some(cookie) = &self.session_cookie {
            request = request.header("Cookie", cookie);
        }
        for (key, value) in query {
            request = request.query(key, value);
        }
        let result = request.call();
        self.finish("GET", path, result)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut request = self.agent.post(&url).header("User-Agent", &user_agent());
        if let Some(cookie) = &self.session_cookie {
            request = request.header("Cookie", cookie);
        }
        let result = request.send_json(body);
        self.finish("POST", path, result)
    }

    fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut request = self.agent.delete(&url).header("User-Agent", &user_agent());
        if let Some(cookie) = &self.session_cookie {
            request = request.header("Cookie", cookie);
        }
        let result = request.call();
        self.finish("DELETE", path, result)
    }

    fn finish<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<T, ApiError> {
        let mut response = result.map_err(|error| {
            tracing::warn!(target: "prodigyhabit::api", method, path, error = %error, "request failed");
            ApiError::Transport(error.to_string())
        })?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|error| ApiError::Transport(error.to_string()))?;
        tracing::debug!(target: "prodigyhabit::api", method, path, status, bytes = body.len(), "response");

        let decoded = decode_response(status, &body);
        if let Err(error) = &decoded {
            tracing::info!(target: "prodigyhabit::api", method, path, status, error = %error, "request rejected");
        }
        decoded
    }

    pub fn check_session(&self) -> Result<(), ApiError> {
        self.get::<IgnoredAny>("dashboard", &[]).map(|_| ())
    }

    pub fn history(&self) -> Result<Vec<ActivityLog>, ApiError> {
        let rows: Vec<serde_json::Value> = self.get("history", &[])?;
        Ok(decode_history_rows(rows))
    }

    pub fn delete_log(&self, id: ActivityLogId) -> Result<(), ApiError> {
        self.delete::<IgnoredAny>(&format!("history/{id}")).map(|_| ())
    }

    pub fn save_activity_log(
        &self,
        kind: LogKind,
        data: &serde_json::Value,
    ) -> Result<Option<ActivityLogId>, ApiError> {
        let body = json!({ "log_type": kind.as_str(), "data": data });
        let saved: SavedLogBody = self.post("activity/log", &body)?;
        Ok(saved.log_id.map(ActivityLogId::new))
    }

    pub fn quick_focus(&self, submission: &FocusSubmission) -> Result<QuickFocusResult, ApiError> {
        let body = serde_json::to_value(submission).map_err(|error| ApiError::Decode(error.to_string()))?;
        self.post("quick/focus", &body)
    }

    pub fn quick_life(&self, submission: &LifeSubmission) -> Result<QuickLifeResult, ApiError> {
        let body = serde_json::to_value(submission).map_err(|error| ApiError::Decode(error.to_string()))?;
        self.post("quick/life", &body)
    }

    pub fn focus_chat(
        &self,
        message: &str,
        history: &[ChatMessage],
        known_duration: Option<u32>,
    ) -> Result<FocusChatReply, ApiError> {
        let mut body = json!({ "message": message, "history": history });
        if let Some(duration) = known_duration {
            body["known_duration"] = json!(duration);
        }
        self.post("chat/focus", &body)
    }

    pub fn lounge_chat(&self, message: &str, history: &[ChatMessage]) -> Result<LoungeChatReply, ApiError> {
        let body = json!({ "message": message, "history": history });
        self.post("chat/lounge", &body)
    }

    pub fn dashboard(&self, week: Week) -> Result<Vec<ChartRow>, ApiError> {
        let query = [
            ("start_date", format_date(week.start())),
            ("end_date", format_date(week.end())),
        ];
        let body: DashboardBody = self.get("dashboard", &query)?;
        Ok(body.chart_data)
    }

    pub fn feedback(&self) -> Result<String, ApiError> {
        let body: FeedbackBody = self.get("feedback", &[])?;
        Ok(body.feedback)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.post::<IgnoredAny>("logout", &json!({})).map(|_| ())
    }

    pub fn perform(&self, call: ApiCall) -> ApiOutcome {
        tracing::debug!(target: "prodigyhabit::api", call = call.name(), "dispatch");
        match call {
            ApiCall::CheckSession => ApiOutcome::SessionChecked(self.check_session()),
            ApiCall::History => ApiOutcome::History(self.history()),
            ApiCall::DeleteLog(id) => ApiOutcome::LogDeleted {
                id,
                result: self.delete_log(id),
            },
            ApiCall::SaveFocusLog(data) => {
                ApiOutcome::FocusLogSaved(self.save_activity_log(LogKind::Focus, &data))
            }
            ApiCall::QuickFocus(submission) => ApiOutcome::QuickFocus(self.quick_focus(&submission)),
            ApiCall::QuickLife(submission) => ApiOutcome::QuickLife(self.quick_life(&submission)),
            ApiCall::FocusChat {
                message,
                history,
                known_duration,
            } => ApiOutcome::FocusChat(self.focus_chat(&message, &history, known_duration)),
            ApiCall::LoungeChat { message, history } => {
                ApiOutcome::LoungeChat(self.lounge_chat(&message, &history))
            }
            ApiCall::Dashboard(week) => ApiOutcome::Dashboard {
                week,
                result: self.dashboard(week),
            },
            ApiCall::Feedback => ApiOutcome::Feedback(self.feedback()),
            ApiCall::Logout => ApiOutcome::LoggedOut(self.logout()),
        }
    }
}

fn cookie_header(value: &str) -> String {
    if value.contains('=') {
        value.to_string()
    } else {
        format!("{SESSION_COOKIE_NAME}={value}")
    }
}

fn user_agent() -> String {
    format!("prodigyhabit/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_recognized() {
        assert_eq!(
            classify_failure(401, r#"{"error": "User not authenticated"}"#),
            ApiError::Unauthorized
        );
        assert_eq!(ApiError::Unauthorized.failure_kind(), FailureKind::AuthRequired);
    }

    #[test]
    fn cooldown_429_is_rate_limited() {
        let body = r#"{"error": "Next use in 3 minutes.", "cooldown": true, "remaining_cooldown_seconds": 150}"#;
        let error = classify_failure(429, body);
        assert_eq!(
            error,
            ApiError::RateLimited {
                message: "Next use in 3 minutes.".to_string(),
                remaining_seconds: Some(150)
            }
        );
        assert_eq!(
            error.failure_kind(),
            FailureKind::RateLimited("Next use in 3 minutes.".to_string())
        );
    }

    #[test]
    fn plain_429_is_a_status_error() {
        let error = classify_failure(429, r#"{"error": "slow down"}"#);
        assert_eq!(
            error,
            ApiError::Status {
                status: 429,
                message: "slow down".to_string()
            }
        );
        assert_eq!(error.failure_kind(), FailureKind::Generic);
    }

    #[test]
    fn non_json_error_body_falls_back() {
        assert_eq!(
            classify_failure(502, "<html>bad gateway</html>"),
            ApiError::Status {
                status: 502,
                message: "HTTP 502".to_string()
            }
        );
        assert_eq!(
            classify_failure(500, "boom"),
            ApiError::Status {
                status: 500,
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn success_bodies_decode() {
        let reply: LoungeChatReply = decode_response(
            200,
            r#"{"reply": "ok", "life_log_saved": true, "life_log_data": {"sleep_hours": 7, "screen_time": 90, "mood": 4, "ai_advice": "Walk"}}"#,
        )
        .expect("decode");
        assert_eq!(reply.saved_life_log().map(|d| d.ai_advice.as_str()), Some("Walk"));

        let plain: LoungeChatReply = decode_response(200, r#"{"reply": "ok", "life_log_saved": false}"#).expect("decode");
        assert!(plain.saved_life_log().is_none());

        let bad = decode_response::<FocusChatReply>(200, "{}");
        assert!(matches!(bad, Err(ApiError::Decode(_))));
    }

    #[test]
    fn history_list_decodes() {
        let body = r#"[
            {"id": 2, "user_id": 1, "created_at": "2025-07-08T10:00:00", "log_type": "life", "data": {"sleep_hours": 7.5, "screen_time": 60, "mood": 3}},
            {"id": 1, "user_id": 1, "created_at": "2025-07-07T10:00:00", "log_type": "focus", "data": {"duration": 25, "title": "Docs"}}
        ]"#;
        let logs: Vec<ActivityLog> = decode_response(200, body).expect("decode");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].kind(), LogKind::Focus);
    }

    #[test]
    fn history_keeps_good_rows_when_one_is_malformed() {
        let body = r#"[
            {"id": 3, "created_at": "2025-07-08T10:00:00", "log_type": "focus", "data": {"title": "Docs", "duration": 25, "ai_feedback": null}},
            {"id": 2, "created_at": "not a date", "log_type": "life", "data": {}},
            {"id": 1, "created_at": "2025-07-07T10:00:00", "log_type": "life", "data": {"sleep_hours": 7, "screen_time": 90.0, "mood": 3}}
        ]"#;
        let rows: Vec<serde_json::Value> = decode_response(200, body).expect("decode");
        let logs = decode_history_rows(rows);
        let ids: Vec<i64> = logs.iter().map(|log| log.id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
        match &logs[1].entry {
            crate::domain::LogEntry::Life(data) => assert_eq!(data.screen_time, 90),
            other => panic!("expected life entry, got {other:?}"),
        }
    }

    #[test]
    fn lounge_reply_with_loose_saved_log_decodes() {
        let reply: LoungeChatReply = decode_response(
            200,
            r#"{"reply": "Saved!", "life_log_saved": true, "life_log_data": {"sleep_hours": 6.5, "screen_time": 90.0, "mood": 4, "ai_advice": null}}"#,
        )
        .expect("decode");
        let saved = reply.saved_life_log().expect("saved log");
        assert_eq!(saved.screen_time, 90);
        assert_eq!(saved.ai_advice, "");

        let odd: LoungeChatReply =
            decode_response(200, r#"{"reply": "ok", "life_log_saved": true, "life_log_data": "sleep 7h"}"#).expect("decode");
        assert_eq!(odd.reply, "ok");
        assert!(odd.saved_life_log().is_none());
    }

    #[test]
    fn inline_error_uses_fallback_only_for_generic_failures() {
        let generic = ApiError::Transport("refused".to_string()).inline("Failed to load history.");
        assert_eq!(generic.message, "Failed to load history.");
        let auth = ApiError::Unauthorized.inline("Failed to load history.");
        assert_eq!(auth.kind, FailureKind::AuthRequired);
    }

    #[test]
    fn session_cookie_is_named() {
        assert_eq!(cookie_header("abc"), "session=abc");
        assert_eq!(cookie_header("session=abc"), "session=abc");
        let client = ApiClient::new("http://localhost:5000/api/", Some("  "), Duration::from_secs(1));
        assert!(!client.has_session());
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(client.url("/history"), "http://localhost:5000/api/history");
    }
}
