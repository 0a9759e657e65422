use crate::domain::focus_flow::InitialAi;
use crate::domain::activity::LifeData;
use serde::{Deserialize, Serialize};

/// Separates the conversational part of a focus reply from its JSON record.
pub const STRUCTURED_MARKER: &str = "JSON_DATA:";
pub const LOUNGE_MAX_INPUT_CHARS: usize = 200;

const FAILED_REPLY: &str = "Sorry, the AI could not respond.";
const SAVED_REPLY: &str = "Saved your session. Great work!";
const SAVE_FAILED_REPLY: &str = "Could not save the session data.";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Ai => "AI",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChatKind {
    FocusManual,
    FocusPostPomodoro { completed_minutes: u32 },
    Lounge,
}

impl ChatKind {
    pub fn max_input_chars(self) -> Option<usize> {
        match self {
            Self::Lounge => Some(LOUNGE_MAX_INPUT_CHARS),
            _ => None,
        }
    }

    pub fn known_duration(self) -> Option<u32> {
        match self {
            Self::FocusPostPomodoro { completed_minutes } => Some(completed_minutes),
            _ => None,
        }
    }
}

pub fn greeting(kind: ChatKind) -> ChatMessage {
    match kind {
        ChatKind::FocusManual => ChatMessage::ai(
            "Good work! Tell me about today's focused work. (e.g. \"Spent 30 minutes drafting the report\")",
        ),
        ChatKind::FocusPostPomodoro { completed_minutes } => ChatMessage::ai(format!(
            "Well done on {completed_minutes} minutes of focus! What did you get done?"
        )),
        ChatKind::Lounge => ChatMessage::ai(
            "Hi! I can help you look after yourself. Tell me about your recent sleep, screen time, or how you feel today (1-5).",
        ),
    }
}

pub fn initial_text(initial: &InitialAi) -> String {
    match initial.score {
        Some(score) => format!("Score: {score}/100\n{}", initial.message),
        None => initial.message.clone(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructuredReply {
    pub visible: String,
    /// `None` when the reply carried no marker; `Err` holds the parse failure.
    pub payload: Option<Result<serde_json::Value, String>>,
}

pub fn split_structured_reply(reply: &str) -> StructuredReply {
    let Some(index) = reply.find(STRUCTURED_MARKER) else {
        return StructuredReply {
            visible: reply.to_string(),
            payload: None,
        };
    };

    let visible = reply[..index].trim().to_string();
    let raw = strip_code_fence(reply[index + STRUCTURED_MARKER.len()..].trim());
    let payload = serde_json::from_str::<serde_json::Value>(raw)
        .map_err(|err| err.to_string())
        .and_then(|value| {
            if value.is_object() {
                Ok(value)
            } else {
                Err("structured data is not a JSON object".to_string())
            }
        });

    StructuredReply {
        visible,
        payload: Some(payload),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}

/// A message ready to send: the new text plus the transcript before it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outgoing {
    pub message: String,
    pub history: Vec<ChatMessage>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatSession {
    kind: ChatKind,
    messages: Vec<ChatMessage>,
    saved: bool,
}

impl ChatSession {
    pub fn new(kind: ChatKind, initial: Option<&InitialAi>) -> Self {
        let first = match initial {
            Some(initial) => ChatMessage::ai(initial_text(initial)),
            None => greeting(kind),
        };
        Self {
            kind,
            messages: vec![first],
            saved: false,
        }
    }

    pub fn kind(&self) -> ChatKind {
        self.kind
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The focus session record has been stored; no further input is taken.
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Appends the user message and returns what to send, or `None` when the
    /// input is blank or the session no longer accepts input.
    pub fn begin_send(&mut self, input: &str) -> Option<Outgoing> {
        if self.saved || input.trim().is_empty() {
            return None;
        }
        let text: String = match self.kind.max_input_chars() {
            Some(max) => input.chars().take(max).collect(),
            None => input.to_string(),
        };
        let history = self.messages.clone();
        self.messages.push(ChatMessage::user(text.clone()));
        Some(Outgoing {
            message: text,
            history,
        })
    }

    /// Records a focus reply and returns the structured record to save, if any.
    pub fn apply_focus_reply(&mut self, reply: &str) -> Option<serde_json::Value> {
        let split = split_structured_reply(reply);
        match split.payload {
            None => {
                self.messages.push(ChatMessage::ai(split.visible));
                None
            }
            Some(payload) => {
                if !split.visible.is_empty() {
                    self.messages.push(ChatMessage::ai(split.visible));
                }
                match payload {
                    Ok(value) => Some(value),
                    Err(err) => {
                        tracing::warn!(target: "prodigyhabit::app", error = %err, "structured focus data did not parse");
                        self.record_save_failed();
                        None
                    }
                }
            }
        }
    }

    pub fn record_saved(&mut self) {
        self.saved = true;
        self.messages.push(ChatMessage::ai(SAVED_REPLY));
    }

    pub fn record_save_failed(&mut self) {
        self.messages.push(ChatMessage::ai(SAVE_FAILED_REPLY));
    }

    pub fn apply_lounge_reply(&mut self, reply: &str, saved_life_log: Option<&LifeData>) {
        self.messages.push(ChatMessage::ai(reply));
        if let Some(data) = saved_life_log {
            self.messages.push(ChatMessage::ai(format!(
                "Saved your life log! AI advice: {}",
                data.ai_advice
            )));
        }
    }

    /// Adds the AI-side failure line; `message` overrides the generic apology.
    pub fn record_failure(&mut self, message: Option<&str>) {
        self.messages
            .push(ChatMessage::ai(message.unwrap_or(FAILED_REPLY)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_without_marker_is_plain_text() {
        let split = split_structured_reply("How long did you work?");
        assert_eq!(split.visible, "How long did you work?");
        assert_eq!(split.payload, None);
    }

    #[test]
    fn reply_with_marker_is_split() {
        let split = split_structured_reply("Great job!\nJSON_DATA: {\"duration\": 30, \"title\": \"Docs\"}");
        assert_eq!(split.visible, "Great job!");
        let payload = split.payload.expect("payload").expect("valid json");
        assert_eq!(payload["duration"], 30);
    }

    #[test]
    fn fenced_payload_is_unwrapped() {
        let split = split_structured_reply("Done.\nJSON_DATA: ```json\n{\"mood\": 4}\n```");
        let payload = split.payload.expect("payload").expect("valid json");
        assert_eq!(payload["mood"], 4);
    }

    #[test]
    fn malformed_payload_is_reported() {
        let split = split_structured_reply("JSON_DATA: {not json");
        assert_eq!(split.visible, "");
        assert!(matches!(split.payload, Some(Err(_))));

        let split = split_structured_reply("JSON_DATA: [1, 2]");
        assert!(matches!(split.payload, Some(Err(_))));
    }

    #[test]
    fn greetings_depend_on_entry_point() {
        let post = ChatSession::new(ChatKind::FocusPostPomodoro { completed_minutes: 25 }, None);
        assert!(post.messages()[0].text.contains("25 minutes"));

        let initial = InitialAi {
            message: "Solid progress".to_string(),
            score: Some(82),
        };
        let seeded = ChatSession::new(ChatKind::FocusManual, Some(&initial));
        assert_eq!(seeded.messages().len(), 1);
        assert!(seeded.messages()[0].text.contains("82/100"));
        assert!(seeded.messages()[0].text.contains("Solid progress"));
    }

    #[test]
    fn blank_input_is_never_sent() {
        let mut chat = ChatSession::new(ChatKind::FocusManual, None);
        assert_eq!(chat.begin_send("   "), None);
        assert_eq!(chat.messages().len(), 1);
    }

    #[test]
    fn send_carries_history_before_the_new_message() {
        let mut chat = ChatSession::new(ChatKind::FocusManual, None);
        let outgoing = chat.begin_send("Wrote tests").expect("sent");
        assert_eq!(outgoing.message, "Wrote tests");
        assert_eq!(outgoing.history.len(), 1);
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[1].sender, Sender::User);
    }

    #[test]
    fn lounge_input_is_capped() {
        let mut chat = ChatSession::new(ChatKind::Lounge, None);
        let long = "a".repeat(250);
        let outgoing = chat.begin_send(&long).expect("sent");
        assert_eq!(outgoing.message.chars().count(), LOUNGE_MAX_INPUT_CHARS);
    }

    #[test]
    fn focus_reply_with_record_then_saved_blocks_input() {
        let mut chat = ChatSession::new(ChatKind::FocusManual, None);
        chat.begin_send("Drafted slides for 40 minutes");
        let record = chat.apply_focus_reply("Nice!\nJSON_DATA: {\"duration\": 40}");
        assert!(record.is_some());
        chat.record_saved();
        assert!(chat.is_saved());
        assert_eq!(chat.begin_send("more"), None);
        let texts: Vec<&str> = chat.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts[2], "Nice!");
        assert_eq!(texts[3], SAVED_REPLY);
    }

    #[test]
    fn malformed_record_adds_failure_message() {
        let mut chat = ChatSession::new(ChatKind::FocusManual, None);
        let record = chat.apply_focus_reply("JSON_DATA: nope");
        assert!(record.is_none());
        assert!(!chat.is_saved());
        assert_eq!(chat.messages().last().map(|m| m.text.as_str()), Some(SAVE_FAILED_REPLY));
    }

    #[test]
    fn lounge_reply_with_saved_log_adds_advice() {
        let mut chat = ChatSession::new(ChatKind::Lounge, None);
        let data = LifeData {
            ai_advice: "Sleep earlier".to_string(),
            ..LifeData::default()
        };
        chat.apply_lounge_reply("Thanks for sharing", Some(&data));
        assert_eq!(chat.messages().len(), 3);
        assert!(chat.messages()[2].text.contains("Sleep earlier"));
    }
}
