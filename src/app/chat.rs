use super::RequestId;
use super::line_editor::LineEditor;
use crate::domain::{ActivityLogId, ChatKind, ChatSession, ErrorSlot, FailureKind, InitialAi, Sender};
use crate::infra::{ApiCall, ApiError, FocusChatReply, LoungeChatReply};
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Wrap};

/// Transcript, status line and input box, top to bottom.
pub fn chat_layout(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1), Constraint::Length(3)])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// Text area of the transcript for a terminal of `terminal_size`: below the
/// tab bar, above the footer, inside the page margin and the bordered block.
fn transcript_viewport(terminal_size: (u16, u16)) -> Rect {
    let (width, height) = terminal_size;
    let full = Rect {
        x: 0,
        y: 0,
        width,
        height,
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(full);
    let content = if rows[1].width < 40 || rows[1].height < 12 {
        rows[1]
    } else {
        rows[1].inner(Margin {
            vertical: 1,
            horizontal: 2,
        })
    };
    let [transcript, _, _] = chat_layout(content);
    transcript.inner(Margin {
        vertical: 1,
        horizontal: 2,
    })
}

/// A chat transcript together with its input box and request state.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatPanel {
    pub session: ChatSession,
    pub input: LineEditor,
    pub pending: Option<RequestId>,
    pub error: ErrorSlot,
    /// Lines scrolled up from the newest message.
    pub scroll_back: u16,
}

impl ChatPanel {
    pub fn new(kind: ChatKind, initial: Option<&InitialAi>) -> Self {
        let input = match kind.max_input_chars() {
            Some(max) => LineEditor::with_max_chars(max),
            None => LineEditor::new(),
        };
        Self {
            session: ChatSession::new(kind, initial),
            input,
            pending: None,
            error: ErrorSlot::default(),
            scroll_back: 0,
        }
    }

    pub fn kind(&self) -> ChatKind {
        self.session.kind()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn accepts_input(&self) -> bool {
        !self.is_busy() && !self.session.is_saved()
    }

    /// Turns the current input into a request. The caller records the
    /// request id in `pending`.
    pub fn submit(&mut self) -> Option<ApiCall> {
        if !self.accepts_input() {
            return None;
        }
        let outgoing = self.session.begin_send(&self.input.text)?;
        self.input.clear();
        self.error.on_submit();
        self.scroll_back = 0;

        let call = match self.kind() {
            ChatKind::Lounge => ApiCall::LoungeChat {
                message: outgoing.message,
                history: outgoing.history,
            },
            kind => ApiCall::FocusChat {
                message: outgoing.message,
                history: outgoing.history,
                known_duration: kind.known_duration(),
            },
        };
        Some(call)
    }

    /// Returns the follow-up save request when the reply carried a record.
    pub fn apply_focus_reply(&mut self, result: Result<FocusChatReply, ApiError>) -> Option<ApiCall> {
        self.pending = None;
        self.scroll_back = 0;
        match result {
            Ok(reply) => {
                self.error.on_success();
                self.session
                    .apply_focus_reply(&reply.reply)
                    .map(ApiCall::SaveFocusLog)
            }
            Err(error) => {
                self.record_error(&error);
                None
            }
        }
    }

    pub fn apply_focus_saved(&mut self, result: Result<Option<ActivityLogId>, ApiError>) {
        self.pending = None;
        self.scroll_back = 0;
        match result {
            Ok(id) => {
                tracing::info!(target: "prodigyhabit::app", log_id = ?id.map(ActivityLogId::get), "focus session saved");
                self.session.record_saved();
            }
            Err(error) => {
                tracing::warn!(target: "prodigyhabit::app", error = %error, "saving focus session failed");
                self.session.record_save_failed();
                if error.failure_kind() != FailureKind::Generic {
                    self.error.on_failure(error.inline("Could not save the session."));
                }
            }
        }
    }

    pub fn apply_lounge_reply(&mut self, result: Result<LoungeChatReply, ApiError>) {
        self.pending = None;
        self.scroll_back = 0;
        match result {
            Ok(reply) => {
                self.error.on_success();
                self.session
                    .apply_lounge_reply(&reply.reply, reply.saved_life_log());
            }
            Err(error) => self.record_error(&error),
        }
    }

    fn record_error(&mut self, error: &ApiError) {
        let kind = error.failure_kind();
        match &kind {
            FailureKind::RateLimited(message) => self.session.record_failure(Some(message.as_str())),
            _ => self.session.record_failure(None),
        }
        if kind != FailureKind::Generic {
            self.error.on_failure(error.inline("The AI could not respond."));
        }
    }

    /// Plain transcript lines: a sender label, the message text, a blank line.
    pub fn transcript_lines(&self) -> Vec<(Option<Sender>, &str)> {
        let mut lines = Vec::new();
        for message in self.session.messages() {
            lines.push((Some(message.sender), message.sender.label()));
            lines.extend(message.text.lines().map(|line| (None, line)));
            lines.push((None, ""));
        }
        lines
    }

    /// Furthest the transcript can scroll back before its first line reaches
    /// the top of the viewport.
    pub fn max_scroll_back(&self, terminal_size: (u16, u16)) -> u16 {
        let viewport = transcript_viewport(terminal_size);
        if viewport.width == 0 {
            return 0;
        }
        let lines: Vec<Line> = self
            .transcript_lines()
            .into_iter()
            .map(|(_, text)| Line::from(text))
            .collect();
        let total = Paragraph::new(lines).wrap(Wrap { trim: false }).line_count(viewport.width);
        u16::try_from(total)
            .unwrap_or(u16::MAX)
            .saturating_sub(viewport.height)
    }

    pub fn scroll_up(&mut self, lines: u16, terminal_size: (u16, u16)) {
        let max = self.max_scroll_back(terminal_size);
        self.scroll_back = self.scroll_back.saturating_add(lines).min(max);
    }

    pub fn scroll_down(&mut self, lines: u16, terminal_size: (u16, u16)) {
        let max = self.max_scroll_back(terminal_size);
        self.scroll_back = self.scroll_back.min(max).saturating_sub(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_builds_focus_request_with_known_duration() {
        let mut panel = ChatPanel::new(ChatKind::FocusPostPomodoro { completed_minutes: 25 }, None);
        panel.input.insert_str("Finished the outline");
        let call = panel.submit().expect("request");
        assert_eq!(
            call,
            ApiCall::FocusChat {
                message: "Finished the outline".to_string(),
                history: panel.session.messages()[..1].to_vec(),
                known_duration: Some(25),
            }
        );
        assert!(panel.input.text.is_empty());
    }

    #[test]
    fn busy_panel_does_not_submit() {
        let mut panel = ChatPanel::new(ChatKind::FocusManual, None);
        panel.pending = Some(RequestId(1));
        panel.input.insert_str("hello");
        assert_eq!(panel.submit(), None);
        assert_eq!(panel.input.text, "hello");
    }

    #[test]
    fn reply_with_record_requests_save() {
        let mut panel = ChatPanel::new(ChatKind::FocusManual, None);
        panel.pending = Some(RequestId(3));
        let follow_up = panel.apply_focus_reply(Ok(FocusChatReply {
            reply: "Saved!\nJSON_DATA: {\"duration\": 30}".to_string(),
        }));
        assert!(matches!(follow_up, Some(ApiCall::SaveFocusLog(_))));
        assert!(panel.pending.is_none());

        panel.apply_focus_saved(Ok(Some(ActivityLogId::new(9))));
        assert!(panel.session.is_saved());
        assert!(!panel.accepts_input());
    }

    #[test]
    fn rate_limit_is_shown_in_transcript_and_kept() {
        let mut panel = ChatPanel::new(ChatKind::Lounge, None);
        panel.apply_lounge_reply(Err(ApiError::RateLimited {
            message: "Wait 2 minutes".to_string(),
            remaining_seconds: Some(100),
        }));
        let last = panel.session.messages().last().expect("message");
        assert_eq!(last.sender, Sender::Ai);
        assert_eq!(last.text, "Wait 2 minutes");

        panel.input.insert_str("again");
        assert!(panel.submit().is_some());
        assert_eq!(panel.error.get().map(|e| e.message.as_str()), Some("Wait 2 minutes"));

        panel.apply_lounge_reply(Ok(LoungeChatReply {
            reply: "Hi".to_string(),
            life_log_saved: false,
            life_log_data: None,
        }));
        assert!(panel.error.get().is_none());
    }

    #[test]
    fn generic_failure_only_apologizes() {
        let mut panel = ChatPanel::new(ChatKind::FocusManual, None);
        panel.apply_focus_reply(Err(ApiError::Transport("refused".to_string())));
        assert!(panel.error.get().is_none());
        assert_eq!(panel.session.messages().len(), 2);
    }

    #[test]
    fn lounge_input_is_capped_by_editor() {
        let mut panel = ChatPanel::new(ChatKind::Lounge, None);
        panel.input.insert_str(&"x".repeat(300));
        assert_eq!(panel.input.char_count(), 200);
    }

    #[test]
    fn scroll_back_stops_at_the_first_message() {
        let mut panel = ChatPanel::new(ChatKind::Lounge, None);
        for index in 0..20 {
            panel.apply_lounge_reply(Ok(LoungeChatReply {
                reply: format!("Reply number {index}"),
                life_log_saved: false,
                life_log_data: None,
            }));
        }
        let size = (100, 30);
        let max = panel.max_scroll_back(size);
        assert!(max > 0);

        for _ in 0..100 {
            panel.scroll_up(5, size);
        }
        assert_eq!(panel.scroll_back, max);

        panel.scroll_down(5, size);
        assert_eq!(panel.scroll_back, max.saturating_sub(5));
    }

    #[test]
    fn short_transcript_does_not_scroll() {
        let mut panel = ChatPanel::new(ChatKind::FocusManual, None);
        panel.scroll_up(5, (100, 30));
        assert_eq!(panel.scroll_back, 0);
        assert_eq!(panel.max_scroll_back((0, 0)), 0);
    }
}
