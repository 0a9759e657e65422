use super::chat::ChatPanel;
use super::line_editor::LineEditor;
use super::{ApiResponse, AppCommand, AppModel, RequestId, View, drop_stale};
use crate::domain::{
    ChatKind, ErrorSlot, FocusFlow, FocusStage, HubChoice, InitialAi, InlineError, MAX_TIMER_MINUTES,
    MIN_TIMER_MINUTES, PomodoroTimer, SessionType, TimerCompletion, TimerDuration, parse_duration_minutes,
    validate_focus_input,
};
use crate::infra::{ApiCall, ApiOutcome, QuickFocusResult, TimerDefaults};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;

const DURATION_FIELD_CHARS: usize = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettingsField {
    Focus,
    Break,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PomodoroSettings {
    pub focus: TimerDuration,
    pub rest: TimerDuration,
    pub field: SettingsField,
}

impl PomodoroSettings {
    fn duration_for(&self, session_type: SessionType) -> TimerDuration {
        match session_type {
            SessionType::Focus => self.focus,
            SessionType::Break => self.rest,
        }
    }

    fn adjust(&mut self, delta: i64) {
        let target = match self.field {
            SettingsField::Focus => &mut self.focus,
            SettingsField::Break => &mut self.rest,
        };
        let next = (i64::from(target.minutes()) + delta)
            .clamp(i64::from(MIN_TIMER_MINUTES), i64::from(MAX_TIMER_MINUTES));
        *target = TimerDuration::saturating(next as u32);
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActiveTimer {
    pub generation: u64,
    pub session_type: SessionType,
    pub timer: PomodoroTimer,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuickField {
    Task,
    Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FocusQuickForm {
    pub task: LineEditor,
    pub duration: LineEditor,
    pub field: QuickField,
    pub pending: Option<RequestId>,
    pub error: ErrorSlot,
}

impl FocusQuickForm {
    fn new(default_minutes: u32) -> Self {
        let mut duration = LineEditor::with_max_chars(DURATION_FIELD_CHARS);
        duration.insert_str(&default_minutes.to_string());
        Self {
            task: LineEditor::new(),
            duration,
            field: QuickField::Task,
            pending: None,
            error: ErrorSlot::default(),
        }
    }

    fn active_editor(&mut self) -> &mut LineEditor {
        match self.field {
            QuickField::Task => &mut self.task,
            QuickField::Duration => &mut self.duration,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FocusView {
    pub flow: FocusFlow,
    pub hub_selected: usize,
    pub settings: PomodoroSettings,
    pub timer: Option<ActiveTimer>,
    pub quick: FocusQuickForm,
    pub chat: Option<ChatPanel>,
}

impl FocusView {
    pub fn new(defaults: &TimerDefaults) -> Self {
        Self {
            flow: FocusFlow::new(),
            hub_selected: 0,
            settings: PomodoroSettings {
                focus: defaults.focus,
                rest: defaults.rest,
                field: SettingsField::Focus,
            },
            timer: None,
            quick: FocusQuickForm::new(defaults.focus.minutes()),
            chat: None,
        }
    }

    /// Rebuilds the countdown whenever the flow moved to a new timer
    /// generation, and drops it outside the timer step.
    fn sync_timer(&mut self) {
        let Some(session_type) = self.flow.active_session() else {
            self.timer = None;
            return;
        };
        let generation = self.flow.timer_generation();
        if self
            .timer
            .is_some_and(|active| active.generation == generation)
        {
            return;
        }
        self.timer = Some(ActiveTimer {
            generation,
            session_type,
            timer: PomodoroTimer::new(self.settings.duration_for(session_type)),
        });
    }

    /// Opens the chat panel that matches the current stage, if any.
    fn sync_chat(&mut self) {
        let kind = match self.flow.stage() {
            FocusStage::ChatManual { .. } => ChatKind::FocusManual,
            FocusStage::ChatPostPomodoro { completed_minutes } => ChatKind::FocusPostPomodoro {
                completed_minutes: *completed_minutes,
            },
            _ => {
                self.chat = None;
                return;
            }
        };
        if self.chat.as_ref().is_some_and(|chat| chat.kind() == kind) {
            return;
        }
        let initial = match self.flow.stage() {
            FocusStage::ChatManual { initial } => initial.clone(),
            _ => None,
        };
        self.chat = Some(ChatPanel::new(kind, initial.as_ref()));
    }

    fn sync(&mut self) {
        self.sync_timer();
        self.sync_chat();
    }

    fn back_to_hub(&mut self, defaults: &TimerDefaults) {
        if self.flow.back_to_hub() {
            self.quick = FocusQuickForm::new(defaults.focus.minutes());
            self.sync();
        }
    }

    fn finish_session(&mut self, completion: TimerCompletion) -> Option<String> {
        let session_type = self.flow.active_session()?;
        if !self.flow.session_finished(completion.credited_minutes) {
            return None;
        }
        self.sync();
        tracing::info!(
            target: "prodigyhabit::app",
            session = session_type.label(),
            minutes = completion.credited_minutes,
            early = completion.early,
            "pomodoro session finished"
        );
        Some(match session_type {
            SessionType::Focus => format!("{} minute focus session complete", completion.credited_minutes),
            SessionType::Break => "Break over, ready for the next session".to_string(),
        })
    }
}

pub(super) fn update_focus(mut model: AppModel, mut view: FocusView, key: KeyEvent) -> (AppModel, AppCommand) {
    if key.code == KeyCode::Esc {
        view.back_to_hub(&model.settings.timer);
        model.view = View::Focus(view);
        return (model, AppCommand::None);
    }

    let mut command = AppCommand::None;
    match view.flow.stage().clone() {
        FocusStage::Hub => update_hub(&mut view, key),
        FocusStage::Pomodoro { .. } => {
            let now = model.now;
            if let Some(notice) = update_pomodoro(&mut view, key, now) {
                model.notice = Some(notice);
            }
        }
        FocusStage::QuickInput => {
            command = update_quick_input(&mut model, &mut view, key);
        }
        FocusStage::ChatManual { .. } | FocusStage::ChatPostPomodoro { .. } => {
            command = update_chat(&mut model, &mut view, key);
        }
    }

    model.view = View::Focus(view);
    (model, command)
}

fn update_hub(view: &mut FocusView, key: KeyEvent) {
    let last = HubChoice::ALL.len() - 1;
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => view.hub_selected = view.hub_selected.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => view.hub_selected = (view.hub_selected + 1).min(last),
        KeyCode::Char('1') => select_hub(view, HubChoice::Pomodoro),
        KeyCode::Char('2') => select_hub(view, HubChoice::QuickInput),
        KeyCode::Char('3') => select_hub(view, HubChoice::Chat),
        KeyCode::Enter => {
            let choice = HubChoice::ALL[view.hub_selected.min(last)];
            select_hub(view, choice);
        }
        _ => {}
    }
}

fn select_hub(view: &mut FocusView, choice: HubChoice) {
    if view.flow.select(choice) {
        view.sync();
    }
}

fn update_pomodoro(view: &mut FocusView, key: KeyEvent, now: Instant) -> Option<String> {
    if view.timer.is_none() {
        // Settings step.
        match key.code {
            KeyCode::Up | KeyCode::Down | KeyCode::Char('k') | KeyCode::Char('j') => {
                view.settings.field = match view.settings.field {
                    SettingsField::Focus => SettingsField::Break,
                    SettingsField::Break => SettingsField::Focus,
                };
            }
            KeyCode::Left | KeyCode::Char('-') | KeyCode::Char('h') => view.settings.adjust(-1),
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('l') => view.settings.adjust(1),
            KeyCode::PageDown => view.settings.adjust(-5),
            KeyCode::PageUp => view.settings.adjust(5),
            KeyCode::Enter => {
                if view.flow.start_session() {
                    view.sync();
                }
            }
            _ => {}
        }
        return None;
    }

    let active = view.timer.as_mut()?;
    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => {
            active.timer.toggle(now);
            None
        }
        KeyCode::Char('r') => {
            active.timer.restart(now);
            None
        }
        KeyCode::Char('c') => {
            let completion = active.timer.complete_early()?;
            view.finish_session(completion)
        }
        KeyCode::Char('s') if active.timer.is_running() || active.timer.is_paused() => {
            if view.flow.switch_session_type() {
                view.sync();
                let label = view.timer.map(|active| active.session_type.label()).unwrap_or("Focus");
                return Some(format!("Switched to {label}"));
            }
            None
        }
        _ => None,
    }
}

fn update_quick_input(model: &mut AppModel, view: &mut FocusView, key: KeyEvent) -> AppCommand {
    let form = &mut view.quick;
    match key.code {
        KeyCode::Up | KeyCode::Down => {
            form.field = match form.field {
                QuickField::Task => QuickField::Duration,
                QuickField::Duration => QuickField::Task,
            };
            AppCommand::None
        }
        KeyCode::F(2) => {
            if form.pending.is_none() && view.flow.quick_input_skipped() {
                view.sync();
            }
            AppCommand::None
        }
        KeyCode::Enter => submit_quick_input(model, view),
        KeyCode::Char(ch)
            if form.field == QuickField::Duration
                && !ch.is_ascii_digit()
                && !key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            AppCommand::None
        }
        _ => {
            if form.pending.is_none() {
                form.active_editor().handle_key(&key);
            }
            AppCommand::None
        }
    }
}

fn submit_quick_input(model: &mut AppModel, view: &mut FocusView) -> AppCommand {
    let form = &mut view.quick;
    if form.pending.is_some() {
        return AppCommand::None;
    }
    form.error.on_submit();
    let validated = parse_duration_minutes(&form.duration.text)
        .and_then(|minutes| validate_focus_input(&form.task.text, minutes));
    match validated {
        Ok(submission) => model.issue(&mut form.pending, ApiCall::QuickFocus(submission)),
        Err(error) => {
            form.error.on_failure(InlineError::generic(error.to_string()));
            AppCommand::None
        }
    }
}

fn update_chat(model: &mut AppModel, view: &mut FocusView, key: KeyEvent) -> AppCommand {
    let post_pomodoro = matches!(view.flow.stage(), FocusStage::ChatPostPomodoro { .. });
    let Some(chat) = view.chat.as_mut() else {
        return AppCommand::None;
    };

    if chat.session.is_saved() {
        if post_pomodoro && matches!(key.code, KeyCode::Enter | KeyCode::Char('b')) && view.flow.start_break() {
            view.sync();
            model.notice = Some("Break started".to_string());
        }
        return AppCommand::None;
    }

    match key.code {
        KeyCode::Enter => match chat.submit() {
            Some(call) => model.issue(&mut chat.pending, call),
            None => AppCommand::None,
        },
        KeyCode::PageUp => {
            chat.scroll_up(5, model.terminal_size);
            AppCommand::None
        }
        KeyCode::PageDown => {
            chat.scroll_down(5, model.terminal_size);
            AppCommand::None
        }
        _ => {
            if chat.accepts_input() {
                chat.input.handle_key(&key);
            }
            AppCommand::None
        }
    }
}

pub(super) fn paste_focus(mut model: AppModel, mut view: FocusView, text: &str) -> (AppModel, AppCommand) {
    match view.flow.stage() {
        FocusStage::QuickInput if view.quick.pending.is_none() => match view.quick.field {
            QuickField::Task => view.quick.task.insert_str(text),
            QuickField::Duration => {
                let digits: String = text.chars().filter(char::is_ascii_digit).collect();
                view.quick.duration.insert_str(&digits);
            }
        },
        FocusStage::ChatManual { .. } | FocusStage::ChatPostPomodoro { .. } => {
            if let Some(chat) = view.chat.as_mut().filter(|chat| chat.accepts_input()) {
                chat.input.insert_str(text);
            }
        }
        _ => {}
    }
    model.view = View::Focus(view);
    (model, AppCommand::None)
}

pub(super) fn tick_focus(mut model: AppModel, mut view: FocusView, now: Instant) -> (AppModel, AppCommand) {
    let completion = view.timer.as_mut().and_then(|active| active.timer.tick(now));
    let Some(completion) = completion else {
        return (model, AppCommand::None);
    };
    if let Some(notice) = view.finish_session(completion) {
        model.notice = Some(notice);
    }
    model.view = View::Focus(view);
    (model, AppCommand::None)
}

pub(super) fn respond_focus(mut model: AppModel, mut view: FocusView, response: ApiResponse) -> (AppModel, AppCommand) {
    let id = Some(response.request_id);

    if view.quick.pending == id && view.flow.stage() == &FocusStage::QuickInput {
        view.quick.pending = None;
        if let ApiOutcome::QuickFocus(result) = response.outcome {
            apply_quick_result(&mut view, result);
        }
        model.view = View::Focus(view);
        return (model, AppCommand::None);
    }

    let Some(chat) = view.chat.as_mut().filter(|chat| chat.pending == id) else {
        drop_stale(&response);
        return (model, AppCommand::None);
    };

    let command = match response.outcome {
        ApiOutcome::FocusChat(result) => match chat.apply_focus_reply(result) {
            Some(save) => model.issue(&mut chat.pending, save),
            None => AppCommand::None,
        },
        ApiOutcome::FocusLogSaved(result) => {
            chat.apply_focus_saved(result);
            AppCommand::None
        }
        _ => {
            chat.pending = None;
            AppCommand::None
        }
    };
    model.view = View::Focus(view);
    (model, command)
}

fn apply_quick_result(view: &mut FocusView, result: Result<QuickFocusResult, crate::infra::ApiError>) {
    match result {
        Ok(result) => {
            view.quick.error.on_success();
            let initial = InitialAi {
                message: result.ai_feedback,
                score: result.score,
            };
            if view.flow.quick_input_submitted(initial) {
                view.sync();
            }
        }
        Err(error) => {
            view.quick
                .error
                .on_failure(error.inline("Could not score this session. Try again."));
        }
    }
}
