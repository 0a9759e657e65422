use super::chat::ChatPanel;
use super::{ApiResponse, AppCommand, AppModel, RequestId, View, drop_stale};
use crate::domain::{ChatKind, ErrorSlot, InitialAi, LifeField, LifeForm};
use crate::infra::{ApiCall, ApiOutcome};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoungeStage {
    QuickInput,
    Chat,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoungeView {
    pub stage: LoungeStage,
    pub form: LifeForm,
    pub field: LifeField,
    pub pending: Option<RequestId>,
    pub error: ErrorSlot,
    pub chat: Option<ChatPanel>,
}

impl Default for LoungeView {
    fn default() -> Self {
        Self::new()
    }
}

impl LoungeView {
    pub fn new() -> Self {
        Self {
            stage: LoungeStage::QuickInput,
            form: LifeForm::default(),
            field: LifeField::Sleep,
            pending: None,
            error: ErrorSlot::default(),
            chat: None,
        }
    }

    fn open_chat(&mut self, initial: Option<InitialAi>) {
        self.stage = LoungeStage::Chat;
        self.chat = Some(ChatPanel::new(ChatKind::Lounge, initial.as_ref()));
    }

    fn back_to_quick_input(&mut self) {
        self.stage = LoungeStage::QuickInput;
        self.chat = None;
    }
}

pub(super) fn update_lounge(mut model: AppModel, mut view: LoungeView, key: KeyEvent) -> (AppModel, AppCommand) {
    let command = match view.stage {
        LoungeStage::QuickInput => update_quick_input(&mut model, &mut view, key),
        LoungeStage::Chat => update_chat(&mut model, &mut view, key),
    };
    model.view = View::Lounge(view);
    (model, command)
}

fn update_quick_input(model: &mut AppModel, view: &mut LoungeView, key: KeyEvent) -> AppCommand {
    let step = if key.modifiers.contains(KeyModifiers::SHIFT) { 4 } else { 1 };
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => view.field = view.field.prev(),
        KeyCode::Down | KeyCode::Char('j') => view.field = view.field.next(),
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => {
            if view.pending.is_none() {
                view.form.adjust(view.field, -step);
            }
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') => {
            if view.pending.is_none() {
                view.form.adjust(view.field, step);
            }
        }
        KeyCode::F(2) | KeyCode::Char('s') => {
            if view.pending.is_none() {
                view.open_chat(None);
            }
        }
        KeyCode::Enter => {
            if view.pending.is_some() {
                return AppCommand::None;
            }
            view.error.on_submit();
            let submission = view.form.submission();
            return model.issue(&mut view.pending, ApiCall::QuickLife(submission));
        }
        _ => {}
    }
    AppCommand::None
}

fn update_chat(model: &mut AppModel, view: &mut LoungeView, key: KeyEvent) -> AppCommand {
    if key.code == KeyCode::Esc {
        view.back_to_quick_input();
        return AppCommand::None;
    }
    let Some(chat) = view.chat.as_mut() else {
        return AppCommand::None;
    };
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

pub(super) fn paste_lounge(mut model: AppModel, mut view: LoungeView, text: &str) -> (AppModel, AppCommand) {
    if let Some(chat) = view.chat.as_mut().filter(|chat| chat.accepts_input()) {
        chat.input.insert_str(text);
    }
    model.view = View::Lounge(view);
    (model, AppCommand::None)
}

pub(super) fn respond_lounge(mut model: AppModel, mut view: LoungeView, response: ApiResponse) -> (AppModel, AppCommand) {
    let id = Some(response.request_id);

    if view.pending == id && view.stage == LoungeStage::QuickInput {
        view.pending = None;
        if let ApiOutcome::QuickLife(result) = response.outcome {
            match result {
                Ok(result) => {
                    view.error.on_success();
                    view.open_chat(Some(InitialAi {
                        message: result.ai_advice,
                        score: None,
                    }));
                }
                Err(error) => view
                    .error
                    .on_failure(error.inline("Could not get advice right now. Try again.")),
            }
        }
        model.view = View::Lounge(view);
        return (model, AppCommand::None);
    }

    let Some(chat) = view.chat.as_mut().filter(|chat| chat.pending == id) else {
        drop_stale(&response);
        return (model, AppCommand::None);
    };
    match response.outcome {
        ApiOutcome::LoungeChat(result) => chat.apply_lounge_reply(result),
        _ => chat.pending = None,
    }
    model.view = View::Lounge(view);
    (model, AppCommand::None)
}
