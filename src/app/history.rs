use super::{ApiResponse, AppCommand, AppModel, RequestId, View, drop_stale};
use crate::domain::{
    ActivityLog, ActivityLogId, FailureKind, InlineError, Week, WeekBuckets,
    aggregate_week, sort_by_recency,
};
use crate::infra::{ApiCall, ApiError, ApiOutcome};
use crossterm::event::{KeyCode, KeyEvent};
use time::{Date, Duration, UtcOffset};

const LOAD_FAILED: &str = "Could not load your history.";
const DELETE_FAILED: &str = "Could not delete the log.";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteConfirm {
    pub log_id: ActivityLogId,
    pub label: String,
    pub confirm_selected: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryView {
    pub logs: Vec<ActivityLog>,
    pub loaded: bool,
    pub load_pending: Option<RequestId>,
    pub reference: Date,
    pub selected: usize,
    pub confirm: Option<DeleteConfirm>,
    pub delete_pending: Option<RequestId>,
    pub error: Option<InlineError>,
}

impl HistoryView {
    pub fn new(today: Date) -> Self {
        Self {
            logs: Vec::new(),
            loaded: false,
            load_pending: None,
            reference: today,
            selected: 0,
            confirm: None,
            delete_pending: None,
            error: None,
        }
    }

    pub fn week(&self) -> Week {
        Week::containing(self.reference)
    }

    pub fn buckets(&self, offset: UtcOffset) -> WeekBuckets {
        aggregate_week(&self.logs, self.reference, offset)
    }

    pub fn selected_log(&self, offset: UtcOffset) -> Option<ActivityLog> {
        self.buckets(offset).iter_logs().nth(self.selected).cloned()
    }

    fn visible_count(&self, offset: UtcOffset) -> usize {
        self.buckets(offset).total_logs()
    }

    fn shift_week(&mut self, weeks: i64) {
        self.reference += Duration::weeks(weeks);
        self.selected = 0;
    }
}

pub(super) fn update_history(mut model: AppModel, mut view: HistoryView, key: KeyEvent) -> (AppModel, AppCommand) {
    let offset = model.settings.utc_offset;

    if let Some(mut confirm) = view.confirm.take() {
        let command = match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => {
                confirm.confirm_selected = !confirm.confirm_selected;
                view.confirm = Some(confirm);
                AppCommand::None
            }
            KeyCode::Char('y') => request_delete(&mut model, &mut view, confirm.log_id),
            KeyCode::Enter if confirm.confirm_selected => request_delete(&mut model, &mut view, confirm.log_id),
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('n') => AppCommand::None,
            _ => {
                view.confirm = Some(confirm);
                AppCommand::None
            }
        };
        model.view = View::History(view);
        return (model, command);
    }

    let mut command = AppCommand::None;
    match key.code {
        KeyCode::Char('q') => return (model, AppCommand::Quit),
        KeyCode::Char('?') => model.help_open = true,
        KeyCode::Up | KeyCode::Char('k') => view.selected = view.selected.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => {
            let last = view.visible_count(offset).saturating_sub(1);
            view.selected = (view.selected + 1).min(last);
        }
        KeyCode::Left | KeyCode::Char('[') | KeyCode::Char('h') => view.shift_week(-1),
        KeyCode::Right | KeyCode::Char(']') | KeyCode::Char('l') => view.shift_week(1),
        KeyCode::Char('t') => {
            view.reference = model.settings.today;
            view.selected = 0;
        }
        KeyCode::Char('r') => {
            if view.load_pending.is_none() {
                view.error = None;
                command = model.issue(&mut view.load_pending, ApiCall::History);
            }
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if view.delete_pending.is_none() {
                if let Some(log) = view.selected_log(offset) {
                    view.confirm = Some(DeleteConfirm {
                        log_id: log.id,
                        label: log.describe(),
                        confirm_selected: false,
                    });
                }
            }
        }
        _ => {}
    }

    model.view = View::History(view);
    (model, command)
}

fn request_delete(model: &mut AppModel, view: &mut HistoryView, id: ActivityLogId) -> AppCommand {
    view.error = None;
    model.issue(&mut view.delete_pending, ApiCall::DeleteLog(id))
}

pub(super) fn respond_history(mut model: AppModel, mut view: HistoryView, response: ApiResponse) -> (AppModel, AppCommand) {
    let id = Some(response.request_id);

    if view.load_pending == id {
        view.load_pending = None;
        if let ApiOutcome::History(result) = response.outcome {
            match result {
                Ok(mut logs) => {
                    sort_by_recency(&mut logs);
                    tracing::debug!(target: "prodigyhabit::app", count = logs.len(), "history loaded");
                    view.logs = logs;
                    view.loaded = true;
                    view.error = None;
                    let count = view.visible_count(model.settings.utc_offset);
                    view.selected = view.selected.min(count.saturating_sub(1));
                }
                Err(error) => view.error = Some(history_error(&error, LOAD_FAILED)),
            }
        }
        model.view = View::History(view);
        return (model, AppCommand::None);
    }

    if view.delete_pending == id {
        view.delete_pending = None;
        if let ApiOutcome::LogDeleted { id: log_id, result } = response.outcome {
            match result {
                Ok(()) => {
                    view.logs.retain(|log| log.id != log_id);
                    let count = view.visible_count(model.settings.utc_offset);
                    view.selected = view.selected.min(count.saturating_sub(1));
                    model.notice = Some("Log deleted".to_string());
                }
                Err(error) => view.error = Some(history_error(&error, DELETE_FAILED)),
            }
        }
        model.view = View::History(view);
        return (model, AppCommand::None);
    }

    drop_stale(&response);
    (model, AppCommand::None)
}

fn history_error(error: &ApiError, fallback: &str) -> InlineError {
    let inline = error.inline(fallback);
    if inline.kind == FailureKind::AuthRequired {
        return InlineError {
            kind: FailureKind::AuthRequired,
            message: "Log in to see your history.".to_string(),
        };
    }
    inline
}
