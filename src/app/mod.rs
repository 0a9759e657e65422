mod chat;
mod feedback;
mod focus;
mod graph;
mod history;
mod line_editor;
mod lounge;

pub use chat::*;
pub use feedback::*;
pub use focus::*;
pub use graph::*;
pub use history::*;
pub use line_editor::*;
pub use lounge::*;

use crate::domain::{Page, RouteDecision, resolve_route};
use crate::infra::{ApiCall, ApiError, ApiOutcome, TimerDefaults};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use time::{Date, UtcOffset};

/// Identifies one in-flight request so late responses can be matched or dropped.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub request_id: RequestId,
    pub outcome: ApiOutcome,
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Paste(String),
    Tick(Instant),
    /// The local calendar date rolled over while the app was running.
    DateChanged(Date),
    Response(ApiResponse),
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppCommand {
    None,
    Quit,
    Request { id: RequestId, call: ApiCall },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// No session cookie is configured.
    Missing,
    Checking,
    Active,
    Rejected,
    Unreachable(String),
    LoggedOut,
}

impl SessionState {
    pub fn label(&self) -> &str {
        match self {
            Self::Missing => "not logged in",
            Self::Checking => "checking session",
            Self::Active => "logged in",
            Self::Rejected => "session expired",
            Self::Unreachable(_) => "backend unreachable",
            Self::LoggedOut => "logged out",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AppSettings {
    pub utc_offset: UtcOffset,
    pub today: Date,
    pub timer: TimerDefaults,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HomeEntry {
    Page(Page),
    Logout,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HomeView {
    pub selected: usize,
}

impl HomeView {
    pub fn entries(has_session: bool) -> Vec<HomeEntry> {
        let mut entries: Vec<HomeEntry> = Page::ALL
            .into_iter()
            .filter(|page| *page != Page::Home)
            .map(HomeEntry::Page)
            .collect();
        if has_session {
            entries.push(HomeEntry::Logout);
        }
        entries
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum View {
    Home(HomeView),
    Focus(FocusView),
    Lounge(LoungeView),
    History(HistoryView),
    Graph(GraphView),
    Feedback(FeedbackView),
}

impl View {
    pub fn page(&self) -> Page {
        match self {
            Self::Home(_) => Page::Home,
            Self::Focus(_) => Page::Focus,
            Self::Lounge(_) => Page::Lounge,
            Self::History(_) => Page::History,
            Self::Graph(_) => Page::Graph,
            Self::Feedback(_) => Page::Feedback,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppModel {
    pub view: View,
    pub settings: AppSettings,
    pub has_session: bool,
    pub session: SessionState,
    /// Set by a guarded redirect or any 401; shown as a banner on Home.
    pub login_required: bool,
    pub notice: Option<String>,
    pub help_open: bool,
    pub now: Instant,
    /// Columns and rows of the terminal, for scroll limits.
    pub terminal_size: (u16, u16),
    session_check: Option<RequestId>,
    logout_pending: Option<RequestId>,
    next_request: u64,
}

impl AppModel {
    pub fn new(settings: AppSettings, has_session: bool, now: Instant) -> Self {
        Self {
            view: View::Home(HomeView::default()),
            settings,
            has_session,
            session: if has_session {
                SessionState::Checking
            } else {
                SessionState::Missing
            },
            login_required: false,
            notice: None,
            help_open: false,
            now,
            terminal_size: (0, 0),
            session_check: None,
            logout_pending: None,
            next_request: 0,
        }
    }

    pub fn with_notice(mut self, notice: Option<String>) -> Self {
        self.notice = notice;
        self
    }

    pub fn with_terminal_size(mut self, width: u16, height: u16) -> Self {
        self.terminal_size = (width, height);
        self
    }

    fn next_request_id(&mut self) -> RequestId {
        self.next_request += 1;
        RequestId(self.next_request)
    }

    /// Allocates an id, marks `slot` in flight and builds the command.
    pub(crate) fn issue(&mut self, slot: &mut Option<RequestId>, call: ApiCall) -> AppCommand {
        let id = self.next_request_id();
        *slot = Some(id);
        tracing::debug!(target: "prodigyhabit::app", request = %id, call = call.name(), "issuing request");
        AppCommand::Request { id, call }
    }
}

/// Startup: the first page (through the route guard) plus the session check.
pub fn start(mut model: AppModel, page: Page) -> (AppModel, Vec<AppCommand>) {
    let mut commands = Vec::new();
    if model.has_session {
        let mut slot = None;
        commands.push(model.issue(&mut slot, ApiCall::CheckSession));
        model.session_check = slot;
    }
    let (model, command) = navigate(model, page);
    if command != AppCommand::None {
        commands.push(command);
    }
    (model, commands)
}

pub fn navigate(mut model: AppModel, page: Page) -> (AppModel, AppCommand) {
    model.help_open = false;
    match resolve_route(page.path(), model.has_session) {
        RouteDecision::Render(page) => open_page(model, page),
        RouteDecision::Redirect { to, login_required } => {
            tracing::info!(target: "prodigyhabit::app", page = page.path(), "redirecting to login prompt");
            model.login_required = login_required;
            model.view = View::Home(HomeView::default());
            if to != Page::Home {
                return open_page(model, to);
            }
            (model, AppCommand::None)
        }
        RouteDecision::NotFound => {
            model.notice = Some(format!("No page at {}", page.path()));
            (model, AppCommand::None)
        }
    }
}

fn open_page(mut model: AppModel, page: Page) -> (AppModel, AppCommand) {
    tracing::debug!(target: "prodigyhabit::app", page = page.path(), "open page");
    let today = model.settings.today;
    match page {
        Page::Home => {
            model.view = View::Home(HomeView::default());
            (model, AppCommand::None)
        }
        Page::Focus => {
            model.view = View::Focus(FocusView::new(&model.settings.timer));
            (model, AppCommand::None)
        }
        Page::Lounge => {
            model.view = View::Lounge(LoungeView::new());
            (model, AppCommand::None)
        }
        Page::History => {
            let mut view = HistoryView::new(today);
            let command = model.issue(&mut view.load_pending, ApiCall::History);
            model.view = View::History(view);
            (model, command)
        }
        Page::Graph => {
            let mut view = GraphView::new(today);
            let command = model.issue(&mut view.pending, ApiCall::Dashboard(view.week));
            model.view = View::Graph(view);
            (model, command)
        }
        Page::Feedback => {
            let mut view = FeedbackView::default();
            let command = model.issue(&mut view.pending, ApiCall::Feedback);
            model.view = View::Feedback(view);
            (model, command)
        }
    }
}

pub fn update(model: AppModel, event: AppEvent) -> (AppModel, AppCommand) {
    match event {
        AppEvent::Key(key) => update_on_key(model, key),
        AppEvent::Paste(text) => update_on_paste(model, &text),
        AppEvent::Tick(now) => update_on_tick(model, now),
        AppEvent::DateChanged(today) => update_on_date(model, today),
        AppEvent::Response(response) => update_on_response(model, response),
    }
}

fn update_on_key(mut model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    if key.kind == KeyEventKind::Release {
        return (model, AppCommand::None);
    }

    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
    {
        return (model, AppCommand::Quit);
    }

    model.notice = None;

    if key.code == KeyCode::F(1) {
        model.help_open = !model.help_open;
        return (model, AppCommand::None);
    }

    if model.help_open {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            model.help_open = false;
        }
        return (model, AppCommand::None);
    }

    match key.code {
        KeyCode::Tab => {
            let next = model.view.page().next();
            return navigate(model, next);
        }
        KeyCode::BackTab => {
            let prev = model.view.page().prev();
            return navigate(model, prev);
        }
        _ => {}
    }

    let view = model.view.clone();
    match view {
        View::Home(home_view) => update_home(model, home_view, key),
        View::Focus(focus_view) => update_focus(model, focus_view, key),
        View::Lounge(lounge_view) => update_lounge(model, lounge_view, key),
        View::History(history_view) => update_history(model, history_view, key),
        View::Graph(graph_view) => update_graph(model, graph_view, key),
        View::Feedback(feedback_view) => update_feedback(model, feedback_view, key),
    }
}

fn update_on_paste(model: AppModel, text: &str) -> (AppModel, AppCommand) {
    if model.help_open {
        return (model, AppCommand::None);
    }
    let view = model.view.clone();
    match view {
        View::Focus(focus_view) => paste_focus(model, focus_view, text),
        View::Lounge(lounge_view) => paste_lounge(model, lounge_view, text),
        _ => (model, AppCommand::None),
    }
}

fn update_on_tick(mut model: AppModel, now: Instant) -> (AppModel, AppCommand) {
    model.now = now;
    let view = model.view.clone();
    match view {
        View::Focus(focus_view) => tick_focus(model, focus_view, now),
        _ => (model, AppCommand::None),
    }
}

fn update_on_date(mut model: AppModel, today: Date) -> (AppModel, AppCommand) {
    if model.settings.today != today {
        tracing::info!(target: "prodigyhabit::app", from = %model.settings.today, to = %today, "date changed");
        model.settings.today = today;
    }
    (model, AppCommand::None)
}

fn update_on_response(mut model: AppModel, response: ApiResponse) -> (AppModel, AppCommand) {
    if matches!(response.outcome.error(), Some(ApiError::Unauthorized)) {
        model.login_required = true;
    }

    let id = response.request_id;
    if model.session_check == Some(id) {
        model.session_check = None;
        if let ApiOutcome::SessionChecked(result) = response.outcome {
            model.session = match result {
                Ok(()) => SessionState::Active,
                Err(ApiError::Unauthorized) => SessionState::Rejected,
                Err(error) => SessionState::Unreachable(error.to_string()),
            };
            tracing::info!(target: "prodigyhabit::app", session = model.session.label(), "session check finished");
        }
        return (model, AppCommand::None);
    }

    if model.logout_pending == Some(id) {
        model.logout_pending = None;
        if let ApiOutcome::LoggedOut(result) = response.outcome {
            return match result {
                Ok(()) => {
                    model.has_session = false;
                    model.session = SessionState::LoggedOut;
                    let (model, command) = navigate(model, Page::Home);
                    (model.with_notice(Some("Logged out".to_string())), command)
                }
                Err(error) => {
                    let notice = format!("Logout failed: {error}");
                    (model.with_notice(Some(notice)), AppCommand::None)
                }
            };
        }
        return (model, AppCommand::None);
    }

    let view = model.view.clone();
    match view {
        View::Focus(focus_view) => respond_focus(model, focus_view, response),
        View::Lounge(lounge_view) => respond_lounge(model, lounge_view, response),
        View::History(history_view) => respond_history(model, history_view, response),
        View::Graph(graph_view) => respond_graph(model, graph_view, response),
        View::Feedback(feedback_view) => respond_feedback(model, feedback_view, response),
        View::Home(_) => {
            drop_stale(&response);
            (model, AppCommand::None)
        }
    }
}

/// Logs a response that no widget is waiting for.
pub(crate) fn drop_stale(response: &ApiResponse) {
    tracing::debug!(
        target: "prodigyhabit::app",
        request = %response.request_id,
        "dropping response for a widget that is gone"
    );
}

fn update_home(mut model: AppModel, mut view: HomeView, key: KeyEvent) -> (AppModel, AppCommand) {
    let entries = HomeView::entries(model.has_session);
    match key.code {
        KeyCode::Char('q') => return (model, AppCommand::Quit),
        KeyCode::Char('?') => {
            model.help_open = true;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view.selected = view.selected.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view.selected = (view.selected + 1).min(entries.len().saturating_sub(1));
        }
        KeyCode::Enter => match entries.get(view.selected) {
            Some(HomeEntry::Page(page)) => return navigate(model, *page),
            Some(HomeEntry::Logout) => {
                if model.logout_pending.is_none() {
                    let mut slot = None;
                    let command = model.issue(&mut slot, ApiCall::Logout);
                    model.logout_pending = slot;
                    model.view = View::Home(view);
                    return (model, command);
                }
            }
            None => {}
        },
        _ => {}
    }
    model.view = View::Home(view);
    (model, AppCommand::None)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::TimerDuration;
    use time::macros::date;

    pub fn settings() -> AppSettings {
        AppSettings {
            utc_offset: UtcOffset::UTC,
            today: date!(2025-07-09),
            timer: TimerDefaults {
                focus: TimerDuration::saturating(25),
                rest: TimerDuration::saturating(5),
            },
        }
    }

    pub fn model(has_session: bool) -> AppModel {
        AppModel::new(settings(), has_session, Instant::now())
    }

    pub fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    pub fn type_text(mut model: AppModel, text: &str) -> AppModel {
        for ch in text.chars() {
            model = update(model, key(KeyCode::Char(ch))).0;
        }
        model
    }

    pub fn request_of(command: &AppCommand) -> (RequestId, ApiCall) {
        match command {
            AppCommand::Request { id, call } => (*id, call.clone()),
            other => panic!("expected a request, got {other:?}"),
        }
    }

    pub fn respond(model: AppModel, request_id: RequestId, outcome: ApiOutcome) -> (AppModel, AppCommand) {
        update(
            model,
            AppEvent::Response(ApiResponse {
                request_id,
                outcome,
            }),
        )
    }
}
