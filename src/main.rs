mod app;
mod cli;
mod domain;
mod infra;
mod logging;
mod ui;

use crate::app::{AppCommand, AppEvent, AppModel, AppSettings, ApiResponse, RequestId};
use crate::cli::{CliContext, CliInvocation, GlobalOptions};
use crate::domain::Page;
use crate::infra::{ApiCall, ApiClient, Config, ConfigError, open_log_file, resolve_state_dir};
use crate::logging::{LogConfig, LogSink};
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use crossterm::{ExecutableCommand, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout, Write};
use std::sync::mpsc::{Sender, channel};
use std::time::{Duration, Instant};
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    App(#[from] crate::app::AppError),

    #[error(transparent)]
    Cli(#[from] crate::cli::CliRunError),
}

/// Everything resolved from config before the first thread is spawned.
struct Startup {
    settings: AppSettings,
    client: ApiClient,
}

fn main() {
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let invocation = match crate::cli::parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            let _ = write!(err, "{}", crate::cli::help_text());
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            let mut out = io::stdout().lock();
            let _ = write!(out, "{}", crate::cli::help_text());
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Tui { options, page } => run_tui(&options, page),
        CliInvocation::Command { options, command } => {
            logging::init(&options.log, LogSink::Stderr);
            let startup = load_startup(&options)?;
            let context = CliContext {
                today: startup.settings.today,
                utc_offset: startup.settings.utc_offset,
            };
            crate::cli::run(command, &startup.client, context)?;
            Ok(())
        }
    }
}

fn load_startup(options: &GlobalOptions) -> Result<Startup, MainError> {
    let config = Config::load(options.config.as_deref())?;
    let timer = config.timer_defaults()?;
    // The local offset can only be read reliably while the process is single-threaded.
    let utc_offset = match config.utc_offset()? {
        Some(offset) => offset,
        None => UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
    };
    let today = OffsetDateTime::now_utc().to_offset(utc_offset).date();
    let client = ApiClient::new(
        &config.api_base_url,
        config.session_cookie.as_deref(),
        Duration::from_secs(config.request_timeout_secs),
    );

    tracing::info!(
        target: "prodigyhabit::startup",
        api = client.base_url(),
        has_session = client.has_session(),
        utc_offset = %utc_offset,
        %today,
        "configuration loaded"
    );

    Ok(Startup {
        settings: AppSettings {
            utc_offset,
            today,
            timer,
        },
        client,
    })
}

/// Logs go to a file while the TUI owns the terminal. Returns a notice when
/// that file cannot be opened.
fn init_file_logging(config: &LogConfig) -> Option<String> {
    let state_dir = match resolve_state_dir() {
        Ok(dir) => dir,
        Err(error) => return Some(format!("Logging disabled: {error}")),
    };
    match open_log_file(&state_dir) {
        Ok(file) => {
            logging::init(config, LogSink::File(file));
            None
        }
        Err(error) => Some(format!("Logging disabled: {error}")),
    }
}

fn run_tui(options: &GlobalOptions, page: Page) -> Result<(), MainError> {
    let log_notice = init_file_logging(&options.log);
    let startup = load_startup(options)?;

    let model = AppModel::new(startup.settings, startup.client.has_session(), Instant::now()).with_notice(log_notice);
    let (model, commands) = app::start(model, page);

    let mut terminal = setup_terminal()?;
    let result = run(&mut terminal, model, commands, &startup.client);
    let restored = restore_terminal(&mut terminal);
    result?;
    restored?;
    tracing::info!(target: "prodigyhabit::startup", "exited");
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, app::AppError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let _ = stdout.execute(EnableBracketedPaste);
    let keyboard_flags =
        KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES | KeyboardEnhancementFlags::REPORT_EVENT_TYPES;
    let _ = stdout.execute(PushKeyboardEnhancementFlags(keyboard_flags));
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), app::AppError> {
    disable_raw_mode()?;
    let _ = execute!(terminal.backend_mut(), DisableBracketedPaste, PopKeyboardEnhancementFlags);
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut model: AppModel,
    initial: Vec<AppCommand>,
    client: &ApiClient,
) -> Result<(), app::AppError> {
    let (response_tx, response_rx) = channel::<ApiResponse>();
    let size = terminal.size()?;
    model = model.with_terminal_size(size.width, size.height);

    for command in initial {
        if dispatch(command, client, &response_tx) {
            return Ok(());
        }
    }

    loop {
        while let Ok(response) = response_rx.try_recv() {
            let (next, command) = app::update(model, AppEvent::Response(response));
            model = next;
            if dispatch(command, client, &response_tx) {
                return Ok(());
            }
        }

        let (next, command) = app::update(model, AppEvent::Tick(Instant::now()));
        model = next;
        if dispatch(command, client, &response_tx) {
            return Ok(());
        }

        let today = OffsetDateTime::now_utc().to_offset(model.settings.utc_offset).date();
        if today != model.settings.today {
            let (next, _) = app::update(model, AppEvent::DateChanged(today));
            model = next;
        }

        terminal.draw(|frame| ui::render(frame, &model))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let event = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Release => continue,
            Event::Key(key) => AppEvent::Key(key),
            Event::Paste(text) => AppEvent::Paste(text),
            Event::Resize(width, height) => {
                model = model.with_terminal_size(width, height);
                continue;
            }
            _ => continue,
        };
        let (next, command) = app::update(model, event);
        model = next;
        if dispatch(command, client, &response_tx) {
            return Ok(());
        }
    }
}

/// Runs a command's side effect. Returns `true` when the app should exit.
fn dispatch(command: AppCommand, client: &ApiClient, tx: &Sender<ApiResponse>) -> bool {
    match command {
        AppCommand::None => false,
        AppCommand::Quit => true,
        AppCommand::Request { id, call } => {
            spawn_request(client.clone(), tx.clone(), id, call);
            false
        }
    }
}

fn spawn_request(client: ApiClient, tx: Sender<ApiResponse>, id: RequestId, call: ApiCall) {
    std::thread::spawn(move || {
        let outcome = client.perform(call);
        // The receiver is gone once the UI has exited.
        let _ = tx.send(ApiResponse {
            request_id: id,
            outcome,
        });
    });
}
