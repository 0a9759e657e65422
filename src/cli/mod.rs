use crate::domain::{
    ActivityLogId, DAYS_PER_WEEK, InitialAi, LifeForm, LifeInputError, Metric, Page, QuickInputError, Week,
    aggregate_week, format_date, initial_text, parse_date, parse_duration_minutes, summarize_week,
    validate_focus_input, weekday_short, weekly_average,
};
use crate::infra::{ApiClient, ApiError};
use crate::logging::{LogConfig, LogFormat};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use time::{Date, UtcOffset};

/// Flags accepted before the subcommand.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub log: LogConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Tui { options: GlobalOptions, page: Page },
    Command { options: GlobalOptions, command: CliCommand },
}

#[derive(Clone, Debug, PartialEq)]
pub enum CliCommand {
    Status,
    History { week_of: Option<Date> },
    Summary { week_of: Option<Date> },
    Feedback,
    Delete { id: ActivityLogId },
    LogFocus { task: String, minutes: u32 },
    LogLife { sleep_hours: f64, screen_time: u32, mood: u8 },
    Logout,
}

#[derive(Debug, Error, PartialEq)]
pub enum CliParseError {
    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("missing required flag: {0}")]
    MissingFlag(String),

    #[error("invalid value for {flag}: {value}")]
    InvalidFlagValue { flag: String, value: String },

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

pub fn parse_invocation(args: &[String]) -> Result<CliInvocation, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    let mut iter = args.iter().skip(1).peekable();
    let mut config: Option<PathBuf> = None;
    let mut verbose = false;
    let mut debug = false;
    let mut quiet = false;
    let mut format = LogFormat::default();
    let mut page: Option<Page> = None;

    while let Some(arg) = iter.peek() {
        match arg.as_str() {
            "--config" | "-c" => {
                let _ = iter.next();
                let value = iter
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--config".to_string()))?;
                config = Some(PathBuf::from(value));
            }
            "--verbose" | "-v" => {
                let _ = iter.next();
                verbose = true;
            }
            "--debug" => {
                let _ = iter.next();
                debug = true;
            }
            "--quiet" | "-q" => {
                let _ = iter.next();
                quiet = true;
            }
            "--log-format" => {
                let _ = iter.next();
                let value = iter
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--log-format".to_string()))?;
                format = value.parse().map_err(|_| invalid("--log-format", value))?;
            }
            "--page" | "-p" => {
                let _ = iter.next();
                let value = iter
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--page".to_string()))?;
                page = Some(Page::from_name(value).ok_or_else(|| invalid("--page", value))?);
            }
            "--" => {
                let _ = iter.next();
                break;
            }
            other if other.starts_with('-') => return Err(CliParseError::UnknownFlag(other.to_string())),
            _ => break,
        }
    }

    let options = GlobalOptions {
        config,
        log: LogConfig::from_flags(verbose, debug, quiet, format),
    };

    let Some(subcommand) = iter.next() else {
        return Ok(CliInvocation::Tui {
            options,
            page: page.unwrap_or(Page::Home),
        });
    };
    if page.is_some() {
        return Err(CliParseError::UnexpectedArgument("--page".to_string()));
    }

    let mut args = iter;
    let command = match subcommand.as_str() {
        "status" => {
            expect_end(&mut args)?;
            CliCommand::Status
        }
        "history" => CliCommand::History {
            week_of: parse_week_of(&mut args)?,
        },
        "summary" => CliCommand::Summary {
            week_of: parse_week_of(&mut args)?,
        },
        "feedback" => {
            expect_end(&mut args)?;
            CliCommand::Feedback
        }
        "delete" => {
            let value = args
                .next()
                .ok_or_else(|| CliParseError::MissingFlagValue("ID".to_string()))?;
            let id = value.parse::<i64>().map_err(|_| invalid("ID", value))?;
            expect_end(&mut args)?;
            CliCommand::Delete {
                id: ActivityLogId::new(id),
            }
        }
        "log-focus" => {
            let mut task: Option<String> = None;
            let mut minutes: Option<u32> = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--task" | "-t" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue("--task".to_string()))?;
                        task = Some(value.to_string());
                    }
                    "--minutes" | "-m" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue("--minutes".to_string()))?;
                        minutes = Some(parse_duration_minutes(value).map_err(|_| invalid("--minutes", value))?);
                    }
                    _ if arg.starts_with('-') => return Err(CliParseError::UnknownFlag(arg.to_string())),
                    _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
                }
            }
            CliCommand::LogFocus {
                task: task.ok_or_else(|| CliParseError::MissingFlag("--task".to_string()))?,
                minutes: minutes.ok_or_else(|| CliParseError::MissingFlag("--minutes".to_string()))?,
            }
        }
        "log-life" => {
            let mut sleep_hours: Option<f64> = None;
            let mut screen_time: Option<u32> = None;
            let mut mood: Option<u8> = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--sleep" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue("--sleep".to_string()))?;
                        sleep_hours = Some(value.parse().map_err(|_| invalid("--sleep", value))?);
                    }
                    "--screen" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue("--screen".to_string()))?;
                        screen_time = Some(value.parse().map_err(|_| invalid("--screen", value))?);
                    }
                    "--mood" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue("--mood".to_string()))?;
                        mood = Some(value.parse().map_err(|_| invalid("--mood", value))?);
                    }
                    _ if arg.starts_with('-') => return Err(CliParseError::UnknownFlag(arg.to_string())),
                    _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
                }
            }
            CliCommand::LogLife {
                sleep_hours: sleep_hours.ok_or_else(|| CliParseError::MissingFlag("--sleep".to_string()))?,
                screen_time: screen_time.ok_or_else(|| CliParseError::MissingFlag("--screen".to_string()))?,
                mood: mood.ok_or_else(|| CliParseError::MissingFlag("--mood".to_string()))?,
            }
        }
        "logout" => {
            expect_end(&mut args)?;
            CliCommand::Logout
        }
        other => return Err(CliParseError::UnknownSubcommand(other.to_string())),
    };

    Ok(CliInvocation::Command { options, command })
}

fn invalid(flag: &str, value: &str) -> CliParseError {
    CliParseError::InvalidFlagValue {
        flag: flag.to_string(),
        value: value.to_string(),
    }
}

fn expect_end<'a>(args: &mut impl Iterator<Item = &'a String>) -> Result<(), CliParseError> {
    match args.next() {
        None => Ok(()),
        Some(arg) if arg.starts_with('-') => Err(CliParseError::UnknownFlag(arg.to_string())),
        Some(arg) => Err(CliParseError::UnexpectedArgument(arg.to_string())),
    }
}

fn parse_week_of<'a>(args: &mut impl Iterator<Item = &'a String>) -> Result<Option<Date>, CliParseError> {
    let mut week_of = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--week-of" | "-w" => {
                let value = args
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--week-of".to_string()))?;
                week_of = Some(parse_date(value).ok_or_else(|| invalid("--week-of", value))?);
            }
            _ if arg.starts_with('-') => return Err(CliParseError::UnknownFlag(arg.to_string())),
            _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
        }
    }
    Ok(week_of)
}

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("not logged in\nHint: set session_cookie in the config file or PRODIGYHABIT_SESSION.")]
    LoginRequired,

    #[error("{0}")]
    RateLimited(String),

    #[error(transparent)]
    Api(ApiError),

    #[error(transparent)]
    FocusInput(#[from] QuickInputError),

    #[error(transparent)]
    LifeInput(#[from] LifeInputError),

    #[error(transparent)]
    WriteOutput(#[from] io::Error),
}

impl From<ApiError> for CliRunError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => Self::LoginRequired,
            ApiError::RateLimited { message, .. } => Self::RateLimited(message),
            other => Self::Api(other),
        }
    }
}

/// Dates the subcommands resolve weeks against.
#[derive(Clone, Copy, Debug)]
pub struct CliContext {
    pub today: Date,
    pub utc_offset: UtcOffset,
}

pub fn run(command: CliCommand, client: &ApiClient, context: CliContext) -> Result<(), CliRunError> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    tracing::debug!(target: "prodigyhabit::cli", ?command, "running subcommand");

    match command {
        CliCommand::Status => {
            client.check_session()?;
            write_line(&mut out, &format!("logged in\t{}", client.base_url()))?;
        }
        CliCommand::History { week_of } => {
            let logs = client.history()?;
            let reference = week_of.unwrap_or(context.today);
            let buckets = aggregate_week(&logs, reference, context.utc_offset);
            write_line(&mut out, &format!("week\t{}", buckets.week.label()))?;
            if buckets.is_empty() {
                write_line(&mut out, "no activity this week")?;
                flush_output(&mut out)?;
                return Ok(());
            }
            for day in &buckets.days {
                if !write_line(&mut out, &format!("{}\t{}", format_date(day.date), weekday_short(day.date)))? {
                    return Ok(());
                }
                for log in &day.logs {
                    let time = log
                        .local_time(context.utc_offset)
                        .format(time::macros::format_description!("[hour]:[minute]"))
                        .unwrap_or_default();
                    let line = format!("  {time}\t{}\t{}\t{}", log.kind().as_str(), log.id, log.describe());
                    if !write_line(&mut out, &line)? {
                        return Ok(());
                    }
                }
            }
        }
        CliCommand::Summary { week_of } => {
            let week = Week::containing(week_of.unwrap_or(context.today));
            let rows = client.dashboard(week)?;
            let days = summarize_week(&rows, week);
            for line in summary_lines(&days) {
                if !write_line(&mut out, &line)? {
                    return Ok(());
                }
            }
        }
        CliCommand::Feedback => {
            let text = client.feedback()?;
            write_line(&mut out, text.trim_end_matches('\n'))?;
        }
        CliCommand::Delete { id } => {
            client.delete_log(id)?;
            tracing::info!(target: "prodigyhabit::cli", log_id = id.get(), "log deleted");
            write_line(&mut out, &format!("deleted\t{id}"))?;
        }
        CliCommand::LogFocus { task, minutes } => {
            let submission = validate_focus_input(&task, minutes)?;
            let result = client.quick_focus(&submission)?;
            let text = initial_text(&InitialAi {
                message: result.ai_feedback,
                score: result.score,
            });
            write_line(&mut out, &text)?;
        }
        CliCommand::LogLife {
            sleep_hours,
            screen_time,
            mood,
        } => {
            let form = LifeForm::from_values(sleep_hours, screen_time, mood)?;
            let result = client.quick_life(&form.submission())?;
            write_line(&mut out, &result.ai_advice)?;
        }
        CliCommand::Logout => {
            client.logout()?;
            write_line(&mut out, "logged out")?;
        }
    }

    flush_output(&mut out)?;
    Ok(())
}

/// Tab-separated table with one row per day and a trailing average row.
fn summary_lines(days: &[crate::domain::DailyMetrics; DAYS_PER_WEEK]) -> Vec<String> {
    let mut lines = Vec::with_capacity(DAYS_PER_WEEK + 2);
    let header: Vec<&str> = Metric::ALL.iter().map(|metric| metric_column(*metric)).collect();
    lines.push(format!("date\tday\t{}", header.join("\t")));
    for day in days {
        let values: Vec<String> = Metric::ALL
            .iter()
            .map(|metric| format_value(day.value(*metric)))
            .collect();
        lines.push(format!("{}\t{}\t{}", format_date(day.date), weekday_short(day.date), values.join("\t")));
    }
    let averages: Vec<String> = Metric::ALL
        .iter()
        .map(|metric| format_value(weekly_average(days, *metric)))
        .collect();
    lines.push(format!("average\t\t{}", averages.join("\t")));
    lines
}

fn metric_column(metric: Metric) -> &'static str {
    match metric {
        Metric::Score => "score",
        Metric::Sleep => "sleep_hours",
        Metric::ScreenTime => "screen_time",
        Metric::Mood => "mood",
    }
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(value) if value.fract() == 0.0 => format!("{value:.0}"),
        Some(value) => format!("{value:.1}"),
        None => "-".to_string(),
    }
}

fn write_line(out: &mut impl Write, line: &str) -> io::Result<bool> {
    match writeln!(out, "{line}") {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(error) => Err(error),
    }
}

/// Output is buffered, so a reader that went away usually shows up here.
fn flush_output(out: &mut impl Write) -> io::Result<()> {
    match out.flush() {
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

pub fn help_text() -> String {
    format!(
        "{name} - terminal client for ProdigyHabit\n\n\
USAGE:\n  \
{name} [GLOBAL FLAGS] [--page PAGE]       Start the TUI\n  \
{name} [GLOBAL FLAGS] status              Check the session\n  \
{name} [GLOBAL FLAGS] history [--week-of DATE]   Print a week of logs\n  \
{name} [GLOBAL FLAGS] summary [--week-of DATE]   Print the weekly dashboard\n  \
{name} [GLOBAL FLAGS] feedback            Print AI feedback\n  \
{name} [GLOBAL FLAGS] delete ID           Delete a log\n  \
{name} [GLOBAL FLAGS] log-focus --task TEXT --minutes N\n  \
{name} [GLOBAL FLAGS] log-life --sleep HOURS --screen MINUTES --mood 1-5\n  \
{name} [GLOBAL FLAGS] logout\n  \
{name} --help | --version\n\n\
GLOBAL FLAGS:\n  \
--config PATH        Config file (default: $PRODIGYHABIT_CONFIG or <config dir>/prodigyhabit/config.toml)\n  \
--verbose, --debug, --quiet   Log level preset (RUST_LOG overrides)\n  \
--log-format FORMAT  text|json\n\n\
PAGES:\n  \
home, focus, lounge, history, graph, feedback\n\n\
OUTPUT:\n  \
history: date<TAB>weekday, then  time<TAB>kind<TAB>id<TAB>summary per log\n  \
summary: date<TAB>day<TAB>score<TAB>sleep_hours<TAB>screen_time<TAB>mood (- for no data)\n\n\
ENV:\n  \
PRODIGYHABIT_API_URL    Backend base URL (default: http://localhost:5000/api)\n  \
PRODIGYHABIT_SESSION    Session cookie value\n  \
PRODIGYHABIT_STATE_DIR  Log directory (default: ~/.prodigyhabit)\n",
        name = env!("CARGO_PKG_NAME")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DailyMetrics;
    use crate::logging::LogPreset;
    use time::macros::date;

    /// Accepts writes, then fails every flush with `kind`.
    struct FailingFlush(io::ErrorKind);

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(self.0))
        }
    }

    /// Fails every write with a closed pipe.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn command(values: &[&str]) -> CliCommand {
        match parse_invocation(&args(values)).expect("parse") {
            CliInvocation::Command { command, .. } => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_starts_tui_on_home() {
        let parsed = parse_invocation(&args(&["prodigyhabit"])).expect("parse");
        assert_eq!(
            parsed,
            CliInvocation::Tui {
                options: GlobalOptions::default(),
                page: Page::Home,
            }
        );
    }

    #[test]
    fn global_flags_are_collected() {
        let parsed = parse_invocation(&args(&[
            "prodigyhabit",
            "--config",
            "/tmp/ph.toml",
            "--debug",
            "--log-format",
            "json",
            "--page",
            "/graph",
        ]))
        .expect("parse");
        let CliInvocation::Tui { options, page } = parsed else {
            panic!("expected tui");
        };
        assert_eq!(page, Page::Graph);
        assert_eq!(options.config, Some(PathBuf::from("/tmp/ph.toml")));
        assert_eq!(options.log.preset, LogPreset::Debug);
        assert_eq!(options.log.format, LogFormat::Json);
    }

    #[test]
    fn help_wins_anywhere() {
        let parsed = parse_invocation(&args(&["prodigyhabit", "history", "--help"])).expect("parse");
        assert_eq!(parsed, CliInvocation::PrintHelp);
    }

    #[test]
    fn history_and_summary_accept_week_of() {
        assert_eq!(
            command(&["prodigyhabit", "history", "--week-of", "2025-07-09"]),
            CliCommand::History {
                week_of: Some(date!(2025-07-09))
            }
        );
        assert_eq!(command(&["prodigyhabit", "summary"]), CliCommand::Summary { week_of: None });
    }

    #[test]
    fn bad_date_is_rejected() {
        let error = parse_invocation(&args(&["prodigyhabit", "summary", "--week-of", "July"])).expect_err("error");
        assert_eq!(
            error,
            CliParseError::InvalidFlagValue {
                flag: "--week-of".to_string(),
                value: "July".to_string(),
            }
        );
    }

    #[test]
    fn log_focus_requires_both_flags() {
        assert_eq!(
            command(&["prodigyhabit", "log-focus", "--task", "Write tests", "--minutes", "45"]),
            CliCommand::LogFocus {
                task: "Write tests".to_string(),
                minutes: 45,
            }
        );
        let error = parse_invocation(&args(&["prodigyhabit", "log-focus", "--task", "x"])).expect_err("error");
        assert_eq!(error, CliParseError::MissingFlag("--minutes".to_string()));
    }

    #[test]
    fn log_life_parses_values() {
        assert_eq!(
            command(&["prodigyhabit", "log-life", "--sleep", "7.5", "--screen", "90", "--mood", "4"]),
            CliCommand::LogLife {
                sleep_hours: 7.5,
                screen_time: 90,
                mood: 4,
            }
        );
    }

    #[test]
    fn delete_needs_numeric_id() {
        assert_eq!(
            command(&["prodigyhabit", "delete", "42"]),
            CliCommand::Delete {
                id: ActivityLogId::new(42)
            }
        );
        assert!(parse_invocation(&args(&["prodigyhabit", "delete", "abc"])).is_err());
    }

    #[test]
    fn page_flag_conflicts_with_subcommand() {
        let error = parse_invocation(&args(&["prodigyhabit", "--page", "focus", "status"])).expect_err("error");
        assert_eq!(error, CliParseError::UnexpectedArgument("--page".to_string()));
    }

    #[test]
    fn unknown_subcommand_and_flag() {
        assert_eq!(
            parse_invocation(&args(&["prodigyhabit", "sync"])),
            Err(CliParseError::UnknownSubcommand("sync".to_string()))
        );
        assert_eq!(
            parse_invocation(&args(&["prodigyhabit", "status", "--all"])),
            Err(CliParseError::UnknownFlag("--all".to_string()))
        );
    }

    #[test]
    fn unauthorized_maps_to_login_hint() {
        let error = CliRunError::from(ApiError::Unauthorized);
        assert!(matches!(error, CliRunError::LoginRequired));
        assert!(error.to_string().contains("PRODIGYHABIT_SESSION"));
    }

    #[test]
    fn summary_table_marks_missing_days() {
        let week = Week::containing(date!(2025-07-09));
        let mut days = week.days().map(DailyMetrics::empty);
        days[0].score = Some(80.0);
        days[0].sleep_hours = Some(7.5);
        let lines = summary_lines(&days);
        assert_eq!(lines[0], "date\tday\tscore\tsleep_hours\tscreen_time\tmood");
        assert_eq!(lines[1], "2025-07-07\tMon\t80\t7.5\t-\t-");
        assert_eq!(lines[2], "2025-07-08\tTue\t-\t-\t-\t-");
        assert_eq!(lines[8], "average\t\t80\t7.5\t-\t-");
    }

    #[test]
    fn closed_pipe_is_not_an_output_error() {
        let mut buffered = io::BufWriter::new(FailingFlush(io::ErrorKind::BrokenPipe));
        assert!(write_line(&mut buffered, "week\t2025-07-07 - 2025-07-13").expect("buffered write"));
        assert!(flush_output(&mut buffered).is_ok());

        assert!(!write_line(&mut ClosedPipe, "line").expect("closed pipe"));
    }

    #[test]
    fn other_flush_errors_still_fail() {
        let mut out = FailingFlush(io::ErrorKind::PermissionDenied);
        let error = flush_output(&mut out).expect_err("permission error");
        assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
    }
}
