mod markdown;
mod theme;

use crate::app::{
    AppModel, ChatPanel, DeleteConfirm, FeedbackView, FocusView, GraphView, HistoryView, HomeEntry, HomeView,
    LineEditor, LoungeStage, LoungeView, QuickField, SessionState, SettingsField, View, chat_layout,
};
use crate::domain::{
    ChatKind, DAYS_PER_WEEK, DailyMetrics, ErrorSlot, FocusStage, HubChoice, InlineError, LifeField, Metric, Page,
    Sender, format_date, weekday_short, weekly_average,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use unicode_width::UnicodeWidthStr;

pub fn render(frame: &mut Frame, model: &AppModel) {
    let full_area = frame.area();
    if full_area.width == 0 || full_area.height == 0 {
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(full_area);

    render_tab_bar(frame, chunks[0], model);

    let content = inner_area(chunks[1]);
    match &model.view {
        View::Home(view) => render_home(frame, content, model, view),
        View::Focus(view) => render_focus(frame, content, model, view),
        View::Lounge(view) => render_lounge(frame, content, view),
        View::History(view) => render_history(frame, content, model, view),
        View::Graph(view) => render_graph(frame, content, view),
        View::Feedback(view) => render_feedback(frame, content, view),
    }

    render_footer(frame, chunks[2], model);

    if let View::History(view) = &model.view {
        if let Some(confirm) = &view.confirm {
            render_delete_confirm_overlay(frame, chunks[1], confirm);
        }
    }

    if model.help_open {
        render_help_overlay(frame, chunks[1], model.view.page());
    }
}

fn render_tab_bar(frame: &mut Frame, area: Rect, model: &AppModel) {
    let base = Style::default().fg(theme::MUTED).bg(theme::BAR_BG);
    let current = model.view.page();

    let mut spans = vec![Span::styled(
        " ProdigyHabit ",
        Style::default()
            .fg(theme::ACCENT)
            .bg(theme::BAR_BG)
            .add_modifier(Modifier::BOLD),
    )];
    for page in Page::ALL {
        let style = if page == current {
            theme::selected()
        } else {
            base
        };
        spans.push(Span::styled(format!(" {} ", page.title()), style));
    }

    let status_style = match &model.session {
        SessionState::Active => Style::default().fg(theme::SUCCESS).bg(theme::BAR_BG),
        SessionState::Checking => base,
        _ => Style::default().fg(theme::WARNING).bg(theme::BAR_BG),
    };
    let status = format!(" ● {} ", model.session.label());

    let used: usize = spans.iter().map(Span::width).sum();
    let remaining = (area.width as usize).saturating_sub(used);
    if remaining > status.width() {
        spans.push(Span::styled(" ".repeat(remaining - status.width()), base));
        spans.push(Span::styled(status, status_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(base), area);
}

fn render_footer(frame: &mut Frame, area: Rect, model: &AppModel) {
    let keys = footer_keys(&model.view);
    let mut text = keys.to_string();
    if let Some(notice) = model.notice.as_deref().filter(|notice| !notice.trim().is_empty()) {
        text.push_str("  ·  ");
        text.push_str(notice);
    }
    let text = truncate_end(&text, area.width as usize);
    frame.render_widget(Paragraph::new(text).style(theme::hint()), area);
}

fn footer_keys(view: &View) -> &'static str {
    match view {
        View::Home(_) => "Keys: ↑/↓=move  Enter=open  Tab=next page  F1/?=help  q=quit",
        View::Focus(view) => match view.flow.stage() {
            FocusStage::Hub => "Keys: ↑/↓=move  1-3/Enter=choose  Tab=next page  F1=help  Ctrl+C=quit",
            FocusStage::Pomodoro { .. } if view.timer.is_none() => {
                "Keys: ↑/↓=field  ←/→=±1  PgUp/PgDn=±5  Enter=start  Esc=back"
            }
            FocusStage::Pomodoro { .. } => {
                "Keys: Space=start/pause  r=restart  c=complete  s=switch type  Esc=back"
            }
            FocusStage::QuickInput => "Keys: ↑/↓=field  Enter=submit  F2=skip to chat  Esc=back",
            _ => "Keys: Enter=send  PgUp/PgDn=scroll  Esc=back",
        },
        View::Lounge(view) => match view.stage {
            LoungeStage::QuickInput => "Keys: ↑/↓=field  ←/→=adjust  Enter=submit  F2=skip to chat  Tab=next page",
            LoungeStage::Chat => "Keys: Enter=send  PgUp/PgDn=scroll  Esc=back to sliders",
        },
        View::History(_) => "Keys: ↑/↓=move  ←/→=week  t=this week  d=delete  r=reload  ?=help  q=quit",
        View::Graph(_) => "Keys: ←/→=week  t=this week  r=reload  ?=help  q=quit",
        View::Feedback(_) => "Keys: ↑/↓/PgUp/PgDn=scroll  r=reload  ?=help  q=quit",
    }
}

fn render_home(frame: &mut Frame, area: Rect, model: &AppModel, view: &HomeView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let mut intro = vec![
        Line::from(Span::styled("Build better focus, one session at a time.", theme::title())),
        Line::from(Span::styled(
            "Track focus sessions, log how you live, and get weekly AI feedback.",
            Style::default().fg(theme::MUTED),
        )),
    ];
    if model.login_required {
        intro.push(Line::from(""));
        intro.push(Line::from(Span::styled(
            "Please log in to continue. Set a session cookie in the config file or PRODIGYHABIT_SESSION.",
            Style::default().fg(theme::WARNING).add_modifier(Modifier::BOLD),
        )));
    }
    frame.render_widget(Paragraph::new(intro).wrap(Wrap { trim: false }), chunks[0]);

    let entries = HomeView::entries(model.has_session);
    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| match entry {
            HomeEntry::Page(page) => {
                let lock = if page_requires_login(*page) && !model.has_session {
                    "  (login required)"
                } else {
                    ""
                };
                ListItem::new(Line::from(vec![
                    Span::styled(page.title().to_string(), Style::default().fg(theme::FG)),
                    Span::styled(lock, theme::hint()),
                ]))
            }
            HomeEntry::Logout => ListItem::new(Line::from(Span::styled("Log out", Style::default().fg(theme::ERROR)))),
        })
        .collect();

    let list = List::new(items)
        .block(theme::block("Go to"))
        .highlight_style(theme::selected())
        .highlight_symbol("› ");
    let mut state = ListState::default().with_selected(Some(view.selected.min(entries.len().saturating_sub(1))));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn page_requires_login(page: Page) -> bool {
    crate::domain::is_protected_path(page.path())
}

fn render_focus(frame: &mut Frame, area: Rect, model: &AppModel, view: &FocusView) {
    match view.flow.stage() {
        FocusStage::Hub => render_focus_hub(frame, area, view),
        FocusStage::Pomodoro { session_type, .. } => match &view.timer {
            None => render_pomodoro_settings(frame, area, view),
            Some(active) => {
                let block = theme::block(active.session_type.label());
                let inner = block.inner(area);
                frame.render_widget(block, area);
                let timer = active.timer;
                let status = if timer.is_running() {
                    "running"
                } else if timer.is_paused() {
                    "paused"
                } else if timer.is_finished() {
                    "finished"
                } else {
                    "ready"
                };

                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(1),
                        Constraint::Length(2),
                        Constraint::Length(3),
                        Constraint::Min(0),
                    ])
                    .split(inner);

                frame.render_widget(
                    Paragraph::new(format!("{} session · {status}", session_type.label()))
                        .style(Style::default().fg(theme::MUTED))
                        .alignment(Alignment::Center),
                    chunks[0],
                );
                frame.render_widget(
                    Paragraph::new(timer.display_text(model.now))
                        .style(theme::title().fg(theme::ACCENT))
                        .alignment(Alignment::Center),
                    chunks[1],
                );
                let gauge = Gauge::default()
                    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(theme::BORDER)))
                    .gauge_style(Style::default().fg(theme::ACCENT).bg(theme::BAR_BG))
                    .ratio(timer.progress(model.now))
                    .label(format!("{} min", timer.duration().minutes()));
                frame.render_widget(gauge, chunks[2]);
            }
        },
        FocusStage::QuickInput => render_focus_quick_input(frame, area, view),
        FocusStage::ChatManual { .. } | FocusStage::ChatPostPomodoro { .. } => {
            if let Some(chat) = &view.chat {
                render_chat(frame, area, chat);
            }
        }
    }
}

fn render_focus_hub(frame: &mut Frame, area: Rect, view: &FocusView) {
    let items: Vec<ListItem> = HubChoice::ALL
        .iter()
        .enumerate()
        .map(|(index, choice)| {
            ListItem::new(vec![
                Line::from(Span::styled(format!("{}. {}", index + 1, choice.label()), theme::title())),
                Line::from(Span::styled(
                    format!("   {}", choice.description()),
                    Style::default().fg(theme::MUTED),
                )),
            ])
        })
        .collect();
    let list = List::new(items)
        .block(theme::block("How do you want to log focus?"))
        .highlight_style(theme::selected());
    let mut state = ListState::default().with_selected(Some(view.hub_selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_pomodoro_settings(frame: &mut Frame, area: Rect, view: &FocusView) {
    let row = |label: &str, minutes: u32, selected: bool| {
        let style = if selected {
            theme::selected()
        } else {
            Style::default().fg(theme::FG)
        };
        Line::from(vec![
            Span::styled(format!("{label:<8}"), style),
            Span::styled(format!("◀ {minutes:>3} min ▶"), style),
        ])
    };
    let lines = vec![
        row("Focus", view.settings.focus.minutes(), view.settings.field == SettingsField::Focus),
        row("Break", view.settings.rest.minutes(), view.settings.field == SettingsField::Break),
        Line::from(""),
        Line::from(Span::styled("Press Enter to start the timer.", theme::hint())),
    ];
    frame.render_widget(Paragraph::new(lines).block(theme::block("Pomodoro settings")), area);
}

fn render_focus_quick_input(frame: &mut Frame, area: Rect, view: &FocusView) {
    let form = &view.quick;
    let block = theme::block("Quick input");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let task_focused = form.field == QuickField::Task && form.pending.is_none();
    let duration_focused = form.field == QuickField::Duration && form.pending.is_none();
    render_input(frame, chunks[0], "What did you work on?", &form.task, task_focused);
    render_input(frame, chunks[1], "Minutes", &form.duration, duration_focused);

    let status = if form.pending.is_some() {
        Line::from(Span::styled("Scoring your session…", Style::default().fg(theme::MUTED)))
    } else {
        error_line(&form.error)
    };
    frame.render_widget(Paragraph::new(status), chunks[2]);
}

fn render_lounge(frame: &mut Frame, area: Rect, view: &LoungeView) {
    if view.stage == LoungeStage::Chat {
        if let Some(chat) = &view.chat {
            render_chat(frame, area, chat);
        }
        return;
    }

    let block = theme::block("How was your day?");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let slider_width = (inner.width as usize).saturating_sub(30).clamp(10, 40);
    let mut lines = Vec::new();
    for field in LifeField::ALL {
        let selected = field == view.field;
        let label_style = if selected {
            theme::selected()
        } else {
            Style::default().fg(theme::FG)
        };
        let (value, max) = match field {
            LifeField::Sleep => (view.form.sleep_hours(), 12.0),
            LifeField::ScreenTime => (f64::from(view.form.screen_time()), 600.0),
            LifeField::Mood => (f64::from(view.form.mood()), 5.0),
        };
        let filled = ((value / max) * slider_width as f64).round() as usize;
        let filled = filled.min(slider_width);
        lines.push(Line::from(vec![
            Span::styled(format!("{:<12}", field.label()), label_style),
            Span::styled("█".repeat(filled), Style::default().fg(theme::ACCENT)),
            Span::styled("░".repeat(slider_width - filled), Style::default().fg(theme::BORDER)),
            Span::raw("  "),
            Span::styled(view.form.value_text(field), Style::default().fg(theme::FG)),
        ]));
        lines.push(Line::from(""));
    }

    if view.pending.is_some() {
        lines.push(Line::from(Span::styled("Asking for advice…", Style::default().fg(theme::MUTED))));
    } else {
        lines.push(error_line(&view.error));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_chat(frame: &mut Frame, area: Rect, chat: &ChatPanel) {
    let title = match chat.kind() {
        ChatKind::FocusManual => "Focus chat".to_string(),
        ChatKind::FocusPostPomodoro { completed_minutes } => format!("Focus chat · {completed_minutes} min session"),
        ChatKind::Lounge => "Lounge chat".to_string(),
    };

    let chunks = chat_layout(area);

    let lines: Vec<Line> = chat
        .transcript_lines()
        .into_iter()
        .map(|(sender, text)| match sender {
            Some(sender) => {
                let color = match sender {
                    Sender::User => theme::USER,
                    Sender::Ai => theme::AI,
                };
                Line::from(Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD)))
            }
            None => Line::from(Span::styled(text, Style::default().fg(theme::FG))),
        })
        .collect();

    let block = theme::block(&title);
    let transcript_inner = block.inner(chunks[0]);
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    let total = paragraph.line_count(transcript_inner.width) as u16;
    let bottom = total.saturating_sub(transcript_inner.height);
    let scroll = bottom.saturating_sub(chat.scroll_back);
    frame.render_widget(paragraph.block(block).scroll((scroll, 0)), chunks[0]);

    let status = if chat.is_busy() {
        Line::from(Span::styled("AI is typing…", Style::default().fg(theme::MUTED)))
    } else if chat.session.is_saved() {
        let hint = match chat.kind() {
            ChatKind::FocusPostPomodoro { .. } => "Session saved. Press Enter or b to start your break.",
            _ => "Session saved. Press Esc to go back.",
        };
        Line::from(Span::styled(hint, Style::default().fg(theme::SUCCESS)))
    } else {
        error_line(&chat.error)
    };
    frame.render_widget(Paragraph::new(status), chunks[1]);

    let input_title = match chat.input.max_chars() {
        Some(max) => format!("Message {}/{max}", chat.input.char_count()),
        None => "Message".to_string(),
    };
    render_input(frame, chunks[2], &input_title, &chat.input, chat.accepts_input());
}

fn render_input(frame: &mut Frame, area: Rect, title: &str, editor: &LineEditor, focused: bool) {
    let border = if focused { theme::ACCENT } else { theme::BORDER };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);
    let inner = block.inner(area);

    let before_cursor: String = editor.text.chars().take(editor.cursor_col).collect();
    let cursor_offset = before_cursor.width() as u16;
    let scroll_x = cursor_offset.saturating_sub(inner.width.saturating_sub(1));

    frame.render_widget(
        Paragraph::new(editor.text.as_str())
            .style(Style::default().fg(theme::FG))
            .scroll((0, scroll_x))
            .block(block),
        area,
    );

    if focused && inner.width > 0 && inner.height > 0 {
        frame.set_cursor_position((inner.x + cursor_offset - scroll_x, inner.y));
    }
}

fn error_line(slot: &ErrorSlot) -> Line<'static> {
    match slot.get() {
        Some(error) => inline_error_line(error),
        None => Line::from(""),
    }
}

fn inline_error_line(error: &InlineError) -> Line<'static> {
    let color = if error.is_rate_limited() {
        theme::WARNING
    } else {
        theme::ERROR
    };
    Line::from(Span::styled(error.message.clone(), Style::default().fg(color)))
}

fn render_history(frame: &mut Frame, area: Rect, model: &AppModel, view: &HistoryView) {
    let offset = model.settings.utc_offset;
    let buckets = view.buckets(offset);
    let title = format!("History · {}", view.week().label());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let status = if view.load_pending.is_some() {
        Line::from(Span::styled("Loading history…", Style::default().fg(theme::MUTED)))
    } else if view.delete_pending.is_some() {
        Line::from(Span::styled("Deleting…", Style::default().fg(theme::MUTED)))
    } else if let Some(error) = &view.error {
        inline_error_line(error)
    } else {
        let count = buckets.total_logs();
        Line::from(Span::styled(
            format!("{count} log{} this week", if count == 1 { "" } else { "s" }),
            theme::hint(),
        ))
    };
    frame.render_widget(Paragraph::new(status), chunks[0]);

    let width = chunks[1].width.saturating_sub(6) as usize;
    let mut items: Vec<ListItem> = Vec::new();
    let mut selected_row = None;
    let mut log_index = 0usize;
    for day in &buckets.days {
        let is_today = day.date == model.settings.today;
        let header_style = if is_today {
            theme::title().fg(theme::ACCENT)
        } else {
            theme::title()
        };
        items.push(ListItem::new(Line::from(Span::styled(
            format!("{} {}", weekday_short(day.date), format_date(day.date)),
            header_style,
        ))));
        if day.logs.is_empty() {
            items.push(ListItem::new(Line::from(Span::styled("  no activity", theme::hint()))));
            continue;
        }
        for log in &day.logs {
            if log_index == view.selected {
                selected_row = Some(items.len());
            }
            log_index += 1;

            let time = log
                .local_time(offset)
                .format(time::macros::format_description!("[hour]:[minute]"))
                .unwrap_or_default();
            let (tag, color) = match log.kind() {
                crate::domain::LogKind::Focus => ("focus", theme::ACCENT),
                crate::domain::LogKind::Life => ("life ", theme::SUCCESS),
            };
            let mut spans = vec![
                Span::styled(format!("  {time} "), Style::default().fg(theme::MUTED)),
                Span::styled(format!("{tag} "), Style::default().fg(color)),
                Span::styled(
                    truncate_end(&log.describe(), width.saturating_sub(14)),
                    Style::default().fg(theme::FG),
                ),
            ];
            if let crate::domain::LogEntry::Focus(data) = &log.entry {
                if let Some(score) = data.score {
                    spans.push(Span::styled(format!("  {score}/100"), theme::hint()));
                }
            }
            items.push(ListItem::new(Line::from(spans)));
        }
    }

    let list = List::new(items)
        .block(theme::block(&title))
        .highlight_style(theme::selected());
    let mut state = ListState::default().with_selected(selected_row);
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn render_delete_confirm_overlay(frame: &mut Frame, area: Rect, confirm: &DeleteConfirm) {
    let popup = centered_rect(60, 36, area);
    frame.render_widget(Clear, popup);

    let block = theme::block("Delete log");
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let message = vec![
        Line::from("Delete this log? This cannot be undone."),
        Line::from(""),
        Line::from(Span::styled(
            truncate_end(&confirm.label, inner.width as usize),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    frame.render_widget(Paragraph::new(message).wrap(Wrap { trim: false }), chunks[0]);

    let cancel_style = if confirm.confirm_selected {
        Style::default()
    } else {
        Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
    };
    let delete_style = if confirm.confirm_selected {
        Style::default().fg(theme::ERROR).add_modifier(Modifier::REVERSED | Modifier::BOLD)
    } else {
        Style::default().fg(theme::ERROR).add_modifier(Modifier::BOLD)
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[ Cancel ]", cancel_style),
            Span::raw("   "),
            Span::styled("[ Delete ]", delete_style),
        ]))
        .alignment(Alignment::Center),
        chunks[1],
    );
    frame.render_widget(
        Paragraph::new("←/→ choose  Enter confirm  Esc cancel  y/n")
            .style(theme::hint())
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn render_graph(frame: &mut Frame, area: Rect, view: &GraphView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let header = if view.pending.is_some() {
        Line::from(Span::styled(
            format!("Week {} · loading…", view.week.label()),
            Style::default().fg(theme::MUTED),
        ))
    } else if let Some(error) = &view.error {
        inline_error_line(error)
    } else {
        Line::from(Span::styled(format!("Week {}", view.week.label()), theme::title()))
    };
    frame.render_widget(Paragraph::new(header), chunks[0]);

    let Some(days) = &view.days else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(chunks[1]);
    let mut cells = Vec::new();
    for row in rows.iter() {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
            .split(*row);
        cells.extend(halves.iter().copied());
    }

    for (metric, cell) in Metric::ALL.into_iter().zip(cells) {
        render_metric_chart(frame, cell, metric, days);
    }
}

/// Bars are drawn in tenths so fractional values such as sleep hours keep
/// their height.
fn render_metric_chart(frame: &mut Frame, area: Rect, metric: Metric, days: &[DailyMetrics; DAYS_PER_WEEK]) {
    let average = weekly_average(days, metric)
        .map(|value| format!("avg {}", format_metric(metric, value)))
        .unwrap_or_else(|| "no data".to_string());
    let title = format!("{} ({}) · {average}", metric.label(), metric.unit());

    let bars: Vec<Bar> = days
        .iter()
        .map(|day| {
            let value = day.value(metric);
            Bar::default()
                .value(bar_height(metric, value))
                .text_value(value.map(|v| format_metric(metric, v)).unwrap_or_else(|| "-".to_string()))
                .label(Line::from(weekday_short(day.date)))
                .style(Style::default().fg(theme::ACCENT))
        })
        .collect();

    let inner_width = area.width.saturating_sub(4);
    let bar_width = (inner_width / DAYS_PER_WEEK as u16).saturating_sub(1).clamp(1, 9);

    let chart = BarChart::default()
        .block(theme::block(&title))
        .data(BarGroup::default().bars(&bars))
        .max(bar_height(metric, Some(metric.scale_max())))
        .bar_width(bar_width)
        .bar_gap(1)
        .value_style(Style::default().fg(theme::BAR_BG).bg(theme::ACCENT));
    frame.render_widget(chart, area);
}

fn bar_height(metric: Metric, value: Option<f64>) -> u64 {
    let Some(value) = value else {
        return 0;
    };
    (value.clamp(0.0, metric.scale_max()) * 10.0).round() as u64
}

fn format_metric(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Sleep | Metric::Mood => format!("{value:.1}"),
        Metric::Score | Metric::ScreenTime => format!("{value:.0}"),
    }
}

fn render_feedback(frame: &mut Frame, area: Rect, view: &FeedbackView) {
    let block = theme::block("Weekly feedback");

    let lines = if let Some(error) = &view.error {
        vec![inline_error_line(error)]
    } else if view.pending.is_some() {
        vec![Line::from(Span::styled(
            "Writing your feedback. This can take a moment…",
            Style::default().fg(theme::MUTED),
        ))]
    } else {
        match &view.text {
            Some(text) if !text.trim().is_empty() => markdown::render_lines(text),
            _ => vec![Line::from(Span::styled("No feedback yet.", theme::hint()))],
        }
    };

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((view.scroll, 0))
            .block(block),
        area,
    );
}

fn render_help_overlay(frame: &mut Frame, area: Rect, page: Page) {
    let popup = centered_rect(70, 70, area);
    frame.render_widget(Clear, popup);

    let mut text = vec![
        Line::from(Span::styled("Global", theme::title())),
        Line::from("  - Tab / Shift+Tab: next / previous page"),
        Line::from("  - F1: toggle this help"),
        Line::from("  - Ctrl+Q or Ctrl+C: quit"),
        Line::from(""),
        Line::from(Span::styled(page.title(), theme::title())),
    ];
    let specific: &[&str] = match page {
        Page::Home => &["  - ↑/↓ and Enter: open a page or log out"],
        Page::Focus => &[
            "  - Hub: 1 pomodoro, 2 quick input, 3 chat",
            "  - Timer: Space start/pause, r restart, c complete early",
            "  - Timer: s switches focus/break while running or paused",
            "  - Quick input: F2 skips to chat",
            "  - Esc: back to the hub",
        ],
        Page::Lounge => &[
            "  - ←/→ adjust the selected slider, Shift for bigger steps",
            "  - Enter: get advice, F2 or s: skip to chat",
            "  - Chat messages are limited to 200 characters",
        ],
        Page::History => &[
            "  - ←/→ or [ ]: previous / next week, t: this week",
            "  - d or Delete: delete the selected log",
            "  - r: reload",
        ],
        Page::Graph => &["  - ←/→: previous / next week, t: this week", "  - r: reload"],
        Page::Feedback => &["  - ↑/↓, PgUp/PgDn: scroll", "  - r: ask for new feedback"],
    };
    text.extend(specific.iter().map(|line| Line::from(*line)));

    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(theme::block("Help (Esc or ? to close)"));
    frame.render_widget(paragraph, popup);
}

fn inner_area(area: Rect) -> Rect {
    if area.width < 40 || area.height < 12 {
        return area;
    }
    area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    })
}

fn truncate_end(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if text.width() <= max_width {
        return text.to_string();
    }
    let available = max_width.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > available {
            break;
        }
        used += ch_width;
        out.push(ch);
    }
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
