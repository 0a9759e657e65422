use super::theme;
use ratatui::prelude::*;

/// Renders the subset of markdown the feedback report uses: headings,
/// bullet and numbered lists, quotes, fenced blocks and inline bold/code.
pub fn render_lines(text: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut in_fence = false;

    for raw_line in text.lines() {
        let trimmed = raw_line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            lines.push(Line::from(Span::styled(
                raw_line.to_string(),
                Style::default().fg(theme::USER),
            )));
            continue;
        }

        let indent = &raw_line[..raw_line.len() - trimmed.len()];

        if let Some((level, heading)) = heading(trimmed) {
            let style = match level {
                1 => theme::title().fg(theme::ACCENT).add_modifier(Modifier::UNDERLINED),
                2 => theme::title().fg(theme::ACCENT),
                _ => theme::title(),
            };
            lines.push(Line::from(inline_spans(heading, style)));
            continue;
        }

        if let Some(quote) = trimmed.strip_prefix("> ") {
            let style = Style::default().fg(theme::MUTED);
            let mut spans = vec![Span::styled("│ ", style)];
            spans.extend(inline_spans(quote, style));
            lines.push(Line::from(spans));
            continue;
        }

        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            let mut spans = vec![
                Span::raw(indent.to_string()),
                Span::styled("• ", Style::default().fg(theme::ACCENT)),
            ];
            spans.extend(inline_spans(item, Style::default().fg(theme::FG)));
            lines.push(Line::from(spans));
            continue;
        }

        if let Some((number, item)) = numbered_item(trimmed) {
            let mut spans = vec![
                Span::raw(indent.to_string()),
                Span::styled(format!("{number}. "), Style::default().fg(theme::ACCENT)),
            ];
            spans.extend(inline_spans(item, Style::default().fg(theme::FG)));
            lines.push(Line::from(spans));
            continue;
        }

        lines.push(Line::from(inline_spans(raw_line, Style::default().fg(theme::FG))));
    }

    lines
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|ch| *ch == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = line[level..].strip_prefix(' ')?;
    Some((level, rest.trim()))
}

fn numbered_item(line: &str) -> Option<(&str, &str)> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix(". ")?;
    Some((&line[..digits], rest))
}

/// Splits on `**bold**` and `` `code` `` markers. Unterminated markers are
/// kept as literal text.
fn inline_spans(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let bold = rest.find("**");
        let code = rest.find('`');
        let (pos, marker, style) = match (bold, code) {
            (Some(b), Some(c)) if c < b => (c, "`", Style::default().fg(theme::USER)),
            (Some(b), _) => (b, "**", base.add_modifier(Modifier::BOLD)),
            (None, Some(c)) => (c, "`", Style::default().fg(theme::USER)),
            (None, None) => break,
        };

        let after = &rest[pos + marker.len()..];
        let Some(end) = after.find(marker) else {
            break;
        };
        if pos > 0 {
            spans.push(Span::styled(rest[..pos].to_string(), base));
        }
        spans.push(Span::styled(after[..end].to_string(), style));
        rest = &after[end + marker.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::styled(rest.to_string(), base));
    }
    spans
}
