use ratatui::style::{Color, Modifier, Style};

// Dark surfaces with a warm accent. Add roles here rather than inlining colors in views.
pub const BAR_BG: Color = Color::Rgb(14, 18, 24);

pub const FG: Color = Color::Rgb(229, 231, 235);
pub const MUTED: Color = Color::Rgb(156, 163, 175);
pub const DIM: Color = Color::Rgb(107, 114, 128);
pub const BORDER: Color = Color::Rgb(55, 65, 81);

pub const ACCENT: Color = Color::Rgb(255, 159, 26);
pub const ACCENT_BG: Color = Color::Rgb(44, 32, 16);

pub const SUCCESS: Color = Color::Rgb(134, 239, 172);
pub const ERROR: Color = Color::Rgb(248, 113, 113);
pub const WARNING: Color = Color::Rgb(250, 204, 21);

// Message roles in chat transcripts.
pub const USER: Color = Color::Rgb(147, 197, 253);
pub const AI: Color = ACCENT;

pub fn selected() -> Style {
    Style::default()
        .fg(ACCENT)
        .bg(ACCENT_BG)
        .add_modifier(Modifier::BOLD)
}

pub fn title() -> Style {
    Style::default().fg(FG).add_modifier(Modifier::BOLD)
}

pub fn hint() -> Style {
    Style::default().fg(DIM)
}

pub fn block(title: &str) -> ratatui::widgets::Block<'_> {
    ratatui::widgets::Block::default()
        .borders(ratatui::widgets::Borders::ALL)
        .border_style(Style::default().fg(BORDER))
        .padding(ratatui::widgets::Padding::horizontal(1))
        .title(title)
}
