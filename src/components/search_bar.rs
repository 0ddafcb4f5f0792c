use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::theme;

pub struct SearchBar;

impl SearchBar {
    pub fn render(frame: &mut Frame, area: Rect, query: &str, focused: bool, year: i32) {
        let theme = theme::current();

        let border_style = if focused {
            Style::default().fg(ratatui::style::Color::Cyan)
        } else {
            theme.border
        };

        let block = Block::default()
            .title(format!(" Nepali Festival Calendar {} ", year))
            .title_style(theme.header)
            .borders(Borders::ALL)
            .border_style(border_style);

        let line = if query.is_empty() && !focused {
            Line::from(Span::styled("Press / to search festivals...", theme.dim))
        } else {
            let cursor = if focused { "_" } else { "" };
            Line::from(vec![
                Span::styled("Search: ", theme.dim),
                Span::raw(format!("{}{}", query, cursor)),
            ])
        };

        frame.render_widget(Paragraph::new(line).block(block), area);
    }
}
