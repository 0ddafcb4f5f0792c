use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::calendar::Festival;
use crate::theme;

/// Everything known about the selected day, including its note.
pub struct DetailPane;

impl DetailPane {
    pub fn render(frame: &mut Frame, area: Rect, festival: Option<&Festival>, note: Option<&str>) {
        let theme = theme::current();

        let Some(f) = festival else {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border);
            let inner = block.inner(area);
            frame.render_widget(block, area);
            frame.render_widget(Paragraph::new("No day selected").style(theme.dim), inner);
            return;
        };

        let block = Block::default()
            .title(format!(" {} {} ({}) ", f.month, f.np, f.en))
            .title_style(if f.holiday { theme.holiday } else { theme.header })
            .borders(Borders::ALL)
            .border_style(theme.border);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines: Vec<Line> = Vec::new();

        if f.has_event() {
            let mut spans = vec![Span::styled(
                f.event.clone(),
                if f.holiday { theme.holiday } else { Style::default() },
            )];
            if f.holiday {
                spans.push(Span::styled("  [holiday]", theme.dim));
            }
            lines.push(Line::from(spans));
        }
        if !f.tithi.is_empty() {
            lines.push(Line::from(vec![
                Span::styled("Tithi: ", theme.dim),
                Span::raw(f.tithi.clone()),
            ]));
        }
        if f.is_special() {
            lines.push(Line::from(vec![
                Span::styled("Special: ", theme.dim),
                Span::styled(f.specialday.clone(), theme.special),
            ]));
        }

        match note {
            Some(text) => {
                lines.push(Line::from(Span::styled("Note:", theme.note)));
                for line in text.lines() {
                    lines.push(Line::from(format!("  {}", line)));
                }
            }
            None => lines.push(Line::from(Span::styled(
                "No note. Press Enter to add one.",
                theme.dim,
            ))),
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}
