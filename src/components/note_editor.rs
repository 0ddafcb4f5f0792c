use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::theme;

/// Text being edited for one date key. Nothing is stored until saved.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEditorState {
    pub date_key: String,
    pub text: String,
}

impl NoteEditorState {
    pub fn new(date_key: String, text: String) -> Self {
        Self { date_key, text }
    }

    pub fn input_char(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn newline(&mut self) {
        self.text.push('\n');
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

pub struct NoteEditor;

impl NoteEditor {
    pub fn render(frame: &mut Frame, area: Rect, state: &NoteEditorState) {
        let theme = theme::current();

        let form_w = area.width.clamp(30, 60);
        let form_h = area.height.clamp(8, 14);
        let x = area.x + (area.width.saturating_sub(form_w)) / 2;
        let y = area.y + (area.height.saturating_sub(form_h)) / 2;
        let form_area = Rect::new(x, y, form_w.min(area.width), form_h.min(area.height));

        frame.render_widget(Clear, form_area);

        let block = Block::default()
            .title(format!(" Note for {} ", state.date_key))
            .title_style(
                Style::default()
                    .fg(ratatui::style::Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ratatui::style::Color::Green));

        let inner = block.inner(form_area);
        frame.render_widget(block, form_area);

        let rows = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner);

        let mut lines: Vec<Line> = state.text.split('\n').map(Line::from).collect();
        if let Some(last) = lines.last_mut() {
            last.push_span(Span::styled("_", Style::default().fg(ratatui::style::Color::Cyan)));
        }
        // Keep the cursor line in view once the note outgrows the box.
        let overflow = lines.len().saturating_sub(rows[0].height as usize);
        let body = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((overflow as u16, 0));
        frame.render_widget(body, rows[0]);

        let key = Style::default().add_modifier(Modifier::BOLD);
        let help = Line::from(vec![
            Span::styled("Enter", key),
            Span::styled(":Save ", theme.dim),
            Span::styled("Alt-Enter", key),
            Span::styled(":Newline ", theme.dim),
            Span::styled("Esc", key),
            Span::styled(":Cancel", theme.dim),
        ]);
        frame.render_widget(Paragraph::new(help), rows[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_operations() {
        let mut state = NoteEditorState::new("Kartik-1".to_string(), "ab".to_string());
        state.input_char('c');
        state.newline();
        state.input_char('d');
        assert_eq!(state.text, "abc\nd");
        state.backspace();
        state.backspace();
        assert_eq!(state.text, "abc");
        state.clear();
        assert!(state.text.is_empty());
        state.backspace();
        assert!(state.text.is_empty());
    }
}
