use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, InputMode, LoadStatus, ViewMode};
use crate::theme;

pub struct StatusBar;

impl StatusBar {
    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let theme = theme::current();
        let w = area.width as usize;

        let mode_str = match app.view_mode {
            ViewMode::Calendar => "[Calendar]",
            ViewMode::List => "[List]",
        };

        let focus_indicator = match app.input_mode {
            InputMode::Search => " [Search]",
            InputMode::Note => " [Note]",
            InputMode::Normal => "",
        };

        let load_str = match &app.load_status {
            LoadStatus::Loading => " loading...".to_string(),
            LoadStatus::Loaded { count, at } => format!(" {} days @ {}", count, at.format("%H:%M")),
            LoadStatus::Failed(_) => " load failed".to_string(),
        };

        // Status message wins over context hints.
        let right_text = if let Some(ref msg) = app.status_message {
            format!(" {} ", msg)
        } else {
            match app.input_mode {
                InputMode::Search => " Enter:Show results Esc:Done ^U:Clear ".to_string(),
                InputMode::Note => " Enter:Save Esc:Cancel ".to_string(),
                InputMode::Normal if w >= 90 => {
                    " hjkl:Nav [/]:Month Tab:View /:Search Enter:Note r:Reload ?:Help q:Quit "
                        .to_string()
                }
                InputMode::Normal if w >= 55 => " Tab:View /:Search Enter:Note q:Quit ".to_string(),
                InputMode::Normal => " ?:Help q:Quit ".to_string(),
            }
        };

        let left = format!(" {}{}{} ", mode_str, focus_indicator, load_str);
        let used = left.chars().count() + right_text.chars().count();
        let padding = " ".repeat(w.saturating_sub(used));

        let right_style = if matches!(app.load_status, LoadStatus::Failed(_))
            && app.status_message.is_none()
        {
            theme.status.patch(theme.error)
        } else {
            theme.status
        };

        let line = Line::from(vec![
            Span::styled(left, theme.status),
            Span::styled(padding, theme.status),
            Span::styled(right_text, right_style),
        ]);

        frame.render_widget(Paragraph::new(line).style(theme.status), area);
    }
}
