use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::App;
use crate::calendar::Festival;
use crate::theme;

pub struct ListView;

impl ListView {
    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let theme = theme::current();
        let entries = app.list_entries();
        let w = area.width as usize;

        let title = if app.state().search_query().is_empty() {
            " Festivals ".to_string()
        } else if w >= 30 {
            format!(" Results for \"{}\" ", app.state().search_query())
        } else {
            " Results ".to_string()
        };

        let count_str = match entries.len() {
            0 => String::new(),
            1 => " 1 day ".to_string(),
            n => format!(" {} days ", n),
        };

        let block = Block::default()
            .title(title)
            .title_style(theme.header)
            .title_bottom(Line::from(Span::styled(count_str, theme.dim)))
            .borders(Borders::ALL)
            .border_style(theme.border);

        if entries.is_empty() {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            frame.render_widget(Paragraph::new("No festivals found.").style(theme.dim), inner);
            return;
        }

        let inner_w = area.width.saturating_sub(2) as usize;
        let items: Vec<ListItem> = entries
            .iter()
            .map(|f| format_festival(f, app.has_note(f), inner_w))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(theme.selected)
            .highlight_symbol("> ");

        let mut state = ListState::default().with_selected(Some(app.list_cursor()));
        frame.render_stateful_widget(list, area, &mut state);
    }
}

fn format_festival(f: &Festival, has_note: bool, max_width: usize) -> ListItem<'static> {
    let theme = theme::current();

    let event = if f.has_event() {
        f.event.clone()
    } else {
        "(no event)".to_string()
    };
    let mut title = vec![Span::styled(
        truncate(&event, max_width.saturating_sub(6)),
        if f.holiday { theme.holiday } else { Style::default() },
    )];
    if has_note {
        title.push(Span::styled(" *", theme.note));
    }

    let mut lines = vec![
        Line::from(title),
        Line::from(vec![
            Span::raw(format!("  {} ({})", f.np, f.en)),
            Span::styled(format!("  {} {}", f.month, f.day), theme.dim),
        ]),
    ];
    if !f.tithi.is_empty() {
        lines.push(Line::from(Span::styled(format!("  {}", f.tithi), theme.dim)));
    }

    ListItem::new(lines)
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        s.to_string()
    } else if max > 3 {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.chars().take(max).collect()
    }
}
