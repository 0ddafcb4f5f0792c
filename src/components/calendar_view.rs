use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, GRID_COLUMNS};
use crate::calendar::Festival;
use crate::theme;

/// Columns taken by one day cell.
const CELL_WIDTH: usize = 6;
/// Width of one month block including its border.
const MONTH_WIDTH: u16 = (GRID_COLUMNS * CELL_WIDTH) as u16 + 2;

pub struct CalendarView;

impl CalendarView {
    /// One grid per configured month, side by side when the terminal is wide
    /// enough, stacked otherwise.
    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        if app.months.is_empty() {
            return;
        }
        let count = app.months.len() as u32;
        let constraints = vec![Constraint::Ratio(1, count); app.months.len()];
        let side_by_side = area.width >= MONTH_WIDTH * app.months.len() as u16;
        let areas = if side_by_side {
            Layout::horizontal(constraints).split(area)
        } else {
            Layout::vertical(constraints).split(area)
        };

        let selected = app.selected_festival();
        for (month, month_area) in app.months.iter().zip(areas.iter()) {
            let days = app.state().days_in_month(month);
            render_month(frame, *month_area, app, month, &days, selected);
        }
    }
}

fn render_month(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    month: &str,
    days: &[&Festival],
    selected: Option<&Festival>,
) {
    let theme = theme::current();

    let holidays = days.iter().filter(|d| d.holiday).count();
    let block = Block::default()
        .title(format!(" {} ", month))
        .title_style(theme.header)
        .title_bottom(Line::from(Span::styled(
            if holidays > 0 {
                format!(" {} holiday{} ", holidays, if holidays == 1 { "" } else { "s" })
            } else {
                String::new()
            },
            theme.dim,
        )))
        .borders(Borders::ALL)
        .border_style(theme.border);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if days.is_empty() {
        let msg = Paragraph::new("No data for this month").style(theme.dim);
        frame.render_widget(msg, inner);
        return;
    }

    // Each grid row shows the primary labels, then the secondary labels.
    let mut lines: Vec<Line> = Vec::new();
    for week in days.chunks(GRID_COLUMNS) {
        let mut top: Vec<Span> = Vec::new();
        let mut bottom: Vec<Span> = Vec::new();
        for day in week {
            let is_selected = selected.is_some_and(|s| std::ptr::eq(s, *day));
            let style = if is_selected {
                theme.selected
            } else if day.holiday {
                theme.holiday
            } else if day.is_special() {
                theme.special
            } else if day.has_event() {
                Style::default().add_modifier(Modifier::UNDERLINED)
            } else {
                Style::default()
            };

            top.push(Span::styled(format!(" {:>3}", day.np), style));
            if app.has_note(day) {
                top.push(Span::styled("* ", theme.note));
            } else {
                top.push(Span::raw("  "));
            }
            bottom.push(Span::styled(
                format!(" {:>3}  ", day.en),
                if is_selected { theme.selected } else { theme.dim },
            ));
        }
        lines.push(Line::from(top));
        lines.push(Line::from(bottom));
    }

    // Scroll so the selected row stays visible in short terminals.
    let selected_row = selected
        .and_then(|s| days.iter().position(|d| std::ptr::eq(*d, s)))
        .map(|i| (i / GRID_COLUMNS) * 2)
        .unwrap_or(0);
    let height = inner.height as usize;
    let offset = (selected_row + 2).saturating_sub(height);

    frame.render_widget(Paragraph::new(lines).scroll((offset as u16, 0)), inner);
}
