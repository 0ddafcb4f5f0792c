mod app;
mod calendar;
mod components;
mod config;
mod error;
mod event;
mod fetch;
mod theme;
mod tui;

use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::Duration;

use app::{App, InputMode, LoadStatus, ViewMode};
use calendar::{CalendarState, FestivalLoader, JsonFileBackend, Notes};
use color_eyre::Result;
use config::Config;
use crossterm::event::{KeyCode, KeyModifiers};
use fetch::FetchTask;
use ratatui::layout::{Constraint, Layout, Rect};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let config = Config::load()?;
    theme::init(&config.theme);
    tracing::info!(year = config.year, months = ?config.months, "starting festival calendar");

    let notes_backend = JsonFileBackend::new(config.notes_path());
    tracing::info!(path = %notes_backend.path().display(), "using notes file");
    let state = CalendarState::new(Notes::load(Box::new(notes_backend)));
    tracing::info!(count = state.notes().len(), "notes loaded");
    let mut app = App::new(&config, state);

    let loader = FestivalLoader::new(&config.source, config.months.clone())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app, &runtime, &loader);
    tui::restore()?;
    tracing::info!("exiting");
    result
}

/// Log to a file under the data dir; the terminal belongs to the UI.
fn init_logging() {
    let dir = config::data_dir();
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("festival-calendar.log"))
    else {
        return;
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "festival_calendar=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
}

fn run(
    terminal: &mut tui::Tui,
    app: &mut App,
    runtime: &tokio::runtime::Runtime,
    loader: &FestivalLoader,
) -> Result<()> {
    let mut fetch = Some(FetchTask::spawn(runtime.handle(), loader.clone(), app.year));
    app.begin_load();

    while app.running {
        if let Some(task) = fetch.as_mut() {
            if let Some(result) = task.poll() {
                app.finish_load(result);
                fetch = None;
            }
        }

        if app.take_reload_request() {
            if app.is_loading() {
                tracing::debug!("superseding in-flight fetch");
            }
            // Replacing the task drops (and aborts) any fetch still in flight.
            fetch = Some(FetchTask::spawn(runtime.handle(), loader.clone(), app.year));
            app.begin_load();
            app.status_message = Some("Reloading festival data...".to_string());
        }

        terminal.draw(|frame| draw(frame, app))?;

        if let Some(key) = event::next_key_press(Duration::from_millis(100))? {
            // Clear status message on any key
            app.status_message = None;

            if app.show_help {
                if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
                    app.show_help = false;
                }
                continue;
            }

            match app.input_mode {
                InputMode::Normal => handle_normal_input(app, key.code, key.modifiers),
                InputMode::Search => handle_search_input(app, key.code, key.modifiers),
                InputMode::Note => handle_note_input(app, key.code, key.modifiers),
            }
        }
    }

    Ok(())
}

fn handle_normal_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match (code, modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            app.running = false;
        }
        (KeyCode::Tab, _) | (KeyCode::Char('v'), _) => app.toggle_view(),
        (KeyCode::Char('1'), _) => app.view_mode = ViewMode::Calendar,
        (KeyCode::Char('2'), _) => app.view_mode = ViewMode::List,
        (KeyCode::Char('/'), _) => app.start_search(),
        (KeyCode::Char('r'), _) => app.request_reload(),
        (KeyCode::Enter, _) | (KeyCode::Char('n'), _) => app.open_note_editor(),
        (KeyCode::Left, _) | (KeyCode::Char('h'), _) => app.prev_day(),
        (KeyCode::Right, _) | (KeyCode::Char('l'), _) => app.next_day(),
        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => app.prev_row(),
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => app.next_row(),
        (KeyCode::Char('['), _) => app.prev_month(),
        (KeyCode::Char(']'), _) => app.next_month(),
        (KeyCode::Char('?'), _) => app.show_help = true,
        _ => {}
    }
}

fn handle_search_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match (code, modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => app.running = false,
        (KeyCode::Char('u'), KeyModifiers::CONTROL) => app.clear_search(),
        (KeyCode::Esc, _) => app.leave_search(),
        (KeyCode::Enter, _) => app.submit_search(),
        (KeyCode::Backspace, _) => app.search_backspace(),
        (KeyCode::Char(c), m) if is_text_input(m) => app.search_input_char(c),
        _ => {}
    }
}

fn handle_note_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match (code, modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => app.running = false,
        (KeyCode::Esc, _) => app.close_note_editor(),
        (KeyCode::Enter, KeyModifiers::ALT) | (KeyCode::Char('j'), KeyModifiers::CONTROL) => {
            if let Some(ref mut editor) = app.editor {
                editor.newline();
            }
        }
        (KeyCode::Enter, _) => app.save_note(),
        (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
            if let Some(ref mut editor) = app.editor {
                editor.clear();
            }
        }
        (KeyCode::Backspace, _) => {
            if let Some(ref mut editor) = app.editor {
                editor.backspace();
            }
        }
        (KeyCode::Char(c), m) if is_text_input(m) => {
            if let Some(ref mut editor) = app.editor {
                editor.input_char(c);
            }
        }
        _ => {}
    }
}

/// Plain or shifted keys type text; anything with Ctrl/Alt is a command.
fn is_text_input(modifiers: KeyModifiers) -> bool {
    modifiers == KeyModifiers::NONE || modifiers == KeyModifiers::SHIFT
}

fn draw(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();

    // Search bar, content, status bar
    let layout = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .split(area);

    components::SearchBar::render(
        frame,
        layout[0],
        app.state().search_query(),
        app.input_mode == InputMode::Search,
        app.year,
    );

    let content_area = layout[1];
    if app.state().festivals().is_empty() {
        render_placeholder(frame, content_area, &app.load_status);
    } else {
        match app.view_mode {
            ViewMode::Calendar => render_calendar_layout(frame, content_area, app),
            ViewMode::List => components::ListView::render(frame, content_area, app),
        }
    }

    if let Some(ref editor) = app.editor {
        components::NoteEditor::render(frame, area, editor);
    }

    if app.show_help {
        render_help(frame, area);
    }

    components::StatusBar::render(frame, layout[2], app);
}

fn render_calendar_layout(frame: &mut ratatui::Frame, area: Rect, app: &App) {
    let detail_h = if area.height >= 24 { 8 } else { 5 };
    let content = Layout::vertical([Constraint::Min(4), Constraint::Length(detail_h)]).split(area);

    components::CalendarView::render(frame, content[0], app);

    let selected = app.selected_festival();
    let note = selected.and_then(|f| app.note_for(f));
    components::DetailPane::render(frame, content[1], selected, note);
}

/// Shown while there are no festivals to draw.
fn render_placeholder(frame: &mut ratatui::Frame, area: Rect, status: &LoadStatus) {
    use ratatui::layout::Alignment;
    use ratatui::widgets::{Paragraph, Wrap};

    let theme = theme::current();
    let (text, style) = match status {
        LoadStatus::Loading => ("Loading festival data...".to_string(), theme.dim),
        LoadStatus::Loaded { .. } => (
            "No festival days for the configured months.".to_string(),
            theme.dim,
        ),
        LoadStatus::Failed(msg) => (
            format!("Failed to load festival data: {}\n\nPress 'r' to retry.", msg),
            theme.error,
        ),
    };

    let rows = Layout::vertical([
        Constraint::Percentage(40),
        Constraint::Min(3),
    ])
    .split(area);
    let para = Paragraph::new(text)
        .style(style)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(para, rows[1]);
}

fn render_help(frame: &mut ratatui::Frame, area: Rect) {
    use ratatui::style::{Color, Modifier, Style};
    use ratatui::text::{Line, Span};
    use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

    let theme = theme::current();

    let popup_w = area.width.clamp(30, 52).min(area.width);
    let popup_h = area.height.clamp(12, 24).min(area.height);
    let x = area.x + (area.width.saturating_sub(popup_w)) / 2;
    let y = area.y + (area.height.saturating_sub(popup_h)) / 2;
    let popup_area = Rect::new(x, y, popup_w, popup_h);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Keybindings ")
        .title_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let section_style = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let entry = |keys: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<11}", keys), key_style),
            Span::raw(desc),
        ])
    };

    let lines = vec![
        Line::from(Span::styled("Navigation", section_style)),
        entry("h/l \u{2190}/\u{2192}", "Previous/next day"),
        entry("j/k \u{2191}/\u{2193}", "Next/previous row"),
        entry("[/]", "Previous/next month"),
        Line::from(""),
        Line::from(Span::styled("Views", section_style)),
        entry("Tab / v", "Toggle calendar / list"),
        entry("1/2", "Calendar / list view"),
        entry("/", "Search (Enter shows list)"),
        Line::from(""),
        Line::from(Span::styled("Notes", section_style)),
        entry("Enter / n", "Edit note for selected day"),
        entry("Alt-Enter", "Newline in note"),
        entry("Esc", "Cancel note"),
        Line::from(""),
        entry("r", "Reload festival data"),
        Line::from(vec![
            Span::styled("  q", key_style),
            Span::styled(" / ", theme.dim),
            Span::styled(format!("{:<7}", "Esc"), key_style),
            Span::raw("Quit / close popup"),
        ]),
    ];

    let para = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(para, inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::notes::MemoryBackend;
    use crate::calendar::Festival;

    fn app_with_one_day() -> App {
        let state = CalendarState::new(Notes::load(Box::new(MemoryBackend::new())));
        let mut app = App::new(&Config::default(), state);
        app.finish_load(Ok(vec![Festival {
            np: "1".to_string(),
            en: "17".to_string(),
            tithi: String::new(),
            event: "Ghatasthapana".to_string(),
            day: 1,
            specialday: String::new(),
            holiday: false,
            month: "Ashwin".to_string(),
        }]));
        app
    }

    fn editor_text(app: &App) -> &str {
        app.editor.as_ref().map(|e| e.text.as_str()).unwrap_or_default()
    }

    #[test]
    fn note_editor_types_plain_and_shifted_chars_only() {
        let mut app = app_with_one_day();
        handle_normal_input(&mut app, KeyCode::Char('n'), KeyModifiers::NONE);
        assert_eq!(app.input_mode, InputMode::Note);

        handle_note_input(&mut app, KeyCode::Char('h'), KeyModifiers::NONE);
        handle_note_input(&mut app, KeyCode::Char('I'), KeyModifiers::SHIFT);
        handle_note_input(&mut app, KeyCode::Char('a'), KeyModifiers::CONTROL);
        handle_note_input(&mut app, KeyCode::Char('x'), KeyModifiers::ALT);
        assert_eq!(editor_text(&app), "hI");
        assert!(app.running);
    }

    #[test]
    fn ctrl_c_quits_from_note_editor() {
        let mut app = app_with_one_day();
        app.open_note_editor();
        handle_note_input(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(!app.running);
        assert_eq!(editor_text(&app), "");
    }

    #[test]
    fn search_ignores_modified_chars() {
        let mut app = app_with_one_day();
        app.start_search();
        handle_search_input(&mut app, KeyCode::Char('g'), KeyModifiers::NONE);
        handle_search_input(&mut app, KeyCode::Char('a'), KeyModifiers::CONTROL);
        assert_eq!(app.state().search_query(), "g");
        handle_search_input(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(!app.running);
    }
}
