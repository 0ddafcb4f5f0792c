use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use crate::calendar::{CalendarState, Festival};
use crate::components::note_editor::NoteEditorState;
use crate::config::Config;
use crate::fetch::FetchResult;

/// Days per row of the calendar grid.
pub const GRID_COLUMNS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewMode {
    Calendar,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Search,
    Note,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loading,
    Loaded { count: usize, at: DateTime<Local> },
    Failed(String),
}

pub struct App {
    pub running: bool,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub load_status: LoadStatus,
    pub status_message: Option<String>,
    pub show_help: bool,
    pub year: i32,
    pub months: Vec<String>,
    pub hide_non_events: bool,
    pub editor: Option<NoteEditorState>,
    /// Index into the full festival list.
    calendar_cursor: usize,
    /// Index into `list_entries()`.
    list_cursor: usize,
    reload_requested: bool,
    state: CalendarState,
}

impl App {
    pub fn new(config: &Config, state: CalendarState) -> Self {
        Self {
            running: true,
            view_mode: ViewMode::Calendar,
            input_mode: InputMode::Normal,
            load_status: LoadStatus::Loading,
            status_message: None,
            show_help: false,
            year: config.year,
            months: config.months.clone(),
            hide_non_events: config.hide_non_events,
            editor: None,
            calendar_cursor: 0,
            list_cursor: 0,
            reload_requested: false,
            state,
        }
    }

    pub fn state(&self) -> &CalendarState {
        &self.state
    }

    // ── loading ──

    pub fn begin_load(&mut self) {
        self.load_status = LoadStatus::Loading;
    }

    /// Apply a finished fetch. On failure the previous festivals stay.
    pub fn finish_load(&mut self, result: FetchResult) {
        match result {
            Ok(festivals) => {
                let count = festivals.len();
                self.state.set_festivals(festivals);
                self.load_status = LoadStatus::Loaded {
                    count,
                    at: Local::now(),
                };
                let loaded = self.state.months();
                for month in self.months.iter().filter(|m| !loaded.contains(&m.as_str())) {
                    warn!(year = self.year, month = %month, "no festival days for month");
                }
                self.clamp_cursors();
            }
            Err(e) => {
                error!("failed to load festival data: {}", e);
                self.load_status = LoadStatus::Failed(e.to_string());
            }
        }
    }

    pub fn request_reload(&mut self) {
        self.reload_requested = true;
    }

    pub fn take_reload_request(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }

    pub fn is_loading(&self) -> bool {
        self.load_status == LoadStatus::Loading
    }

    // ── views ──

    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Calendar => ViewMode::List,
            ViewMode::List => ViewMode::Calendar,
        };
    }

    /// What the list view shows: search hits, minus non-event days if configured.
    pub fn list_entries(&self) -> Vec<&Festival> {
        let mut entries = self.state.filtered();
        if self.hide_non_events {
            entries.retain(|f| f.has_event());
        }
        entries
    }

    pub fn list_cursor(&self) -> usize {
        self.list_cursor
    }

    pub fn selected_festival(&self) -> Option<&Festival> {
        match self.view_mode {
            ViewMode::Calendar => self.state.festivals().get(self.calendar_cursor),
            ViewMode::List => self.list_entries().get(self.list_cursor).copied(),
        }
    }

    // ── navigation ──

    pub fn next_day(&mut self) {
        self.move_cursor(1);
    }

    pub fn prev_day(&mut self) {
        self.move_cursor(-1);
    }

    pub fn next_row(&mut self) {
        match self.view_mode {
            ViewMode::Calendar => self.move_cursor(GRID_COLUMNS as isize),
            ViewMode::List => self.move_cursor(1),
        }
    }

    pub fn prev_row(&mut self) {
        match self.view_mode {
            ViewMode::Calendar => self.move_cursor(-(GRID_COLUMNS as isize)),
            ViewMode::List => self.move_cursor(-1),
        }
    }

    /// Jump to the first day of the following month in the calendar.
    pub fn next_month(&mut self) {
        let Some(current) = self
            .state
            .festivals()
            .get(self.calendar_cursor)
            .map(|f| f.month.clone())
        else {
            return;
        };
        if let Some(idx) = self
            .state
            .festivals()
            .iter()
            .enumerate()
            .skip(self.calendar_cursor)
            .find(|(_, f)| f.month != current)
            .map(|(i, _)| i)
        {
            self.calendar_cursor = idx;
        }
    }

    /// Jump to the first day of the current month, or of the previous one if
    /// already there.
    pub fn prev_month(&mut self) {
        let festivals = self.state.festivals();
        let Some(current) = festivals.get(self.calendar_cursor) else {
            return;
        };
        let month_start = first_index_of_run(festivals, self.calendar_cursor);
        if month_start < self.calendar_cursor {
            self.calendar_cursor = month_start;
        } else if month_start > 0 {
            let prev_month = &festivals[month_start - 1].month;
            if *prev_month != current.month {
                self.calendar_cursor = first_index_of_run(festivals, month_start - 1);
            }
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let (cursor, len) = match self.view_mode {
            ViewMode::Calendar => (&mut self.calendar_cursor, self.state.festivals().len()),
            ViewMode::List => {
                let len = self.list_entries().len();
                (&mut self.list_cursor, len)
            }
        };
        if len == 0 {
            *cursor = 0;
            return;
        }
        let target = (*cursor as isize + delta).clamp(0, len as isize - 1);
        *cursor = target as usize;
    }

    fn clamp_cursors(&mut self) {
        let festivals = self.state.festivals().len();
        self.calendar_cursor = self.calendar_cursor.min(festivals.saturating_sub(1));
        let entries = self.list_entries().len();
        self.list_cursor = self.list_cursor.min(entries.saturating_sub(1));
    }

    // ── search ──

    pub fn start_search(&mut self) {
        self.input_mode = InputMode::Search;
    }

    pub fn search_input_char(&mut self, c: char) {
        let mut query = self.state.search_query().to_string();
        query.push(c);
        self.update_query(query);
    }

    pub fn search_backspace(&mut self) {
        let mut query = self.state.search_query().to_string();
        query.pop();
        self.update_query(query);
    }

    pub fn clear_search(&mut self) {
        self.update_query(String::new());
    }

    /// Enter in the search box shows the results.
    pub fn submit_search(&mut self) {
        self.input_mode = InputMode::Normal;
        self.view_mode = ViewMode::List;
    }

    pub fn leave_search(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    fn update_query(&mut self, query: String) {
        self.state.set_search_query(query);
        self.list_cursor = 0;
    }

    // ── notes ──

    pub fn open_note_editor(&mut self) {
        let Some(festival) = self.selected_festival() else {
            self.status_message = Some("No day selected".to_string());
            return;
        };
        let key = festival.date_key();
        let existing = self.state.notes().get(&key).unwrap_or_default().to_string();
        self.editor = Some(NoteEditorState::new(key, existing));
        self.input_mode = InputMode::Note;
    }

    pub fn save_note(&mut self) {
        let Some(editor) = self.editor.as_ref() else {
            return;
        };
        match self.state.set_note(&editor.date_key, &editor.text) {
            Ok(()) => {
                info!(key = %editor.date_key, "note saved");
                self.status_message = Some(format!("Note saved for {}", editor.date_key));
                self.close_note_editor();
            }
            Err(e) => {
                error!(key = %editor.date_key, "note not saved: {}", e);
                self.status_message = Some(format!("Note not saved: {}", e));
            }
        }
    }

    pub fn close_note_editor(&mut self) {
        self.editor = None;
        self.input_mode = InputMode::Normal;
    }

    pub fn has_note(&self, festival: &Festival) -> bool {
        self.state.notes().has_note(&festival.date_key())
    }

    pub fn note_for(&self, festival: &Festival) -> Option<&str> {
        self.state
            .notes()
            .get(&festival.date_key())
            .filter(|n| !n.is_empty())
    }
}

fn first_index_of_run(festivals: &[Festival], idx: usize) -> usize {
    let month = &festivals[idx].month;
    let mut start = idx;
    while start > 0 && festivals[start - 1].month == *month {
        start -= 1;
    }
    start
}
