pub mod calendar_view;
pub mod detail_pane;
pub mod list_view;
pub mod note_editor;
pub mod search_bar;
pub mod status_bar;

pub use calendar_view::CalendarView;
pub use detail_pane::DetailPane;
pub use list_view::ListView;
pub use note_editor::NoteEditor;
pub use search_bar::SearchBar;
pub use status_bar::StatusBar;
