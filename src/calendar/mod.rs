pub mod festival;
pub mod loader;
pub mod notes;
pub mod search;
pub mod state;

pub use festival::Festival;
pub use loader::FestivalLoader;
pub use notes::{JsonFileBackend, Notes};
pub use state::CalendarState;
