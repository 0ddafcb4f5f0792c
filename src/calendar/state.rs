use super::notes::Notes;
use super::{search, Festival};
use crate::error::StorageError;

/// Festival list, search query and notes shared by every view.
#[derive(Debug)]
pub struct CalendarState {
    festivals: Vec<Festival>,
    search_query: String,
    notes: Notes,
}

impl CalendarState {
    pub fn new(notes: Notes) -> Self {
        Self {
            festivals: Vec::new(),
            search_query: String::new(),
            notes,
        }
    }

    pub fn festivals(&self) -> &[Festival] {
        &self.festivals
    }

    /// Replace the whole list. Entries are never patched in place.
    pub fn set_festivals(&mut self, festivals: Vec<Festival>) {
        self.festivals = festivals;
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn notes(&self) -> &Notes {
        &self.notes
    }

    pub fn set_note(&mut self, date_key: &str, text: &str) -> Result<(), StorageError> {
        self.notes.set(date_key, text)
    }

    /// Festivals matching the current search query.
    pub fn filtered(&self) -> Vec<&Festival> {
        search::filter(&self.festivals, &self.search_query)
    }

    pub fn days_in_month(&self, month: &str) -> Vec<&Festival> {
        self.festivals.iter().filter(|f| f.month == month).collect()
    }

    /// Distinct months in the order they first appear.
    pub fn months(&self) -> Vec<&str> {
        let mut months: Vec<&str> = Vec::new();
        for f in &self.festivals {
            if !months.contains(&f.month.as_str()) {
                months.push(&f.month);
            }
        }
        months
    }
}
