use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::StorageError;

pub type NoteMap = BTreeMap<String, String>;

/// Durable storage for the whole note mapping, read and written as one blob.
pub trait NoteBackend: Send {
    fn load(&self) -> Result<NoteMap, StorageError>;
    fn save(&self, notes: &NoteMap) -> Result<(), StorageError>;

    /// Move data that failed to load out of the way so the next `save`
    /// cannot overwrite it. Returns where it went, `None` if there was nothing.
    fn set_aside(&self) -> Result<Option<PathBuf>, StorageError>;
}

/// Notes kept as a single JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl NoteBackend for JsonFileBackend {
    fn load(&self) -> Result<NoteMap, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(NoteMap::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if content.trim().is_empty() {
            return Ok(NoteMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, notes: &NoteMap) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }

        // Write a sibling first so a crash never leaves a truncated file behind.
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(notes)?;
        fs::write(&tmp, body).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }

    fn set_aside(&self) -> Result<Option<PathBuf>, StorageError> {
        if fs::symlink_metadata(&self.path).is_err() {
            return Ok(None);
        }
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "notes.json".to_string());
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let dest = self.path.with_file_name(format!("{}.corrupt-{}", name, stamp));
        fs::rename(&self.path, &dest).map_err(|e| self.io_err(e))?;
        warn!(
            from = %self.path.display(),
            to = %dest.display(),
            "moved unreadable notes aside"
        );
        Ok(Some(dest))
    }
}

/// In-memory backend for tests. Can be switched into a failing mode.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryBackend {
    stored: Mutex<Option<String>>,
    fail_writes: Mutex<bool>,
}

#[cfg(test)]
impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a raw blob, as if left behind by a previous run.
    pub fn with_raw(raw: &str) -> Self {
        Self {
            stored: Mutex::new(Some(raw.to_string())),
            fail_writes: Mutex::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.stored.lock().ok().and_then(|s| s.clone())
    }
}

#[cfg(test)]
impl NoteBackend for MemoryBackend {
    fn load(&self) -> Result<NoteMap, StorageError> {
        let stored = self
            .stored
            .lock()
            .map_err(|_| StorageError::Unavailable("lock poisoned".to_string()))?;
        match stored.as_deref() {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(NoteMap::new()),
        }
    }

    fn save(&self, notes: &NoteMap) -> Result<(), StorageError> {
        let failing = self.fail_writes.lock().map(|f| *f).unwrap_or(true);
        if failing {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        let body = serde_json::to_string(notes)?;
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| StorageError::Unavailable("lock poisoned".to_string()))?;
        *stored = Some(body);
        Ok(())
    }

    fn set_aside(&self) -> Result<Option<PathBuf>, StorageError> {
        Err(StorageError::Unavailable(
            "memory backend keeps a single blob".to_string(),
        ))
    }
}

impl<B: NoteBackend + Sync> NoteBackend for std::sync::Arc<B> {
    fn load(&self) -> Result<NoteMap, StorageError> {
        (**self).load()
    }

    fn save(&self, notes: &NoteMap) -> Result<(), StorageError> {
        (**self).save(notes)
    }

    fn set_aside(&self) -> Result<Option<PathBuf>, StorageError> {
        (**self).set_aside()
    }
}

/// The note mapping, mirrored write-through to its backend.
pub struct Notes {
    map: NoteMap,
    backend: Box<dyn NoteBackend>,
    /// Set when stored notes could not be read nor moved aside. Writes are
    /// refused so they are not overwritten.
    read_only: Option<String>,
}

impl Notes {
    /// Hydrate from the backend. Missing or unreadable data yields an empty
    /// mapping; unreadable data is moved aside first, and if that fails the
    /// store refuses writes.
    pub fn load(backend: Box<dyn NoteBackend>) -> Self {
        let mut read_only = None;
        let map = match backend.load() {
            Ok(map) => {
                debug!(count = map.len(), "loaded notes");
                map
            }
            Err(e) => {
                warn!("ignoring unreadable notes: {}", e);
                if let Err(aside) = backend.set_aside() {
                    warn!("could not move unreadable notes aside, notes are read-only: {}", aside);
                    read_only = Some(e.to_string());
                }
                NoteMap::new()
            }
        };
        Self {
            map,
            backend,
            read_only,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Present and non-empty. A cleared note keeps its key but has no text.
    pub fn has_note(&self, key: &str) -> bool {
        self.get(key).is_some_and(|n| !n.is_empty())
    }

    /// Insert or overwrite, then persist the full mapping. The in-memory
    /// mapping only changes once the write has succeeded.
    pub fn set(&mut self, key: &str, text: &str) -> Result<(), StorageError> {
        if let Some(reason) = &self.read_only {
            return Err(StorageError::Unavailable(format!(
                "existing notes could not be read ({})",
                reason
            )));
        }
        let mut updated = self.map.clone();
        updated.insert(key.to_string(), text.to_string());
        self.backend.save(&updated)?;
        debug!(key, len = text.len(), "saved note");
        self.map = updated;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl std::fmt::Debug for Notes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notes")
            .field("map", &self.map)
            .field("read_only", &self.read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn file_notes(dir: &TempDir) -> (Notes, PathBuf) {
        let path = dir.path().join("nested").join("notes.json");
        let notes = Notes::load(Box::new(JsonFileBackend::new(&path)));
        (notes, path)
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let (notes, path) = file_notes(&dir);
        assert_eq!(notes.len(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn note_survives_restart() {
        let dir = TempDir::new().unwrap();
        let (mut notes, path) = file_notes(&dir);
        notes.set("Ashwin-1", "hello").unwrap();
        assert_eq!(notes.get("Ashwin-1"), Some("hello"));
        assert!(path.exists());

        let reloaded = Notes::load(Box::new(JsonFileBackend::new(&path)));
        assert_eq!(reloaded.get("Ashwin-1"), Some("hello"));
    }

    #[test]
    fn last_write_wins() {
        let dir = TempDir::new().unwrap();
        let (mut notes, path) = file_notes(&dir);
        notes.set("Kartik-2", "a").unwrap();
        notes.set("Kartik-2", "b").unwrap();
        assert_eq!(notes.get("Kartik-2"), Some("b"));

        let on_disk: NoteMap = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk["Kartik-2"], "b");
    }

    #[test]
    fn empty_text_keeps_key_without_note() {
        let backend = MemoryBackend::new();
        let mut notes = Notes::load(Box::new(backend));
        notes.set("Ashwin-3", "remember").unwrap();
        notes.set("Ashwin-3", "").unwrap();
        assert_eq!(notes.get("Ashwin-3"), Some(""));
        assert!(!notes.has_note("Ashwin-3"));
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn corrupt_blob_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, "{not json").unwrap();
        let notes = Notes::load(Box::new(JsonFileBackend::new(&path)));
        assert_eq!(notes.len(), 0);

        let notes = Notes::load(Box::new(MemoryBackend::with_raw("[1, 2]")));
        assert_eq!(notes.len(), 0);
    }

    fn set_aside_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("notes.json.corrupt-"))
            })
            .collect()
    }

    #[test]
    fn corrupt_file_is_moved_aside_before_next_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        let previous = r#"{"Ashwin-1":"pay rent","Ashwin-2":"call mom",}"#;
        fs::write(&path, previous).unwrap();

        let mut notes = Notes::load(Box::new(JsonFileBackend::new(&path)));
        assert_eq!(notes.len(), 0);
        notes.set("Kartik-1", "new").unwrap();

        let aside = set_aside_files(dir.path());
        assert_eq!(aside.len(), 1);
        assert_eq!(fs::read_to_string(&aside[0]).unwrap(), previous);

        let on_disk: NoteMap = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk["Kartik-1"], "new");
    }

    #[test]
    fn unreadable_path_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let mut notes = Notes::load(Box::new(JsonFileBackend::new(&path)));
        notes.set("Ashwin-1", "hello").unwrap();

        let aside = set_aside_files(dir.path());
        assert_eq!(aside.len(), 1);
        assert!(aside[0].join("keep").exists());
        assert!(path.is_file());
    }

    #[test]
    fn unreadable_blob_that_cannot_be_moved_refuses_writes() {
        let backend = Arc::new(MemoryBackend::with_raw(r#"{"Ashwin-1":"pay rent",}"#));
        let mut notes = Notes::load(Box::new(backend.clone()));
        assert_eq!(notes.len(), 0);

        let err = notes.set("Kartik-1", "new").unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert_eq!(notes.get("Kartik-1"), None);
        assert_eq!(backend.raw().as_deref(), Some(r#"{"Ashwin-1":"pay rent",}"#));
    }

    #[test]
    fn failed_write_leaves_memory_at_last_persisted_value() {
        let backend = Arc::new(MemoryBackend::new());
        let mut notes = Notes::load(Box::new(backend.clone()));
        notes.set("Ashwin-1", "kept").unwrap();

        backend.set_fail_writes(true);
        let err = notes.set("Ashwin-1", "lost").unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert_eq!(notes.get("Ashwin-1"), Some("kept"));
        assert_eq!(backend.raw().as_deref(), Some(r#"{"Ashwin-1":"kept"}"#));
    }

    #[test]
    fn keys_are_compared_verbatim() {
        let mut notes = Notes::load(Box::new(MemoryBackend::new()));
        notes.set("Ashwin-1", "x").unwrap();
        assert_eq!(notes.get("ashwin-1"), None);
        assert_eq!(notes.get("Ashwin-1 "), None);
    }
}
