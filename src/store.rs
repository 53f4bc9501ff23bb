//! Persistence collaborators.
//!
//! Each store treats its backing data as a single opaque document: load
//! the whole thing once at startup, rewrite the whole thing after every
//! mutation. No partial-field updates exist anywhere.
//!
//! `JsonFileStore` is the bundled implementation — one pretty-printed
//! JSON file per document in the data directory, written atomically.
//! Hosts with a different backend (remote document collection, REST
//! endpoint) implement the same two traits.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{PlaylistDocument, PlaylistItem, RosterDocument, DEFAULT_PLAYLIST};

/// Whole-document persistence for the sales board.
pub trait RosterPersistence: Send {
    /// `Ok(None)` means no document exists yet (first run).
    fn load(&self) -> Result<Option<RosterDocument>, String>;
    fn save(&self, doc: &RosterDocument) -> Result<(), String>;
}

/// Whole-document persistence for the playlists.
pub trait PlaylistPersistence: Send {
    fn load(&self) -> Result<Option<PlaylistDocument>, String>;
    fn save(&self, doc: &PlaylistDocument) -> Result<(), String>;
}

const ROSTER_FILE: &str = "sales_board.json";
const PLAYLISTS_FILE: &str = "playlists.json";
/// Pre-multi-playlist documents: a bare item array.
const LEGACY_PLAYLIST_FILE: &str = "playlist.json";

/// File-backed document store rooted at one directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    fn read_document<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>, String> {
        let path = self.dir.join(filename);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("Read error ({}): {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| format!("Parse error ({}): {}", path.display(), e))
    }

    fn write_document<T: Serialize>(&self, filename: &str, doc: &T) -> Result<(), String> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Failed to create {}: {}", self.dir.display(), e))?;
        let path = self.dir.join(filename);
        let content =
            serde_json::to_string_pretty(doc).map_err(|e| format!("Serialize error: {}", e))?;
        atomic_write_str(&path, &content).map_err(|e| format!("Write error: {}", e))
    }
}

impl RosterPersistence for JsonFileStore {
    fn load(&self) -> Result<Option<RosterDocument>, String> {
        self.read_document(ROSTER_FILE)
    }

    fn save(&self, doc: &RosterDocument) -> Result<(), String> {
        self.write_document(ROSTER_FILE, doc)
    }
}

impl PlaylistPersistence for JsonFileStore {
    fn load(&self) -> Result<Option<PlaylistDocument>, String> {
        if let Some(doc) = self.read_document::<PlaylistDocument>(PLAYLISTS_FILE)? {
            return Ok(Some(doc));
        }

        // Migrate the pre-multi-playlist format: a bare item array becomes
        // the "default" playlist. The legacy file is dropped on first save.
        if let Some(items) = self.read_document::<Vec<PlaylistItem>>(LEGACY_PLAYLIST_FILE)? {
            log::info!(
                "Migrating legacy single-playlist document ({} items) to '{}'",
                items.len(),
                DEFAULT_PLAYLIST
            );
            let mut doc = PlaylistDocument::default();
            doc.playlists.insert(DEFAULT_PLAYLIST.to_string(), items);
            return Ok(Some(doc));
        }

        Ok(None)
    }

    fn save(&self, doc: &PlaylistDocument) -> Result<(), String> {
        self.write_document(PLAYLISTS_FILE, doc)?;
        let legacy = self.dir.join(LEGACY_PLAYLIST_FILE);
        if legacy.exists() {
            let _ = fs::remove_file(&legacy);
        }
        Ok(())
    }
}

/// Write via a sibling temp file + rename so readers never observe a
/// half-written document.
fn atomic_write_str(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)
}
