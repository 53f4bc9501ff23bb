//! Application state and configuration.
//!
//! One `AppState` owns everything, passed explicitly to every handler —
//! no ambient globals. Stores sit behind their own mutex; persistence
//! runs inside the lock, so writes to one document are serialized and
//! "last response wins" races cannot happen within a process.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};

use crate::auth::Session;
use crate::db::HistoryDb;
use crate::player::Rotation;
use crate::playlist::PlaylistBoard;
use crate::roster::Roster;
use crate::store::JsonFileStore;
use crate::types::{Config, JobId, PlaylistDocument};

const HISTORY_DB_FILE: &str = "history.db";

pub struct AppState {
    pub config: RwLock<Option<Config>>,
    pub roster: Mutex<Roster>,
    pub playlists: Mutex<PlaylistBoard>,
    pub session: Mutex<Session>,
    pub db: Mutex<Option<HistoryDb>>,
    pub rotation: Mutex<Rotation>,
    pub last_scheduled_run: Mutex<HashMap<JobId, DateTime<Utc>>>,
}

impl AppState {
    /// Build from the default locations under ~/.frontdesk. Load
    /// problems degrade rather than abort: an unreadable sales board
    /// starts from the seed roster, a missing DB disables history.
    pub fn new() -> Self {
        let config = load_config().ok();
        let data_dir = resolve_data_dir(config.as_ref());

        let roster = match Roster::load(Box::new(JsonFileStore::new(&data_dir))) {
            Ok(roster) => roster,
            Err(e) => {
                log::warn!("Failed to load the sales board: {}. Starting from the seed roster.", e);
                Roster::seeded(Box::new(JsonFileStore::new(&data_dir)))
            }
        };

        let playlists = match PlaylistBoard::load(Box::new(JsonFileStore::new(&data_dir))) {
            Ok(board) => board,
            Err(e) => {
                log::warn!("Failed to load playlists: {}. Starting empty.", e);
                PlaylistBoard::with_document(
                    Box::new(JsonFileStore::new(&data_dir)),
                    PlaylistDocument::default(),
                )
            }
        };

        let db = match HistoryDb::open(&data_dir.join(HISTORY_DB_FILE)) {
            Ok(db) => Some(db),
            Err(e) => {
                log::warn!("Failed to open history database: {}. History features disabled.", e);
                None
            }
        };

        Self::with_parts(config, roster, playlists, db)
    }

    /// Build from explicit parts. Hosts with their own persistence
    /// collaborators (and tests) come in through here.
    pub fn with_parts(
        config: Option<Config>,
        roster: Roster,
        playlists: PlaylistBoard,
        db: Option<HistoryDb>,
    ) -> Self {
        AppState {
            config: RwLock::new(config),
            roster: Mutex::new(roster),
            playlists: Mutex::new(playlists),
            session: Mutex::new(Session::new()),
            db: Mutex::new(db),
            rotation: Mutex::new(Rotation::new()),
            last_scheduled_run: Mutex::new(HashMap::new()),
        }
    }

    /// Record when a scheduled job last ran.
    pub fn set_last_scheduled_run(&self, job: JobId, time: DateTime<Utc>) {
        if let Ok(mut guard) = self.last_scheduled_run.lock() {
            guard.insert(job, time);
        }
    }

    /// When a job last ran on schedule, if ever.
    pub fn get_last_scheduled_run(&self, job: JobId) -> Option<DateTime<Utc>> {
        self.last_scheduled_run
            .lock()
            .ok()
            .and_then(|guard| guard.get(&job).cloned())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// The canonical config file path (~/.frontdesk/config.json).
pub fn config_path() -> Result<PathBuf, String> {
    Ok(state_dir()?.join("config.json"))
}

/// The state directory (~/.frontdesk), created on first use.
pub fn state_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    let dir = home.join(".frontdesk");
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| format!("Failed to create state dir: {}", e))?;
    }
    Ok(dir)
}

/// Where the documents and the history DB live: the configured override,
/// or the state directory.
pub fn resolve_data_dir(config: Option<&Config>) -> PathBuf {
    if let Some(config) = config {
        if !config.data_dir.is_empty() {
            return PathBuf::from(&config.data_dir);
        }
    }
    state_dir().unwrap_or_else(|e| {
        log::warn!("{}; falling back to ./.frontdesk", e);
        PathBuf::from(".frontdesk")
    })
}

/// Load configuration from ~/.frontdesk/config.json.
pub fn load_config() -> Result<Config, String> {
    let path = config_path()?;
    if !path.exists() {
        return Err(format!("Config file not found at {}", path.display()));
    }

    let content =
        fs::read_to_string(&path).map_err(|e| format!("Failed to read config: {}", e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Create or update config.json.
///
/// If config already exists in memory, clones it, applies the mutator,
/// and writes back. If it is None (first run), starts from defaults.
pub fn create_or_update_config(
    state: &AppState,
    mutator: impl FnOnce(&mut Config),
) -> Result<Config, String> {
    let mut guard = state.config.write().map_err(|_| "Lock poisoned")?;

    let mut config = guard.clone().unwrap_or_default();
    mutator(&mut config);

    let path = config_path()?;
    let content = serde_json::to_string_pretty(&config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;

    *guard = Some(config.clone());
    Ok(config)
}

/// Reload configuration from disk.
pub fn reload_config(state: &AppState) -> Result<Config, String> {
    let config = load_config()?;
    let mut guard = state.config.write().map_err(|_| "Lock poisoned")?;
    *guard = Some(config.clone());
    Ok(config)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::*;
    use crate::roster::test_support::MemoryStore;
    use crate::types::RosterDocument;

    /// State wired to shared in-memory stores and an in-memory DB.
    pub fn memory_state(store: &MemoryStore) -> Arc<AppState> {
        let roster = Roster::load(Box::new(store.handle())).unwrap();
        let playlists = PlaylistBoard::load(Box::new(store.handle())).unwrap();
        let db = HistoryDb::open_in_memory().unwrap();
        Arc::new(AppState::with_parts(None, roster, playlists, Some(db)))
    }

    /// State with an empty roster instead of the seven seeded sellers.
    pub fn empty_roster_state(store: &MemoryStore) -> Arc<AppState> {
        let roster = Roster::with_document(Box::new(store.handle()), RosterDocument::default());
        let playlists = PlaylistBoard::load(Box::new(store.handle())).unwrap();
        let db = HistoryDb::open_in_memory().unwrap();
        Arc::new(AppState::with_parts(None, roster, playlists, Some(db)))
    }
}
